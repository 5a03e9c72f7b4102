//! Core traits for nota abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Repository for encrypted note storage.
///
/// Implementations store and return envelopes as opaque strings; they never
/// decrypt. Every method is scoped by `owner_id`: a call against a note owned
/// by someone else fails with `Error::Forbidden` and changes nothing.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note and return its id.
    async fn create(
        &self,
        owner_id: Uuid,
        title_ciphertext: &str,
        body_ciphertext: &str,
    ) -> Result<Uuid>;

    /// Replace title and body, returning the new `updated_at`.
    async fn update(
        &self,
        note_id: Uuid,
        owner_id: Uuid,
        title_ciphertext: &str,
        body_ciphertext: &str,
    ) -> Result<DateTime<Utc>>;

    /// Fetch a single note.
    async fn fetch(&self, note_id: Uuid, owner_id: Uuid) -> Result<NoteRecord>;

    /// All notes of an owner, oldest first.
    async fn list_all(&self, owner_id: Uuid) -> Result<Vec<NoteRecord>>;

    /// Permanently delete a note.
    async fn delete(&self, note_id: Uuid, owner_id: Uuid) -> Result<()>;

    /// Delete every listed note that belongs to `owner_id`; others are ignored.
    /// Returns the number of notes removed.
    async fn delete_many(&self, note_ids: &[Uuid], owner_id: Uuid) -> Result<u64>;

    /// Pin or unpin a note. Does not touch `updated_at`.
    async fn set_pinned(&self, note_id: Uuid, owner_id: Uuid, pinned: bool) -> Result<()>;
}

// =============================================================================
// ACCOUNT REPOSITORY TRAITS
// =============================================================================

/// Per-account settings that are stored encrypted.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// The stored chat API key envelope, if any.
    async fn api_key_ciphertext(&self, owner_id: Uuid) -> Result<Option<String>>;

    /// Store or clear (`None`) the chat API key envelope.
    async fn set_api_key_ciphertext(&self, owner_id: Uuid, ciphertext: Option<&str>)
        -> Result<()>;
}

// =============================================================================
// CHAT COMPLETION TRAITS
// =============================================================================

/// External chat-completion service, consumed as a black box.
#[async_trait]
pub trait ChatCompletionBackend: Send + Sync {
    /// Send role-tagged messages, receive a single text answer.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
