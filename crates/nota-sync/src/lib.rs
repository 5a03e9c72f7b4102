//! # nota-sync
//!
//! Debounced autosave for encrypted notes.
//!
//! Each open note gets a session that moves through
//! `Idle -> PendingDebounce -> Saving -> Idle` (or `Error`). Edits restart a
//! single debounce timer; when it elapses the current title and body are
//! sealed with the shared [`nota_crypto::EnvelopeCipher`] and written with
//! one owner-scoped `NoteRepository::update`. Edits that arrive while a save
//! is in flight schedule exactly one follow-up save.
//!
//! ```rust,ignore
//! let engine = AutosaveEngine::new(owner_id, cipher, repository, AutosaveConfig::from_env());
//! engine.open(note.id, note.title, note.body, note.updated_at).await?;
//! engine.edit(note.id, "Groceries", "<p>milk</p>").await?;
//! engine.flush(note.id).await?;
//! engine.close(note.id).await?;
//! ```

pub mod config;
pub mod engine;
mod session;
pub mod snapshot;

pub use config::AutosaveConfig;
pub use engine::AutosaveEngine;
pub use snapshot::{SaveFailure, SessionSnapshot};
