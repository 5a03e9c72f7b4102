//! Encrypting note service.
//!
//! `SecureNotes` is the only place plaintext crosses into storage: it seals
//! title and body before they reach a [`NoteRepository`] and opens them on
//! the way out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use nota_core::{defaults, DecryptedNote, Error, NoteRecord, NoteRepository, NoteTitle, Result};
use nota_crypto::EnvelopeCipher;

/// Note CRUD over plaintext, stored as envelopes.
#[derive(Clone)]
pub struct SecureNotes {
    cipher: Arc<EnvelopeCipher>,
    notes: Arc<dyn NoteRepository>,
}

impl SecureNotes {
    pub fn new(cipher: Arc<EnvelopeCipher>, notes: Arc<dyn NoteRepository>) -> Self {
        Self { cipher, notes }
    }

    pub fn repository(&self) -> &Arc<dyn NoteRepository> {
        &self.notes
    }

    /// Create a note with an empty body. `None` uses the default title.
    pub async fn create(&self, owner_id: Uuid, title: Option<&str>) -> Result<Uuid> {
        let title = title.unwrap_or(defaults::NOTE_TITLE);
        let title_ct = self.cipher.encrypt(title)?;
        let body_ct = self.cipher.encrypt(defaults::NOTE_BODY)?;

        self.notes
            .create(owner_id, title_ct.as_str(), body_ct.as_str())
            .await
    }

    /// Open a note for reading.
    ///
    /// An envelope that fails to open is fatal here and reported as
    /// `NoteUnreadable`; a missing key still reports `KeyConfiguration`.
    pub async fn open(&self, note_id: Uuid, owner_id: Uuid) -> Result<DecryptedNote> {
        let record = self.notes.fetch(note_id, owner_id).await?;
        let (title, body) = self.open_record(&record).map_err(|e| {
            if e.kind().is_crypto_failure() {
                warn!(
                    subsystem = "database",
                    component = "secure_notes",
                    note_id = %note_id,
                    error_kind = ?e.kind(),
                    "Stored note could not be decrypted"
                );
                Error::NoteUnreadable(note_id)
            } else {
                e
            }
        })?;

        Ok(DecryptedNote {
            id: record.id,
            title,
            body,
            pinned: record.pinned,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Encrypt and replace title and body in one write.
    pub async fn update(
        &self,
        note_id: Uuid,
        owner_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<DateTime<Utc>> {
        let title_ct = self.cipher.encrypt(title)?;
        let body_ct = self.cipher.encrypt(body)?;
        self.notes
            .update(note_id, owner_id, title_ct.as_str(), body_ct.as_str())
            .await
    }

    pub async fn delete(&self, note_id: Uuid, owner_id: Uuid) -> Result<()> {
        self.notes.delete(note_id, owner_id).await
    }

    pub async fn delete_many(&self, note_ids: &[Uuid], owner_id: Uuid) -> Result<u64> {
        self.notes.delete_many(note_ids, owner_id).await
    }

    pub async fn set_pinned(&self, note_id: Uuid, owner_id: Uuid, pinned: bool) -> Result<()> {
        self.notes.set_pinned(note_id, owner_id, pinned).await
    }

    /// Sidebar listing: pinned notes first, then most recently updated.
    ///
    /// A title that cannot be decrypted is returned as `None` so the list
    /// still renders; a missing key fails the whole call.
    pub async fn list_titles(&self, owner_id: Uuid) -> Result<Vec<NoteTitle>> {
        let records = self.notes.list_all(owner_id).await?;
        let mut titles = Vec::with_capacity(records.len());

        for record in records {
            let title = match self.cipher.decrypt(&record.title_ciphertext) {
                Ok(title) => Some(title),
                Err(e) if e.is_unreadable_envelope() => {
                    warn!(
                        subsystem = "database",
                        component = "secure_notes",
                        note_id = %record.id,
                        "Note title could not be decrypted"
                    );
                    None
                }
                Err(e) => return Err(e.into()),
            };

            titles.push(NoteTitle {
                id: record.id,
                title,
                pinned: record.pinned,
                created_at: record.created_at,
                updated_at: record.updated_at,
            });
        }

        titles.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then(b.updated_at.cmp(&a.updated_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(titles)
    }

    fn open_record(&self, record: &NoteRecord) -> Result<(String, String)> {
        let title = self.cipher.decrypt(&record.title_ciphertext)?;
        let body = self.cipher.decrypt(&record.body_ciphertext)?;
        Ok((title, body))
    }
}
