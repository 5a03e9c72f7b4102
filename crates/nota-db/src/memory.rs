//! In-memory repositories.
//!
//! Behave like the PostgreSQL repositories (ownership checks, ordering,
//! timestamps) without a database. Used by tests across the workspace and by
//! local tooling. The note repository can also inject latency and failures
//! into `update` to exercise the autosave engine's timeout and error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use nota_core::{new_v7, AccountRepository, Error, NoteRecord, NoteRepository, Result};

#[derive(Debug, Default)]
struct UpdateFaults {
    delay: Option<Duration>,
    failures_remaining: u32,
}

/// In-memory implementation of NoteRepository.
#[derive(Default)]
pub struct InMemoryNoteRepository {
    notes: RwLock<HashMap<Uuid, NoteRecord>>,
    faults: Mutex<UpdateFaults>,
    update_calls: AtomicU64,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every subsequent `update` by `delay` before it applies.
    pub fn set_update_delay(&self, delay: Option<Duration>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.delay = delay;
        }
    }

    /// Make the next `count` calls to `update` fail without applying.
    pub fn fail_next_updates(&self, count: u32) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failures_remaining = count;
        }
    }

    /// Number of `update` calls received, including failed ones.
    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Insert a fully-formed record, bypassing `create`.
    ///
    /// Lets tests seed rows with fixed timestamps or hand-crafted envelopes.
    pub async fn insert_record(&self, record: NoteRecord) {
        self.notes.write().await.insert(record.id, record);
    }

    /// Replace the stored envelopes of a note without any ownership check.
    pub async fn overwrite_ciphertext(&self, note_id: Uuid, title: &str, body: &str) {
        if let Some(note) = self.notes.write().await.get_mut(&note_id) {
            note.title_ciphertext = title.to_string();
            note.body_ciphertext = body.to_string();
        }
    }

    /// Next fault to apply to an `update` call.
    fn take_fault(&self) -> (Option<Duration>, bool) {
        match self.faults.lock() {
            Ok(mut faults) => {
                let fail = faults.failures_remaining > 0;
                if fail {
                    faults.failures_remaining -= 1;
                }
                (faults.delay, fail)
            }
            Err(_) => (None, false),
        }
    }

    fn check_owner(note: Option<&NoteRecord>, note_id: Uuid, owner_id: Uuid) -> Result<()> {
        match note {
            None => Err(Error::NoteNotFound(note_id)),
            Some(n) if n.owner_id != owner_id => Err(Error::Forbidden(format!(
                "note {} belongs to another owner",
                note_id
            ))),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn create(
        &self,
        owner_id: Uuid,
        title_ciphertext: &str,
        body_ciphertext: &str,
    ) -> Result<Uuid> {
        let now = Utc::now();
        let record = NoteRecord {
            id: new_v7(),
            owner_id,
            title_ciphertext: title_ciphertext.to_string(),
            body_ciphertext: body_ciphertext.to_string(),
            pinned: false,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.notes.write().await.insert(id, record);
        Ok(id)
    }

    async fn update(
        &self,
        note_id: Uuid,
        owner_id: Uuid,
        title_ciphertext: &str,
        body_ciphertext: &str,
    ) -> Result<DateTime<Utc>> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, fail) = self.take_fault();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(Error::Internal("injected update failure".to_string()));
        }

        let mut notes = self.notes.write().await;
        Self::check_owner(notes.get(&note_id), note_id, owner_id)?;

        let now = Utc::now();
        if let Some(note) = notes.get_mut(&note_id) {
            note.title_ciphertext = title_ciphertext.to_string();
            note.body_ciphertext = body_ciphertext.to_string();
            note.updated_at = now;
        }
        Ok(now)
    }

    async fn fetch(&self, note_id: Uuid, owner_id: Uuid) -> Result<NoteRecord> {
        let notes = self.notes.read().await;
        let note = notes.get(&note_id);
        Self::check_owner(note, note_id, owner_id)?;
        note.cloned().ok_or(Error::NoteNotFound(note_id))
    }

    async fn list_all(&self, owner_id: Uuid) -> Result<Vec<NoteRecord>> {
        let notes = self.notes.read().await;
        let mut owned: Vec<NoteRecord> = notes
            .values()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn delete(&self, note_id: Uuid, owner_id: Uuid) -> Result<()> {
        let mut notes = self.notes.write().await;
        Self::check_owner(notes.get(&note_id), note_id, owner_id)?;
        notes.remove(&note_id);
        Ok(())
    }

    async fn delete_many(&self, note_ids: &[Uuid], owner_id: Uuid) -> Result<u64> {
        let mut notes = self.notes.write().await;
        let mut removed = 0;
        for id in note_ids {
            if notes.get(id).is_some_and(|n| n.owner_id == owner_id) {
                notes.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn set_pinned(&self, note_id: Uuid, owner_id: Uuid, pinned: bool) -> Result<()> {
        let mut notes = self.notes.write().await;
        Self::check_owner(notes.get(&note_id), note_id, owner_id)?;
        if let Some(note) = notes.get_mut(&note_id) {
            note.pinned = pinned;
        }
        Ok(())
    }
}

/// In-memory implementation of AccountRepository.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    api_keys: RwLock<HashMap<Uuid, String>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn api_key_ciphertext(&self, owner_id: Uuid) -> Result<Option<String>> {
        Ok(self.api_keys.read().await.get(&owner_id).cloned())
    }

    async fn set_api_key_ciphertext(
        &self,
        owner_id: Uuid,
        ciphertext: Option<&str>,
    ) -> Result<()> {
        let mut keys = self.api_keys.write().await;
        match ciphertext {
            Some(ct) if !ct.is_empty() => {
                keys.insert(owner_id, ct.to_string());
            }
            _ => {
                keys.remove(&owner_id);
            }
        }
        Ok(())
    }
}
