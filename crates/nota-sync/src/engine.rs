//! Autosave engine: one session task per open note.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use nota_core::{Error, EventBus, EventEnvelope, NoteRepository, Result};
use nota_crypto::EnvelopeCipher;

use crate::config::AutosaveConfig;
use crate::session::{Command, SessionContext, SessionTask};
use crate::snapshot::SessionSnapshot;

struct SessionSlot {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

/// Coalesces rapid edits into debounced, strictly ordered writes.
///
/// The engine is bound to one authenticated owner at construction; every
/// write it issues carries that owner id and nothing a caller passes in can
/// change it. At most one persist per note is in flight at any time.
pub struct AutosaveEngine {
    ctx: SessionContext,
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    /// Tasks of closed sessions that may still be finishing a persist.
    closing: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl AutosaveEngine {
    pub fn new(
        owner_id: Uuid,
        cipher: Arc<EnvelopeCipher>,
        repository: Arc<dyn NoteRepository>,
        config: AutosaveConfig,
    ) -> Self {
        let events = Arc::new(EventBus::new(config.event_capacity));
        Self {
            ctx: SessionContext {
                owner_id,
                cipher,
                repository,
                events,
                config,
            },
            sessions: Mutex::new(HashMap::new()),
            closing: Mutex::new(HashMap::new()),
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.ctx.owner_id
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.ctx.config
    }

    /// Start a session for a note the caller has just loaded.
    ///
    /// `title`, `body` and `updated_at` are the persisted values; the session
    /// starts `Idle` and clean. If the note was closed while a persist was
    /// still in flight, this waits for that persist before the new session
    /// can issue its own.
    pub async fn open(
        &self,
        note_id: Uuid,
        title: impl Into<String>,
        body: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let previous = self.closing.lock().await.remove(&note_id);
        if let Some(previous) = previous {
            if !previous.is_finished() {
                debug!(
                    subsystem = "autosave",
                    component = "engine",
                    note_id = %note_id,
                    "Waiting for the closed session's persist"
                );
            }
            let _ = previous.await;
        }

        let mut sessions = self.sessions.lock().await;

        if let Some(slot) = sessions.get(&note_id) {
            if !slot.task.is_finished() {
                return Err(Error::InvalidInput(format!(
                    "note {} is already open",
                    note_id
                )));
            }
        }

        let (command_tx, command_rx) = mpsc::channel(self.ctx.config.command_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::opened(
            note_id,
            title.into(),
            body.into(),
            updated_at,
        ));

        let task = SessionTask::new(self.ctx.clone(), command_rx, snapshot_tx);
        let handle = tokio::spawn(task.run());

        sessions.insert(
            note_id,
            SessionSlot {
                commands: command_tx,
                snapshot: snapshot_rx,
                task: handle,
            },
        );
        Ok(())
    }

    /// Record the latest title and body.
    pub async fn edit(
        &self,
        note_id: Uuid,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<()> {
        self.send(
            note_id,
            Command::Edit {
                title: Some(title.into()),
                body: Some(body.into()),
            },
        )
        .await
    }

    /// Record a new title, keeping the current body.
    pub async fn edit_title(&self, note_id: Uuid, title: impl Into<String>) -> Result<()> {
        self.send(
            note_id,
            Command::Edit {
                title: Some(title.into()),
                body: None,
            },
        )
        .await
    }

    /// Record a new body, keeping the current title.
    pub async fn edit_body(&self, note_id: Uuid, body: impl Into<String>) -> Result<()> {
        self.send(
            note_id,
            Command::Edit {
                title: None,
                body: Some(body.into()),
            },
        )
        .await
    }

    /// Re-arm the save cycle after a failed persist. No-op in any other state.
    pub async fn retry(&self, note_id: Uuid) -> Result<()> {
        self.send(note_id, Command::Retry).await
    }

    /// Save unsaved content now, skipping the rest of the debounce delay.
    ///
    /// Resolves once the note is settled, or with the persist failure.
    pub async fn flush(&self, note_id: Uuid) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(note_id, Command::Flush(reply_tx)).await?;

        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(failure)) => Err(failure.into()),
            Err(_) => Err(Error::NotFound(format!(
                "autosave session for note {} ended",
                note_id
            ))),
        }
    }

    /// Last-known state of an open note.
    pub async fn snapshot(&self, note_id: Uuid) -> Option<SessionSnapshot> {
        let sessions = self.sessions.lock().await;
        sessions.get(&note_id).map(|s| s.snapshot.borrow().clone())
    }

    /// Receiver that observes every snapshot change of an open note.
    pub async fn watch(&self, note_id: Uuid) -> Option<watch::Receiver<SessionSnapshot>> {
        let sessions = self.sessions.lock().await;
        sessions.get(&note_id).map(|s| s.snapshot.clone())
    }

    /// Subscribe to autosave events for every note of this engine.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.ctx.events.subscribe()
    }

    /// Close a session. The debounce timer is cancelled and unsaved edits
    /// are dropped; call [`AutosaveEngine::flush`] first to keep them. A
    /// persist already in flight still completes.
    pub async fn close(&self, note_id: Uuid) -> Result<()> {
        let slot = self
            .sessions
            .lock()
            .await
            .remove(&note_id)
            .ok_or_else(|| Error::NotFound(format!("note {} is not open", note_id)))?;

        // A finished task has already dropped its receiver.
        let _ = slot.commands.send(Command::Close).await;

        let mut closing = self.closing.lock().await;
        closing.retain(|_, task| !task.is_finished());
        closing.insert(note_id, slot.task);
        drop(closing);
        debug!(
            subsystem = "autosave",
            component = "engine",
            note_id = %note_id,
            "Close requested"
        );
        Ok(())
    }

    /// Ids of notes with a live session.
    pub async fn open_notes(&self) -> Vec<Uuid> {
        let sessions = self.sessions.lock().await;
        let mut ids: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, slot)| !slot.task.is_finished())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    async fn send(&self, note_id: Uuid, command: Command) -> Result<()> {
        let sender = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(&note_id)
                .map(|s| s.commands.clone())
                .ok_or_else(|| Error::NotFound(format!("note {} is not open", note_id)))?
        };

        sender
            .send(command)
            .await
            .map_err(|_| Error::NotFound(format!("autosave session for note {} ended", note_id)))
    }
}
