//! Per-note autosave session task.
//!
//! Each open note runs one task that owns its editable state, a single
//! debounce deadline and at most one in-flight persist. Commands arrive over
//! an mpsc channel; the latest state is mirrored into a watch channel and
//! every transition is published on the event bus.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use nota_core::{AutosaveEvent, Error, EventBus, NoteRepository, Result, SaveState};
use nota_crypto::EnvelopeCipher;

use crate::config::AutosaveConfig;
use crate::snapshot::{SaveFailure, SessionSnapshot};

pub(crate) type FlushReply = oneshot::Sender<std::result::Result<(), SaveFailure>>;

/// Messages from the engine to a session task.
pub(crate) enum Command {
    /// New local values; `None` keeps the current field.
    Edit {
        title: Option<String>,
        body: Option<String>,
    },
    /// Re-arm the save cycle after a failure.
    Retry,
    /// Save now if dirty; reply once settled or failed.
    Flush(FlushReply),
    /// Stop the session. Pending edits are dropped; an in-flight persist
    /// still runs to completion.
    Close,
}

/// Shared collaborators handed to every session.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub owner_id: Uuid,
    pub cipher: Arc<EnvelopeCipher>,
    pub repository: Arc<dyn NoteRepository>,
    pub events: Arc<EventBus>,
    pub config: AutosaveConfig,
}

struct InFlight {
    revision: u64,
    started: Instant,
    handle: JoinHandle<Result<DateTime<Utc>>>,
}

enum Wake {
    Command(Option<Command>),
    Deadline,
    Persisted(u64, Duration, Result<DateTime<Utc>>),
}

pub(crate) struct SessionTask {
    note_id: Uuid,
    ctx: SessionContext,
    commands: mpsc::Receiver<Command>,
    snapshot_tx: watch::Sender<SessionSnapshot>,

    state: SaveState,
    title: String,
    body: String,
    edit_revision: u64,
    persisted_revision: u64,
    last_edit: Instant,
    deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    last_persisted_updated_at: DateTime<Utc>,
    last_failure: Option<SaveFailure>,
    flush_waiters: Vec<FlushReply>,
    closing: bool,
}

impl SessionTask {
    pub(crate) fn new(
        ctx: SessionContext,
        commands: mpsc::Receiver<Command>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
    ) -> Self {
        let initial = snapshot_tx.borrow().clone();
        Self {
            note_id: initial.note_id,
            ctx,
            commands,
            snapshot_tx,
            state: SaveState::Idle,
            title: initial.title,
            body: initial.body,
            edit_revision: 0,
            persisted_revision: 0,
            last_edit: Instant::now(),
            deadline: None,
            in_flight: None,
            last_persisted_updated_at: initial.last_persisted_updated_at,
            last_failure: None,
            flush_waiters: Vec::new(),
            closing: false,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(
            subsystem = "autosave",
            component = "session",
            op = "open",
            note_id = %self.note_id,
            owner_id = %self.ctx.owner_id,
            "Autosave session opened"
        );

        loop {
            if self.closing && self.in_flight.is_none() {
                break;
            }

            let deadline = self.deadline;
            let timer_armed = deadline.is_some() && self.in_flight.is_none();
            let saving = self.in_flight.is_some();
            let accepting = !self.closing;

            let wake = tokio::select! {
                persisted = wait_persisted(&mut self.in_flight), if saving => {
                    let (revision, elapsed, result) = persisted;
                    Wake::Persisted(revision, elapsed, result)
                }
                cmd = self.commands.recv(), if accepting => Wake::Command(cmd),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if timer_armed => Wake::Deadline,
            };

            match wake {
                Wake::Command(Some(cmd)) => self.on_command(cmd),
                // Engine dropped its sender: same as close.
                Wake::Command(None) => self.on_close(),
                Wake::Deadline => self.start_save(),
                Wake::Persisted(revision, elapsed, result) => {
                    self.on_persisted(revision, elapsed, result)
                }
            }
        }

        for waiter in self.flush_waiters.drain(..) {
            let _ = waiter.send(Err(SaveFailure {
                kind: nota_core::ErrorKind::NotFound,
                message: format!("session for note {} closed", self.note_id),
            }));
        }

        self.ctx.events.emit(
            self.ctx.owner_id,
            AutosaveEvent::Closed {
                note_id: self.note_id,
            },
        );
        info!(
            subsystem = "autosave",
            component = "session",
            op = "close",
            note_id = %self.note_id,
            unsaved = self.is_dirty(),
            "Autosave session closed"
        );
    }

    fn is_dirty(&self) -> bool {
        self.edit_revision > self.persisted_revision
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Edit { title, body } => self.on_edit(title, body),
            Command::Retry => self.on_retry(),
            Command::Flush(reply) => self.on_flush(reply),
            Command::Close => self.on_close(),
        }
    }

    fn on_edit(&mut self, title: Option<String>, body: Option<String>) {
        if let Some(title) = title {
            if title != self.title {
                self.ctx.events.emit(
                    self.ctx.owner_id,
                    AutosaveEvent::TitleChanged {
                        note_id: self.note_id,
                        title: title.clone(),
                    },
                );
            }
            self.title = title;
        }
        if let Some(body) = body {
            self.body = body;
        }

        self.edit_revision += 1;
        self.last_edit = Instant::now();

        if self.in_flight.is_some() {
            // The running save keeps its snapshot; the follow-up is scheduled
            // when it completes.
            self.publish_snapshot();
            return;
        }

        self.deadline = Some(self.last_edit + self.ctx.config.debounce);
        self.transition(SaveState::PendingDebounce);
    }

    fn on_retry(&mut self) {
        if self.state != SaveState::Error || !self.is_dirty() {
            return;
        }
        debug!(
            subsystem = "autosave",
            component = "session",
            note_id = %self.note_id,
            "Manual retry requested"
        );
        self.deadline = Some(Instant::now());
        self.transition(SaveState::PendingDebounce);
    }

    fn on_flush(&mut self, reply: FlushReply) {
        if !self.is_dirty() && self.in_flight.is_none() {
            let _ = reply.send(Ok(()));
            return;
        }
        self.flush_waiters.push(reply);
        if self.in_flight.is_none() {
            self.deadline = Some(Instant::now());
            if self.state != SaveState::PendingDebounce {
                self.transition(SaveState::PendingDebounce);
            }
        }
    }

    fn on_close(&mut self) {
        self.closing = true;
        self.deadline = None;
    }

    fn start_save(&mut self) {
        self.deadline = None;

        let revision = self.edit_revision;
        let title = self.title.clone();
        let body = self.body.clone();
        let note_id = self.note_id;
        let owner_id = self.ctx.owner_id;
        let cipher = self.ctx.cipher.clone();
        let repository = self.ctx.repository.clone();
        let persist_timeout = self.ctx.config.persist_timeout;

        // Spawned so the write is never dropped mid-flight by the session.
        let handle = tokio::spawn(async move {
            let title_ct = cipher.encrypt(&title)?;
            let body_ct = cipher.encrypt(&body)?;

            match timeout(
                persist_timeout,
                repository.update(note_id, owner_id, title_ct.as_str(), body_ct.as_str()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "persist exceeded {} ms",
                    persist_timeout.as_millis()
                ))),
            }
        });

        self.in_flight = Some(InFlight {
            revision,
            started: Instant::now(),
            handle,
        });
        self.transition(SaveState::Saving);
    }

    fn on_persisted(&mut self, revision: u64, elapsed: Duration, result: Result<DateTime<Utc>>) {
        match result {
            Ok(updated_at) => {
                self.persisted_revision = self.persisted_revision.max(revision);
                self.last_persisted_updated_at = updated_at;
                self.last_failure = None;

                debug!(
                    subsystem = "autosave",
                    component = "session",
                    op = "persist",
                    note_id = %self.note_id,
                    duration_ms = elapsed.as_millis() as u64,
                    success = true,
                    "Note persisted"
                );
                self.ctx.events.emit(
                    self.ctx.owner_id,
                    AutosaveEvent::Saved {
                        note_id: self.note_id,
                        updated_at,
                    },
                );

                if self.is_dirty() && !self.closing {
                    let due = if self.flush_waiters.is_empty() {
                        self.last_edit + self.ctx.config.debounce
                    } else {
                        Instant::now()
                    };
                    self.deadline = Some(due.max(Instant::now()));
                    self.transition(SaveState::PendingDebounce);
                } else {
                    self.transition(SaveState::Idle);
                    if !self.is_dirty() {
                        for waiter in self.flush_waiters.drain(..) {
                            let _ = waiter.send(Ok(()));
                        }
                    }
                }
            }
            Err(error) => {
                let failure = SaveFailure::from_error(&error);
                warn!(
                    subsystem = "autosave",
                    component = "session",
                    op = "persist",
                    note_id = %self.note_id,
                    duration_ms = elapsed.as_millis() as u64,
                    error_kind = ?failure.kind,
                    error = %error,
                    "Note persist failed, unsaved content retained"
                );
                self.ctx.events.emit(
                    self.ctx.owner_id,
                    AutosaveEvent::SaveFailed {
                        note_id: self.note_id,
                        kind: failure.kind,
                        error: failure.message.clone(),
                    },
                );
                for waiter in self.flush_waiters.drain(..) {
                    let _ = waiter.send(Err(failure.clone()));
                }
                self.last_failure = Some(failure);
                self.transition(SaveState::Error);

                // Edits made while the failed save ran get their own cycle.
                if self.edit_revision > revision && !self.closing {
                    let due = self.last_edit + self.ctx.config.debounce;
                    self.deadline = Some(due.max(Instant::now()));
                    self.transition(SaveState::PendingDebounce);
                }
            }
        }
    }

    fn transition(&mut self, next: SaveState) {
        if next != self.state {
            debug!(
                subsystem = "autosave",
                component = "session",
                note_id = %self.note_id,
                from = %self.state,
                save_state = %next,
                "Autosave state changed"
            );
            self.state = next;
            self.ctx.events.emit(
                self.ctx.owner_id,
                AutosaveEvent::StateChanged {
                    note_id: self.note_id,
                    state: next,
                },
            );
        }
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            note_id: self.note_id,
            state: self.state,
            title: self.title.clone(),
            body: self.body.clone(),
            dirty: self.is_dirty(),
            last_persisted_updated_at: self.last_persisted_updated_at,
            last_failure: self.last_failure.clone(),
        });
    }
}

/// Await the in-flight persist and clear the slot.
async fn wait_persisted(in_flight: &mut Option<InFlight>) -> (u64, Duration, Result<DateTime<Utc>>) {
    let Some(flight) = in_flight.as_mut() else {
        return std::future::pending().await;
    };

    let joined = (&mut flight.handle).await;
    let revision = flight.revision;
    let elapsed = flight.started.elapsed();
    *in_flight = None;

    let result = match joined {
        Ok(result) => result,
        Err(e) => Err(Error::Internal(format!("persist task failed: {}", e))),
    };
    (revision, elapsed, result)
}
