//! Per-session state exposed to views.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use nota_core::{Error, ErrorKind, SaveState};

/// Why the most recent persist failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl SaveFailure {
    pub fn from_error(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<SaveFailure> for Error {
    fn from(failure: SaveFailure) -> Self {
        Error::Persist {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

/// Last-known state of one open note.
///
/// `title` and `body` are the latest local values, saved or not.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub note_id: Uuid,
    pub state: SaveState,
    pub title: String,
    pub body: String,
    /// Local values differ from what was last persisted.
    pub dirty: bool,
    pub last_persisted_updated_at: DateTime<Utc>,
    pub last_failure: Option<SaveFailure>,
}

impl SessionSnapshot {
    pub(crate) fn opened(
        note_id: Uuid,
        title: String,
        body: String,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            note_id,
            state: SaveState::Idle,
            title,
            body,
            dirty: false,
            last_persisted_updated_at: updated_at,
            last_failure: None,
        }
    }

    /// Nothing left to write and nothing in flight.
    pub fn is_settled(&self) -> bool {
        self.state == SaveState::Idle && !self.dirty
    }
}

impl std::fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("note_id", &self.note_id)
            .field("state", &self.state)
            .field("title_len", &self.title.len())
            .field("body_len", &self.body.len())
            .field("dirty", &self.dirty)
            .field("last_persisted_updated_at", &self.last_persisted_updated_at)
            .field("last_failure", &self.last_failure)
            .finish()
    }
}
