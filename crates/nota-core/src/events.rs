//! Autosave event types, envelope schema, and event bus.
//!
//! The autosave engine publishes every session transition here. Views (a
//! sidebar list, a "saved" indicator, a toast layer) subscribe independently
//! and never couple to the engine itself.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ErrorKind;

// ============================================================================
// Save state
// ============================================================================

/// Per-note autosave state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    /// No pending edits, nothing in flight.
    Idle,
    /// An edit occurred and the debounce timer is running.
    PendingDebounce,
    /// Exactly one persist request is in flight.
    Saving,
    /// The last persist failed; unsaved content is retained.
    Error,
}

impl SaveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveState::Idle => "idle",
            SaveState::PendingDebounce => "pending_debounce",
            SaveState::Saving => "saving",
            SaveState::Error => "error",
        }
    }
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Autosave Event (domain payloads)
// ============================================================================

/// Events published by the autosave engine.
///
/// Serialized as JSON with a `type` tag field, e.g.
/// `{"type":"Saved","note_id":"...","updated_at":"..."}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AutosaveEvent {
    /// A session moved to a new state.
    StateChanged { note_id: Uuid, state: SaveState },
    /// The title was edited locally; published before the save round-trip so
    /// note lists can mirror it optimistically.
    TitleChanged { note_id: Uuid, title: String },
    /// A persist finished.
    Saved {
        note_id: Uuid,
        updated_at: DateTime<Utc>,
    },
    /// A persist failed; content is kept for the next cycle.
    SaveFailed {
        note_id: Uuid,
        kind: ErrorKind,
        error: String,
    },
    /// The session was closed.
    Closed { note_id: Uuid },
}

impl AutosaveEvent {
    /// Returns the namespaced event type for the envelope (e.g., `"note.saved"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            AutosaveEvent::StateChanged { .. } => "autosave.state_changed",
            AutosaveEvent::TitleChanged { .. } => "note.title_changed",
            AutosaveEvent::Saved { .. } => "note.saved",
            AutosaveEvent::SaveFailed { .. } => "note.save_failed",
            AutosaveEvent::Closed { .. } => "autosave.closed",
        }
    }

    pub fn note_id(&self) -> Uuid {
        match self {
            AutosaveEvent::StateChanged { note_id, .. }
            | AutosaveEvent::TitleChanged { note_id, .. }
            | AutosaveEvent::Saved { note_id, .. }
            | AutosaveEvent::SaveFailed { note_id, .. }
            | AutosaveEvent::Closed { note_id } => *note_id,
        }
    }
}

// ============================================================================
// Event Envelope
// ============================================================================

/// Versioned wrapper around an [`AutosaveEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"note.saved"`).
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Account whose session produced the event.
    pub owner_id: Uuid,
    /// Payload schema version.
    pub payload_version: u32,
    pub payload: AutosaveEvent,
}

impl EventEnvelope {
    pub fn new(owner_id: Uuid, event: AutosaveEvent) -> Self {
        Self {
            event_id: crate::ids::new_v7(),
            event_type: event.event_type().to_string(),
            occurred_at: Utc::now(),
            owner_id,
            payload_version: 1,
            payload: event,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus for distributing autosave events.
///
/// Slow receivers that fall behind get a `Lagged` error and miss events;
/// the latest per-note state is always available from the session snapshot.
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, owner_id: Uuid, event: AutosaveEvent) {
        let envelope = EventEnvelope::new(owner_id, event);
        tracing::trace!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            note_id = %envelope.payload.note_id(),
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive enveloped events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();
        let owner = Uuid::new_v4();

        bus.emit(
            owner,
            AutosaveEvent::StateChanged {
                note_id: Uuid::nil(),
                state: SaveState::Saving,
            },
        );

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "autosave.state_changed");
        assert_eq!(envelope.owner_id, owner);
        assert_eq!(envelope.payload_version, 1);
        assert!(matches!(
            envelope.payload,
            AutosaveEvent::StateChanged {
                state: SaveState::Saving,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(32);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(Uuid::nil(), AutosaveEvent::Closed { note_id: Uuid::nil() });

        assert_eq!(rx1.recv().await.unwrap().event_type, "autosave.closed");
        assert_eq!(rx2.recv().await.unwrap().event_type, "autosave.closed");
    }

    #[test]
    fn test_event_bus_no_subscribers_ok() {
        let bus = EventBus::new(4);
        bus.emit(Uuid::nil(), AutosaveEvent::Closed { note_id: Uuid::nil() });
    }

    #[test]
    fn test_save_failed_serialization() {
        let event = AutosaveEvent::SaveFailed {
            note_id: Uuid::nil(),
            kind: ErrorKind::Timeout,
            error: "persist exceeded 10s".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SaveFailed");
        assert_eq!(json["kind"], "timeout");
    }

    #[test]
    fn test_event_note_id() {
        let id = Uuid::new_v4();
        let event = AutosaveEvent::TitleChanged {
            note_id: id,
            title: "Groceries".to_string(),
        };
        assert_eq!(event.note_id(), id);
        assert_eq!(event.event_type(), "note.title_changed");
    }

    #[test]
    fn test_save_state_display() {
        assert_eq!(SaveState::PendingDebounce.to_string(), "pending_debounce");
        let json = serde_json::to_string(&SaveState::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }
}
