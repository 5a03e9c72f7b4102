//! # nota-core
//!
//! Core types, traits, and abstractions for nota.
//!
//! This crate provides the data structures, error taxonomy, event bus and
//! repository traits that the storage, autosave and chat crates share.
//!
//! ## Logging
//!
//! Every crate logs through `tracing` with the same structured fields:
//! `subsystem` (`crypto`, `database`, `autosave`, `context`, `inference`),
//! `component`, `op`, plus `note_id`, `owner_id` and `duration_ms` where
//! they apply. WARN marks a recovered failure such as a skipped note or a
//! failed save. Plaintext and key material are never logged; envelopes
//! are referred to by length only.

pub mod defaults;
pub mod error;
pub mod events;
pub mod ids;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use events::{AutosaveEvent, EventBus, EventEnvelope, SaveState};
pub use ids::{new_v7, v7_millis};
pub use models::*;
pub use traits::*;
