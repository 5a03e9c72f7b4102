//! Centralized default constants for nota.
//!
//! Shared default values live here so the autosave engine, the context
//! assembler and the chat backend agree on them. Environment overrides are
//! applied by each crate's config type.

// =============================================================================
// NOTES
// =============================================================================

/// Title given to a note created without one.
pub const NOTE_TITLE: &str = "New Note";

/// Body given to a note created without one.
pub const NOTE_BODY: &str = "";

// =============================================================================
// AUTOSAVE
// =============================================================================

/// Quiet period after the last edit before a save starts.
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 1000;

/// Upper bound on a single persist round-trip before it counts as failed.
pub const AUTOSAVE_PERSIST_TIMEOUT_MS: u64 = 10_000;

/// Capacity of the per-session command channel.
pub const AUTOSAVE_COMMAND_CAPACITY: usize = 64;

/// Broadcast buffer for autosave events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// CHAT CONTEXT
// =============================================================================

/// Character budget for the notes section of a chat context.
///
/// Roughly 50k tokens, well under the window of current small chat models.
pub const CONTEXT_MAX_CHARS: usize = 200_000;

/// Most recent transcript turns carried into a prompt.
pub const TRANSCRIPT_MAX_TURNS: usize = 40;

/// Separator placed between rendered notes.
pub const NOTE_SEPARATOR: &str = "\n---\n";

// =============================================================================
// CHAT COMPLETION
// =============================================================================

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const CHAT_MODEL: &str = "gpt-4o-mini";

/// Request timeout for chat completion in seconds.
pub const CHAT_TIMEOUT_SECS: u64 = 60;

/// Prefix every OpenAI secret key starts with.
pub const API_KEY_PREFIX: &str = "sk-";

/// Answer returned when the owner has no readable notes.
pub const NO_NOTES_ANSWER: &str = "You don't have any notes yet.";

/// Answer returned when the backend replies with nothing.
pub const EMPTY_ANSWER: &str = "A problem has occurred";
