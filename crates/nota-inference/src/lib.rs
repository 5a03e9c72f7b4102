//! # nota-inference
//!
//! "Ask AI about my notes" for nota.
//!
//! This crate provides:
//! - HTML to plain text reduction for note bodies
//! - `ContextAssembler`, which decrypts an owner's notes into a chat prompt
//! - An OpenAI-compatible `ChatCompletionBackend`
//! - `NotesAssistant`, which ties the two together
//!
//! # Example
//!
//! ```rust,ignore
//! let assembler = Arc::new(ContextAssembler::new(cipher, notes, ContextConfig::from_env()));
//! let assistant =
//!     NotesAssistant::for_owner_key(&vault, owner_id, assembler, OpenAIChatConfig::from_env())
//!         .await?;
//!
//! let transcript = Transcript::from_exchanges(&questions, &responses);
//! let answer = assistant.ask(owner_id, &transcript).await?;
//! ```

pub mod assistant;
pub mod context;
pub mod html;
pub mod openai;
pub mod prompt;

// Mock chat backend for tests and local tooling
pub mod mock;

// Re-export core types
pub use nota_core::*;

pub use assistant::{update_api_key, NotesAssistant};
pub use context::{ChatPrompt, ContextAssembler, ContextConfig, NoteContext};
pub use html::html_to_text;
pub use openai::{validate_api_key, OpenAIChatBackend, OpenAIChatConfig, OpenAIErrorCode};
