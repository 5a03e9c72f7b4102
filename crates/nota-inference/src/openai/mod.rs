//! OpenAI-compatible chat completion backend.
//!
//! Works with any endpoint that speaks the OpenAI chat completions API:
//! the OpenAI cloud API, Azure OpenAI, Ollama in compatibility mode, vLLM
//! or LM Studio.
//!
//! # Example
//!
//! ```rust,no_run
//! use nota_core::{ChatCompletionBackend, ChatMessage};
//! use nota_inference::openai::{OpenAIChatBackend, OpenAIChatConfig};
//!
//! #[tokio::main]
//! async fn main() -> nota_core::Result<()> {
//!     let config = OpenAIChatConfig::from_env().with_api_key("sk-...");
//!     let backend = OpenAIChatBackend::new(config)?;
//!
//!     let answer = backend
//!         .complete(&[ChatMessage::user("What did I write about groceries?")])
//!         .await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{validate_api_key, OpenAIChatBackend, OpenAIChatConfig};
pub use error::{ChatServiceError, OpenAIErrorCode};
