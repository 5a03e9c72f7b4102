//! "Ask AI about my notes".

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use nota_core::defaults;
use nota_core::{ChatCompletionBackend, Error, ErrorKind, Result, Transcript};
use nota_db::ApiKeyVault;

use crate::context::{ContextAssembler, NoteContext};
use crate::openai::{validate_api_key, OpenAIChatBackend, OpenAIChatConfig};

/// Answers questions about one owner's notes.
pub struct NotesAssistant {
    assembler: Arc<ContextAssembler>,
    backend: Arc<dyn ChatCompletionBackend>,
}

impl NotesAssistant {
    pub fn new(assembler: Arc<ContextAssembler>, backend: Arc<dyn ChatCompletionBackend>) -> Self {
        Self { assembler, backend }
    }

    /// Build an assistant that talks to the chat service with the owner's
    /// own stored key.
    ///
    /// Fails with `NotFound` when the owner never stored a key and with
    /// `InvalidInput` when the stored key is blank.
    pub async fn for_owner_key(
        vault: &ApiKeyVault,
        owner_id: Uuid,
        assembler: Arc<ContextAssembler>,
        config: OpenAIChatConfig,
    ) -> Result<Self> {
        let api_key = vault.load(owner_id).await?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::InvalidInput(
                "Invalid API key. Please set your API key in the settings".to_string(),
            ));
        }

        let backend = OpenAIChatBackend::new(config.with_api_key(api_key))?;
        Ok(Self::new(assembler, Arc::new(backend)))
    }

    pub fn backend(&self) -> &Arc<dyn ChatCompletionBackend> {
        &self.backend
    }

    /// Answer the last question of `transcript` from the owner's notes.
    ///
    /// With no readable notes the fixed "no notes" answer is returned and the
    /// backend is not called. An empty reply becomes a generic problem
    /// message rather than an empty string.
    pub async fn ask(&self, owner_id: Uuid, transcript: &Transcript) -> Result<String> {
        let start = Instant::now();
        let prompt = match self.assembler.build_context(owner_id, transcript).await? {
            NoteContext::NoNotes => return Ok(defaults::NO_NOTES_ANSWER.to_string()),
            NoteContext::Ready(prompt) => prompt,
        };

        let answer = self.backend.complete(&prompt.messages()).await?;
        if answer.trim().is_empty() {
            warn!(
                subsystem = "inference",
                component = "assistant",
                owner_id = %owner_id,
                model = self.backend.model_name(),
                "Chat backend returned an empty answer"
            );
            return Ok(defaults::EMPTY_ANSWER.to_string());
        }

        info!(
            subsystem = "inference",
            component = "assistant",
            op = "ask",
            owner_id = %owner_id,
            model = self.backend.model_name(),
            result_count = prompt.included,
            response_len = answer.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );
        Ok(answer)
    }
}

/// Replace the owner's stored chat API key.
///
/// An empty key clears the stored one. A new key must look like an OpenAI
/// key, differ from the current one and be accepted by the service before it
/// is stored.
pub async fn update_api_key(
    vault: &ApiKeyVault,
    owner_id: Uuid,
    api_key: &str,
    config: OpenAIChatConfig,
) -> Result<()> {
    if api_key.trim().is_empty() {
        return vault.store(owner_id, "").await;
    }

    let api_key = validate_api_key(api_key)?;
    match vault.load(owner_id).await {
        Ok(current) if current == api_key => {
            return Err(Error::InvalidInput(
                "New API key is the same as the old one".to_string(),
            ));
        }
        Ok(_) => {}
        // Nothing stored, or a key that no longer decrypts: replace it.
        Err(e) if e.kind() == ErrorKind::NotFound || e.kind().is_crypto_failure() => {}
        Err(e) => return Err(e),
    }

    let backend = OpenAIChatBackend::new(config.with_api_key(api_key.as_str()))?;
    if !backend.health_check().await? {
        return Err(Error::InvalidInput("Invalid API key".to_string()));
    }

    vault.store(owner_id, &api_key).await
}
