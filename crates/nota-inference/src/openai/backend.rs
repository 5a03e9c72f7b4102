//! OpenAI-compatible chat completion backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use nota_core::defaults;
use nota_core::{ChatCompletionBackend, ChatMessage, Error, Result};

use super::error::ChatServiceError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Configuration for an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct OpenAIChatConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Chat model.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAIChatConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            api_key: None,
            model: defaults::CHAT_MODEL.to_string(),
            timeout_seconds: defaults::CHAT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for OpenAIChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl OpenAIChatConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` | Endpoint |
    /// | `OPENAI_API_KEY` | unset | Service-wide key, usually replaced per owner |
    /// | `OPENAI_MODEL` | `gpt-4o-mini` | Chat model |
    /// | `OPENAI_TIMEOUT` | `60` | Request timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| defaults::OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| defaults::CHAT_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::CHAT_TIMEOUT_SECS),
        }
    }

    /// Same endpoint and model, authenticated with `api_key`.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into().trim().to_string());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Check the shape of a user-supplied OpenAI key and return it trimmed.
///
/// This is a format check only; [`OpenAIChatBackend::health_check`] asks the
/// service whether the key is accepted.
pub fn validate_api_key(api_key: &str) -> Result<String> {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("API key is empty".to_string()));
    }
    if !trimmed.starts_with(defaults::API_KEY_PREFIX) {
        return Err(Error::InvalidInput(format!(
            "API key must start with \"{}\"",
            defaults::API_KEY_PREFIX
        )));
    }
    Ok(trimmed.to_string())
}

/// Chat completion over an OpenAI-compatible HTTP API.
pub struct OpenAIChatBackend {
    client: Client,
    config: OpenAIChatConfig,
}

impl OpenAIChatBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAIChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "openai",
            model = %config.model,
            "Initializing chat backend: url={}",
            config.base_url
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIChatConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIChatConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    /// Ask the service whether the configured key is accepted.
    ///
    /// Network errors and non-2xx answers both report `false`.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .authorize(self.client.get(self.url("/models")))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!(
                    subsystem = "inference",
                    component = "openai",
                    "Chat backend health check passed"
                );
                Ok(true)
            }
            Ok(resp) => {
                warn!(
                    subsystem = "inference",
                    component = "openai",
                    status = resp.status().as_u16(),
                    "Chat backend health check failed"
                );
                Ok(false)
            }
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "openai",
                    error = %e,
                    "Chat backend health check error"
                );
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl ChatCompletionBackend for OpenAIChatBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        let response = self
            .authorize(self.client.post(self.url("/chat/completions")))
            .json(&ChatCompletionRequest::new(&self.config.model, messages))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("chat completion: {}", e))
                } else {
                    Error::Inference(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let rejected = ChatServiceError::from_reply(status.as_u16(), &body);
            warn!(
                subsystem = "inference",
                component = "openai",
                op = "complete",
                status = rejected.status,
                error_kind = ?rejected.code,
                retryable = rejected.code.is_retryable(),
                "Chat completion rejected"
            );
            return Err(rejected.into());
        }

        let reply: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;
        let total_tokens = reply.usage.as_ref().map(|u| u.total_tokens);
        let content = reply.into_answer();

        debug!(
            subsystem = "inference",
            component = "openai",
            op = "complete",
            model = %self.config.model,
            prompt_len = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            response_len = content.len(),
            total_tokens = ?total_tokens,
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nota_core::ErrorKind;

    #[test]
    fn test_default_config() {
        let config = OpenAIChatConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_seconds, 60);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_with_api_key_trims() {
        let config = OpenAIChatConfig::default().with_api_key("  sk-test  ");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = OpenAIChatConfig::default().with_api_key("sk-secret-value");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key("  sk-abc \n").unwrap(), "sk-abc");
        assert_eq!(
            validate_api_key("   ").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            validate_api_key("pk-abc").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_backend_creation() {
        let backend = OpenAIChatBackend::new(OpenAIChatConfig::default()).unwrap();
        assert_eq!(backend.model_name(), "gpt-4o-mini");
        assert_eq!(
            backend.url("/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let config = OpenAIChatConfig::default().with_base_url("http://localhost:8080/v1/");
        let backend = OpenAIChatBackend::new(config).unwrap();
        assert_eq!(backend.url("/models"), "http://localhost:8080/v1/models");
    }
}
