//! Mock chat backend for deterministic testing.
//!
//! ```rust
//! use nota_inference::mock::MockChatBackend;
//!
//! let backend = MockChatBackend::new().with_response("<p>You need milk.</p>");
//! assert_eq!(backend.call_count(), 0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use nota_core::{ChatCompletionBackend, ChatMessage, Error, Result};

/// Chat backend that records every request and replies from configuration.
#[derive(Clone)]
pub struct MockChatBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    response: String,
    model: String,
    latency: Option<Duration>,
    failure: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            response: "Mock response".to_string(),
            model: "mock-chat".to_string(),
            latency: None,
            failure: None,
        }
    }
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every request with `response`.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).response = response.into();
        self
    }

    /// Delay every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        Arc::make_mut(&mut self.config).latency = Some(latency);
        self
    }

    /// Fail every request with an inference error carrying `message`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(message.into());
        self
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.log().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    fn log(&self) -> MutexGuard<'_, Vec<Vec<ChatMessage>>> {
        self.call_log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatCompletionBackend for MockChatBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.log().push(messages.to_vec());

        if let Some(latency) = self.config.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(ref failure) = self.config.failure {
            return Err(Error::Inference(failure.clone()));
        }
        Ok(self.config.response.clone())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
