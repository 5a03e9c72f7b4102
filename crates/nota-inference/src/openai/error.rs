//! Classifying rejected chat requests.

use nota_core::Error;

use super::types::ErrorBody;

/// Why the chat service rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// The key was not accepted.
    Unauthorized,
    /// The key works but lacks access to the model, or has no quota left.
    Forbidden,
    RateLimited,
    UnknownModel,
    /// Notes plus transcript do not fit the model's context window.
    ContextTooLong,
    Upstream,
    Other,
}

impl OpenAIErrorCode {
    /// Classify from the HTTP status and the body's `error.type`.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        if error_type == "insufficient_quota" {
            return Self::Forbidden;
        }
        if error_type == "model_not_found" {
            return Self::UnknownModel;
        }
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::UnknownModel,
            429 => Self::RateLimited,
            400 if error_type.contains("context_length") => Self::ContextTooLong,
            500..=599 => Self::Upstream,
            _ => Self::Other,
        }
    }

    /// Whether sending the same request later might succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Upstream)
    }

    /// The user has to change their key or model setting to get past this.
    fn needs_settings_change(self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden | Self::UnknownModel)
    }

    fn label(self) -> Option<&'static str> {
        match self {
            Self::Unauthorized => Some("Authentication failed"),
            Self::Forbidden => Some("Permission denied"),
            Self::RateLimited => Some("Rate limit exceeded"),
            Self::UnknownModel => Some("Model not found"),
            Self::ContextTooLong => Some("Context too long"),
            Self::Upstream => Some("Server error"),
            Self::Other => None,
        }
    }
}

/// A non-2xx reply from the chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatServiceError {
    pub status: u16,
    pub code: OpenAIErrorCode,
    pub message: String,
}

impl ChatServiceError {
    /// Build from the raw reply. Bodies that are not the usual
    /// `{"error": {...}}` shape report "Unknown error".
    pub fn from_reply(status: u16, body: &[u8]) -> Self {
        let (error_type, message) = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(body) => (body.error.error_type, body.error.message),
            Err(_) => (String::new(), "Unknown error".to_string()),
        };
        Self {
            status,
            code: OpenAIErrorCode::from_response(status, &error_type),
            message,
        }
    }
}

impl From<ChatServiceError> for Error {
    fn from(e: ChatServiceError) -> Self {
        let message = match e.code.label() {
            Some(label) => format!("{label}: {}", e.message),
            None => e.message,
        };
        if e.code.needs_settings_change() {
            Error::Config(message)
        } else {
            Error::Inference(message)
        }
    }
}
