//! Error types for nota.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use nota_crypto::CryptoError;

/// Result type alias using nota's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for nota operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The encryption key is missing or has the wrong length
    #[error("Key configuration error: {0}")]
    KeyConfiguration(String),

    /// Envelope failed authentication (tampered, corrupted, wrong key)
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Envelope is not base64 or too short
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Encryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Note not found (or not visible to the caller)
    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),

    /// Note exists but its envelopes cannot be opened
    #[error("Note unreadable: {0}")]
    NoteUnreadable(Uuid),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller does not own the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A persist did not finish within its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// An autosave persist failed; carries the original classification
    #[error("Save failed: {message}")]
    Persist { kind: ErrorKind, message: String },

    /// Chat completion failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Typed classification of an [`Error`].
///
/// Callers branch on this instead of inspecting error messages. It is `Copy`
/// so it can travel inside UI snapshots and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    KeyConfiguration,
    Decryption,
    MalformedEnvelope,
    Encryption,
    NotFound,
    Unreadable,
    Authorization,
    Timeout,
    Storage,
    Inference,
    Config,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    /// Decryption and malformed-envelope failures are handled identically.
    pub fn is_crypto_failure(self) -> bool {
        matches!(self, ErrorKind::Decryption | ErrorKind::MalformedEnvelope)
    }

    /// Transient failures that a later attempt may get past.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Storage | ErrorKind::Timeout)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(_) | Error::Request(_) => ErrorKind::Storage,
            Error::KeyConfiguration(_) => ErrorKind::KeyConfiguration,
            Error::Decryption(_) => ErrorKind::Decryption,
            Error::MalformedEnvelope(_) => ErrorKind::MalformedEnvelope,
            Error::Encryption(_) => ErrorKind::Encryption,
            Error::NoteNotFound(_) | Error::NotFound(_) => ErrorKind::NotFound,
            Error::NoteUnreadable(_) => ErrorKind::Unreadable,
            Error::Forbidden(_) => ErrorKind::Authorization,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Persist { kind, .. } => *kind,
            Error::Inference(_) => ErrorKind::Inference,
            Error::Config(_) => ErrorKind::Config,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Serialization(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::KeyConfiguration(msg) => Error::KeyConfiguration(msg),
            CryptoError::Decryption(msg) => Error::Decryption(msg),
            CryptoError::MalformedEnvelope(msg) => Error::MalformedEnvelope(msg),
            CryptoError::Encryption(msg) => Error::Encryption(msg),
            CryptoError::Io(io) => Error::KeyConfiguration(io.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_note_not_found() {
        let id = Uuid::nil();
        let err = Error::NoteNotFound(id);
        assert_eq!(err.to_string(), format!("Note not found: {}", id));
    }

    #[test]
    fn test_error_display_forbidden() {
        let err = Error::Forbidden("note belongs to another owner".to_string());
        assert_eq!(err.to_string(), "Forbidden: note belongs to another owner");
    }

    #[test]
    fn test_error_display_key_configuration() {
        let err = Error::KeyConfiguration("missing NOTA_ENCRYPTION_KEY env".to_string());
        assert!(err.to_string().starts_with("Key configuration error:"));
    }

    #[test]
    fn test_crypto_errors_map_to_distinct_kinds() {
        let cases = [
            (
                CryptoError::KeyConfiguration("k".into()),
                ErrorKind::KeyConfiguration,
            ),
            (CryptoError::Decryption("d".into()), ErrorKind::Decryption),
            (
                CryptoError::MalformedEnvelope("m".into()),
                ErrorKind::MalformedEnvelope,
            ),
            (CryptoError::Encryption("e".into()), ErrorKind::Encryption),
        ];

        for (crypto, expected) in cases {
            let err: Error = crypto.into();
            assert_eq!(err.kind(), expected);
        }
    }

    #[test]
    fn test_crypto_failure_grouping() {
        assert!(ErrorKind::Decryption.is_crypto_failure());
        assert!(ErrorKind::MalformedEnvelope.is_crypto_failure());
        assert!(!ErrorKind::Storage.is_crypto_failure());
        assert!(!ErrorKind::KeyConfiguration.is_crypto_failure());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::Timeout("persist".into()).kind().is_retryable());
        assert!(Error::Request("reset".into()).kind().is_retryable());
        assert!(!Error::Forbidden("x".into()).kind().is_retryable());
        assert!(!Error::Decryption("x".into()).kind().is_retryable());
    }

    #[test]
    fn test_persist_error_keeps_original_kind() {
        let err = Error::Persist {
            kind: ErrorKind::Timeout,
            message: "persist exceeded 10000 ms".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "Save failed: persist exceeded 10000 ms");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::MalformedEnvelope).unwrap();
        assert_eq!(json, "\"malformed_envelope\"");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
