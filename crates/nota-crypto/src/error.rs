//! Envelope and key failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    /// The process-wide key is missing, not base64, or not 32 bytes.
    #[error("Key configuration error: {0}")]
    KeyConfiguration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Authentication failed: wrong key, or the bytes were altered.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Envelope is not valid base64 or too short to hold nonce and tag.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Reading a keyfile failed.
    #[error("Keyfile I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    /// The stored value can never be opened with this key. Callers treat
    /// garbage and forgeries alike.
    pub fn is_unreadable_envelope(&self) -> bool {
        matches!(
            self,
            CryptoError::Decryption(_) | CryptoError::MalformedEnvelope(_)
        )
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
