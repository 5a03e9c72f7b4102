//! The process-wide note encryption key.
//!
//! Exactly one 256-bit key is loaded at startup, usually from the
//! `NOTA_ENCRYPTION_KEY` environment variable (base64 of 32 bytes). Key bytes
//! are zeroized on drop and never appear in `Debug` output.

use std::path::Path;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cipher::{random_bytes, KEY_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::base64_encode;

/// Environment variable holding the base64-encoded note key.
pub const ENCRYPTION_KEY_ENV: &str = "NOTA_ENCRYPTION_KEY";

/// 256-bit AES key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { key: bytes }
    }

    /// Create a key from a byte slice, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::KeyConfiguration(format!(
                "encryption key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Decode a base64 key. Surrounding whitespace is ignored.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        use base64::Engine;

        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(CryptoError::KeyConfiguration(
                "encryption key is empty".to_string(),
            ));
        }

        let decoded = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(cleaned.as_bytes())
                .map_err(|e| {
                    CryptoError::KeyConfiguration(format!("encryption key is not base64: {}", e))
                })?,
        );

        Self::from_slice(&decoded)
    }

    /// Load the key from [`ENCRYPTION_KEY_ENV`].
    pub fn from_env() -> CryptoResult<Self> {
        Self::from_env_var(ENCRYPTION_KEY_ENV)
    }

    /// Load the key from a named environment variable.
    pub fn from_env_var(name: &str) -> CryptoResult<Self> {
        let value = Zeroizing::new(
            std::env::var(name)
                .map_err(|_| CryptoError::KeyConfiguration(format!("missing {} env", name)))?,
        );
        Self::from_base64(&value)
    }

    /// Load key from keyfile (raw 32 bytes or base64-encoded).
    pub fn from_keyfile(path: &Path) -> CryptoResult<Self> {
        let contents = Zeroizing::new(std::fs::read(path)?);

        if contents.len() == KEY_LEN {
            return Self::from_slice(&contents);
        }

        let text = Zeroizing::new(String::from_utf8_lossy(&contents).into_owned());
        Self::from_base64(&text)
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self {
            key: random_bytes(),
        }
    }

    /// Base64 form, suitable for `NOTA_ENCRYPTION_KEY`.
    pub fn to_base64(&self) -> String {
        base64_encode(&self.key)
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
