//! AES-256-GCM primitives under the envelope format.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

/// 96-bit GCM nonce.
pub const NONCE_LEN: usize = 12;

/// GCM tag, appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// AES-256 key.
pub const KEY_LEN: usize = 32;

/// `N` bytes from the thread-local CSPRNG.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// An initialised AES-256-GCM instance for one key.
pub(crate) struct Sealer {
    aead: Aes256Gcm,
}

impl Sealer {
    pub(crate) fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            aead: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Encrypt under a fresh nonce. The returned bytes end with the tag.
    pub(crate) fn seal(&self, plaintext: &[u8]) -> CryptoResult<([u8; NONCE_LEN], Vec<u8>)> {
        let nonce = random_bytes::<NONCE_LEN>();
        let sealed = self
            .aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".to_string()))?;
        Ok((nonce, sealed))
    }

    /// Decrypt and authenticate `sealed` (ciphertext followed by tag).
    pub(crate) fn open(&self, nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> CryptoResult<Vec<u8>> {
        self.aead
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decryption("AES-GCM authentication failed".to_string()))
    }
}
