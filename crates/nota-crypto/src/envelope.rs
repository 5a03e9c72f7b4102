//! Envelope encryption for note fields.
//!
//! # Wire format
//!
//! ```text
//! base64( nonce (12 bytes) || ciphertext || tag (16 bytes) )
//! ```
//!
//! The tag is appended by AES-GCM itself. The encoded string is what the
//! repository stores in place of the plaintext title or body.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cipher::{Sealer, NONCE_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode};
use crate::key::EncryptionKey;

/// Smallest decoded envelope: a nonce plus the tag of an empty plaintext.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

/// A stored, base64-encoded envelope.
///
/// `Debug` only reports the length so envelopes never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(String);

impl Envelope {
    /// Wrap a string read back from storage. No validation happens here.
    pub fn from_stored(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split the envelope into nonce and sealed bytes.
    pub fn decode_parts(&self) -> CryptoResult<EnvelopeParts> {
        EnvelopeParts::decode(&self.0)
    }
}

impl AsRef<str> for Envelope {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Envelope> for String {
    fn from(envelope: Envelope) -> Self {
        envelope.0
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope(<{} chars>)", self.0.len())
    }
}

/// Decoded envelope: the nonce and the ciphertext with its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeParts {
    pub nonce: [u8; NONCE_LEN],
    pub sealed: Vec<u8>,
}

impl EnvelopeParts {
    /// Decode a base64 envelope, rejecting anything shorter than nonce + tag.
    pub fn decode(encoded: &str) -> CryptoResult<Self> {
        let raw = base64_decode(encoded)?;
        if raw.len() < MIN_ENVELOPE_LEN {
            return Err(CryptoError::MalformedEnvelope(format!(
                "envelope is {} bytes, need at least {}",
                raw.len(),
                MIN_ENVELOPE_LEN
            )));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&raw[..NONCE_LEN]);

        Ok(Self {
            nonce,
            sealed: raw[NONCE_LEN..].to_vec(),
        })
    }

    /// Re-encode into the stored form.
    pub fn encode(&self) -> String {
        let mut out = Vec::with_capacity(NONCE_LEN + self.sealed.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.sealed);
        base64_encode(&out)
    }
}

/// Encrypts and decrypts note fields under the process-wide key.
///
/// Construct once at startup and share it behind an `Arc`; it holds no
/// mutable state and is safe to use from many tasks at once.
pub struct EnvelopeCipher {
    sealer: Sealer,
}

impl std::fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeCipher(<key>)")
    }
}

impl EnvelopeCipher {
    /// The key is only needed to initialise the cipher and is dropped
    /// (and zeroized) afterwards.
    pub fn new(key: EncryptionKey) -> Self {
        Self {
            sealer: Sealer::new(key.as_bytes()),
        }
    }

    /// Load the key from `NOTA_ENCRYPTION_KEY`. Call this at startup so a
    /// missing or malformed key stops the process before serving notes.
    pub fn from_env() -> CryptoResult<Self> {
        Ok(Self::new(EncryptionKey::from_env()?))
    }

    /// Seal `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<Envelope> {
        let (nonce, sealed) = self.sealer.seal(plaintext.as_bytes())?;

        Ok(Envelope(EnvelopeParts { nonce, sealed }.encode()))
    }

    /// Open an envelope.
    ///
    /// An empty string decrypts to an empty string without touching the
    /// cipher. Anything else must authenticate or the call fails.
    pub fn decrypt(&self, envelope: &str) -> CryptoResult<String> {
        if envelope.is_empty() {
            return Ok(String::new());
        }

        let parts = EnvelopeParts::decode(envelope).inspect_err(|e| {
            debug!(
                subsystem = "crypto",
                component = "envelope",
                op = "decrypt",
                envelope_len = envelope.len(),
                error = %e,
                "Rejected malformed envelope"
            );
        })?;

        let plaintext = self
            .sealer
            .open(&parts.nonce, &parts.sealed)
            .inspect_err(|_| {
                debug!(
                    subsystem = "crypto",
                    component = "envelope",
                    op = "decrypt",
                    envelope_len = envelope.len(),
                    "Envelope failed authentication"
                );
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".to_string()))
    }

    /// Convenience wrapper over [`EnvelopeCipher::decrypt`].
    pub fn decrypt_envelope(&self, envelope: &Envelope) -> CryptoResult<String> {
        self.decrypt(envelope.as_str())
    }
}
