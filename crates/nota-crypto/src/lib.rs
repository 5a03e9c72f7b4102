//! # nota-crypto
//!
//! Envelope encryption for note titles, bodies and stored API keys.
//!
//! ## Cryptographic Primitives
//!
//! - **Symmetric cipher**: AES-256-GCM (AEAD)
//! - **Nonce**: 96 bits from a ChaCha20-based CSPRNG, fresh per call
//! - **Key**: one 256-bit key per process, base64 in `NOTA_ENCRYPTION_KEY`
//!
//! ## Envelope Format
//!
//! ```text
//! ┌──────────────┬──────────────────────┬───────────────┐
//! │ Nonce (12 B) │ Ciphertext (n bytes) │ GCM tag (16 B)│
//! └──────────────┴──────────────────────┴───────────────┘
//!                  base64 (standard, padded)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use nota_crypto::{EncryptionKey, EnvelopeCipher};
//!
//! let cipher = EnvelopeCipher::new(EncryptionKey::generate());
//!
//! let envelope = cipher.encrypt("Groceries").unwrap();
//! assert_ne!(envelope.as_str(), "Groceries");
//! assert_eq!(cipher.decrypt(envelope.as_str()).unwrap(), "Groceries");
//!
//! // Empty fields skip the cipher entirely.
//! assert_eq!(cipher.decrypt("").unwrap(), "");
//! ```

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod format;
pub mod key;

// Re-export commonly used types
pub use cipher::{KEY_LEN, NONCE_LEN, TAG_LEN};
pub use envelope::{Envelope, EnvelopeCipher, EnvelopeParts, MIN_ENVELOPE_LEN};
pub use error::{CryptoError, CryptoResult};
pub use format::{base64_decode, base64_encode};
pub use key::{EncryptionKey, ENCRYPTION_KEY_ENV};
