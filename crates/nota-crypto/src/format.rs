//! Text encoding for keys and envelopes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Padded standard-alphabet base64, as stored in the note columns.
pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Inverse of [`base64_encode`]. Text that is not base64 is a malformed
/// envelope, whatever else is wrong with it.
pub fn base64_decode(text: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| CryptoError::MalformedEnvelope(format!("not base64: {e}")))
}
