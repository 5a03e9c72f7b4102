//! Encrypted storage for each account's chat API key.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use nota_core::{AccountRepository, Error, Result};
use nota_crypto::EnvelopeCipher;

/// Stores the owner's chat API key as an envelope.
#[derive(Clone)]
pub struct ApiKeyVault {
    cipher: Arc<EnvelopeCipher>,
    accounts: Arc<dyn AccountRepository>,
}

impl ApiKeyVault {
    pub fn new(cipher: Arc<EnvelopeCipher>, accounts: Arc<dyn AccountRepository>) -> Self {
        Self { cipher, accounts }
    }

    /// Store a new key. An empty (or whitespace) key clears the stored one.
    ///
    /// Rejects a key identical to the one already stored. Format checks
    /// belong to the chat backend and are not applied here.
    pub async fn store(&self, owner_id: Uuid, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            self.accounts.set_api_key_ciphertext(owner_id, None).await?;
            info!(
                subsystem = "database",
                component = "api_keys",
                op = "clear",
                owner_id = %owner_id,
                "API key cleared"
            );
            return Ok(());
        }

        match self.load(owner_id).await {
            Ok(current) if current == api_key => {
                return Err(Error::InvalidInput(
                    "new API key is the same as the current one".to_string(),
                ));
            }
            Ok(_) | Err(Error::NotFound(_)) => {}
            // An unreadable stored key is simply replaced.
            Err(e) if e.kind().is_crypto_failure() => {}
            Err(e) => return Err(e),
        }

        let envelope = self.cipher.encrypt(api_key)?;
        self.accounts
            .set_api_key_ciphertext(owner_id, Some(envelope.as_str()))
            .await?;

        info!(
            subsystem = "database",
            component = "api_keys",
            op = "store",
            owner_id = %owner_id,
            "API key stored"
        );
        Ok(())
    }

    /// Decrypt the stored key. `NotFound` when none is stored.
    pub async fn load(&self, owner_id: Uuid) -> Result<String> {
        let ciphertext = self
            .accounts
            .api_key_ciphertext(owner_id)
            .await?
            .ok_or_else(|| Error::NotFound("no API key found".to_string()))?;

        Ok(self.cipher.decrypt(&ciphertext)?)
    }
}
