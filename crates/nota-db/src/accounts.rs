//! Account settings repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use nota_core::{AccountRepository, Error, Result};

/// PostgreSQL implementation of AccountRepository.
pub struct PgAccountRepository {
    pool: Pool<Postgres>,
}

impl PgAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn api_key_ciphertext(&self, owner_id: Uuid) -> Result<Option<String>> {
        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT api_key_ciphertext FROM account WHERE id = $1")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        // Older rows cleared the key by writing an empty string.
        Ok(stored.flatten().filter(|ct| !ct.is_empty()))
    }

    async fn set_api_key_ciphertext(
        &self,
        owner_id: Uuid,
        ciphertext: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO account (id, api_key_ciphertext, created_at, updated_at)
             VALUES ($1, $2, $3, $3)
             ON CONFLICT (id) DO UPDATE
             SET api_key_ciphertext = EXCLUDED.api_key_ciphertext, updated_at = EXCLUDED.updated_at",
        )
        .bind(owner_id)
        .bind(ciphertext)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
