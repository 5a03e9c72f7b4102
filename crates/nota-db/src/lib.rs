//! # nota-db
//!
//! Storage layer for nota.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repositories for notes and account settings
//! - In-memory repositories with the same contract
//! - `SecureNotes` and `ApiKeyVault`, which encrypt on the way in and decrypt
//!   on the way out
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nota_crypto::EnvelopeCipher;
//! use nota_db::{Database, SecureNotes};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cipher = Arc::new(EnvelopeCipher::from_env()?);
//!     let db = Database::connect("postgres://localhost/nota").await?;
//!     let notes = SecureNotes::new(cipher, Arc::new(db.notes));
//!
//!     let id = notes.create(owner_id, Some("Groceries")).await?;
//!     println!("Created note: {}", id);
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod api_keys;
pub mod memory;
pub mod notes;
pub mod pool;
pub mod secure;

// Always compiled so integration tests (in tests/) can use the fixtures.
pub mod test_fixtures;

// Re-export core types
pub use nota_core::*;

pub use accounts::PgAccountRepository;
pub use api_keys::ApiKeyVault;
pub use memory::{InMemoryAccountRepository, InMemoryNoteRepository};
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use secure::SecureNotes;

use sqlx::PgPool;

/// Pg-backed repositories sharing one pool.
pub struct Database {
    pub pool: PgPool,
    pub notes: PgNoteRepository,
    pub accounts: PgAccountRepository,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        let notes = PgNoteRepository::new(pool.clone());
        let accounts = PgAccountRepository::new(pool.clone());
        Self {
            pool,
            notes,
            accounts,
        }
    }

    /// Connect with the default pool sizing.
    pub async fn connect(url: &str) -> Result<Self> {
        create_pool(url).await.map(Self::new)
    }

    /// Connect to `DATABASE_URL`, sizing the pool from the environment.
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
        let db = create_pool_with_config(&url, PoolConfig::from_env())
            .await
            .map(Self::new)?;
        log_pool_metrics(&db.pool);
        Ok(db)
    }

    /// Apply `migrations/` to the connected database.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(e.into()))
    }
}
