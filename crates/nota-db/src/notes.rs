//! Note repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use nota_core::{new_v7, Error, NoteRecord, NoteRepository, Result};

/// PostgreSQL implementation of NoteRepository.
///
/// Rows hold envelopes only. Ownership is enforced in every statement's
/// `WHERE` clause so a foreign note is never read or modified.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

const NOTE_COLUMNS: &str =
    "id, owner_id, title_ciphertext, body_ciphertext, pinned, created_at, updated_at";

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Explain why an owner-scoped statement touched no row.
    ///
    /// A note that exists under another owner is `Forbidden`; otherwise it
    /// is `NoteNotFound`.
    async fn missing_or_forbidden(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        owner_id: Uuid,
    ) -> Error {
        let owner: std::result::Result<Option<Uuid>, sqlx::Error> =
            sqlx::query_scalar("SELECT owner_id FROM note WHERE id = $1")
                .bind(note_id)
                .fetch_optional(&mut **tx)
                .await;

        match owner {
            Ok(Some(actual)) if actual != owner_id => {
                debug!(
                    subsystem = "database",
                    component = "notes",
                    note_id = %note_id,
                    owner_id = %owner_id,
                    "Rejected access to a note owned by another account"
                );
                Error::Forbidden(format!("note {} belongs to another owner", note_id))
            }
            Ok(_) => Error::NoteNotFound(note_id),
            Err(e) => Error::Database(e),
        }
    }

    /// Update a note within an existing transaction.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        owner_id: Uuid,
        title_ciphertext: &str,
        body_ciphertext: &str,
    ) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        let updated: Option<DateTime<Utc>> = sqlx::query_scalar(
            "UPDATE note SET title_ciphertext = $1, body_ciphertext = $2, updated_at = $3
             WHERE id = $4 AND owner_id = $5
             RETURNING updated_at",
        )
        .bind(title_ciphertext)
        .bind(body_ciphertext)
        .bind(now)
        .bind(note_id)
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        match updated {
            Some(ts) => Ok(ts),
            None => Err(self.missing_or_forbidden(tx, note_id, owner_id).await),
        }
    }
}

fn map_row_to_note(row: sqlx::postgres::PgRow) -> NoteRecord {
    NoteRecord {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title_ciphertext: row.get("title_ciphertext"),
        body_ciphertext: row.get("body_ciphertext"),
        pinned: row.get("pinned"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(
        &self,
        owner_id: Uuid,
        title_ciphertext: &str,
        body_ciphertext: &str,
    ) -> Result<Uuid> {
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO note (id, owner_id, title_ciphertext, body_ciphertext, pinned, created_at, updated_at)
             VALUES ($1, $2, $3, $4, false, $5, $5)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(title_ciphertext)
        .bind(body_ciphertext)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn update(
        &self,
        note_id: Uuid,
        owner_id: Uuid,
        title_ciphertext: &str,
        body_ciphertext: &str,
    ) -> Result<DateTime<Utc>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self
            .update_tx(&mut tx, note_id, owner_id, title_ciphertext, body_ciphertext)
            .await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn fetch(&self, note_id: Uuid, owner_id: Uuid) -> Result<NoteRecord> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM note WHERE id = $1 AND owner_id = $2",
            NOTE_COLUMNS
        ))
        .bind(note_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let result = match row {
            Some(row) => Ok(map_row_to_note(row)),
            None => Err(self.missing_or_forbidden(&mut tx, note_id, owner_id).await),
        };
        tx.commit().await.map_err(Error::Database)?;
        result
    }

    async fn list_all(&self, owner_id: Uuid) -> Result<Vec<NoteRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM note WHERE owner_id = $1 ORDER BY created_at ASC, id ASC",
            NOTE_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_row_to_note).collect())
    }

    async fn delete(&self, note_id: Uuid, owner_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND owner_id = $2")
            .bind(note_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            let err = self.missing_or_forbidden(&mut tx, note_id, owner_id).await;
            tx.rollback().await.map_err(Error::Database)?;
            return Err(err);
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_many(&self, note_ids: &[Uuid], owner_id: Uuid) -> Result<u64> {
        if note_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM note WHERE id = ANY($1) AND owner_id = $2")
            .bind(note_ids)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn set_pinned(&self, note_id: Uuid, owner_id: Uuid, pinned: bool) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = sqlx::query("UPDATE note SET pinned = $1 WHERE id = $2 AND owner_id = $3")
            .bind(pinned)
            .bind(note_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            let err = self.missing_or_forbidden(&mut tx, note_id, owner_id).await;
            tx.rollback().await.map_err(Error::Database)?;
            return Err(err);
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
