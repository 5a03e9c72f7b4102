//! PostgreSQL repository tests.
//!
//! These need a reachable database (`DATABASE_URL`) and are ignored by default:
//! `cargo test -p nota-db -- --ignored`.

use std::sync::Arc;

use nota_core::{AccountRepository, ErrorKind, NoteRepository};
use nota_db::test_fixtures::{test_cipher, TestDatabase};
use nota_db::{log_pool_metrics, ApiKeyVault, Database, SecureNotes};
use uuid::Uuid;

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_update_is_owner_scoped() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let repo = test_db.notes();
    let owner = Uuid::new_v4();

    let id = repo.create(owner, "t0", "b0").await.unwrap();

    let err = repo
        .update(id, Uuid::new_v4(), "t1", "b1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = repo
        .update(Uuid::new_v4(), owner, "t1", "b1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let stored = repo.fetch(id, owner).await.unwrap();
    assert_eq!(stored.title_ciphertext, "t0");

    let updated_at = repo.update(id, owner, "t2", "b2").await.unwrap();
    let stored = repo.fetch(id, owner).await.unwrap();
    assert_eq!(stored.body_ciphertext, "b2");
    assert!(stored.updated_at >= stored.created_at);
    assert_eq!(
        stored.updated_at.timestamp_micros(),
        updated_at.timestamp_micros()
    );

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_list_all_oldest_first() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let repo = test_db.notes();
    let owner = Uuid::new_v4();

    let first = repo.create(owner, "a", "a").await.unwrap();
    let second = repo.create(owner, "b", "b").await.unwrap();
    repo.create(Uuid::new_v4(), "c", "c").await.unwrap();
    repo.update(first, owner, "a2", "a2").await.unwrap();

    let ids: Vec<Uuid> = repo
        .list_all(owner)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec![first, second]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_delete_many_and_pin() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let repo = test_db.notes();
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    let a = repo.create(owner, "a", "a").await.unwrap();
    let b = repo.create(owner, "b", "b").await.unwrap();
    let theirs = repo.create(other, "c", "c").await.unwrap();

    repo.set_pinned(b, owner, true).await.unwrap();
    assert!(repo.fetch(b, owner).await.unwrap().pinned);
    assert_eq!(
        repo.set_pinned(theirs, owner, true).await.unwrap_err().kind(),
        ErrorKind::Authorization
    );

    let removed = repo.delete_many(&[a, theirs], owner).await.unwrap();
    assert_eq!(removed, 1);
    assert!(repo.fetch(theirs, other).await.is_ok());

    repo.delete(b, owner).await.unwrap();
    assert_eq!(
        repo.delete(b, owner).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_secure_notes_and_api_key() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let owner = Uuid::new_v4();

    let notes = SecureNotes::new(test_cipher(), Arc::new(test_db.notes()));
    let id = notes.create(owner, Some("Groceries")).await.unwrap();
    notes.update(id, owner, "Groceries", "<p>milk</p>").await.unwrap();
    let opened = notes.open(id, owner).await.unwrap();
    assert_eq!(opened.body, "<p>milk</p>");

    let accounts = Arc::new(test_db.accounts());
    let vault = ApiKeyVault::new(test_cipher(), accounts.clone());
    vault.store(owner, "sk-live").await.unwrap();
    assert_eq!(vault.load(owner).await.unwrap(), "sk-live");
    vault.store(owner, "").await.unwrap();
    assert_eq!(accounts.api_key_ciphertext(owner).await.unwrap(), None);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_database_shares_one_pool() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let db = Database::new(test_db.pool.clone());
    let owner = Uuid::new_v4();

    let id = db.notes.create(owner, "", "").await.unwrap();
    assert_eq!(db.notes.list_all(owner).await.unwrap()[0].id, id);
    assert_eq!(db.accounts.api_key_ciphertext(owner).await.unwrap(), None);
    log_pool_metrics(&db.pool);

    test_db.cleanup().await;
}
