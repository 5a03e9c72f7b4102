//! Context assembly over the in-memory repository.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use nota_core::{ChatRole, NoteRecord, NoteRepository, Transcript};
use nota_crypto::EnvelopeCipher;
use nota_db::test_fixtures::test_cipher;
use nota_db::InMemoryNoteRepository;
use nota_inference::mock::MockChatBackend;
use nota_inference::{ContextAssembler, ContextConfig, NoteContext, NotesAssistant};

struct Fixture {
    cipher: Arc<EnvelopeCipher>,
    notes: Arc<InMemoryNoteRepository>,
    owner: Uuid,
}

impl Fixture {
    fn new() -> Self {
        Self {
            cipher: test_cipher(),
            notes: Arc::new(InMemoryNoteRepository::new()),
            owner: Uuid::new_v4(),
        }
    }

    /// Insert a note created `minutes` after a fixed epoch.
    async fn note(&self, minutes: i64, title: &str, body: &str) -> Uuid {
        let created_at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
            + Duration::minutes(minutes);
        let record = NoteRecord {
            id: Uuid::now_v7(),
            owner_id: self.owner,
            title_ciphertext: self.cipher.encrypt(title).unwrap().into_string(),
            body_ciphertext: self.cipher.encrypt(body).unwrap().into_string(),
            pinned: false,
            created_at,
            updated_at: created_at,
        };
        let id = record.id;
        self.notes.insert_record(record).await;
        id
    }

    fn assembler(&self, config: ContextConfig) -> ContextAssembler {
        ContextAssembler::new(self.cipher.clone(), self.notes.clone(), config)
    }
}

fn question(text: &str) -> Transcript {
    Transcript::from_exchanges(&[text], &[] as &[&str])
}

/// The part of the system prompt after the fixed instructions.
fn notes_section(prompt: &nota_inference::ChatPrompt) -> &str {
    let marker = "Here are the user's notes:\n";
    let start = prompt.system.find(marker).expect("notes marker") + marker.len();
    &prompt.system[start..]
}

fn ready(context: NoteContext) -> nota_inference::ChatPrompt {
    match context {
        NoteContext::Ready(prompt) => prompt,
        NoteContext::NoNotes => panic!("expected a prompt"),
    }
}

#[tokio::test]
async fn test_corrupt_note_is_skipped() {
    let fx = Fixture::new();
    fx.note(0, "Groceries", "<p>milk</p>").await;
    let corrupt = fx.note(1, "Diary", "<p>secret</p>").await;
    fx.note(2, "Work", "<p>ship release</p>").await;
    fx.note(3, "Ideas", "<p>garden</p>").await;
    fx.notes
        .overwrite_ciphertext(corrupt, "bm90IGFuIGVudmVsb3Bl", "%%%not-base64%%%")
        .await;

    let prompt = ready(
        fx.assembler(ContextConfig::default())
            .build_context(fx.owner, &question("what did I write?"))
            .await
            .unwrap(),
    );

    assert_eq!(prompt.included, 3);
    assert_eq!(prompt.skipped, 1);
    assert_eq!(prompt.truncated, 0);
    assert!(prompt.system.contains("Title: Groceries"));
    assert!(prompt.system.contains("Title: Work"));
    assert!(prompt.system.contains("Title: Ideas"));
    assert!(!prompt.system.contains("Diary"));
}

#[tokio::test]
async fn test_owner_without_notes() {
    let fx = Fixture::new();
    let context = fx
        .assembler(ContextConfig::default())
        .build_context(fx.owner, &question("anything?"))
        .await
        .unwrap();
    assert_eq!(context, NoteContext::NoNotes);
}

#[tokio::test]
async fn test_only_unreadable_notes_means_no_notes() {
    let fx = Fixture::new();
    let id = fx.note(0, "Lost", "gone").await;
    fx.notes.overwrite_ciphertext(id, "AAAA", "AAAA").await;

    let context = fx
        .assembler(ContextConfig::default())
        .build_context(fx.owner, &question("anything?"))
        .await
        .unwrap();
    assert_eq!(context, NoteContext::NoNotes);
}

#[tokio::test]
async fn test_other_owners_notes_are_not_included() {
    let fx = Fixture::new();
    fx.note(0, "Mine", "mine").await;
    fx.notes
        .create(
            Uuid::new_v4(),
            fx.cipher.encrypt("Theirs").unwrap().as_str(),
            fx.cipher.encrypt("theirs").unwrap().as_str(),
        )
        .await
        .unwrap();

    let prompt = ready(
        fx.assembler(ContextConfig::default())
            .build_context(fx.owner, &question("q"))
            .await
            .unwrap(),
    );
    assert_eq!(prompt.included, 1);
    assert!(!prompt.system.contains("Theirs"));
}

#[tokio::test]
async fn test_notes_ordered_oldest_first_with_separator() {
    let fx = Fixture::new();
    fx.note(20, "Third", "c").await;
    fx.note(0, "First", "a").await;
    fx.note(10, "Second", "b").await;

    let prompt = ready(
        fx.assembler(ContextConfig::default())
            .build_context(fx.owner, &question("q"))
            .await
            .unwrap(),
    );

    let first = prompt.system.find("Title: First").unwrap();
    let second = prompt.system.find("Title: Second").unwrap();
    let third = prompt.system.find("Title: Third").unwrap();
    assert!(first < second && second < third);
    assert_eq!(prompt.system.matches("\n---\n").count(), 2);
    assert!(prompt.system.contains(
        "[Note]\nTitle: First\nText: a\nCreated At: 2025-01-01T08:00:00.000Z\nUpdated At: 2025-01-01T08:00:00.000Z"
    ));
}

#[tokio::test]
async fn test_bodies_are_reduced_to_text() {
    let fx = Fixture::new();
    fx.note(
        0,
        "Groceries",
        "<h2>Shop</h2><ul><li>milk &amp; eggs</li><li>bread</li></ul><script>x()</script>",
    )
    .await;

    let prompt = ready(
        fx.assembler(ContextConfig::default())
            .build_context(fx.owner, &question("q"))
            .await
            .unwrap(),
    );

    let notes = notes_section(&prompt);
    assert!(notes.contains("Text: Shop\n\n* milk & eggs\n* bread\nCreated At:"));
    assert!(!notes.contains('<'));
    assert!(!notes.contains("x()"));
}

#[tokio::test]
async fn test_budget_drops_oldest_notes() {
    let fx = Fixture::new();
    let body = "word ".repeat(40);
    for minute in 0..5 {
        fx.note(minute, &format!("Note {}", minute), &body).await;
    }

    // Each rendered block is 300 chars; leave room for two.
    let config = ContextConfig::default().with_max_chars(700);
    let prompt = ready(
        fx.assembler(config)
            .build_context(fx.owner, &question("q"))
            .await
            .unwrap(),
    );

    assert_eq!(prompt.included, 2);
    assert_eq!(prompt.truncated, 3);
    assert!(prompt.system.contains("Title: Note 3"));
    assert!(prompt.system.contains("Title: Note 4"));
    assert!(!prompt.system.contains("Title: Note 0"));
}

#[tokio::test]
async fn test_transcript_follows_system_prompt() {
    let fx = Fixture::new();
    fx.note(0, "Groceries", "milk").await;

    let transcript = Transcript::from_exchanges(
        &["what do I need?", "anything else?"],
        &["<p>Milk.</p>"],
    );
    let prompt = ready(
        fx.assembler(ContextConfig::default())
            .build_context(fx.owner, &transcript)
            .await
            .unwrap(),
    );

    let messages = prompt.messages();
    let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            ChatRole::System,
            ChatRole::User,
            ChatRole::Assistant,
            ChatRole::User
        ]
    );
    assert_eq!(messages[1].content, "what do I need?");
    assert_eq!(messages[3].content, "anything else?");
}

#[tokio::test]
async fn test_transcript_keeps_most_recent_turns() {
    let fx = Fixture::new();
    fx.note(0, "Groceries", "milk").await;

    let questions: Vec<String> = (0..5).map(|i| format!("q{}", i)).collect();
    let responses: Vec<String> = (0..4).map(|i| format!("a{}", i)).collect();
    let transcript = Transcript::from_exchanges(&questions, &responses);

    let config = ContextConfig::default().with_max_transcript_turns(3);
    let prompt = ready(
        fx.assembler(config)
            .build_context(fx.owner, &transcript)
            .await
            .unwrap(),
    );

    let contents: Vec<&str> = prompt.transcript.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["q3", "a3", "q4"]);
}

#[tokio::test]
async fn test_assistant_sends_assembled_prompt() {
    let fx = Fixture::new();
    fx.note(0, "Groceries", "<p>milk</p>").await;

    let backend = MockChatBackend::new().with_response("<p>You need milk.</p>");
    let assistant = NotesAssistant::new(
        Arc::new(fx.assembler(ContextConfig::default())),
        Arc::new(backend.clone()),
    );

    let answer = assistant
        .ask(fx.owner, &question("what do I need?"))
        .await
        .unwrap();

    assert_eq!(answer, "<p>You need milk.</p>");
    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0].role, ChatRole::System);
    assert!(calls[0][0].content.contains("Text: milk"));
    assert_eq!(calls[0][1].content, "what do I need?");
}
