//! Chat context assembly from a user's encrypted notes.
//!
//! Every note of the owner is decrypted, reduced to plain text and rendered
//! as a `[Note]` block, oldest first. Notes that cannot be decrypted are
//! skipped and counted; one bad row never hides the rest of the corpus.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use nota_core::defaults;
use nota_core::{ChatMessage, NoteRecord, NoteRepository, Result, Transcript};
use nota_crypto::{CryptoResult, EnvelopeCipher};

use crate::html::html_to_text;
use crate::prompt::system_prompt;

/// Limits applied while assembling a context.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Character budget for the notes section. Oldest notes are dropped
    /// first once it is exceeded.
    pub max_chars: usize,
    /// Most recent transcript messages carried into the prompt.
    pub max_transcript_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: defaults::CONTEXT_MAX_CHARS,
            max_transcript_turns: defaults::TRANSCRIPT_MAX_TURNS,
        }
    }
}

impl ContextConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTA_CONTEXT_MAX_CHARS` | `200000` | Notes section budget |
    /// | `NOTA_CONTEXT_MAX_TURNS` | `40` | Transcript messages kept |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(chars) = std::env::var("NOTA_CONTEXT_MAX_CHARS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|c| *c > 0)
        {
            config.max_chars = chars;
        }

        if let Some(turns) = std::env::var("NOTA_CONTEXT_MAX_TURNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|t| *t > 0)
        {
            config.max_transcript_turns = turns;
        }

        config
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    /// At least one turn is kept so the question being asked survives.
    pub fn with_max_transcript_turns(mut self, turns: usize) -> Self {
        self.max_transcript_turns = turns.max(1);
        self
    }
}

/// Outcome of assembling a context.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteContext {
    /// The owner has no notes, or none of them could be read.
    NoNotes,
    Ready(ChatPrompt),
}

/// A prompt ready for a chat-completion backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    /// Instructions followed by the rendered notes.
    pub system: String,
    /// Prior conversation, oldest first, ending with the current question.
    pub transcript: Vec<ChatMessage>,
    /// Notes rendered into `system`.
    pub included: usize,
    /// Notes left out because they could not be decrypted.
    pub skipped: usize,
    /// Readable notes left out to stay within the character budget.
    pub truncated: usize,
}

impl ChatPrompt {
    /// Role-tagged messages: the system prompt, then the transcript.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(ChatMessage::system(self.system.clone()));
        messages.extend(self.transcript.iter().cloned());
        messages
    }

    /// Single-string form, one `role: content` paragraph per message.
    pub fn render(&self) -> String {
        self.messages()
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

struct ReadableNote {
    id: Uuid,
    title: String,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReadableNote {
    fn render(&self) -> String {
        format!(
            "[Note]\nTitle: {}\nText: {}\nCreated At: {}\nUpdated At: {}",
            self.title,
            self.text,
            self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

/// Builds chat prompts from an owner's notes.
pub struct ContextAssembler {
    cipher: Arc<EnvelopeCipher>,
    repository: Arc<dyn NoteRepository>,
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(
        cipher: Arc<EnvelopeCipher>,
        repository: Arc<dyn NoteRepository>,
        config: ContextConfig,
    ) -> Self {
        Self {
            cipher,
            repository,
            config,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Assemble the prompt for `owner_id` around the given transcript.
    ///
    /// Repository failures propagate. Envelopes that fail to decrypt do not:
    /// the note is skipped with a warning and counted in
    /// [`ChatPrompt::skipped`].
    pub async fn build_context(
        &self,
        owner_id: Uuid,
        transcript: &Transcript,
    ) -> Result<NoteContext> {
        let start = Instant::now();
        let records = self.repository.list_all(owner_id).await?;
        let total = records.len();

        let mut readable = Vec::with_capacity(total);
        let mut skipped = 0;
        for record in &records {
            match self.open(record) {
                Ok(note) => readable.push(note),
                Err(e) if e.is_unreadable_envelope() => {
                    skipped += 1;
                    warn!(
                        subsystem = "inference",
                        component = "context",
                        note_id = %record.id,
                        owner_id = %owner_id,
                        error = %e,
                        "Skipping note that cannot be decrypted"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        if readable.is_empty() {
            debug!(
                subsystem = "inference",
                component = "context",
                owner_id = %owner_id,
                skipped_count = skipped,
                "No readable notes"
            );
            return Ok(NoteContext::NoNotes);
        }

        readable.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let blocks: Vec<String> = readable.iter().map(ReadableNote::render).collect();
        let (kept, truncated) = fit_budget(blocks, self.config.max_chars);
        let included = kept.len();
        let notes_section = kept.join(defaults::NOTE_SEPARATOR);

        let prompt = ChatPrompt {
            system: system_prompt(&notes_section),
            transcript: transcript.tail(self.config.max_transcript_turns).to_vec(),
            included,
            skipped,
            truncated,
        };

        info!(
            subsystem = "inference",
            component = "context",
            op = "build_context",
            owner_id = %owner_id,
            result_count = included,
            skipped_count = skipped,
            truncated,
            prompt_len = prompt.system.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat context assembled"
        );
        Ok(NoteContext::Ready(prompt))
    }

    fn open(&self, record: &NoteRecord) -> CryptoResult<ReadableNote> {
        let title = self.cipher.decrypt(&record.title_ciphertext)?;
        let body = self.cipher.decrypt(&record.body_ciphertext)?;
        Ok(ReadableNote {
            id: record.id,
            title,
            text: html_to_text(&body),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Drop blocks from the front (oldest) until the joined length fits.
///
/// The newest block is always kept; if it alone exceeds the budget it is cut
/// at a character boundary. Returns the kept blocks and how many were dropped.
fn fit_budget(mut blocks: Vec<String>, max_chars: usize) -> (Vec<String>, usize) {
    let sep = defaults::NOTE_SEPARATOR.chars().count();
    let sizes: Vec<usize> = blocks.iter().map(|b| b.chars().count()).collect();
    let mut total = sizes.iter().sum::<usize>() + sep * blocks.len().saturating_sub(1);

    let mut start = 0;
    while total > max_chars && start + 1 < blocks.len() {
        total -= sizes[start] + sep;
        start += 1;
    }

    let mut kept = blocks.split_off(start);
    if total > max_chars {
        if let Some(last) = kept.last_mut() {
            if let Some((idx, _)) = last.char_indices().nth(max_chars) {
                last.truncate(idx);
            }
        }
    }
    (kept, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nota_core::ChatRole;

    fn block(len: usize) -> String {
        "x".repeat(len)
    }

    #[test]
    fn test_zero_transcript_turns_is_rejected() {
        std::env::set_var("NOTA_CONTEXT_MAX_TURNS", "0");
        let config = ContextConfig::from_env();
        std::env::remove_var("NOTA_CONTEXT_MAX_TURNS");
        assert_eq!(config.max_transcript_turns, 40);

        let config = ContextConfig::default().with_max_transcript_turns(0);
        assert_eq!(config.max_transcript_turns, 1);
    }

    #[test]
    fn test_fit_budget_keeps_everything_under_limit() {
        let (kept, dropped) = fit_budget(vec![block(10), block(10)], 100);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_fit_budget_drops_oldest_first() {
        let blocks = vec!["old".repeat(10), "mid".repeat(10), "new".repeat(10)];
        // Two blocks plus one separator.
        let budget = 30 + 30 + defaults::NOTE_SEPARATOR.len();
        let (kept, dropped) = fit_budget(blocks, budget);
        assert_eq!(dropped, 1);
        assert!(kept[0].starts_with("mid"));
        assert!(kept[1].starts_with("new"));
    }

    #[test]
    fn test_fit_budget_cuts_single_oversized_block() {
        let (kept, dropped) = fit_budget(vec![block(5), "é".repeat(50)], 20);
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].chars().count(), 20);
    }

    #[test]
    fn test_note_block_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let note = ReadableNote {
            id: Uuid::nil(),
            title: "Groceries".to_string(),
            text: "milk".to_string(),
            created_at: at,
            updated_at: at,
        };
        assert_eq!(
            note.render(),
            "[Note]\nTitle: Groceries\nText: milk\nCreated At: 2025-03-01T09:30:00.000Z\nUpdated At: 2025-03-01T09:30:00.000Z"
        );
    }

    #[test]
    fn test_prompt_messages_start_with_system() {
        let prompt = ChatPrompt {
            system: "notes".to_string(),
            transcript: vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")],
            included: 1,
            skipped: 0,
            truncated: 0,
        };
        let messages = prompt.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[2].content, "a1");
        assert_eq!(prompt.render(), "system: notes\n\nuser: q1\n\nassistant: a1");
    }

    #[test]
    fn test_config_builders() {
        let config = ContextConfig::default()
            .with_max_chars(0)
            .with_max_transcript_turns(4);
        assert_eq!(config.max_chars, 1);
        assert_eq!(config.max_transcript_turns, 4);
        assert_eq!(ContextConfig::default().max_chars, 200_000);
    }
}
