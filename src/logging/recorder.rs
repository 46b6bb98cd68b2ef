//! Logging adapter: buffer/session transitions become event log writes.
//!
//! `Recorder` wraps an [`EventLog`] and provides one named method per action
//! type so call-sites don't construct `LogRecord`s by hand. It also owns the
//! checkpoint counter: every data entry bumps it, and the engine writes a
//! fresh `current_code` snapshot once `checkpoint_due` reports true.

use std::sync::Arc;

use crate::buffer::Direction;

use super::record::{EventKind, LogRecord};
use super::writer::EventLog;

/// Translates editor events into ordered, durable log entries.
///
/// All methods append exactly one entry. Entry order on disk is the call
/// order; the engine serializes calls through its single event loop.
pub struct Recorder {
    log: Arc<EventLog>,
    /// Data entries written since the last snapshot.
    entries_since_checkpoint: u32,
    /// Snapshot cadence; `0` disables periodic checkpoints.
    checkpoint_every: u32,
}

impl Recorder {
    pub fn new(log: Arc<EventLog>, checkpoint_every: u32) -> Self {
        Self {
            log,
            entries_since_checkpoint: 0,
            checkpoint_every,
        }
    }

    // ─── Per-action entries ──────────────────────────────────────────────────

    /// One user-typed character. `caret` is the position after the insert.
    pub async fn character_typed(&mut self, ch: char, caret: usize) {
        self.write(EventKind::CharacterTyped, ch.to_string(), caret)
            .await;
    }

    /// One removed character. `caret` is the position after the removal,
    /// which is also the index the character occupied.
    pub async fn deletion(&mut self, caret: usize) {
        self.write(EventKind::Deletion, "1".to_string(), caret).await;
    }

    /// A caret-movement key, whether or not the caret actually moved.
    pub async fn arrow_key(&mut self, direction: Direction, caret: usize) {
        self.write(EventKind::ArrowKey, direction.as_str().to_string(), caret)
            .await;
    }

    /// A suggestion became visible; `suffix` is the post-trim text.
    pub async fn proposed(&mut self, suffix: &str, caret: usize) {
        self.write(EventKind::ProposedSuggestion, suffix.to_string(), caret)
            .await;
    }

    /// A suggestion was spliced into the buffer.
    pub async fn accepted(&mut self, suffix: &str, caret: usize) {
        self.write(EventKind::AcceptedSuggestion, suffix.to_string(), caret)
            .await;
    }

    /// Full-buffer snapshot. Resets the checkpoint counter and does not
    /// count toward the next checkpoint.
    pub async fn snapshot(&mut self, buffer: &str, caret: usize) {
        self.entries_since_checkpoint = 0;
        self.log
            .append(&LogRecord::new(
                EventKind::CurrentCode,
                buffer.to_string(),
                caret,
            ))
            .await;
    }

    // ─── Checkpoint cadence ──────────────────────────────────────────────────

    /// True once enough data entries have accumulated since the last
    /// snapshot. The engine checks this after every logged entry.
    pub fn checkpoint_due(&self) -> bool {
        self.checkpoint_every > 0 && self.entries_since_checkpoint >= self.checkpoint_every
    }

    async fn write(&mut self, kind: EventKind, info: String, caret: usize) {
        self.entries_since_checkpoint += 1;
        self.log.append(&LogRecord::new(kind, info, caret)).await;
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
