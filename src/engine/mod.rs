// SPDX-License-Identifier: MIT

//! Editor engine: owns the buffer, the suggestion session, and the event
//! log for one open exercise, and turns host input plus internal task
//! events into buffer mutations, session transitions, and log entries.
//!
//! Everything funnels through [`EditorEngine::handle`] on one task, so
//! entry order in the log is exactly the order things happened and no
//! transition races another.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::buffer::{Buffer, Direction};
use crate::completion::{CompletionBackend, CompletionOutcome, FetchError};
use crate::config::EditorTuning;
use crate::logging::{EventLog, Recorder};
use crate::overlay::{neutral_filler, overlay_view, OverlayView};
use crate::session::{SessionEffect, SessionEvent, SuggestionSession};
use crate::SessionContext;

mod fetch;

use fetch::FetchPilot;

/// Queue depth for internal task events; input is handled synchronously so
/// the queue only ever holds timer ticks and fetch settlements.
const EVENT_QUEUE_DEPTH: usize = 64;

// ─── Events ──────────────────────────────────────────────────────────────────

/// Host-side input, already decoded from whatever front end is driving us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Insert(char),
    Backspace,
    DeleteForward,
    Arrow(Direction),
    /// Accept key: splice the visible suggestion, or insert the neutral
    /// filler when nothing valid is showing.
    Accept,
    /// Reject key: discard the suggestion and suppress until the next edit.
    Reject,
}

/// Everything the engine reacts to. Input comes from the host loop;
/// `DebounceElapsed` and `FetchSettled` are posted by the engine's own
/// spawned tasks through the receiver returned by [`EditorEngine::open`].
#[derive(Debug)]
pub enum EngineEvent {
    Input(InputEvent),
    DebounceElapsed {
        generation: u64,
    },
    FetchSettled {
        generation: u64,
        prefix: String,
        result: Result<String, FetchError>,
    },
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// One open exercise: buffer, session machine, recorder, and the pilot
/// that runs its debounce/fetch tasks.
pub struct EditorEngine {
    ctx: SessionContext,
    buffer: Buffer,
    session: SuggestionSession,
    recorder: Recorder,
    pilot: FetchPilot,
    debounce: Duration,
    filler: String,
    /// Most recent fetch failure, shown on the status line until the next
    /// successful proposal.
    last_error: Option<String>,
}

impl EditorEngine {
    /// Open an exercise with its starter content. Writes the opening
    /// `current_code` snapshot and returns the engine together with the
    /// receiver its internal tasks post to; the caller's loop must feed
    /// received events back into [`handle`](Self::handle).
    pub async fn open(
        ctx: SessionContext,
        tuning: &EditorTuning,
        backend: Arc<dyn CompletionBackend>,
        starter: &str,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let log = Arc::new(EventLog::new(ctx.log_path.clone()));
        let mut recorder = Recorder::new(log, tuning.checkpoint_every);

        let buffer = Buffer::from_text(starter);
        recorder.snapshot(buffer.text(), buffer.caret()).await;
        info!(
            exercise = %ctx.exercise,
            assistant = %ctx.assistant,
            chars = buffer.len_chars(),
            "exercise opened"
        );

        let engine = Self {
            pilot: FetchPilot::new(backend, tx),
            buffer,
            session: SuggestionSession::new(),
            recorder,
            debounce: Duration::from_millis(tuning.debounce_ms),
            filler: neutral_filler(tuning.filler_width),
            last_error: None,
            ctx,
        };
        (engine, rx)
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn session(&self) -> &SuggestionSession {
        &self.session
    }

    /// The ghost text to render right now, if any.
    pub fn overlay(&self) -> Option<OverlayView<'_>> {
        overlay_view(&self.buffer, &self.session)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Select a character range. Embedders drive this; plain caret keys
    /// clear it. Replacement and deletion decompose through the normal
    /// single-character path so the log stays one entry per character.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.buffer.set_selection(start, end);
    }

    // ─── Event entry point ───────────────────────────────────────────────────

    /// Feed one event through the engine. Host input and internal task
    /// events both land here, already serialized by the caller's loop.
    pub async fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Input(input) => self.on_input(input).await,
            EngineEvent::DebounceElapsed { generation } => {
                let fx = self
                    .session
                    .dispatch(SessionEvent::DebounceElapsed { generation }, self.buffer.prefix_to_caret());
                self.apply(fx).await;
            }
            EngineEvent::FetchSettled {
                generation,
                prefix,
                result,
            } => self.on_settled(generation, prefix, result).await,
        }
    }

    async fn on_input(&mut self, input: InputEvent) {
        match input {
            InputEvent::Insert(ch) => {
                self.delete_selection().await;
                self.buffer.insert_char(ch);
                self.log_typed(ch).await;
                self.note_edit().await;
            }
            InputEvent::Backspace => {
                if self.delete_selection().await {
                    self.note_edit().await;
                } else if self.buffer.delete_backward().is_some() {
                    self.log_deletion().await;
                    self.note_edit().await;
                }
                // At the start of the buffer nothing happened: no entry,
                // no session event.
            }
            InputEvent::DeleteForward => {
                if self.delete_selection().await {
                    self.note_edit().await;
                } else if self.buffer.delete_forward().is_some() {
                    self.log_deletion().await;
                    self.note_edit().await;
                }
            }
            InputEvent::Arrow(dir) => {
                // Logged whether or not the caret actually moved; the key
                // was pressed either way. Caret movement is not an edit,
                // so the session is not consulted here — a now-diverged
                // candidate is caught by the prefix check on display and
                // on accept.
                self.buffer.move_caret(dir);
                self.log_arrow(dir).await;
            }
            InputEvent::Accept => {
                let fx = self
                    .session
                    .dispatch(SessionEvent::AcceptRequested, self.buffer.prefix_to_caret());
                self.apply(fx).await;
            }
            InputEvent::Reject => {
                let fx = self
                    .session
                    .dispatch(SessionEvent::RejectRequested, self.buffer.prefix_to_caret());
                self.apply(fx).await;
            }
        }
    }

    async fn on_settled(
        &mut self,
        generation: u64,
        prefix: String,
        result: Result<String, FetchError>,
    ) {
        match result {
            Ok(predicted) => {
                let outcome = CompletionOutcome::from_predicted(&predicted, &prefix);
                let fx = self.session.dispatch(
                    SessionEvent::ResponseReceived {
                        generation,
                        prefix,
                        outcome,
                    },
                    self.buffer.prefix_to_caret(),
                );
                self.apply(fx).await;
            }
            Err(err) => {
                let fx = self
                    .session
                    .dispatch(SessionEvent::RequestFailed { generation }, self.buffer.prefix_to_caret());
                if fx.contains(&SessionEffect::ReportFailure) {
                    warn!(
                        exercise = %self.ctx.exercise,
                        err = %err,
                        "completion request failed"
                    );
                    self.last_error = Some(err.to_string());
                }
                self.apply(fx).await;
            }
        }
    }

    // ─── Effects ─────────────────────────────────────────────────────────────

    async fn apply(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::ArmDebounce { generation } => {
                    self.pilot.arm_debounce(generation, self.debounce);
                }
                SessionEffect::BeginFetch { generation, prefix } => {
                    debug!(generation, chars = prefix.chars().count(), "fetch launched");
                    self.pilot.begin_fetch(generation, prefix);
                }
                SessionEffect::CancelFetch => self.pilot.supersede(),
                SessionEffect::ProposeCandidate { suffix } => {
                    debug!(chars = suffix.chars().count(), "suggestion proposed");
                    self.last_error = None;
                    let caret = self.buffer.caret();
                    self.recorder.proposed(&suffix, caret).await;
                    self.roll_checkpoint().await;
                }
                SessionEffect::AcceptCandidate { suffix } => {
                    self.buffer.insert_str(&suffix);
                    info!(chars = suffix.chars().count(), "suggestion accepted");
                    let caret = self.buffer.caret();
                    self.recorder.accepted(&suffix, caret).await;
                    self.roll_checkpoint().await;
                }
                SessionEffect::InsertFallback => {
                    let filler = self.filler.clone();
                    for ch in filler.chars() {
                        self.buffer.insert_char(ch);
                        self.log_typed(ch).await;
                    }
                }
                // Handled at the settle site, where the error detail lives.
                SessionEffect::ReportFailure => {}
            }
        }
    }

    /// The buffer changed; restart the suggestion cycle.
    async fn note_edit(&mut self) {
        let fx = self
            .session
            .dispatch(SessionEvent::Edit, self.buffer.prefix_to_caret());
        self.apply(fx).await;
    }

    /// Decompose the selection, if any, into single-character backspaces
    /// starting from its end. Returns whether anything was deleted.
    async fn delete_selection(&mut self) -> bool {
        let Some((start, end)) = self.buffer.take_selection() else {
            return false;
        };
        self.buffer.set_caret(end);
        for _ in start..end {
            if self.buffer.delete_backward().is_some() {
                self.log_deletion().await;
            }
        }
        true
    }

    // ─── Logging with checkpoint roll ────────────────────────────────────────

    async fn log_typed(&mut self, ch: char) {
        self.recorder.character_typed(ch, self.buffer.caret()).await;
        self.roll_checkpoint().await;
    }

    async fn log_deletion(&mut self) {
        self.recorder.deletion(self.buffer.caret()).await;
        self.roll_checkpoint().await;
    }

    async fn log_arrow(&mut self, dir: Direction) {
        self.recorder.arrow_key(dir, self.buffer.caret()).await;
        self.roll_checkpoint().await;
    }

    /// Snapshot the live buffer once enough entries have accumulated, so a
    /// truncated or doubted log can be re-anchored mid-stream.
    async fn roll_checkpoint(&mut self) {
        if self.recorder.checkpoint_due() {
            self.recorder
                .snapshot(self.buffer.text(), self.buffer.caret())
                .await;
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
