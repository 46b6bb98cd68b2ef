// SPDX-License-Identifier: MIT

//! Debounce and fetch tasks for the suggestion cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::EngineEvent;
use crate::completion::CompletionBackend;

/// Runs at most one timer or fetch task at a time, stamping every event it
/// posts back with the generation it was launched for.
///
/// Superseding is a `JoinHandle::abort`: idempotent and safe on tasks that
/// already finished. The engine ignores events carrying an old stamp, so
/// an abort that loses the race against completion changes nothing.
pub(crate) struct FetchPilot {
    backend: Arc<dyn CompletionBackend>,
    events: mpsc::Sender<EngineEvent>,
    task: Option<JoinHandle<()>>,
}

impl FetchPilot {
    pub(crate) fn new(
        backend: Arc<dyn CompletionBackend>,
        events: mpsc::Sender<EngineEvent>,
    ) -> Self {
        Self {
            backend,
            events,
            task: None,
        }
    }

    /// Start the debounce timer for `generation`, superseding any running
    /// timer or fetch.
    pub(crate) fn arm_debounce(&mut self, generation: u64, delay: Duration) {
        self.supersede();
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A closed channel means the engine is gone; nothing to do.
            let _ = events
                .send(EngineEvent::DebounceElapsed { generation })
                .await;
        }));
    }

    /// Launch the completion request for `generation`, superseding the
    /// timer that triggered it.
    pub(crate) fn begin_fetch(&mut self, generation: u64, prefix: String) {
        self.supersede();
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            let result = backend.complete(&prefix).await;
            let _ = events
                .send(EngineEvent::FetchSettled {
                    generation,
                    prefix,
                    result,
                })
                .await;
        }));
    }

    /// Abort whatever is running, if anything.
    pub(crate) fn supersede(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for FetchPilot {
    fn drop(&mut self) {
        self.supersede();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
