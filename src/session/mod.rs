// SPDX-License-Identifier: MIT

//! Suggestion Session — the state machine owning what is currently
//! suggested, when to (re)request, and how acceptance, rejection, and
//! supersession are detected.
//!
//! The machine is pure: it consumes one event at a time through
//! [`SuggestionSession::dispatch`] and returns the effects the engine must
//! carry out (arm the debounce, launch or cancel a fetch, splice text, log
//! an entry). Clock and I/O concerns live in the engine, which keeps every
//! transition deterministic and directly testable.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::completion::CompletionOutcome;

// ─── States, candidates, events ──────────────────────────────────────────────

/// Lifecycle states; exactly one holds per open buffer at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing pending, nothing shown.
    Idle,
    /// Debounce timer armed; a further edit restarts it.
    PendingFetch,
    /// Request sent, cancellable.
    InFlight,
    /// Candidate available and displayed.
    Suggested,
    /// User explicitly rejected; no new fetch until the next edit.
    Suppressed,
}

/// A proposed continuation of the buffer text up to the caret at request
/// time. Valid only while that text is still exactly `prefix`.
#[derive(Debug, Clone)]
pub struct SuggestionCandidate {
    /// Buffer text up to the caret when the request was sent.
    pub prefix: String,
    /// Post-trim continuation, never empty.
    pub suffix: String,
    /// When the request was sent.
    pub requested_at: DateTime<Utc>,
}

/// The closed event set host input and fetch results are translated into
/// before they reach the machine.
#[derive(Debug)]
pub enum SessionEvent {
    /// The buffer changed (insert or delete, already applied).
    Edit,
    /// The debounce timer for `generation` fired.
    DebounceElapsed { generation: u64 },
    /// The fetch for `generation` settled; `prefix` is the text the request
    /// was made for.
    ResponseReceived {
        generation: u64,
        prefix: String,
        outcome: CompletionOutcome,
    },
    /// The fetch for `generation` failed (transport or HTTP status).
    RequestFailed { generation: u64 },
    /// The user pressed the accept key.
    AcceptRequested,
    /// The user pressed the reject key.
    RejectRequested,
}

/// What the engine must do after a transition, in order.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEffect {
    /// Start (or restart) the debounce timer for this generation,
    /// cancelling whatever timer or fetch was running.
    ArmDebounce { generation: u64 },
    /// Send the completion request for this generation.
    BeginFetch { generation: u64, prefix: String },
    /// Cancel any outstanding timer or fetch without arming a new one.
    CancelFetch,
    /// A candidate became current; log `proposed_suggestion`.
    ProposeCandidate { suffix: String },
    /// Splice the accepted suffix into the buffer at the caret and log
    /// `accepted_suggestion`.
    AcceptCandidate { suffix: String },
    /// Insert the neutral filler (explicit completion request with nothing
    /// to show); logged as ordinary typing.
    InsertFallback,
    /// Surface a transient fetch failure on the operator channel.
    ReportFailure,
}

// ─── State machine ───────────────────────────────────────────────────────────

/// Suggestion state machine for one open buffer.
///
/// `generation` stamps each debounce/fetch cycle. Every edit bumps it, so a
/// timer tick or response carrying an old stamp is ignored no matter when
/// it arrives — including out of order. The prefix recorded with a request
/// must additionally equal the live prefix at receipt; that check is the
/// authoritative staleness guard and also catches caret movement, which
/// does not bump the generation.
#[derive(Debug, Default)]
pub struct SuggestionSession {
    state: SessionState,
    generation: u64,
    candidate: Option<SuggestionCandidate>,
    /// Set when a fetch is launched; becomes the candidate's request time.
    fetch_started: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl SuggestionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current candidate, if any. Whether it is visible against the live
    /// buffer is the overlay's concern; the candidate is kept even while
    /// hidden.
    pub fn candidate(&self) -> Option<&SuggestionCandidate> {
        self.candidate.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Single entry point: apply one event given the live prefix-to-caret,
    /// returning the effects to carry out in order.
    pub fn dispatch(&mut self, event: SessionEvent, live_prefix: &str) -> Vec<SessionEffect> {
        match event {
            SessionEvent::Edit => self.on_edit(),
            SessionEvent::DebounceElapsed { generation } => {
                self.on_debounce(generation, live_prefix)
            }
            SessionEvent::ResponseReceived {
                generation,
                prefix,
                outcome,
            } => self.on_response(generation, prefix, outcome, live_prefix),
            SessionEvent::RequestFailed { generation } => self.on_failure(generation),
            SessionEvent::AcceptRequested => self.on_accept(live_prefix),
            SessionEvent::RejectRequested => self.on_reject(),
        }
    }

    /// Any edit invalidates whatever was pending, shown, or suppressed and
    /// starts a fresh debounce cycle.
    fn on_edit(&mut self) -> Vec<SessionEffect> {
        self.generation += 1;
        self.candidate = None;
        self.fetch_started = None;
        self.state = SessionState::PendingFetch;
        vec![SessionEffect::ArmDebounce {
            generation: self.generation,
        }]
    }

    fn on_debounce(&mut self, generation: u64, live_prefix: &str) -> Vec<SessionEffect> {
        if generation != self.generation || self.state != SessionState::PendingFetch {
            // A timer from a superseded cycle.
            return Vec::new();
        }
        self.state = SessionState::InFlight;
        self.fetch_started = Some(Utc::now());
        vec![SessionEffect::BeginFetch {
            generation,
            prefix: live_prefix.to_string(),
        }]
    }

    fn on_response(
        &mut self,
        generation: u64,
        prefix: String,
        outcome: CompletionOutcome,
        live_prefix: &str,
    ) -> Vec<SessionEffect> {
        if generation != self.generation || self.state != SessionState::InFlight {
            debug!(
                generation,
                current = self.generation,
                "dropping superseded completion response"
            );
            return Vec::new();
        }
        if prefix != live_prefix {
            // Same generation, so no edit happened — the caret moved away.
            debug!("dropping stale completion response: prefix diverged");
            self.fetch_started = None;
            self.state = SessionState::Idle;
            return Vec::new();
        }
        match outcome {
            CompletionOutcome::Suffix(suffix) => {
                let requested_at = self.fetch_started.take().unwrap_or_else(Utc::now);
                self.candidate = Some(SuggestionCandidate {
                    prefix,
                    suffix: suffix.clone(),
                    requested_at,
                });
                self.state = SessionState::Suggested;
                vec![SessionEffect::ProposeCandidate { suffix }]
            }
            CompletionOutcome::Empty => {
                // Nothing to show and nothing to log; an explicit accept
                // from here takes the filler path.
                self.fetch_started = None;
                self.state = SessionState::Idle;
                Vec::new()
            }
            CompletionOutcome::Failure(_) => self.on_failure(generation),
        }
    }

    fn on_failure(&mut self, generation: u64) -> Vec<SessionEffect> {
        if generation != self.generation || self.state != SessionState::InFlight {
            // Failures of superseded requests (including aborts) are not
            // user-visible.
            return Vec::new();
        }
        self.fetch_started = None;
        self.state = SessionState::Idle;
        vec![SessionEffect::ReportFailure]
    }

    /// Accept: splice when the candidate still leads to the caret, neutral
    /// filler otherwise. Both paths re-enter the debounce cycle — the
    /// splice is itself an edit, and the filler must reschedule a fetch.
    fn on_accept(&mut self, live_prefix: &str) -> Vec<SessionEffect> {
        let valid = self.state == SessionState::Suggested
            && self
                .candidate
                .as_ref()
                .is_some_and(|c| c.prefix == live_prefix);

        self.generation += 1;
        self.fetch_started = None;
        self.state = SessionState::PendingFetch;

        if valid {
            let suffix = self
                .candidate
                .take()
                .map(|c| c.suffix)
                .unwrap_or_default();
            vec![
                SessionEffect::AcceptCandidate { suffix },
                SessionEffect::ArmDebounce {
                    generation: self.generation,
                },
            ]
        } else {
            self.candidate = None;
            vec![
                SessionEffect::InsertFallback,
                SessionEffect::ArmDebounce {
                    generation: self.generation,
                },
            ]
        }
    }

    fn on_reject(&mut self) -> Vec<SessionEffect> {
        self.generation += 1;
        self.candidate = None;
        self.fetch_started = None;
        self.state = SessionState::Suppressed;
        vec![SessionEffect::CancelFetch]
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn suffix(s: &str) -> CompletionOutcome {
        CompletionOutcome::Suffix(s.to_string())
    }

    /// Drive a fresh session to `InFlight` for the given prefix.
    fn in_flight(prefix: &str) -> SuggestionSession {
        let mut s = SuggestionSession::new();
        s.dispatch(SessionEvent::Edit, prefix);
        let g = s.generation();
        s.dispatch(SessionEvent::DebounceElapsed { generation: g }, prefix);
        assert_eq!(s.state(), SessionState::InFlight);
        s
    }

    #[test]
    fn edit_arms_debounce_with_fresh_generation() {
        let mut s = SuggestionSession::new();
        let fx = s.dispatch(SessionEvent::Edit, "a");
        assert_eq!(fx, vec![SessionEffect::ArmDebounce { generation: 1 }]);
        assert_eq!(s.state(), SessionState::PendingFetch);

        // A second edit before the timer fires restarts the cycle.
        let fx = s.dispatch(SessionEvent::Edit, "ab");
        assert_eq!(fx, vec![SessionEffect::ArmDebounce { generation: 2 }]);
        assert_eq!(s.state(), SessionState::PendingFetch);
    }

    #[test]
    fn stale_timer_is_ignored() {
        let mut s = SuggestionSession::new();
        s.dispatch(SessionEvent::Edit, "a");
        s.dispatch(SessionEvent::Edit, "ab");
        // Timer from the first cycle fires late.
        let fx = s.dispatch(SessionEvent::DebounceElapsed { generation: 1 }, "ab");
        assert!(fx.is_empty());
        assert_eq!(s.state(), SessionState::PendingFetch);
    }

    #[test]
    fn debounce_launches_fetch_with_live_prefix() {
        let mut s = SuggestionSession::new();
        s.dispatch(SessionEvent::Edit, "a");
        let fx = s.dispatch(SessionEvent::DebounceElapsed { generation: 1 }, "ab");
        assert_eq!(
            fx,
            vec![SessionEffect::BeginFetch {
                generation: 1,
                prefix: "ab".to_string()
            }]
        );
        assert_eq!(s.state(), SessionState::InFlight);
    }

    #[test]
    fn matching_response_stores_candidate_and_proposes() {
        let mut s = in_flight("ab");
        let fx = s.dispatch(
            SessionEvent::ResponseReceived {
                generation: s.generation(),
                prefix: "ab".to_string(),
                outcome: suffix("cd"),
            },
            "ab",
        );
        assert_eq!(
            fx,
            vec![SessionEffect::ProposeCandidate {
                suffix: "cd".to_string()
            }]
        );
        assert_eq!(s.state(), SessionState::Suggested);
        let cand = s.candidate().unwrap();
        assert_eq!(cand.prefix, "ab");
        assert_eq!(cand.suffix, "cd");
    }

    #[test]
    fn superseded_response_is_dropped_silently() {
        let mut s = in_flight("x");
        let old = s.generation();
        // User types before the response lands.
        s.dispatch(SessionEvent::Edit, "xy");

        let fx = s.dispatch(
            SessionEvent::ResponseReceived {
                generation: old,
                prefix: "x".to_string(),
                outcome: suffix("123"),
            },
            "xy",
        );
        assert!(fx.is_empty(), "no proposal for a superseded response");
        assert!(s.candidate().is_none());
        // The new cycle is untouched.
        assert_eq!(s.state(), SessionState::PendingFetch);
    }

    #[test]
    fn diverged_prefix_drops_response_even_with_current_generation() {
        // Caret movement does not bump the generation, so the prefix check
        // must catch it.
        let mut s = in_flight("ab");
        let fx = s.dispatch(
            SessionEvent::ResponseReceived {
                generation: s.generation(),
                prefix: "ab".to_string(),
                outcome: suffix("cd"),
            },
            "a",
        );
        assert!(fx.is_empty());
        assert!(s.candidate().is_none());
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn empty_outcome_leaves_idle_without_candidate() {
        let mut s = in_flight("ab");
        let fx = s.dispatch(
            SessionEvent::ResponseReceived {
                generation: s.generation(),
                prefix: "ab".to_string(),
                outcome: CompletionOutcome::Empty,
            },
            "ab",
        );
        assert!(fx.is_empty());
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.candidate().is_none());
    }

    #[test]
    fn failure_of_current_request_is_reported_once() {
        let mut s = in_flight("ab");
        let fx = s.dispatch(
            SessionEvent::RequestFailed {
                generation: s.generation(),
            },
            "ab",
        );
        assert_eq!(fx, vec![SessionEffect::ReportFailure]);
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn failure_of_superseded_request_is_invisible() {
        let mut s = in_flight("ab");
        let old = s.generation();
        s.dispatch(SessionEvent::Edit, "abc");
        let fx = s.dispatch(SessionEvent::RequestFailed { generation: old }, "abc");
        assert!(fx.is_empty());
    }

    #[test]
    fn accept_splices_and_rearms_when_prefix_still_matches() {
        let mut s = in_flight("ab");
        s.dispatch(
            SessionEvent::ResponseReceived {
                generation: s.generation(),
                prefix: "ab".to_string(),
                outcome: suffix("cd"),
            },
            "ab",
        );

        let fx = s.dispatch(SessionEvent::AcceptRequested, "ab");
        assert_eq!(
            fx,
            vec![
                SessionEffect::AcceptCandidate {
                    suffix: "cd".to_string()
                },
                SessionEffect::ArmDebounce {
                    generation: s.generation()
                },
            ]
        );
        assert_eq!(s.state(), SessionState::PendingFetch);
        assert!(s.candidate().is_none());
    }

    #[test]
    fn accept_with_moved_caret_falls_back_to_filler() {
        let mut s = in_flight("ab");
        s.dispatch(
            SessionEvent::ResponseReceived {
                generation: s.generation(),
                prefix: "ab".to_string(),
                outcome: suffix("cd"),
            },
            "ab",
        );

        // Caret moved left; the candidate no longer leads to it.
        let fx = s.dispatch(SessionEvent::AcceptRequested, "a");
        assert_eq!(fx[0], SessionEffect::InsertFallback);
        assert!(matches!(fx[1], SessionEffect::ArmDebounce { .. }));
        assert!(s.candidate().is_none());
        assert_eq!(s.state(), SessionState::PendingFetch);
    }

    #[test]
    fn accept_with_nothing_available_falls_back_to_filler() {
        let mut s = SuggestionSession::new();
        let fx = s.dispatch(SessionEvent::AcceptRequested, "");
        assert_eq!(fx[0], SessionEffect::InsertFallback);
        assert!(matches!(fx[1], SessionEffect::ArmDebounce { .. }));
        assert_eq!(s.state(), SessionState::PendingFetch);
    }

    #[test]
    fn accept_during_flight_cancels_it_via_new_generation() {
        let mut s = in_flight("ab");
        let old = s.generation();
        let fx = s.dispatch(SessionEvent::AcceptRequested, "ab");
        assert_eq!(fx[0], SessionEffect::InsertFallback);
        assert!(s.generation() > old);

        // The old response now lands on a bumped generation.
        let late = s.dispatch(
            SessionEvent::ResponseReceived {
                generation: old,
                prefix: "ab".to_string(),
                outcome: suffix("cd"),
            },
            "ab    ",
        );
        assert!(late.is_empty());
    }

    #[test]
    fn reject_suppresses_until_next_edit() {
        let mut s = in_flight("ab");
        let fx = s.dispatch(SessionEvent::RejectRequested, "ab");
        assert_eq!(fx, vec![SessionEffect::CancelFetch]);
        assert_eq!(s.state(), SessionState::Suppressed);
        assert!(s.candidate().is_none());

        // Debounce/response from the cancelled cycle stay dead.
        let fx = s.dispatch(SessionEvent::DebounceElapsed { generation: 1 }, "ab");
        assert!(fx.is_empty());

        // The next edit clears suppression.
        let fx = s.dispatch(SessionEvent::Edit, "abc");
        assert!(matches!(fx[0], SessionEffect::ArmDebounce { .. }));
        assert_eq!(s.state(), SessionState::PendingFetch);
    }

    #[test]
    fn reject_discards_visible_candidate() {
        let mut s = in_flight("ab");
        s.dispatch(
            SessionEvent::ResponseReceived {
                generation: s.generation(),
                prefix: "ab".to_string(),
                outcome: suffix("cd"),
            },
            "ab",
        );
        assert!(s.candidate().is_some());

        s.dispatch(SessionEvent::RejectRequested, "ab");
        assert!(s.candidate().is_none());
        assert_eq!(s.state(), SessionState::Suppressed);
    }
}
