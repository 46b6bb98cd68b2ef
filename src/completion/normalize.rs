// SPDX-License-Identifier: MIT

//! Boundary normalization of completion responses.
//!
//! The server's predicted text is reduced to a candidate suffix here,
//! before anything reaches the state machine: slice off the prefix by
//! character count, then apply the leading-blank trim. The trim is a
//! heuristic tuned for Python-style indentation in the study exercises and
//! is preserved literally — analysis scripts depend on byte-exact logged
//! suggestion text.

use super::client::FetchError;

/// Completion result in one tagged type, as the state machine consumes it.
#[derive(Debug)]
pub enum CompletionOutcome {
    /// Non-empty candidate suffix, post-trim.
    Suffix(String),
    /// The response reduced to nothing after trimming.
    Empty,
    /// Transport or HTTP failure. Aborted requests never surface here.
    Failure(FetchError),
}

impl CompletionOutcome {
    /// Normalize a successful response body for `prefix`.
    pub fn from_predicted(predicted: &str, prefix: &str) -> CompletionOutcome {
        let suffix = derive_suffix(predicted, prefix);
        if suffix.is_empty() {
            CompletionOutcome::Empty
        } else {
            CompletionOutcome::Suffix(suffix)
        }
    }
}

/// Reduce raw predicted text to the suffix relative to `prefix`.
///
/// The server is expected to echo the prefix and continue it; the slice is
/// taken at the prefix's character length whether or not the echo actually
/// matches. If the slice then starts with a blank (space or tab) while the
/// prefix's current line is non-blank, exactly one leading blank is
/// dropped.
pub fn derive_suffix(predicted: &str, prefix: &str) -> String {
    let skip = prefix.chars().count();
    let mut suffix: String = predicted.chars().skip(skip).collect();

    if let Some(first) = suffix.chars().next() {
        if (first == ' ' || first == '\t') && !current_line(prefix).trim().is_empty() {
            suffix.drain(..first.len_utf8());
        }
    }
    suffix
}

/// Text of the prefix since the last line break.
fn current_line(prefix: &str) -> &str {
    prefix.rsplit('\n').next().unwrap_or_default()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
