//! Derived overlay view of the current suggestion.
//!
//! The overlay is non-authoritative: it is recomputed from the buffer and
//! the session each frame, never stored. Hiding is therefore free and
//! destroys nothing — the candidate stays in the session and the ghost
//! text reappears if the caret moves back to the matching position.

use crate::buffer::Buffer;
use crate::session::SuggestionSession;

/// Ghost text to render inline at the caret: visually distinguished,
/// non-editable, never part of the buffer content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayView<'a> {
    /// Char offset where the ghost text starts (the caret).
    pub at: usize,
    /// The candidate suffix.
    pub text: &'a str,
}

/// Compute the overlay for the current frame.
///
/// Visible only when all three hold: no active selection, the candidate's
/// prefix equals the live text up to the caret, and the suffix is
/// non-empty. Otherwise `None`.
pub fn overlay_view<'a>(
    buffer: &Buffer,
    session: &'a SuggestionSession,
) -> Option<OverlayView<'a>> {
    if buffer.selection().is_some() {
        return None;
    }
    let cand = session.candidate()?;
    if cand.suffix.is_empty() || cand.prefix != buffer.prefix_to_caret() {
        return None;
    }
    Some(OverlayView {
        at: buffer.caret(),
        text: &cand.suffix,
    })
}

/// The fixed-width neutral filler inserted when the user explicitly
/// requests completion and no suffix is available.
pub fn neutral_filler(width: usize) -> String {
    " ".repeat(width)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
