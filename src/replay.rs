//! Offline reconstruction of a buffer from its event log.
//!
//! Replays the mutating entries (`character_typed`, `deletion`,
//! `accepted_suggestion`) against an in-memory buffer, tagging every
//! character with where it came from. `current_code` checkpoints are
//! verified against the rebuilt text and then taken as authoritative, so
//! a log spanning several sittings of the same (exercise, assistant)
//! pair replays to the last sitting's screen. This powers the `check`
//! command and derives the provenance counters plain entry counts cannot
//! answer: how much suggested text was inserted, later deleted, and
//! survives.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::logging::{EventKind, LogRecord, LOG_HEADER};

/// Where a character in the reconstructed buffer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Seeded by a `current_code` snapshot, either the opening one or a
    /// later resynchronization.
    Starter,
    /// Inserted by a `character_typed` entry (includes the neutral filler).
    Typed,
    /// Inserted by an `accepted_suggestion` entry.
    Suggested,
}

/// Counters and final state derived from one log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Data entries processed (header excluded).
    pub entries: usize,
    pub proposed: usize,
    pub accepted: usize,
    pub typed: usize,
    pub deletions: usize,
    pub arrows: usize,
    pub checkpoints: usize,
    /// Checkpoints that disagreed with the rebuilt buffer before
    /// re-seeding it. A resumed sitting contributes one per reopen.
    pub checkpoint_mismatches: usize,
    /// Whether the log ends in a partial line, as an interrupted write
    /// leaves behind. Entries up to the tear are still replayed.
    pub torn_tail: bool,
    /// Characters spliced in by acceptances.
    pub suggested_inserted: usize,
    /// Characters of suggested origin later removed.
    pub suggested_deleted: usize,
    /// Characters of suggested origin still present at the end.
    pub suggested_surviving: usize,
    pub final_text: String,
    pub final_caret: usize,
}

/// Replay a complete log. Impossible positions and malformed lines are
/// hard errors, with one exception: a torn trailing line, as a crash
/// mid-append leaves behind, is noted in the summary and everything up
/// to it is replayed. A checkpoint that diverges from the reconstruction
/// is counted and re-seeds it, so a resumed sitting picks up from its
/// own opening snapshot.
pub fn replay(log_text: &str) -> Result<ReplaySummary> {
    let mut lines = log_text.lines();
    match lines.next() {
        Some(first) if first == LOG_HEADER => {}
        Some(first) => bail!("not an event log: unexpected header {first:?}"),
        None => bail!("empty log"),
    }
    let rows: Vec<&str> = lines.collect();
    let last_data = rows.iter().rposition(|l| !l.is_empty());

    let mut summary = ReplaySummary::default();
    let mut chars: Vec<(char, Origin)> = Vec::new();
    let mut caret = 0usize;

    for (idx, line) in rows.iter().copied().enumerate() {
        let line_no = idx + 2;
        if line.is_empty() {
            continue;
        }
        let Some(rec) = LogRecord::parse_line(line) else {
            if Some(idx) == last_data {
                // Interrupted mid-append, the sync never completed. The
                // log up to the tear is intact.
                summary.torn_tail = true;
                warn!(line = line_no, "torn trailing entry, replay stops here");
                break;
            }
            bail!("line {line_no}: malformed record");
        };
        summary.entries += 1;

        match rec.kind {
            EventKind::CurrentCode => {
                summary.checkpoints += 1;
                if summary.entries == 1 {
                    // The opening snapshot seeds the reconstruction.
                    chars = rec.info.chars().map(|c| (c, Origin::Starter)).collect();
                } else {
                    let rebuilt: String = chars.iter().map(|&(c, _)| c).collect();
                    if rebuilt != rec.info {
                        // A reopened sitting starts over from its own
                        // starter content, so the snapshot wins. Origins
                        // cannot be carried across the divergence.
                        summary.checkpoint_mismatches += 1;
                        warn!(
                            line = line_no,
                            "checkpoint diverges from rebuilt buffer, resynchronizing"
                        );
                        chars = rec.info.chars().map(|c| (c, Origin::Starter)).collect();
                    }
                }
                caret = rec.caret;
            }
            EventKind::CharacterTyped => {
                summary.typed += 1;
                let mut it = rec.info.chars();
                let (Some(ch), None) = (it.next(), it.next()) else {
                    bail!(
                        "line {line_no}: character_typed info must be one character, got {:?}",
                        rec.info
                    );
                };
                if rec.caret == 0 || rec.caret > chars.len() + 1 {
                    bail!(
                        "line {line_no}: insert lands at {} in a buffer of {}",
                        rec.caret,
                        chars.len()
                    );
                }
                // Caret is recorded after the insert, so the character sits
                // one position before it.
                chars.insert(rec.caret - 1, (ch, Origin::Typed));
                caret = rec.caret;
            }
            EventKind::Deletion => {
                summary.deletions += 1;
                // Caret after a removal is also the removed character's index.
                if rec.caret >= chars.len() {
                    bail!(
                        "line {line_no}: deletion at {} in a buffer of {}",
                        rec.caret,
                        chars.len()
                    );
                }
                let (_, origin) = chars.remove(rec.caret);
                if origin == Origin::Suggested {
                    summary.suggested_deleted += 1;
                }
                caret = rec.caret;
            }
            EventKind::AcceptedSuggestion => {
                summary.accepted += 1;
                let n = rec.info.chars().count();
                if n == 0 {
                    bail!("line {line_no}: empty accepted_suggestion");
                }
                // The splice ends at the recorded caret.
                if rec.caret < n || rec.caret - n > chars.len() {
                    bail!(
                        "line {line_no}: acceptance of {n} chars ending at {} in a buffer of {}",
                        rec.caret,
                        chars.len()
                    );
                }
                let at = rec.caret - n;
                for (i, ch) in rec.info.chars().enumerate() {
                    chars.insert(at + i, (ch, Origin::Suggested));
                }
                summary.suggested_inserted += n;
                caret = rec.caret;
            }
            EventKind::ProposedSuggestion => summary.proposed += 1,
            EventKind::ArrowKey => {
                summary.arrows += 1;
                caret = rec.caret;
            }
        }
    }

    summary.suggested_surviving = chars
        .iter()
        .filter(|&&(_, o)| o == Origin::Suggested)
        .count();
    summary.final_text = chars.iter().map(|&(c, _)| c).collect();
    summary.final_caret = caret;
    Ok(summary)
}

/// Read and replay a log file.
pub async fn replay_file(path: &Path) -> Result<ReplaySummary> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading event log {}", path.display()))?;
    replay(&text).with_context(|| format!("replaying {}", path.display()))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::escape_info;

    fn row(kind: &str, info: &str, caret: usize) -> String {
        format!(
            "2026-01-05T10:00:00+00:00\t{kind}\t{}\t{caret}",
            escape_info(info)
        )
    }

    fn log_of(rows: &[String]) -> String {
        let mut all = vec![LOG_HEADER.to_string()];
        all.extend_from_slice(rows);
        all.join("\n")
    }

    #[test]
    fn replays_pure_typing() {
        let log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "a", 1),
            row("character_typed", "b", 2),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.final_text, "ab");
        assert_eq!(s.final_caret, 2);
        assert_eq!(s.typed, 2);
        assert_eq!(s.suggested_surviving, 0);
        assert_eq!(s.checkpoints, 1);
    }

    #[test]
    fn starter_snapshot_seeds_the_buffer() {
        let log = log_of(&[
            row("current_code", "def f():\n", 9),
            row("character_typed", "x", 10),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.final_text, "def f():\nx");
        assert_eq!(s.final_caret, 10);
    }

    #[test]
    fn acceptance_then_deletion_attributes_origin() {
        let log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "a", 1),
            row("character_typed", "b", 2),
            row("proposed_suggestion", "cd", 2),
            row("accepted_suggestion", "cd", 4),
            row("deletion", "1", 3), // removes 'd' (suggested)
            row("deletion", "1", 2), // removes 'c' (suggested)
            row("deletion", "1", 1), // removes 'b' (typed)
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.final_text, "a");
        assert_eq!(s.proposed, 1);
        assert_eq!(s.accepted, 1);
        assert_eq!(s.suggested_inserted, 2);
        assert_eq!(s.suggested_deleted, 2);
        assert_eq!(s.suggested_surviving, 0);
        assert_eq!(s.deletions, 3);
    }

    #[test]
    fn surviving_suggested_text_is_counted() {
        let log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "a", 1),
            row("accepted_suggestion", "bc", 3),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.final_text, "abc");
        assert_eq!(s.suggested_surviving, 2);
    }

    #[test]
    fn caret_moves_redirect_later_edits() {
        let log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "a", 1),
            row("character_typed", "b", 2),
            row("character_typed", "c", 3),
            row("arrow_key", "left", 2),
            row("arrow_key", "left", 1),
            row("character_typed", "x", 2),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.final_text, "axbc");
        assert_eq!(s.arrows, 2);
        assert_eq!(s.final_caret, 2);
    }

    #[test]
    fn diverging_checkpoint_reseeds_the_reconstruction() {
        let log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "a", 1),
            row("current_code", "xy", 2), // disagrees with the rebuilt "a"
            row("character_typed", "z", 3),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.checkpoint_mismatches, 1);
        assert_eq!(s.final_text, "xyz");
        assert_eq!(s.final_caret, 3);
    }

    #[test]
    fn resumed_log_reseeds_mid_stream() {
        // Two sittings of the same pair share one file. The second opens
        // fresh from the starter, and its snapshot must win over the
        // text rebuilt from the first.
        let log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "h", 1),
            row("character_typed", "i", 2),
            row("current_code", "", 0),
            row("character_typed", "x", 1),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.final_text, "x");
        assert_eq!(s.final_caret, 1);
        assert_eq!(s.checkpoints, 2);
        assert_eq!(s.checkpoint_mismatches, 1);
        assert_eq!(s.typed, 3, "both sittings' typing is counted");
    }

    #[test]
    fn matching_checkpoint_is_clean() {
        let log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "a", 1),
            row("current_code", "a", 1),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.checkpoints, 2);
        assert_eq!(s.checkpoint_mismatches, 0);
    }

    #[test]
    fn matching_checkpoint_keeps_origins() {
        // Rolling checkpoints must not launder suggested text into
        // starter text.
        let log = log_of(&[
            row("current_code", "", 0),
            row("accepted_suggestion", "ab", 2),
            row("current_code", "ab", 2),
            row("deletion", "1", 1),
        ]);
        let s = replay(&log).unwrap();
        assert_eq!(s.checkpoint_mismatches, 0);
        assert_eq!(s.suggested_deleted, 1);
        assert_eq!(s.suggested_surviving, 1);
    }

    #[test]
    fn escaped_multiline_snapshot_round_trips() {
        let text = "line1\nline2\ttabbed";
        let log = log_of(&[row("current_code", text, 0)]);
        let s = replay(&log).unwrap();
        assert_eq!(s.final_text, text);
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(replay("").is_err());
        assert!(replay("not a header\nstuff").is_err());
    }

    #[test]
    fn malformed_line_is_reported_with_its_number() {
        // A valid entry follows the garbage, so this is mid-log damage
        // rather than a torn tail.
        let log = format!("{LOG_HEADER}\ngarbage\n{}", row("character_typed", "a", 1));
        let err = replay(&log).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn torn_trailing_entry_is_tolerated() {
        let mut log = log_of(&[
            row("current_code", "", 0),
            row("character_typed", "a", 1),
        ]);
        // Crash mid-append: the last line never got its final columns.
        log.push_str("\n2026-01-05T10:00:01+00:00\tcharacter_ty");
        let s = replay(&log).unwrap();
        assert!(s.torn_tail);
        assert_eq!(s.entries, 2);
        assert_eq!(s.final_text, "a");
        assert_eq!(s.final_caret, 1);
    }

    #[test]
    fn impossible_deletion_position_is_an_error() {
        let log = log_of(&[row("current_code", "ab", 2), row("deletion", "1", 5)]);
        assert!(replay(&log).is_err());
    }

    #[test]
    fn replay_is_idempotent() {
        let log = log_of(&[
            row("current_code", "seed", 4),
            row("character_typed", "!", 5),
            row("accepted_suggestion", "?!", 7),
            row("deletion", "1", 6),
        ]);
        let first = replay(&log).unwrap();
        let second = replay(&log).unwrap();
        assert_eq!(first, second);
    }
}
