//! Log entry model and the tab-separated on-disk format.
//!
//! One line per entry, four columns:
//! `timestamp\taction_type\taction_info\tcaret_index`. The `action_info`
//! column may carry arbitrary buffer text, so tab, newline, and carriage
//! return inside it are escaped as literal two-character sequences before
//! writing. Analysis tooling reads these files with a plain tab split.

use chrono::Utc;

/// Fixed header row, written once when a log file is created.
pub const LOG_HEADER: &str = "timestamp\taction_type\taction_info\tcaret_index";

// ─── Event kinds ─────────────────────────────────────────────────────────────

/// Action type of one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Full-buffer snapshot: on exercise open and as a periodic checkpoint.
    CurrentCode,
    /// A suggestion became visible; info carries the post-trim suffix.
    ProposedSuggestion,
    /// A suggestion was spliced into the buffer; info carries the suffix.
    AcceptedSuggestion,
    /// One character inserted by the user; info carries the character.
    CharacterTyped,
    /// One character removed; info carries the per-entry count, always `"1"`.
    Deletion,
    /// Caret movement; info carries the direction.
    ArrowKey,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CurrentCode => "current_code",
            EventKind::ProposedSuggestion => "proposed_suggestion",
            EventKind::AcceptedSuggestion => "accepted_suggestion",
            EventKind::CharacterTyped => "character_typed",
            EventKind::Deletion => "deletion",
            EventKind::ArrowKey => "arrow_key",
        }
    }

    pub fn from_str(s: &str) -> Option<EventKind> {
        match s {
            "current_code" => Some(EventKind::CurrentCode),
            "proposed_suggestion" => Some(EventKind::ProposedSuggestion),
            "accepted_suggestion" => Some(EventKind::AcceptedSuggestion),
            "character_typed" => Some(EventKind::CharacterTyped),
            "deletion" => Some(EventKind::Deletion),
            "arrow_key" => Some(EventKind::ArrowKey),
            _ => None,
        }
    }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One event log entry.
///
/// `caret` is the caret position after the action, in characters. For a
/// deletion this is also the index of the removed character, which holds for
/// both backspace and forward delete.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// RFC-3339 UTC timestamp, assigned when the record is built.
    pub timestamp: String,
    pub kind: EventKind,
    /// Raw (unescaped) action info.
    pub info: String,
    pub caret: usize,
}

impl LogRecord {
    pub fn new(kind: EventKind, info: impl Into<String>, caret: usize) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind,
            info: info.into(),
            caret,
        }
    }

    /// Render as one tab-separated line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.timestamp,
            self.kind.as_str(),
            escape_info(&self.info),
            self.caret
        )
    }

    /// Parse one data line. Returns `None` on a malformed field; callers
    /// attach file/line context.
    pub fn parse_line(line: &str) -> Option<LogRecord> {
        let mut cols = line.splitn(4, '\t');
        let timestamp = cols.next()?.to_string();
        let kind = EventKind::from_str(cols.next()?)?;
        let info = unescape_info(cols.next()?);
        let caret = cols.next()?.parse().ok()?;
        Some(LogRecord {
            timestamp,
            kind,
            info,
            caret,
        })
    }
}

// ─── Field escaping ──────────────────────────────────────────────────────────

/// Escape column/line separators inside `action_info`: tab, newline, and
/// carriage return become the literal two-character sequences `\t`, `\n`,
/// `\r`. Backslash itself is not escaped; the consumers only rewrite these
/// three pairs.
pub fn escape_info(raw: &str) -> String {
    raw.replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Reverse of [`escape_info`]. Backslash pairs other than `\t`/`\n`/`\r`
/// are kept verbatim.
pub fn unescape_info(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────────
