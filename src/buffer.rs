//! Live text buffer: content, caret, optional selection.

/// Caret movement directions, as logged in `arrow_key` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// The live buffer for one open exercise.
///
/// All offsets (caret, selection bounds) are character counts, not bytes.
/// The caret sits between characters, `0..=len`. Any mutation or caret
/// movement clears the selection; bulk operations (selection delete,
/// suggestion splice) are driven one step at a time by the engine so the
/// log keeps its one-entry-per-character invariant.
#[derive(Debug, Clone)]
pub struct Buffer {
    text: String,
    caret: usize,
    /// Half-open char range, always non-empty (`start < end`).
    selection: Option<(usize, usize)>,
}

impl Buffer {
    /// Open with starter content; the caret starts at the end of the text.
    pub fn from_text(text: &str) -> Self {
        let caret = text.chars().count();
        Self {
            text: text.to_string(),
            caret,
            selection: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Buffer text from the start up to the caret.
    pub fn prefix_to_caret(&self) -> &str {
        &self.text[..self.byte_at(self.caret)]
    }

    // ─── Mutation ────────────────────────────────────────────────────────────

    /// Insert one character at the caret and advance past it.
    pub fn insert_char(&mut self, ch: char) {
        self.selection = None;
        let at = self.byte_at(self.caret);
        self.text.insert(at, ch);
        self.caret += 1;
    }

    /// Splice a string at the caret (suggestion accept, filler). The caret
    /// advances past the inserted text. Returns the number of characters
    /// inserted.
    pub fn insert_str(&mut self, s: &str) -> usize {
        self.selection = None;
        let at = self.byte_at(self.caret);
        self.text.insert_str(at, s);
        let n = s.chars().count();
        self.caret += n;
        n
    }

    /// Remove the character before the caret. Returns it, or `None` when
    /// the caret is at the start.
    pub fn delete_backward(&mut self) -> Option<char> {
        self.selection = None;
        if self.caret == 0 {
            return None;
        }
        let at = self.byte_at(self.caret - 1);
        let removed = self.text.remove(at);
        self.caret -= 1;
        Some(removed)
    }

    /// Remove the character at the caret. Returns it, or `None` when the
    /// caret is at the end.
    pub fn delete_forward(&mut self) -> Option<char> {
        self.selection = None;
        if self.caret >= self.len_chars() {
            return None;
        }
        let at = self.byte_at(self.caret);
        Some(self.text.remove(at))
    }

    // ─── Caret movement ──────────────────────────────────────────────────────

    /// Place the caret at `pos`, clamped to the buffer. Clears the
    /// selection like any other caret movement.
    pub fn set_caret(&mut self, pos: usize) {
        self.selection = None;
        self.caret = pos.min(self.len_chars());
    }

    /// Move the caret one step. Up/down land on the same column when the
    /// target line is long enough, else on its end. Returns whether the
    /// caret actually moved.
    pub fn move_caret(&mut self, dir: Direction) -> bool {
        self.selection = None;
        let before = self.caret;
        match dir {
            Direction::Left => {
                if self.caret > 0 {
                    self.caret -= 1;
                }
            }
            Direction::Right => {
                if self.caret < self.len_chars() {
                    self.caret += 1;
                }
            }
            Direction::Up => {
                let (line, col) = self.caret_line_col();
                if line > 0 {
                    self.caret = self.line_col_to_pos(line - 1, col);
                }
            }
            Direction::Down => {
                let (line, col) = self.caret_line_col();
                if line + 1 < self.line_count() {
                    self.caret = self.line_col_to_pos(line + 1, col);
                }
            }
        }
        self.caret != before
    }

    /// Zero-based (line, column) of the caret.
    pub fn caret_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for (i, ch) in self.text.chars().enumerate() {
            if i == self.caret {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    // ─── Selection ───────────────────────────────────────────────────────────

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    /// Set a selection. Bounds are clamped to the buffer; an empty range
    /// clears instead.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let len = self.len_chars();
        let start = start.min(len);
        let end = end.min(len);
        self.selection = if start < end { Some((start, end)) } else { None };
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Take the selection for deletion, leaving none behind.
    pub fn take_selection(&mut self) -> Option<(usize, usize)> {
        self.selection.take()
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    /// Byte index of the character at char offset `pos` (or the end of the
    /// text for `pos == len`).
    fn byte_at(&self, pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(pos)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }

    fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// Char offset of (line, col), clamping col to the line length.
    fn line_col_to_pos(&self, line: usize, col: usize) -> usize {
        let mut start = 0;
        for (i, l) in self.text.split('\n').enumerate() {
            let len = l.chars().count();
            if i == line {
                return start + col.min(len);
            }
            start += len + 1;
        }
        self.len_chars()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_places_caret_at_end() {
        let buf = Buffer::from_text("def f():\n    pass\n");
        assert_eq!(buf.caret(), buf.len_chars());
        assert_eq!(buf.prefix_to_caret(), buf.text());
    }

    #[test]
    fn insert_and_delete_round_the_caret() {
        let mut buf = Buffer::from_text("");
        buf.insert_char('a');
        buf.insert_char('b');
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.caret(), 2);

        assert_eq!(buf.delete_backward(), Some('b'));
        assert_eq!(buf.text(), "a");
        assert_eq!(buf.caret(), 1);
        assert_eq!(buf.delete_backward(), Some('a'));
        assert_eq!(buf.delete_backward(), None);
    }

    #[test]
    fn delete_forward_keeps_caret_position() {
        let mut buf = Buffer::from_text("abc");
        buf.move_caret(Direction::Left);
        buf.move_caret(Direction::Left);
        assert_eq!(buf.caret(), 1);
        assert_eq!(buf.delete_forward(), Some('b'));
        assert_eq!(buf.text(), "ac");
        assert_eq!(buf.caret(), 1);
        assert_eq!(buf.delete_forward(), Some('c'));
        assert_eq!(buf.delete_forward(), None);
    }

    #[test]
    fn multibyte_characters_use_char_offsets() {
        let mut buf = Buffer::from_text("");
        buf.insert_char('é');
        buf.insert_char('日');
        buf.insert_char('!');
        assert_eq!(buf.caret(), 3);
        assert_eq!(buf.prefix_to_caret(), "é日!");
        assert_eq!(buf.delete_backward(), Some('!'));
        assert_eq!(buf.delete_backward(), Some('日'));
        assert_eq!(buf.text(), "é");
    }

    #[test]
    fn insert_str_advances_by_char_count() {
        let mut buf = Buffer::from_text("ab");
        assert_eq!(buf.insert_str("cd"), 2);
        assert_eq!(buf.text(), "abcd");
        assert_eq!(buf.caret(), 4);
    }

    #[test]
    fn vertical_movement_clamps_to_line_length() {
        let mut buf = Buffer::from_text("long line\nab\nlonger line");
        // Caret starts at the very end (col 11 of line 2).
        assert!(buf.move_caret(Direction::Up));
        let (line, col) = buf.caret_line_col();
        assert_eq!((line, col), (1, 2)); // clamped to "ab"

        assert!(buf.move_caret(Direction::Up));
        assert_eq!(buf.caret_line_col(), (0, 2)); // keeps the current column

        assert!(!buf.move_caret(Direction::Up), "already on the first line");
    }

    #[test]
    fn horizontal_movement_stops_at_bounds() {
        let mut buf = Buffer::from_text("a");
        assert!(!buf.move_caret(Direction::Right));
        assert!(buf.move_caret(Direction::Left));
        assert!(!buf.move_caret(Direction::Left));
        assert_eq!(buf.caret(), 0);
    }

    #[test]
    fn set_caret_clamps_to_length() {
        let mut buf = Buffer::from_text("abc");
        buf.set_caret(99);
        assert_eq!(buf.caret(), 3);
        buf.set_caret(1);
        assert_eq!(buf.caret(), 1);
        assert_eq!(buf.prefix_to_caret(), "a");
    }

    #[test]
    fn selection_is_cleared_by_any_mutation() {
        let mut buf = Buffer::from_text("abcdef");
        buf.set_selection(1, 3);
        assert_eq!(buf.selection(), Some((1, 3)));
        buf.insert_char('x');
        assert_eq!(buf.selection(), None);

        buf.set_selection(0, 2);
        buf.move_caret(Direction::Left);
        assert_eq!(buf.selection(), None);
    }

    #[test]
    fn empty_or_inverted_selection_clears() {
        let mut buf = Buffer::from_text("abc");
        buf.set_selection(2, 2);
        assert_eq!(buf.selection(), None);
        buf.set_selection(5, 9);
        assert_eq!(buf.selection(), None);
    }
}
