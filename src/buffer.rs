//! Capacity-bounded text buffer with a cursor.
//!
//! The buffer never holds more than `capacity` bytes. Every mutating
//! operation checks the bound first and leaves the buffer untouched when the
//! edit would not fit. The cursor is a byte offset that always sits on a
//! `char` boundary.

/// Default capacity: 1 MiB.
pub const DEFAULT_CAPACITY: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("text of {needed} bytes exceeds buffer capacity of {capacity} bytes")]
pub struct CapacityExceeded {
    pub needed: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: String,
    capacity: usize,
    cursor: usize,
    /// Column (in chars) that vertical movement tries to return to.
    goal_column: Option<usize>,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TextBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::new(),
            capacity,
            cursor: 0,
            goal_column: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Byte offset of the cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the whole content, moving the cursor to the start.
    ///
    /// Fails without touching the buffer if `text` does not fit.
    pub fn replace(&mut self, text: String) -> Result<(), CapacityExceeded> {
        if text.len() > self.capacity {
            return Err(CapacityExceeded {
                needed: text.len(),
                capacity: self.capacity,
            });
        }
        self.text = text;
        self.cursor = 0;
        self.goal_column = None;
        Ok(())
    }

    // --- Editing ---

    /// Insert a character at the cursor. Returns false if it does not fit.
    pub fn insert_char(&mut self, c: char) -> bool {
        let mut tmp = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut tmp))
    }

    /// Insert a string at the cursor, all or nothing.
    pub fn insert_str(&mut self, s: &str) -> bool {
        if s.is_empty() || self.text.len() + s.len() > self.capacity {
            return false;
        }
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
        self.goal_column = None;
        true
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) -> bool {
        let Some(prev) = self.prev_boundary(self.cursor) else {
            return false;
        };
        self.text.replace_range(prev..self.cursor, "");
        self.cursor = prev;
        self.goal_column = None;
        true
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) -> bool {
        let Some(next) = self.next_boundary(self.cursor) else {
            return false;
        };
        self.text.replace_range(self.cursor..next, "");
        self.goal_column = None;
        true
    }

    // --- Movement ---

    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary(self.cursor) {
            self.cursor = prev;
        }
        self.goal_column = None;
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.next_boundary(self.cursor) {
            self.cursor = next;
        }
        self.goal_column = None;
    }

    pub fn move_line_start(&mut self) {
        self.cursor = self.line_start(self.cursor);
        self.goal_column = None;
    }

    pub fn move_line_end(&mut self) {
        self.cursor = self.line_end(self.cursor);
        self.goal_column = None;
    }

    pub fn move_doc_start(&mut self) {
        self.cursor = 0;
        self.goal_column = None;
    }

    pub fn move_doc_end(&mut self) {
        self.cursor = self.text.len();
        self.goal_column = None;
    }

    pub fn move_up(&mut self, lines: usize) {
        let column = self.goal_column.unwrap_or_else(|| self.cursor_position().1);
        let mut start = self.line_start(self.cursor);
        for _ in 0..lines {
            if start == 0 {
                break;
            }
            start = self.line_start(start - 1);
        }
        self.cursor = self.offset_in_line(start, column);
        self.goal_column = Some(column);
    }

    pub fn move_down(&mut self, lines: usize) {
        let column = self.goal_column.unwrap_or_else(|| self.cursor_position().1);
        let mut start = self.line_start(self.cursor);
        for _ in 0..lines {
            let end = self.line_end(start);
            if end == self.text.len() {
                break;
            }
            start = end + 1;
        }
        self.cursor = self.offset_in_line(start, column);
        self.goal_column = Some(column);
    }

    // --- Queries ---

    /// Zero-based `(line, column)` of the cursor, column counted in chars.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before = &self.text[..self.cursor];
        let line = before.matches('\n').count();
        let column = before[self.line_start(self.cursor)..].chars().count();
        (line, column)
    }

    /// Text between the start of the cursor's line and the cursor.
    pub fn line_before_cursor(&self) -> &str {
        &self.text[self.line_start(self.cursor)..self.cursor]
    }

    /// Number of lines; an empty buffer has one empty line.
    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    /// Iterate over lines without their terminators, including a trailing
    /// empty line after a final `\n`.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text[..pos].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.text[pos..].find('\n').map_or(self.text.len(), |i| pos + i)
    }

    /// Byte offset of `column` chars into the line starting at `start`,
    /// clamped to the line end.
    fn offset_in_line(&self, start: usize, column: usize) -> usize {
        let end = self.line_end(start);
        self.text[start..end]
            .char_indices()
            .nth(column)
            .map_or(end, |(i, _)| start + i)
    }

    fn prev_boundary(&self, pos: usize) -> Option<usize> {
        self.text[..pos].char_indices().next_back().map(|(i, _)| i)
    }

    fn next_boundary(&self, pos: usize) -> Option<usize> {
        self.text[pos..].chars().next().map(|c| pos + c.len_utf8())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> TextBuffer {
        let mut buf = TextBuffer::new(64);
        buf.replace(text.to_string()).unwrap();
        buf
    }

    #[test]
    fn insert_respects_capacity() {
        let mut buf = TextBuffer::new(4);
        assert!(buf.insert_str("abc"));
        assert!(!buf.insert_str("de"));
        assert_eq!(buf.text(), "abc");
        assert!(buf.insert_char('d'));
        assert!(!buf.insert_char('e'));
        assert_eq!(buf.text(), "abcd");
    }

    #[test]
    fn multibyte_char_must_fit_entirely() {
        let mut buf = TextBuffer::new(3);
        assert!(buf.insert_char('a'));
        // '∀' is three bytes
        assert!(!buf.insert_char('∀'));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn replace_too_large_leaves_buffer_unchanged() {
        let mut buf = buffer("keep");
        let err = buf.replace("x".repeat(65)).unwrap_err();
        assert_eq!(err.capacity, 64);
        assert_eq!(err.needed, 65);
        assert_eq!(buf.text(), "keep");
    }

    #[test]
    fn backspace_and_delete_on_char_boundaries() {
        let mut buf = buffer("a∀b");
        buf.move_doc_end();
        buf.move_left();
        assert!(buf.backspace());
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.cursor(), 1);
        assert!(buf.delete());
        assert_eq!(buf.text(), "a");
        assert!(!buf.delete());
        buf.move_doc_start();
        assert!(!buf.backspace());
    }

    #[test]
    fn vertical_movement_keeps_goal_column() {
        let mut buf = buffer("long line\nab\nanother line");
        buf.move_right();
        buf.move_right();
        buf.move_right();
        buf.move_right();
        buf.move_down(1);
        assert_eq!(buf.cursor_position(), (1, 2));
        buf.move_down(1);
        assert_eq!(buf.cursor_position(), (2, 4));
        buf.move_up(5);
        assert_eq!(buf.cursor_position(), (0, 4));
    }

    #[test]
    fn line_bounds() {
        let mut buf = buffer("one\ntwo\n");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.lines().collect::<Vec<_>>(), vec!["one", "two", ""]);
        buf.move_down(1);
        buf.move_line_end();
        assert_eq!(buf.cursor_position(), (1, 3));
        buf.move_line_start();
        assert_eq!(buf.cursor_position(), (1, 0));
        buf.move_down(10);
        assert_eq!(buf.cursor_position(), (2, 0));
    }

    #[test]
    fn newline_insertion_splits_line() {
        let mut buf = buffer("ab");
        buf.move_right();
        assert!(buf.insert_char('\n'));
        assert_eq!(buf.text(), "a\nb");
        assert_eq!(buf.cursor_position(), (1, 0));
    }
}
