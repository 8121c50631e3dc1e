// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Editable draft text with a char-offset cursor.

use unicode_width::UnicodeWidthStr;

use crate::mention::byte_offset;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    text: String,
    /// Char offset
    cursor: usize,
}

impl EditBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Replace the contents, e.g. after the controller spliced out a mention.
    pub fn set(&mut self, text: &str, cursor: usize) {
        self.text = text.to_string();
        self.cursor = cursor.min(self.len_chars());
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, c: char) {
        let at = byte_offset(&self.text, self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    /// Delete the char before the cursor. Returns false at the start.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let start = byte_offset(&self.text, self.cursor - 1);
        let end = byte_offset(&self.text, self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= 1;
        true
    }

    /// Delete the char under the cursor. Returns false at the end.
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.len_chars() {
            return false;
        }
        let start = byte_offset(&self.text, self.cursor);
        let end = byte_offset(&self.text, self.cursor + 1);
        self.text.replace_range(start..end, "");
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len_chars());
    }

    /// Move to the start of the current line.
    pub fn move_home(&mut self) {
        let before: Vec<char> = self.text.chars().take(self.cursor).collect();
        self.cursor = before
            .iter()
            .rposition(|c| *c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
    }

    /// Move to the end of the current line.
    pub fn move_end(&mut self) {
        let rest = self.text.chars().skip(self.cursor).take_while(|c| *c != '\n').count();
        self.cursor += rest;
    }

    /// Line index and display column of the cursor.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before = &self.text[..byte_offset(&self.text, self.cursor)];
        let line = before.matches('\n').count();
        let current = before.rsplit('\n').next().unwrap_or("");
        (line, UnicodeWidthStr::width(current))
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> EditBuffer {
        let mut b = EditBuffer::default();
        b.set(text, text.chars().count());
        b
    }

    #[test]
    fn test_insert_in_middle() {
        let mut b = buffer("fix @pp");
        b.set("fix @pp", 5);
        b.insert_char('A');
        assert_eq!(b.text(), "fix @App");
        assert_eq!(b.cursor(), 6);
    }

    #[test]
    fn test_backspace_multibyte() {
        let mut b = buffer("héé");
        assert!(b.backspace());
        assert_eq!(b.text(), "hé");
        assert_eq!(b.cursor(), 2);

        b.set("x", 0);
        assert!(!b.backspace());
    }

    #[test]
    fn test_delete_at_end_is_noop() {
        let mut b = buffer("ab");
        assert!(!b.delete());
        b.move_left();
        assert!(b.delete());
        assert_eq!(b.text(), "a");
    }

    #[test]
    fn test_home_end_per_line() {
        let mut b = buffer("first\nsecond");
        b.move_home();
        assert_eq!(b.cursor(), 6);
        b.move_end();
        assert_eq!(b.cursor(), 12);

        b.set("first\nsecond", 2);
        b.move_end();
        assert_eq!(b.cursor(), 5);
    }

    #[test]
    fn test_cursor_line_col() {
        let mut b = buffer("one\ntwo @x");
        assert_eq!(b.cursor_line_col(), (1, 6));

        b.insert_newline();
        assert_eq!(b.cursor_line_col(), (2, 0));
        assert_eq!(b.lines().count(), 3);
    }

    #[test]
    fn test_cursor_clamped_on_set() {
        let mut b = EditBuffer::default();
        b.set("abc", 99);
        assert_eq!(b.cursor(), 3);
        b.move_right();
        assert_eq!(b.cursor(), 3);
    }
}
