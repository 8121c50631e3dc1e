// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `@` mention detection for the chat input.
//!
//! A mention is "in progress" while the text between the nearest `@` before
//! the cursor and the cursor itself contains no space and no newline:
//!
//! ```text
//! fix the @App|          -> active, search term "App"
//! fix the @App file|     -> inactive (space after the @)
//! mail a@b then @src/ma| -> active, search term "src/ma" (later @ wins)
//! ```
//!
//! All offsets are char offsets into the text, not byte offsets.
//!
//! # Example
//!
//! ```
//! use ctxpin::mention::{scan, MentionScan};
//!
//! let scan = scan("fix the @App", 12);
//! assert_eq!(
//!     scan,
//!     MentionScan::Active { search_term: "App".to_string(), at_sign_offset: 8 }
//! );
//! ```

use crate::popup::Position;

/// Character that opens a mention.
pub const MENTION_TRIGGER: char = '@';

/// Result of scanning the text before the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionScan {
    /// No mention in progress at the cursor
    Inactive,
    /// A mention is being typed
    Active {
        /// Text between the `@` and the cursor
        search_term: String,
        /// Char offset of the `@` in the full text
        at_sign_offset: usize,
    },
}

impl MentionScan {
    pub fn is_active(&self) -> bool {
        matches!(self, MentionScan::Active { .. })
    }
}

/// Detect an in-progress `@` mention ending at `cursor`.
///
/// `cursor` is a char offset; values past the end of the text are clamped.
pub fn scan(text: &str, cursor: usize) -> MentionScan {
    let before: Vec<char> = text.chars().take(cursor).collect();

    let Some(at_sign_offset) = before.iter().rposition(|&c| c == MENTION_TRIGGER) else {
        return MentionScan::Inactive;
    };

    let token = &before[at_sign_offset + 1..];
    if token.iter().any(|&c| c == ' ' || c == '\n') {
        return MentionScan::Inactive;
    }

    MentionScan::Active {
        search_term: token.iter().collect(),
        at_sign_offset,
    }
}

/// Convert a char offset into a byte offset, clamping to the end of `text`.
pub fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Remove the chars in `start..end` from `text`.
pub fn splice_out(text: &str, start: usize, end: usize) -> String {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let start_byte = byte_offset(text, start);
    let end_byte = byte_offset(text, end);

    let mut out = String::with_capacity(text.len() - (end_byte - start_byte));
    out.push_str(&text[..start_byte]);
    out.push_str(&text[end_byte..]);
    out
}

/// Popup-facing view of the current mention.
///
/// Recomputed on every text change. Hiding keeps the last search term and
/// offset so a late selection can still splice the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionState {
    pub is_visible: bool,
    pub position: Position,
    pub search_term: String,
    /// Char offset of the triggering `@`, `None` when no mention was seen
    pub at_sign_offset: Option<usize>,
}

impl Default for MentionState {
    fn default() -> Self {
        Self {
            is_visible: false,
            position: Position::default(),
            search_term: String::new(),
            at_sign_offset: None,
        }
    }
}

impl MentionState {
    /// Show the popup for an active mention at `position`.
    pub fn show(&mut self, search_term: String, at_sign_offset: usize, position: Position) {
        self.is_visible = true;
        self.position = position;
        self.search_term = search_term;
        self.at_sign_offset = Some(at_sign_offset);
    }

    pub fn hide(&mut self) {
        self.is_visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(term: &str, offset: usize) -> MentionScan {
        MentionScan::Active {
            search_term: term.to_string(),
            at_sign_offset: offset,
        }
    }

    #[test]
    fn test_scan_end_of_text() {
        assert_eq!(scan("fix the @App", 12), active("App", 8));
    }

    #[test]
    fn test_scan_cursor_inside_text() {
        let text = "fix the @App file please";
        assert_eq!(scan(text, 12), active("App", 8));
        assert_eq!(scan(text, 15), MentionScan::Inactive);
        assert_eq!(scan(text, 20), MentionScan::Inactive);
    }

    #[test]
    fn test_scan_bare_at() {
        assert_eq!(scan("@", 1), active("", 0));
        assert_eq!(scan("look at @", 9), active("", 8));
    }

    #[test]
    fn test_scan_cursor_before_at() {
        assert_eq!(scan("@App", 0), MentionScan::Inactive);
    }

    #[test]
    fn test_scan_no_at() {
        assert_eq!(scan("no mention here", 15), MentionScan::Inactive);
        assert_eq!(scan("", 0), MentionScan::Inactive);
    }

    #[test]
    fn test_scan_newline_breaks_mention() {
        assert_eq!(scan("@App\nmore", 9), MentionScan::Inactive);
        assert_eq!(scan("line one\n@src", 13), active("src", 9));
    }

    #[test]
    fn test_scan_later_at_wins() {
        assert_eq!(scan("@one @two", 9), active("two", 5));
        // Nearest @ is inside an email-like token; it still wins
        assert_eq!(scan("@src a@b", 8), active("b", 6));
    }

    #[test]
    fn test_scan_space_deactivates_every_position() {
        let text = "ask @components";
        let end = text.chars().count();
        assert!(scan(text, end).is_active());

        for insert_at in 5..=end {
            let mut chars: Vec<char> = text.chars().collect();
            chars.insert(insert_at, ' ');
            let broken: String = chars.into_iter().collect();
            assert_eq!(
                scan(&broken, end + 1),
                MentionScan::Inactive,
                "space at {} should end the mention",
                insert_at
            );
        }
    }

    #[test]
    fn test_scan_cursor_past_end_clamps() {
        assert_eq!(scan("@App", 100), active("App", 0));
    }

    #[test]
    fn test_scan_multibyte_offsets() {
        assert_eq!(scan("héllo @wörld", 12), active("wörld", 6));
    }

    #[test]
    fn test_splice_out() {
        assert_eq!(splice_out("fix the @App now", 8, 12), "fix the  now");
        assert_eq!(splice_out("héllo @wö", 6, 9), "héllo ");
        assert_eq!(splice_out("abc", 3, 3), "abc");
        assert_eq!(splice_out("abc", 2, 1), "ac");
    }

    #[test]
    fn test_mention_state_show_hide() {
        let mut state = MentionState::default();
        assert!(!state.is_visible);

        state.show("App".to_string(), 8, Position { top: 30, left: 40 });
        assert!(state.is_visible);
        assert_eq!(state.at_sign_offset, Some(8));

        state.hide();
        assert!(!state.is_visible);
        assert_eq!(state.search_term, "App");
    }
}
