//! # Document Handle
//!
//! The editor widget an AI action writes into, seen through the few operations
//! the session needs.
//!
//! ## Lifecycle of one action
//!
//! ```text
//! selection() → delete_range(start, end) → insert_at_cursor(delta) × N
//!     ↓                                             ↓
//!  source text                               text() captured once
//! ```
//!
//! Offsets are in chars, not bytes.

/// Editor surface driven by an [`EditSession`](crate::EditSession)
pub trait EditableDocument {
    /// Full document text
    fn text(&self) -> String;

    /// Current selection as `(start, end)`; collapsed when both are equal
    fn selection(&self) -> (usize, usize);

    /// Remove `start..end` and leave the cursor at `start`
    fn delete_range(&mut self, start: usize, end: usize);

    /// Insert at the cursor and move the cursor past the inserted text
    fn insert_at_cursor(&mut self, text: &str);

    /// Swap the whole content, used by rollback and restore
    fn replace_all(&mut self, text: &str);
}

/// Plain-text, in-memory document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
    selection: (usize, usize),
    cursor: usize,

    /// Increments on each mutation
    pub version: u64,
}

impl TextDocument {
    /// Create a document with the cursor at the end
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.chars().count();
        Self {
            text,
            selection: (end, end),
            cursor: end,
            version: 0,
        }
    }

    pub fn with_selection(mut self, start: usize, end: usize) -> Self {
        self.select(start, end);
        self
    }

    /// Select `start..end`; the cursor moves to the start of the range
    pub fn select(&mut self, start: usize, end: usize) {
        let len = self.char_len();
        let (start, end) = (start.min(end).min(len), start.max(end).min(len));
        self.selection = (start, end);
        self.cursor = start;
    }

    pub fn select_all(&mut self) {
        self.select(0, self.char_len());
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(byte, _)| byte)
    }

    fn collapse_to(&mut self, at: usize) {
        self.cursor = at;
        self.selection = (at, at);
    }
}

impl EditableDocument for TextDocument {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn selection(&self) -> (usize, usize) {
        self.selection
    }

    fn delete_range(&mut self, start: usize, end: usize) {
        let len = self.char_len();
        let (start, end) = (start.min(end).min(len), start.max(end).min(len));
        let range = self.byte_offset(start)..self.byte_offset(end);
        self.text.replace_range(range, "");
        self.version += 1;
        self.collapse_to(start);
    }

    fn insert_at_cursor(&mut self, text: &str) {
        let at = self.byte_offset(self.cursor);
        self.text.insert_str(at, text);
        self.version += 1;
        self.collapse_to(self.cursor + text.chars().count());
    }

    fn replace_all(&mut self, text: &str) {
        self.text = text.to_string();
        self.version += 1;
        let end = self.char_len();
        self.collapse_to(end);
    }
}
