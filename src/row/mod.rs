//! Row: one line of text plus its display-width index
//!
//! A `Row` maps between character offsets (what the buffer edits) and display
//! columns (what the terminal shows). Wide characters occupy two cells, so the
//! two coordinate systems diverge as soon as one appears on the line.

/// ## row/ Invariants
///
/// - `widths.len()` equals the number of characters in `text`.
/// - `positions.len() == widths.len() + 1` and `positions[0] == 0`.
/// - `positions[i + 1] == positions[i] + widths[i]`.
/// - The width index is rebuilt in full after every mutation.
use crate::character::display_width;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    text: String,
    widths: Vec<usize>,
    positions: Vec<usize>,
}

impl Row {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let mut row = Row {
            text: text.into(),
            widths: Vec::new(),
            positions: Vec::new(),
        };
        row.rebuild();
        row
    }

    fn rebuild(&mut self) {
        self.widths.clear();
        self.widths.extend(self.text.chars().map(display_width));

        self.positions.clear();
        self.positions.reserve(self.widths.len() + 1);
        self.positions.push(0);
        let mut acc = 0;
        for w in &self.widths {
            acc += w;
            self.positions.push(acc);
        }
    }

    /// Byte index of the character at `offset`, or the text length past the end
    fn byte_index(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map_or(self.text.len(), |(i, _)| i)
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of characters
    #[must_use]
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Total display width in cells
    #[must_use]
    pub fn total_width(&self) -> usize {
        self.positions[self.widths.len()]
    }

    #[must_use]
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    #[must_use]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Insert a character; `at` is clamped to `[0, len]`
    pub fn insert_char(&mut self, at: usize, ch: char) {
        let at = at.min(self.len());
        let idx = self.byte_index(at);
        self.text.insert(idx, ch);
        self.rebuild();
    }

    /// Delete the character at `at`; out-of-range offsets are ignored
    pub fn delete_char(&mut self, at: usize) -> Option<char> {
        if at >= self.len() {
            return None;
        }
        let idx = self.byte_index(at);
        let ch = self.text.remove(idx);
        self.rebuild();
        Some(ch)
    }

    /// Split off everything from `at` onward, returning it as a new row
    pub fn split_off(&mut self, at: usize) -> Row {
        let at = at.min(self.len());
        let idx = self.byte_index(at);
        let tail = self.text.split_off(idx);
        self.rebuild();
        Row::new(tail)
    }

    /// Append another row's text to the end of this one
    pub fn append(&mut self, other: &Row) {
        self.text.push_str(&other.text);
        self.rebuild();
    }

    /// Character index whose display span contains `screen_col`.
    ///
    /// A column on a cell boundary resolves to the character starting there.
    /// Columns at or past the total width resolve to the last character.
    #[must_use]
    pub fn screen_position_to_offset(&self, screen_col: usize) -> usize {
        if self.is_empty() {
            return 0;
        }
        if screen_col >= self.total_width() {
            return self.len() - 1;
        }
        // positions[0] == 0 <= screen_col, so the partition point is at least 1
        self.positions.partition_point(|&p| p <= screen_col) - 1
    }

    /// Display column where the character at `offset` starts
    #[must_use]
    pub fn offset_to_screen_position(&self, offset: usize) -> usize {
        self.positions[offset.min(self.len())]
    }

    /// Characters fully visible in the column window `[start_col, start_col + width)`
    #[must_use]
    pub fn visible_slice(&self, start_col: usize, width: usize) -> &str {
        let end_col = start_col.saturating_add(width);
        let first = self.positions.partition_point(|&p| p < start_col);
        let mut last = first;
        while last < self.len() && self.positions[last + 1] <= end_col {
            last += 1;
        }
        if first >= last {
            return "";
        }
        let start = self.byte_index(first);
        let end = self.byte_index(last);
        &self.text[start..end]
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Row {
    fn from(s: &str) -> Self {
        Row::new(s)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
