//! Line buffer
//!
//! The buffer stores a file as an ordered list of lines (without terminators)
//! and a dirty flag. Every mutation returns the `Event` describing it, with
//! deep copies of the state before and after, ready to publish.

/// ## buffer/ Invariants
///
/// - `lines` is the only authoritative content; the row cache is derived.
/// - A cached row always matches its line; any line mutation evicts it.
/// - Invalid positions never corrupt state: they make the mutation a no-op.
/// - Every state handed out or taken in is a deep copy of the lines.
use crate::constants::errors;
use crate::error::{ErrorKind, QuillError, Result};
use crate::event::{BufferChange, ChangeRecord, EditOperation, Event, EventData};
use crate::row::Row;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Buffer coordinates: `x` is a character offset into line `y`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[must_use]
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Captured buffer contents
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferState {
    /// First line, kept for display
    pub content: String,
    pub is_dirty: bool,
    pub lines: Vec<String>,
}

impl BufferState {
    #[must_use]
    pub fn from_lines(lines: &[String], is_dirty: bool) -> Self {
        Self {
            content: lines.first().cloned().unwrap_or_default(),
            is_dirty,
            lines: lines.to_vec(),
        }
    }

    /// Line count with an empty buffer counted as one empty line
    #[must_use]
    pub fn effective_line_count(&self) -> usize {
        self.lines.len().max(1)
    }

    /// All lines joined, used for identity comparisons
    #[must_use]
    pub fn joined(&self) -> String {
        if self.lines.is_empty() {
            self.content.clone()
        } else {
            self.lines.join("\n")
        }
    }

    /// Check that the display field agrees with the lines
    pub fn validate(&self) -> Result<()> {
        match self.lines.first() {
            Some(first) if *first != self.content => Err(QuillError::state_mismatch(format!(
                "state content {:?} does not match first line {:?}",
                self.content, first
            ))),
            _ => Ok(()),
        }
    }
}

/// Something whose contents can be captured and replaced wholesale
pub trait StateTarget {
    /// Deep copy of the current state
    fn capture(&self) -> BufferState;

    /// Replace the current state from an event payload, returning the
    /// event that describes the replacement
    fn restore(&mut self, payload: &EventData) -> Result<Event>;
}

/// Ordered lines plus dirty state
#[derive(Debug, Default)]
pub struct Buffer {
    lines: Vec<String>,
    dirty: bool,
    rows: Mutex<HashMap<usize, Row>>,
}

impl Buffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            dirty: false,
            rows: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Deep copy of all lines
    #[must_use]
    pub fn get_all_lines(&self) -> Vec<String> {
        self.lines.clone()
    }

    #[must_use]
    pub fn line(&self, y: usize) -> Option<&str> {
        self.lines.get(y).map(String::as_str)
    }

    /// Number of characters on line `y` (0 when out of range)
    #[must_use]
    pub fn line_len(&self, y: usize) -> usize {
        self.lines.get(y).map_or(0, |l| l.chars().count())
    }

    /// Row for line `y`, built and cached on first use
    #[must_use]
    pub fn get_row(&self, y: usize) -> Option<Row> {
        let line = self.lines.get(y)?;
        let mut rows = self.rows.lock();
        Some(rows.entry(y).or_insert_with(|| Row::new(line.as_str())).clone())
    }

    /// Number of rows currently cached
    #[must_use]
    pub fn cached_rows(&self) -> usize {
        self.rows.lock().len()
    }

    #[must_use]
    pub fn capture_state(&self) -> BufferState {
        BufferState::from_lines(&self.lines, self.dirty)
    }

    /// Replace all lines, clearing the dirty flag and the row cache
    pub fn load_content(&mut self, lines: Vec<String>) -> Event {
        let prev = self.capture_state();
        self.lines = lines;
        self.dirty = false;
        self.rows.lock().clear();
        let end = self.lines.len().saturating_sub(1);
        self.change_event(prev, EditOperation::Load, true, 0, end)
    }

    /// Set the dirty flag; returns an event only when the flag changed
    pub fn set_dirty(&mut self, dirty: bool) -> Option<Event> {
        if self.dirty == dirty {
            return None;
        }
        let prev = self.capture_state();
        self.dirty = dirty;
        Some(self.change_event(prev, EditOperation::SetDirty, false, 0, 0))
    }

    fn take_row(&self, y: usize) -> Row {
        let cached = self.rows.lock().remove(&y);
        cached.unwrap_or_else(|| Row::new(self.lines[y].as_str()))
    }

    fn evict(&self, y: usize) {
        self.rows.lock().remove(&y);
    }

    fn evict_from(&self, y: usize) {
        self.rows.lock().retain(|&line, _| line < y);
    }

    fn change_event(
        &self,
        prev: BufferState,
        operation: EditOperation,
        is_structural: bool,
        start_line: usize,
        end_line: usize,
    ) -> Event {
        let change = ChangeRecord::new(operation, is_structural, start_line, end_line);
        Event::buffer(BufferChange {
            prev_state: prev,
            curr_state: self.capture_state(),
            changes: vec![change],
        })
    }

    /// Insert `ch` at `pos`; no-op when `pos.y` is out of range
    pub fn insert_char(&mut self, pos: Position, ch: char) -> Option<Event> {
        let prev = self.capture_state();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        if pos.y >= self.lines.len() {
            log::trace!("insert_char ignored at {}", pos);
            if prev.lines.is_empty() {
                self.lines.clear();
            }
            return None;
        }

        let mut row = self.take_row(pos.y);
        row.insert_char(pos.x, ch);
        self.lines[pos.y] = row.into_text();
        self.evict(pos.y);
        self.dirty = true;

        Some(self.change_event(prev, EditOperation::InsertChar, false, pos.y, pos.y))
    }

    /// Backspace at `pos`: delete the character before `pos.x`, or join the
    /// line with the previous one when `pos.x == 0`
    pub fn delete_char(&mut self, pos: Position) -> Option<Event> {
        if pos.y >= self.lines.len() || (pos.x == 0 && pos.y == 0) {
            return None;
        }
        let prev = self.capture_state();

        if pos.x == 0 {
            let old_len = self.lines.len();
            let current = self.lines.remove(pos.y);
            if !current.is_empty() {
                self.lines[pos.y - 1].push_str(&current);
            }
            self.evict_from(pos.y - 1);
            self.dirty = true;
            return Some(self.change_event(
                prev,
                EditOperation::JoinLines,
                true,
                pos.y - 1,
                old_len - 1,
            ));
        }

        let mut row = self.take_row(pos.y);
        if row.delete_char(pos.x - 1).is_none() {
            log::trace!("delete_char ignored at {}", pos);
            return None;
        }
        self.lines[pos.y] = row.into_text();
        self.evict(pos.y);
        self.dirty = true;

        Some(self.change_event(prev, EditOperation::DeleteChar, false, pos.y, pos.y))
    }

    /// Split line `pos.y` at `pos.x`, moving the tail to a new line below
    pub fn insert_newline(&mut self, pos: Position) -> Option<Event> {
        let prev = self.capture_state();
        if self.lines.is_empty() {
            if pos.y != 0 {
                return None;
            }
            self.lines = vec![String::new(), String::new()];
            self.rows.lock().clear();
            self.dirty = true;
            return Some(self.change_event(prev, EditOperation::InsertNewline, true, 0, 1));
        }
        if pos.y >= self.lines.len() {
            return None;
        }

        let mut row = self.take_row(pos.y);
        let tail = row.split_off(pos.x);
        self.lines[pos.y] = row.into_text();
        self.lines.insert(pos.y + 1, tail.into_text());
        self.evict_from(pos.y);
        self.dirty = true;

        let end = self.lines.len() - 1;
        Some(self.change_event(prev, EditOperation::InsertNewline, true, pos.y, end))
    }

    /// Replace the whole buffer with a deep copy of `state`
    pub fn restore_state(&mut self, state: &BufferState) -> Result<Event> {
        state.validate()?;
        let prev = self.capture_state();

        self.lines = if state.lines.is_empty() {
            vec![state.content.clone()]
        } else {
            state.lines.clone()
        };
        self.dirty = state.is_dirty;

        let mut rows = self.rows.lock();
        rows.clear();
        for (y, line) in self.lines.iter().enumerate() {
            rows.insert(y, Row::new(line.as_str()));
        }
        drop(rows);

        let end = self.lines.len().saturating_sub(1);
        Ok(self.change_event(prev, EditOperation::Restore, true, 0, end))
    }
}

impl StateTarget for Buffer {
    fn capture(&self) -> BufferState {
        self.capture_state()
    }

    fn restore(&mut self, payload: &EventData) -> Result<Event> {
        match payload {
            EventData::Buffer(change) => self.restore_state(&change.curr_state),
            other => Err(QuillError::new(
                ErrorKind::InvalidStateType,
                errors::INVALID_STATE_TYPE,
                format!("cannot restore buffer from a {} payload", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
