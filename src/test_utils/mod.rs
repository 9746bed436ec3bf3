//! Test utilities
//! Shared testing helpers and mocks

use std::collections::VecDeque;
use std::time::Duration;

use crate::buffer::Buffer;
use crate::key::Key;
use crate::term::{Size, TerminalBackend};

/// Mock terminal backend for testing
/// Records all operations and replays a scripted key sequence
pub struct MockTerminal {
    pub writes: Vec<Vec<u8>>,
    pub cursor_moves: Vec<(u16, u16)>,
    pub clear_screen_calls: usize,
    pub reverse_toggles: usize,
    pub size: (u16, u16),
    pub keys: VecDeque<Key>,
    pub initialized: bool,
}

impl MockTerminal {
    /// Create a new mock terminal with specified dimensions
    pub fn new(rows: u16, cols: u16) -> Self {
        MockTerminal {
            writes: Vec::new(),
            cursor_moves: Vec::new(),
            clear_screen_calls: 0,
            reverse_toggles: 0,
            size: (rows, cols),
            keys: VecDeque::new(),
            initialized: false,
        }
    }

    /// Mock terminal that will replay `keys`, then keep sending Ctrl-Q
    pub fn scripted(rows: u16, cols: u16, keys: impl IntoIterator<Item = Key>) -> Self {
        let mut term = Self::new(rows, cols);
        term.keys.extend(keys);
        term
    }

    /// Queue keys typed as plain characters
    pub fn type_text(&mut self, text: &str) {
        self.keys.extend(text.chars().map(Key::Char));
    }

    /// Get all written bytes as a single vector
    pub fn get_written_bytes(&self) -> Vec<u8> {
        self.writes.iter().flatten().cloned().collect()
    }

    /// Get all written bytes as a string (lossy UTF-8 conversion)
    pub fn get_written_string(&self) -> String {
        String::from_utf8_lossy(&self.get_written_bytes()).to_string()
    }

    /// Clear all recorded operations (useful for testing multiple renders)
    pub fn clear(&mut self) {
        self.writes.clear();
        self.cursor_moves.clear();
        self.clear_screen_calls = 0;
        self.reverse_toggles = 0;
    }
}

impl TerminalBackend for MockTerminal {
    fn init(&mut self) -> Result<(), String> {
        self.initialized = true;
        Ok(())
    }

    fn deinit(&mut self) {
        self.initialized = false;
    }

    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<Key>, String> {
        Ok(Some(self.keys.pop_front().unwrap_or(Key::Ctrl(b'q'))))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn get_size(&self) -> Result<Size, String> {
        Ok(Size {
            rows: self.size.0,
            cols: self.size.1,
        })
    }

    fn clear_screen(&mut self) -> Result<(), String> {
        self.clear_screen_calls += 1;
        Ok(())
    }

    fn move_cursor(&mut self, row: u16, col: u16) -> Result<(), String> {
        self.cursor_moves.push((row, col));
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn show_cursor(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn clear_to_end_of_line(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn set_reverse(&mut self, _on: bool) -> Result<(), String> {
        self.reverse_toggles += 1;
        Ok(())
    }
}

/// Buffer holding the given lines
pub fn buffer_of(lines: &[&str]) -> Buffer {
    Buffer::from_lines(lines.iter().map(|s| s.to_string()).collect())
}
