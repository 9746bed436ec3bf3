//! Viewport management
//! Handles the visible portion of the text buffer

//! ## viewport/ Invariants
//!
//! - The viewport never mutates buffer contents.
//! - The cursor is always visible within the viewport after `update`.
//! - Horizontal scroll is measured in display columns, not characters.
//! - Viewport dimensions reflect the current text area, excluding the
//!   status and message lines.

/// Viewport manages which portion of the buffer is visible
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Top line of the visible area (0-indexed)
    top_line: usize,
    /// Leftmost visible display column
    left_col: usize,
    /// Whether this is the first update (for initial render)
    first_update: bool,
    /// Number of text rows
    visible_rows: usize,
    /// Number of visible display columns
    visible_cols: usize,
}

impl Viewport {
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Viewport {
            top_line: 0,
            left_col: 0,
            first_update: true,
            visible_rows: rows,
            visible_cols: cols,
        }
    }

    /// Scroll so that the cursor at (`cursor_line`, `cursor_col`) is visible.
    /// `cursor_col` is a display column.
    /// Returns true if the viewport scrolled or if this is the first update
    pub fn update(&mut self, cursor_line: usize, cursor_col: usize, total_lines: usize) -> bool {
        let prev = (self.top_line, self.left_col);
        let was_first = self.first_update;
        self.first_update = false;

        let rows = self.visible_rows.max(1);
        if cursor_line < self.top_line {
            self.top_line = cursor_line;
        } else if cursor_line >= self.top_line + rows {
            self.top_line = cursor_line + 1 - rows;
        }
        // Never leave the top past the last line
        let last = total_lines.saturating_sub(1);
        if self.top_line > last {
            self.top_line = last;
        }

        if self.visible_cols > 0 {
            if cursor_col < self.left_col {
                self.left_col = cursor_col;
            } else if cursor_col >= self.left_col + self.visible_cols {
                self.left_col = cursor_col + 1 - self.visible_cols;
            }
        }

        (self.top_line, self.left_col) != prev || was_first
    }

    #[must_use]
    pub fn top_line(&self) -> usize {
        self.top_line
    }

    /// Get the leftmost visible display column
    #[must_use]
    pub fn left_col(&self) -> usize {
        self.left_col
    }

    #[must_use]
    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    #[must_use]
    pub fn visible_cols(&self) -> usize {
        self.visible_cols
    }

    /// Screen row of a buffer line, if it is on screen
    #[must_use]
    pub fn screen_row(&self, line: usize) -> Option<usize> {
        line.checked_sub(self.top_line)
            .filter(|row| *row < self.visible_rows)
    }

    pub fn set_size(&mut self, rows: usize, cols: usize) {
        self.visible_rows = rows;
        self.visible_cols = cols;
        self.first_update = true;
    }
}
