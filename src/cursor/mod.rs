//! Cursor
//!
//! The cursor lives in buffer coordinates. Vertical motion goes through the
//! row width index so the cursor keeps its display column across lines with
//! wide characters.

use crate::buffer::{Buffer, Position};
use crate::event::{Event, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pos: Position,
    prev: Position,
    /// Display column to return to on vertical motion
    desired_col: Option<usize>,
}

impl Cursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.pos
    }

    #[must_use]
    pub fn previous(&self) -> Position {
        self.prev
    }

    #[must_use]
    pub fn x(&self) -> usize {
        self.pos.x
    }

    #[must_use]
    pub fn y(&self) -> usize {
        self.pos.y
    }

    /// Display column of the cursor on its line
    #[must_use]
    pub fn screen_column(&self, buffer: &Buffer) -> usize {
        buffer
            .get_row(self.pos.y)
            .map_or(0, |row| row.offset_to_screen_position(self.pos.x))
    }

    /// UI event describing the last motion
    #[must_use]
    pub fn moved_event(&self) -> Event {
        Event::ui(UiEvent::CursorMoved {
            from: (self.prev.x, self.prev.y),
            to: (self.pos.x, self.pos.y),
        })
    }

    /// `prev` only changes on a real move
    fn set(&mut self, pos: Position) -> bool {
        if pos == self.pos {
            return false;
        }
        self.prev = self.pos;
        self.pos = pos;
        true
    }

    fn last_line(buffer: &Buffer) -> usize {
        buffer.line_count().saturating_sub(1)
    }

    /// Move to `pos`, clamped into the buffer
    pub fn move_to(&mut self, pos: Position, buffer: &Buffer) -> bool {
        let y = pos.y.min(Self::last_line(buffer));
        let x = pos.x.min(buffer.line_len(y));
        self.desired_col = None;
        self.set(Position::new(x, y))
    }

    /// Pull the cursor back inside the buffer, e.g. after a restore
    pub fn clamp(&mut self, buffer: &Buffer) -> bool {
        self.move_to(self.pos, buffer)
    }

    pub fn move_left(&mut self, buffer: &Buffer) -> bool {
        self.desired_col = None;
        let Position { x, y } = self.pos;
        if x > 0 {
            self.set(Position::new(x - 1, y))
        } else if y > 0 {
            self.set(Position::new(buffer.line_len(y - 1), y - 1))
        } else {
            false
        }
    }

    pub fn move_right(&mut self, buffer: &Buffer) -> bool {
        self.desired_col = None;
        let Position { x, y } = self.pos;
        if x < buffer.line_len(y) {
            self.set(Position::new(x + 1, y))
        } else if y < Self::last_line(buffer) {
            self.set(Position::new(0, y + 1))
        } else {
            false
        }
    }

    pub fn move_up(&mut self, buffer: &Buffer) -> bool {
        self.move_vertical(buffer, self.pos.y.saturating_sub(1))
    }

    pub fn move_down(&mut self, buffer: &Buffer) -> bool {
        let target = (self.pos.y + 1).min(Self::last_line(buffer));
        self.move_vertical(buffer, target)
    }

    pub fn page_up(&mut self, buffer: &Buffer, page: usize) -> bool {
        self.move_vertical(buffer, self.pos.y.saturating_sub(page.max(1)))
    }

    pub fn page_down(&mut self, buffer: &Buffer, page: usize) -> bool {
        let target = (self.pos.y + page.max(1)).min(Self::last_line(buffer));
        self.move_vertical(buffer, target)
    }

    pub fn move_home(&mut self) -> bool {
        self.desired_col = None;
        self.set(Position::new(0, self.pos.y))
    }

    pub fn move_end(&mut self, buffer: &Buffer) -> bool {
        self.desired_col = None;
        self.set(Position::new(buffer.line_len(self.pos.y), self.pos.y))
    }

    fn move_vertical(&mut self, buffer: &Buffer, target: usize) -> bool {
        if target == self.pos.y {
            return false;
        }
        let col = match self.desired_col {
            Some(col) => col,
            None => self.screen_column(buffer),
        };
        let x = match buffer.get_row(target) {
            Some(row) if col >= row.total_width() => row.len(),
            Some(row) => row.screen_position_to_offset(col),
            None => 0,
        };
        let moved = self.set(Position::new(x, target));
        self.desired_col = Some(col);
        moved
    }
}
