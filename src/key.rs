//! Key representation for editor input

/// Represents a key press event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable character
    Char(char),
    /// Control key combination, holding the lowercase letter (Ctrl+S = `Ctrl(b's')`)
    Ctrl(u8),
    /// Arrow keys
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// Navigation keys
    Home,
    End,
    PageUp,
    PageDown,
    /// Editing keys
    Backspace,
    Delete,
    Enter,
    Escape,
    Tab,
    /// Terminal resized to (cols, rows)
    Resize(u16, u16),
}

impl Key {
    /// Whether the key inserts its character as typed
    #[must_use]
    pub fn is_printable(&self) -> bool {
        matches!(self, Key::Char(ch) if !ch.is_control())
    }
}
