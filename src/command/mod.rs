//! Command dispatch and keybindings
//! Translates keys into editor commands

/// ## command/ Invariants
///
/// - `Command` represents editor-level intent, not key-level input.
/// - Commands contain no terminal- or platform-specific concepts.
/// - All data required to apply a command is contained within the command.
use crate::key::Key;

/// Editor commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Movement
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveToLineStart,
    MoveToLineEnd,
    PageUp,
    PageDown,

    // Editing
    InsertChar(char),
    InsertNewline,
    InsertTab,
    DeleteBackward,
    DeleteForward,

    // File and session
    Save,
    Quit,
    /// Roll the buffer back to the latest snapshot
    Recover,

    Resize(u16, u16),
    Noop,
}

impl Command {
    /// Whether the command may change buffer contents
    #[must_use]
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Command::InsertChar(_)
                | Command::InsertNewline
                | Command::InsertTab
                | Command::DeleteBackward
                | Command::DeleteForward
        )
    }
}

/// Translate a key into a command
#[must_use]
pub fn translate_key(key: Key) -> Command {
    match key {
        Key::Char(ch) if key.is_printable() => Command::InsertChar(ch),
        Key::Char(_) => Command::Noop,
        Key::Ctrl(b's') => Command::Save,
        Key::Ctrl(b'q') => Command::Quit,
        Key::Ctrl(b'r') => Command::Recover,
        Key::Ctrl(_) => Command::Noop,
        Key::ArrowLeft => Command::MoveLeft,
        Key::ArrowRight => Command::MoveRight,
        Key::ArrowUp => Command::MoveUp,
        Key::ArrowDown => Command::MoveDown,
        Key::Home => Command::MoveToLineStart,
        Key::End => Command::MoveToLineEnd,
        Key::PageUp => Command::PageUp,
        Key::PageDown => Command::PageDown,
        Key::Enter => Command::InsertNewline,
        Key::Tab => Command::InsertTab,
        Key::Backspace => Command::DeleteBackward,
        Key::Delete => Command::DeleteForward,
        Key::Resize(cols, rows) => Command::Resize(cols, rows),
        Key::Escape => Command::Noop,
    }
}
