//! Events
//!
//! An `Event` is an immutable record of one state transition. Payloads are a
//! closed set of typed variants, one per event category, so subscribers match
//! on them exhaustively.

use crate::buffer::BufferState;
use crate::clock::{self, Timestamp};
use crate::error::{ErrorSeverity, QuillError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub mod bus;

pub use bus::{BusConfig, Delivery, EventBus, ShutdownSignal, SubscriptionId};

/// Event type tag; subscribers register per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Buffer,
    System,
    Ui,
    File,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer => write!(f, "buffer"),
            Self::System => write!(f, "system"),
            Self::Ui => write!(f, "ui"),
            Self::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// Buffer operation that produced a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditOperation {
    InsertChar,
    DeleteChar,
    InsertNewline,
    JoinLines,
    Load,
    Restore,
    SetDirty,
}

impl EditOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InsertChar => "insert_char",
            Self::DeleteChar => "delete_char",
            Self::InsertNewline => "insert_newline",
            Self::JoinLines => "join_lines",
            Self::Load => "load",
            Self::Restore => "restore",
            Self::SetDirty => "set_dirty",
        }
    }
}

/// Lines touched by a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub affected_lines: BTreeSet<usize>,
    /// Whether the number of lines changed
    pub is_structural: bool,
    pub start_line: usize,
    pub end_line: usize,
    pub operation: EditOperation,
}

impl ChangeRecord {
    #[must_use]
    pub fn new(
        operation: EditOperation,
        is_structural: bool,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        let end_line = end_line.max(start_line);
        Self {
            affected_lines: (start_line..=end_line).collect(),
            is_structural,
            start_line,
            end_line,
            operation,
        }
    }
}

/// Before/after states of a buffer transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferChange {
    pub prev_state: BufferState,
    pub curr_state: BufferState,
    pub changes: Vec<ChangeRecord>,
}

impl BufferChange {
    /// Whether any change alters the number of lines
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.changes.iter().any(|c| c.is_structural)
    }
}

/// Events whose ordering relative to keystrokes is safety-critical
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemEvent {
    Save { path: Option<String> },
    Quit { force: bool },
    Status { message: String, severity: ErrorSeverity },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    Redraw { full: bool },
    CursorMoved { from: (usize, usize), to: (usize, usize) },
    Resize { rows: u16, cols: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileEvent {
    Loaded { path: String, lines: usize },
    Saved { path: String, lines: usize },
}

/// Typed payload, one variant per event kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventData {
    Buffer(BufferChange),
    System(SystemEvent),
    Ui(UiEvent),
    File(FileEvent),
}

impl EventData {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Buffer(_) => EventKind::Buffer,
            Self::System(_) => EventKind::System,
            Self::Ui(_) => EventKind::Ui,
            Self::File(_) => EventKind::File,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub data: EventData,
    pub timestamp: Timestamp,
    pub priority: Priority,
    pub error: Option<QuillError>,
}

impl Event {
    fn with_data(data: EventData, priority: Priority) -> Self {
        Self {
            data,
            timestamp: clock::now(),
            priority,
            error: None,
        }
    }

    #[must_use]
    pub fn buffer(change: BufferChange) -> Self {
        Self::with_data(EventData::Buffer(change), Priority::Normal)
    }

    #[must_use]
    pub fn system(event: SystemEvent) -> Self {
        Self::with_data(EventData::System(event), Priority::High)
    }

    #[must_use]
    pub fn ui(event: UiEvent) -> Self {
        Self::with_data(EventData::Ui(event), Priority::Low)
    }

    #[must_use]
    pub fn file(event: FileEvent) -> Self {
        Self::with_data(EventData::File(event), Priority::Normal)
    }

    /// Status message shown to the user
    pub fn status(message: impl Into<String>, severity: ErrorSeverity) -> Self {
        Self::system(SystemEvent::Status {
            message: message.into(),
            severity,
        })
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: QuillError) -> Self {
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }

    /// Finer-grained tag within the kind
    #[must_use]
    pub fn subtype(&self) -> &'static str {
        match &self.data {
            EventData::Buffer(change) => change
                .changes
                .first()
                .map_or("change", |c| c.operation.as_str()),
            EventData::System(SystemEvent::Save { .. }) => "save",
            EventData::System(SystemEvent::Quit { .. }) => "quit",
            EventData::System(SystemEvent::Status { .. }) => "status",
            EventData::Ui(UiEvent::Redraw { .. }) => "redraw",
            EventData::Ui(UiEvent::CursorMoved { .. }) => "cursor_moved",
            EventData::Ui(UiEvent::Resize { .. }) => "resize",
            EventData::File(FileEvent::Loaded { .. }) => "loaded",
            EventData::File(FileEvent::Saved { .. }) => "saved",
        }
    }

    #[must_use]
    pub fn buffer_change(&self) -> Option<&BufferChange> {
        match &self.data {
            EventData::Buffer(change) => Some(change),
            _ => None,
        }
    }

    #[must_use]
    pub fn prev_state(&self) -> Option<&BufferState> {
        self.buffer_change().map(|c| &c.prev_state)
    }

    #[must_use]
    pub fn curr_state(&self) -> Option<&BufferState> {
        self.buffer_change().map(|c| &c.curr_state)
    }

    #[must_use]
    pub fn changes(&self) -> &[ChangeRecord] {
        self.buffer_change().map_or(&[], |c| c.changes.as_slice())
    }

    /// A buffer event whose before and after states are equal carries no information
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match &self.data {
            EventData::Buffer(change) => change.prev_state == change.curr_state,
            EventData::Ui(UiEvent::CursorMoved { from, to }) => from == to,
            _ => false,
        }
    }

    /// Composite identity used to discard repeated events
    #[must_use]
    pub fn dedup_key(&self) -> String {
        let (prev, curr) = match &self.data {
            EventData::Buffer(change) => (change.prev_state.joined(), change.curr_state.joined()),
            _ => (String::new(), String::new()),
        };
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.timestamp,
            self.kind(),
            self.subtype(),
            prev,
            curr
        )
    }

    /// Non-cryptographic checksum of the dedup key
    #[must_use]
    pub fn checksum(&self) -> String {
        fnv1a_hex(self.dedup_key().as_bytes())
    }

    /// Short description for log lines and error messages
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}/{}@{}", self.kind(), self.subtype(), self.timestamp)
    }
}

/// 64-bit FNV-1a, as 16 hex digits
#[must_use]
pub fn fnv1a_hex(bytes: &[u8]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    let hash = bytes
        .iter()
        .fold(OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(PRIME));
    format!("{:016x}", hash)
}

/// Check that a buffer event's change records agree with its states
pub fn validate(event: &Event) -> Result<()> {
    let Some(change) = event.buffer_change() else {
        return Ok(());
    };
    change.prev_state.validate()?;
    change.curr_state.validate()?;

    let before = change.prev_state.effective_line_count();
    let after = change.curr_state.effective_line_count();
    let reloaded = change
        .changes
        .iter()
        .any(|c| matches!(c.operation, EditOperation::Load | EditOperation::Restore));

    if reloaded {
        return Ok(());
    }
    if change.is_structural() {
        if before.abs_diff(after) != 1 {
            return Err(QuillError::state_mismatch(format!(
                "structural {} changed line count {} -> {}",
                event.subtype(),
                before,
                after
            )));
        }
    } else if before != after {
        return Err(QuillError::state_mismatch(format!(
            "in-place {} changed line count {} -> {}",
            event.subtype(),
            before,
            after
        )));
    }
    Ok(())
}
