//! Centralized error handling for Quill
//! Defines the error taxonomy, severity levels, classification and error codes

use crate::constants::errors;
use crate::event::{Event, EventKind};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod manager;

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Informational message (not really an error)
    Info,
    /// Warning - something might be wrong but operation can continue
    Warning,
    /// Standard error - operation failed but editor can continue
    Error,
    /// Critical error - may lead to data loss or require restart
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad position or argument
    Validation,
    /// Snapshot persistence or file system failure
    Io,
    /// Before/after states disagree with each other or with the buffer
    StateConsistency,
    /// A state payload of the wrong shape was handed to a restore
    InvalidStateType,
    /// Recovery itself failed
    Recovery,
    /// The recursion guard dropped a publish
    LoopDetected,
    /// Memory or other resource exhaustion
    Resource,
    /// Errors that don't fit other kinds
    Unknown,
}

impl ErrorKind {
    /// Classification bucket for this kind
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::Validation | Self::InvalidStateType => ErrorCategory::Validation,
            Self::Io => ErrorCategory::Io,
            Self::StateConsistency | Self::Recovery => ErrorCategory::StateConsistency,
            Self::LoopDetected | Self::Resource => ErrorCategory::Resource,
            Self::Unknown => ErrorCategory::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "Validation"),
            Self::Io => write!(f, "IO"),
            Self::StateConsistency => write!(f, "StateConsistency"),
            Self::InvalidStateType => write!(f, "InvalidStateType"),
            Self::Recovery => write!(f, "Recovery"),
            Self::LoopDetected => write!(f, "LoopDetected"),
            Self::Resource => write!(f, "Resource"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Classification used for statistics and recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Io,
    StateConsistency,
    Validation,
    Resource,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 5] = [
        ErrorCategory::Io,
        ErrorCategory::StateConsistency,
        ErrorCategory::Validation,
        ErrorCategory::Resource,
        ErrorCategory::Unknown,
    ];

    /// Stable index for per-category counters
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Io => 0,
            Self::StateConsistency => 1,
            Self::Validation => 2,
            Self::Resource => 3,
            Self::Unknown => 4,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "io"),
            Self::StateConsistency => write!(f, "state"),
            Self::Validation => write!(f, "validation"),
            Self::Resource => write!(f, "resource"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A structured error in Quill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuillError {
    /// How serious the error is
    pub severity: ErrorSeverity,
    /// What kind of error occurred
    pub kind: ErrorKind,
    /// Machine-readable error code (e.g. "STATE_MISMATCH")
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl QuillError {
    /// Create a new standard error (Severity: Error)
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Error,
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a new critical error (Severity: Critical)
    pub fn critical(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Critical,
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a new warning (Severity: Warning)
    pub fn warning(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Warning,
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Recovery failures are always critical
    pub fn recovery(message: impl Into<String>) -> Self {
        Self::critical(ErrorKind::Recovery, errors::RECOVERY_FAILED, message)
    }

    pub fn state_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StateConsistency, errors::STATE_MISMATCH, message)
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Check if the message contains a substring (useful for tests)
    pub fn contains_msg(&self, sub: &str) -> bool {
        self.message.contains(sub)
    }
}

impl fmt::Display for QuillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}({}): {}",
            self.severity, self.kind, self.code, self.message
        )
    }
}

impl std::error::Error for QuillError {}

impl From<String> for QuillError {
    fn from(msg: String) -> Self {
        Self::new(ErrorKind::Unknown, errors::GENERIC_ERROR, msg)
    }
}

impl From<&str> for QuillError {
    fn from(msg: &str) -> Self {
        Self::new(ErrorKind::Unknown, errors::GENERIC_ERROR, msg)
    }
}

impl From<std::io::Error> for QuillError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::OutOfMemory => {
                Self::critical(ErrorKind::Resource, errors::OUT_OF_MEMORY, err.to_string())
            }
            _ => Self::new(ErrorKind::Io, errors::IO_ERROR, err.to_string()),
        }
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::new(ErrorKind::Io, errors::IO_ERROR, err.to_string())
        } else {
            Self::new(
                ErrorKind::Io,
                errors::SNAPSHOT_DECODE_FAILED,
                err.to_string(),
            )
        }
    }
}

/// Result alias for Quill operations
pub type Result<T> = std::result::Result<T, QuillError>;

/// An error together with the event that produced it
#[derive(Debug, Clone)]
pub struct EventError {
    pub error: QuillError,
    pub event: Option<Event>,
}

impl EventError {
    pub fn new(error: QuillError, event: Option<Event>) -> Self {
        Self { error, event }
    }

    /// Error without a source event (e.g. raised by a background task)
    pub fn detached(error: QuillError) -> Self {
        Self { error, event: None }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }

    /// Event type the error should be routed by
    #[must_use]
    pub fn event_kind(&self) -> Option<EventKind> {
        self.event.as_ref().map(Event::kind)
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.event {
            Some(event) => write!(f, "{} (while handling {})", self.error, event.describe()),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for EventError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
