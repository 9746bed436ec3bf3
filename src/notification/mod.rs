//! Notification system
//! Manages status messages shown to the user

use crate::constants::defaults;
use crate::error::ErrorSeverity;
use std::time::{Duration, Instant};

/// Types of notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    /// Informational message
    Info,
    /// Warning message
    Warning,
    /// Error message
    Error,
    /// Success message
    Success,
}

impl From<ErrorSeverity> for NotificationType {
    fn from(severity: ErrorSeverity) -> Self {
        match severity {
            ErrorSeverity::Info => NotificationType::Info,
            ErrorSeverity::Warning => NotificationType::Warning,
            ErrorSeverity::Error => NotificationType::Error,
            ErrorSeverity::Critical => NotificationType::Error,
        }
    }
}

/// A single notification
#[derive(Debug, Clone)]
pub struct Notification {
    /// Unique identifier
    pub id: u64,
    /// The message content
    pub message: String,
    /// The type/severity of the notification
    pub kind: NotificationType,
    /// When the notification was created
    pub timestamp: Instant,
    /// Optional time-to-live. If None, it persists until manually dismissed.
    pub ttl: Option<Duration>,
}

impl Notification {
    /// Create a new notification
    pub fn new(
        id: u64,
        kind: NotificationType,
        message: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            id,
            message: message.into(),
            kind,
            timestamp: Instant::now(),
            ttl,
        }
    }

    /// Check if the notification has expired
    pub fn is_expired(&self, now: Instant) -> bool {
        if let Some(ttl) = self.ttl {
            now.duration_since(self.timestamp) > ttl
        } else {
            false
        }
    }
}

/// Manages active notifications
pub struct NotificationManager {
    /// Active notifications
    notifications: Vec<Notification>,
    /// Counter for generating unique IDs
    next_id: u64,
    /// How long an informational message stays up
    display_duration: Duration,
    /// Monotonic generation counter for change detection
    pub generation: u64,
}

impl NotificationManager {
    /// Create a new notification manager with the default display duration
    pub fn new() -> Self {
        Self::with_duration(Duration::from_secs(defaults::STATUS_DURATION_SECS))
    }

    pub fn with_duration(display_duration: Duration) -> Self {
        Self {
            notifications: Vec::new(),
            next_id: 0,
            display_duration,
            generation: 0,
        }
    }

    /// Add a notification
    pub fn add(
        &mut self,
        kind: NotificationType,
        message: impl Into<String>,
        ttl: Option<Duration>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.notifications
            .push(Notification::new(id, kind, message, ttl));
        self.generation += 1;
        id
    }

    /// Add a notification for a status event of the given severity
    pub fn notify(&mut self, severity: ErrorSeverity, message: impl Into<String>) -> u64 {
        match severity {
            ErrorSeverity::Info => self.info(message),
            ErrorSeverity::Warning => self.warn(message),
            ErrorSeverity::Error => self.error(message),
            ErrorSeverity::Critical => self.critical(message),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.add(NotificationType::Info, message, Some(self.display_duration))
    }

    /// Warnings stay up twice as long as info messages
    pub fn warn(&mut self, message: impl Into<String>) -> u64 {
        self.add(
            NotificationType::Warning,
            message,
            Some(self.display_duration * 2),
        )
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.add(
            NotificationType::Error,
            message,
            Some(self.display_duration * 2),
        )
    }

    /// Critical messages persist until dismissed
    pub fn critical(&mut self, message: impl Into<String>) -> u64 {
        self.add(NotificationType::Error, message, None)
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.add(NotificationType::Success, message, Some(self.display_duration))
    }

    /// Most recent notification, shown in the message line
    pub fn latest(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    /// Prune expired notifications
    pub fn prune_expired(&mut self) {
        self.prune_expired_at(Instant::now());
    }

    pub fn prune_expired_at(&mut self, now: Instant) {
        let old_len = self.notifications.len();
        self.notifications.retain(|n| !n.is_expired(now));
        if self.notifications.len() != old_len {
            self.generation += 1;
        }
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}
