//! Error Manager
//! Centralizes error presentation and keeps per-category statistics

use crate::error::{ErrorCategory, ErrorSeverity, EventError, QuillError};
use crate::notification::NotificationManager;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Error counters shared with the statistics sampler
#[derive(Debug, Default)]
pub struct ErrorStats {
    counts: [AtomicU64; 5],
}

impl ErrorStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, category: ErrorCategory) {
        self.counts[category.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn count(&self, category: ErrorCategory) -> u64 {
        self.counts[category.index()].load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        ErrorCategory::ALL.iter().map(|c| self.count(*c)).sum()
    }

    #[must_use]
    pub fn sample(&self) -> ErrorStatsSample {
        let mut counts = [0; 5];
        for category in ErrorCategory::ALL {
            counts[category.index()] = self.count(category);
        }
        ErrorStatsSample { counts }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorStatsSample {
    counts: [u64; 5],
}

impl ErrorStatsSample {
    #[must_use]
    pub fn count(&self, category: ErrorCategory) -> u64 {
        self.counts[category.index()]
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl fmt::Display for ErrorStatsSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "errors:")?;
        for category in ErrorCategory::ALL {
            write!(f, " {}={}", category, self.count(category))?;
        }
        Ok(())
    }
}

/// Manages errors and their presentation to the user
pub struct ErrorManager {
    /// Internal notification manager for displaying errors
    notifications: NotificationManager,
    stats: Arc<ErrorStats>,
}

impl ErrorManager {
    #[must_use]
    pub fn new(notifications: NotificationManager) -> Self {
        Self {
            notifications,
            stats: Arc::new(ErrorStats::new()),
        }
    }

    pub fn handle(&mut self, err: QuillError) {
        self.stats.record(err.category());
        let message = err.message.clone();
        match err.severity {
            ErrorSeverity::Critical => {
                log::error!("{}", err);
                self.notifications.critical(message);
            }
            ErrorSeverity::Error => {
                log::error!("{}", err);
                self.notifications.error(message);
            }
            ErrorSeverity::Warning => {
                log::warn!("{}", err);
                self.notifications.warn(message);
            }
            ErrorSeverity::Info => {
                log::info!("{}", err);
                self.notifications.info(message);
            }
        }
    }

    pub fn handle_event_error(&mut self, err: EventError) {
        if let Some(event) = &err.event {
            log::debug!("error raised by {}", event.describe());
        }
        self.handle(err.error);
    }

    /// Shared counters for background sampling
    #[must_use]
    pub fn stats(&self) -> Arc<ErrorStats> {
        Arc::clone(&self.stats)
    }

    /// Get a reference to the notification manager
    #[must_use]
    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    /// Get a mutable reference to the notification manager
    pub fn notifications_mut(&mut self) -> &mut NotificationManager {
        &mut self.notifications
    }
}

impl Default for ErrorManager {
    fn default() -> Self {
        Self::new(NotificationManager::new())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
