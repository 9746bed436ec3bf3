//! Error recovery
//!
//! Picks a snapshot according to the configured strategy and replays it into
//! the buffer. A failed recovery is always surfaced to the bus's global error
//! handler as a critical error.

use crate::buffer::StateTarget;
use crate::clock::{self, Timestamp};
use crate::constants::errors;
use crate::error::{ErrorCategory, ErrorKind, EventError, QuillError, Result};
use crate::event::{Event, EventBus};
use crate::snapshot::SnapshotManager;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How to choose the snapshot to recover to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryStrategy {
    /// Restore the most recent snapshot
    LatestSnapshot,
    /// Try snapshots newest to oldest, keeping the first that restores
    #[default]
    RollbackToStable,
    /// Try snapshots oldest to newest, keeping the first that restores
    IncrementalRecovery,
}

impl RecoveryStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryStrategy::LatestSnapshot => "latest",
            RecoveryStrategy::RollbackToStable => "rollback",
            RecoveryStrategy::IncrementalRecovery => "incremental",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(RecoveryStrategy::LatestSnapshot),
            "rollback" => Ok(RecoveryStrategy::RollbackToStable),
            "incremental" => Ok(RecoveryStrategy::IncrementalRecovery),
            other => Err(format!("unknown recovery strategy: {}", other)),
        }
    }
}

/// Whether an error should trigger a recovery attempt.
///
/// State consistency failures do; a failed recovery never retriggers itself.
#[must_use]
pub fn requires_recovery(error: &QuillError) -> bool {
    error.category() == ErrorCategory::StateConsistency && error.kind != ErrorKind::Recovery
}

/// Outcome of a successful recovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub strategy: RecoveryStrategy,
    pub snapshot: Timestamp,
    /// Snapshots tried, including the one that restored
    pub attempts: usize,
}

impl fmt::Display for RecoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy {
            RecoveryStrategy::LatestSnapshot => {
                write!(f, "Recovered: restored latest snapshot")
            }
            RecoveryStrategy::RollbackToStable => write!(
                f,
                "Recovered: rolled back to stable snapshot ({} tried)",
                self.attempts
            ),
            RecoveryStrategy::IncrementalRecovery => write!(
                f,
                "Recovered: restored earliest good snapshot ({} tried)",
                self.attempts
            ),
        }
    }
}

pub struct RecoveryManager {
    snapshots: Arc<SnapshotManager>,
    strategy: RecoveryStrategy,
    bus: Arc<EventBus>,
}

impl RecoveryManager {
    pub fn new(
        snapshots: Arc<SnapshotManager>,
        strategy: RecoveryStrategy,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            snapshots,
            strategy,
            bus,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> RecoveryStrategy {
        self.strategy
    }

    #[must_use]
    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    /// Restore `target` after `cause`. On failure the critical recovery
    /// error is reported to the global handler and returned.
    pub fn recover(
        &self,
        cause: &EventError,
        target: &mut dyn StateTarget,
    ) -> Result<(RecoveryReport, Event)> {
        log::warn!("recovering ({}) after: {}", self.strategy, cause);

        match self.attempt(target) {
            Ok((snapshot, event, attempts)) => {
                let report = RecoveryReport {
                    strategy: self.strategy,
                    snapshot,
                    attempts,
                };
                log::info!("{} [snapshot {}]", report, snapshot);
                Ok((report, event))
            }
            Err(e) => {
                let error = QuillError::recovery(format!(
                    "recovery after {} failed: {}",
                    cause.error.code, e.message
                ));
                log::error!("{}", error);
                self.bus
                    .report_global(EventError::new(error.clone(), cause.event.clone()));
                Err(error)
            }
        }
    }

    fn attempt(&self, target: &mut dyn StateTarget) -> Result<(Timestamp, Event, usize)> {
        let stamps = self.snapshots.timestamps();
        if stamps.is_empty() {
            // nothing in memory; the manager may still find one on disk
            return self
                .snapshots
                .request_state_recovery(clock::now(), target)
                .map(|(ts, event)| (ts, event, 1));
        }

        match self.strategy {
            RecoveryStrategy::LatestSnapshot => self
                .snapshots
                .request_state_recovery(clock::now(), target)
                .map(|(ts, event)| (ts, event, 1)),
            RecoveryStrategy::RollbackToStable => self.walk(stamps.into_iter().rev(), target),
            RecoveryStrategy::IncrementalRecovery => self.walk(stamps.into_iter(), target),
        }
    }

    fn walk(
        &self,
        stamps: impl Iterator<Item = Timestamp>,
        target: &mut dyn StateTarget,
    ) -> Result<(Timestamp, Event, usize)> {
        let mut last_error = None;
        let mut attempts = 0;
        for ts in stamps {
            attempts += 1;
            match self.snapshots.recover_from_snapshot(ts, target) {
                Ok((selected, event)) => return Ok((selected, event, attempts)),
                Err(e) => {
                    log::warn!("snapshot {} did not restore: {}", ts, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            QuillError::new(
                ErrorKind::StateConsistency,
                errors::NO_SNAPSHOT,
                "no snapshots available",
            )
        }))
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
