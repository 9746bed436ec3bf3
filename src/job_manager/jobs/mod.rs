//! Periodic background tasks
pub mod snapshot;
pub mod stats;

pub use snapshot::{take_snapshot, SnapshotJob};
pub use stats::ErrorStatsJob;
