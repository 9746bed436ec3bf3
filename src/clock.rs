//! Process-wide timestamp source
//!
//! Events and snapshots are ordered by nanosecond timestamps, and persisted
//! snapshots are named after them. Wall-clock time can stall or step backwards,
//! so every value handed out is strictly greater than the previous one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch
pub type Timestamp = u64;

static LAST: AtomicU64 = AtomicU64::new(0);

fn wall_clock_nanos() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

/// Current time in nanoseconds, strictly increasing across calls
pub fn now() -> Timestamp {
    let wall = wall_clock_nanos();
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = wall.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}
