use crate::buffer::Buffer;
use crate::clock::Timestamp;
use crate::error::{ErrorSeverity, EventError, Result};
use crate::event::{Event, EventBus};
use crate::job_manager::{CancellationSignal, Job, JobMessage};
use crate::snapshot::SnapshotManager;
use parking_lot::RwLock;
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

/// Harvest the bus log into a new snapshot if the buffer has unsaved edits.
///
/// Only reads the buffer. Returns the new snapshot's timestamp, or `None`
/// when there was nothing to store. A log holding no buffer edits is
/// discarded, since it could not restore anything.
pub fn take_snapshot(
    buffer: &RwLock<Buffer>,
    bus: &EventBus,
    snapshots: &SnapshotManager,
) -> Result<Option<Timestamp>> {
    if !buffer.read().is_dirty() {
        return Ok(None);
    }
    let events = bus.drain_log();
    if !events.iter().any(|e| e.buffer_change().is_some()) {
        log::debug!("no buffer edits since the last snapshot");
        return Ok(None);
    }
    snapshots.create_snapshot(events)
}

/// Periodically snapshots the buffer while it is dirty
pub struct SnapshotJob {
    buffer: Arc<RwLock<Buffer>>,
    bus: Arc<EventBus>,
    snapshots: Arc<SnapshotManager>,
    interval: Duration,
}

impl SnapshotJob {
    pub fn new(
        buffer: Arc<RwLock<Buffer>>,
        bus: Arc<EventBus>,
        snapshots: Arc<SnapshotManager>,
        interval: Duration,
    ) -> Self {
        Self {
            buffer,
            bus,
            snapshots,
            interval,
        }
    }
}

impl fmt::Debug for SnapshotJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotJob")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Job for SnapshotJob {
    fn run(self: Box<Self>, id: usize, sender: Sender<JobMessage>, signal: CancellationSignal) {
        while signal.sleep(self.interval) {
            match take_snapshot(&self.buffer, &self.bus, &self.snapshots) {
                Ok(Some(ts)) => {
                    self.bus
                        .publish(Event::status("Snapshot saved", ErrorSeverity::Info));
                    if sender.send(JobMessage::SnapshotTaken(id, ts)).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                // persistence failures go to the global handler; keep running
                Err(e) => self.bus.report_global(EventError::detached(e)),
            }
        }
        let _ = sender.send(JobMessage::Cancelled(id));
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}
