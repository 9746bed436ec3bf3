use crate::error::manager::{ErrorStats, ErrorStatsSample};
use crate::error::ErrorSeverity;
use crate::event::{Event, EventBus};
use crate::job_manager::{CancellationSignal, Job, JobMessage};
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

/// Samples the error counters and publishes a status line when they change
pub struct ErrorStatsJob {
    stats: Arc<ErrorStats>,
    bus: Arc<EventBus>,
    interval: Duration,
}

impl ErrorStatsJob {
    pub fn new(stats: Arc<ErrorStats>, bus: Arc<EventBus>, interval: Duration) -> Self {
        Self {
            stats,
            bus,
            interval,
        }
    }
}

impl fmt::Debug for ErrorStatsJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorStatsJob")
            .field("stats", &self.stats)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Job for ErrorStatsJob {
    fn run(self: Box<Self>, id: usize, sender: Sender<JobMessage>, signal: CancellationSignal) {
        let mut last = ErrorStatsSample::default();
        while signal.sleep(self.interval) {
            let sample = self.stats.sample();
            if sample == last {
                continue;
            }
            log::info!("{}", sample);
            self.bus
                .publish(Event::status(sample.to_string(), ErrorSeverity::Info));
            last = sample;
        }
        let _ = sender.send(JobMessage::Cancelled(id));
    }

    fn name(&self) -> &'static str {
        "error-stats"
    }
}
