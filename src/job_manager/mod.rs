//! Background jobs
//!
//! Jobs run on their own threads and talk to the editor through a channel.
//! Every job sees the editor-wide shutdown signal as well as its own
//! cancellation flag, and must return promptly once either is set.

use crate::clock::Timestamp;
use crate::event::ShutdownSignal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub mod jobs;

/// Granularity of interruptible sleeps
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Message sent from a background job to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMessage {
    Started(usize),
    /// A periodic snapshot was stored
    SnapshotTaken(usize, Timestamp),
    /// Job stopped because it was cancelled or the editor shut down
    Cancelled(usize),
}

/// Signal used to check if a job has been cancelled.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
    shutdown: ShutdownSignal,
}

impl CancellationSignal {
    #[must_use]
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            shutdown,
        }
    }

    /// Check if the job has been cancelled or the editor is shutting down.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.shutdown.is_triggered()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Sleep for `duration`, waking early on cancellation.
    /// Returns false if the job should stop.
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let step = remaining.min(CANCEL_POLL);
            thread::sleep(step);
            remaining -= step;
        }
        !self.is_cancelled()
    }
}

/// State of a background job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Cancelled,
}

/// Handle to a running job
pub struct JobHandle {
    pub handle: JoinHandle<()>,
    pub state: JobState,
    pub signal: CancellationSignal,
}

/// Trait defining a background job.
/// Jobs must be Send + 'static to be moved into a thread.
pub trait Job: Send + std::fmt::Debug + 'static {
    /// Run the job.
    ///
    /// # Invariants
    /// * The job MUST NOT mutate the buffer; it may only read it and go
    ///   through the snapshot and event APIs.
    /// * If cancelled, the job SHOULD exit as soon as possible.
    fn run(self: Box<Self>, id: usize, sender: Sender<JobMessage>, signal: CancellationSignal);

    /// Name used in log lines
    fn name(&self) -> &'static str;
}

/// Manages background jobs.
pub struct JobManager {
    /// Sender to clone for new jobs
    sender: Sender<JobMessage>,
    /// Receiver for the editor to poll
    receiver: Receiver<JobMessage>,
    jobs: HashMap<usize, JobHandle>,
    next_job_id: usize,
    shutdown: ShutdownSignal,
}

impl JobManager {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            jobs: HashMap::new(),
            next_job_id: 1,
            shutdown,
        }
    }

    /// Spawn a new job.
    /// returns the Job ID.
    pub fn spawn<J: Job>(&mut self, job: J) -> usize {
        let id = self.next_job_id;
        self.next_job_id += 1;

        let sender = self.sender.clone();
        let signal = CancellationSignal::new(self.shutdown.clone());
        let job_signal = signal.clone();
        let name = job.name();
        let job_box = Box::new(job);

        let handle = thread::spawn(move || {
            if sender.send(JobMessage::Started(id)).is_ok() {
                job_box.run(id, sender, job_signal);
            }
        });
        log::debug!("spawned job {} ({})", id, name);

        self.jobs.insert(
            id,
            JobHandle {
                handle,
                state: JobState::Running,
                signal,
            },
        );

        id
    }

    /// Get the receiver to poll for messages.
    /// The editor should call `receiver.try_recv()` to get messages without blocking.
    pub fn receiver(&self) -> &Receiver<JobMessage> {
        &self.receiver
    }

    #[must_use]
    pub fn state(&self, id: usize) -> Option<JobState> {
        self.jobs.get(&id).map(|job| job.state)
    }

    #[must_use]
    pub fn running(&self) -> usize {
        self.jobs
            .values()
            .filter(|job| job.state == JobState::Running)
            .count()
    }

    /// Update job state based on message.
    /// This should be called by the editor when it processes a message.
    pub fn update_job_state(&mut self, message: &JobMessage) {
        let JobMessage::Cancelled(id) = message else {
            return;
        };
        if let Some(job) = self.jobs.get_mut(id) {
            job.state = JobState::Cancelled;
        }
    }

    /// Clean up jobs that have stopped.
    /// This joins the threads to release resources.
    /// Returns a list of cleaned up IDs.
    pub fn cleanup_finished_jobs(&mut self) -> Vec<usize> {
        let finished_ids: Vec<usize> = self
            .jobs
            .iter()
            .filter(|(_, job)| job.state != JobState::Running && job.handle.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for id in &finished_ids {
            if let Some(job) = self.jobs.remove(id) {
                let _ = job.handle.join();
            }
        }

        finished_ids
    }

    /// Cancel every job and wait for the threads to exit
    pub fn join_all(&mut self) {
        for job in self.jobs.values() {
            job.signal.cancel();
        }
        for (id, job) in self.jobs.drain() {
            if job.handle.join().is_err() {
                log::error!("job {} panicked", id);
            }
        }
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        for job in self.jobs.values() {
            job.signal.cancel();
        }
    }
}
