//! Event Core
//! Synchronous publish/subscribe with batching and re-entrancy protection

/// ## event/bus Invariants
///
/// - Outside a batch, every subscriber of an event's kind has run before
///   `publish` returns.
/// - When a batch closes, buffer events are dispatched before all other kinds.
/// - System events are never batched.
/// - Dispatch depth per kind never exceeds `max_depth`; publishes beyond it
///   are dropped with a warning.
/// - After shutdown, publishes are silently ignored.
/// - No lock is held while a handler runs, so handlers may publish.
use crate::constants::defaults;
use crate::error::{EventError, Result};
use crate::event::{Event, EventKind};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked for each dispatched event of the subscribed kind
pub type Subscriber = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;

/// Callback invoked with errors raised by or attached to events
pub type ErrorHandler = Arc<dyn Fn(&EventError) + Send + Sync>;

/// Maximum number of events kept in the audit log between harvests
const LOG_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What `publish` did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered to this many subscribers
    Dispatched(usize),
    /// Buffered until the current batch ends
    Queued,
    /// Delivered immediately to the system handler
    System,
    /// The event carried an error and was routed to an error handler
    Rejected,
    /// Dropped by the recursion guard
    Dropped,
    /// No-op event, nothing to deliver
    Skipped,
    /// The core has been shut down
    Closed,
}

/// Shared cancellation flag for the core and its background tasks
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Maximum nested dispatch depth per event kind
    pub max_depth: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_depth: defaults::MAX_EVENT_DEPTH,
        }
    }
}

#[derive(Default)]
struct BatchState {
    depth: usize,
    queued: Vec<Event>,
}

/// Decrements the per-kind dispatch depth when dropped
struct DepthGuard<'a> {
    bus: &'a EventBus,
    kind: EventKind,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let mut depth = self.bus.depth.lock();
        if let Some(d) = depth.get_mut(&self.kind) {
            *d = d.saturating_sub(1);
        }
    }
}

pub struct EventBus {
    subscribers: RwLock<HashMap<EventKind, Vec<(SubscriptionId, Subscriber)>>>,
    error_handlers: RwLock<HashMap<EventKind, ErrorHandler>>,
    global_error_handler: RwLock<Option<ErrorHandler>>,
    system_handler: RwLock<Option<Subscriber>>,
    batch: Mutex<BatchState>,
    depth: Mutex<HashMap<EventKind, usize>>,
    log: Mutex<VecDeque<Event>>,
    shutdown: ShutdownSignal,
    max_depth: usize,
    next_id: AtomicU64,
    dropped: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self::with_shutdown(config, ShutdownSignal::new())
    }

    /// Create a core that shuts down when `shutdown` is triggered
    #[must_use]
    pub fn with_shutdown(config: BusConfig, shutdown: ShutdownSignal) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            error_handlers: RwLock::new(HashMap::new()),
            global_error_handler: RwLock::new(None),
            system_handler: RwLock::new(None),
            batch: Mutex::new(BatchState::default()),
            depth: Mutex::new(HashMap::new()),
            log: Mutex::new(VecDeque::new()),
            shutdown,
            max_depth: config.max_depth.max(1),
            next_id: AtomicU64::new(1),
            dropped: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn shared(config: BusConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        for list in subscribers.values_mut() {
            if let Some(pos) = list.iter().position(|(sid, _)| *sid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Handler for errors from events of one kind; takes precedence over the global handler
    pub fn set_error_handler<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&EventError) + Send + Sync + 'static,
    {
        self.error_handlers.write().insert(kind, Arc::new(handler));
    }

    pub fn set_global_error_handler<F>(&self, handler: F)
    where
        F: Fn(&EventError) + Send + Sync + 'static,
    {
        *self.global_error_handler.write() = Some(Arc::new(handler));
    }

    /// The single handler that receives system events immediately
    pub fn set_system_handler<F>(&self, handler: F)
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        *self.system_handler.write() = Some(Arc::new(handler));
    }

    pub fn publish(&self, event: Event) -> Delivery {
        if self.shutdown.is_triggered() {
            log::debug!("publish after shutdown ignored: {}", event.describe());
            return Delivery::Closed;
        }

        if let Some(error) = event.error.clone() {
            self.record(event.clone());
            self.route_error(EventError::new(error, Some(event)));
            return Delivery::Rejected;
        }

        if event.is_noop() {
            log::trace!("skipping no-op event {}", event.describe());
            return Delivery::Skipped;
        }

        self.record(event.clone());

        if event.kind() == EventKind::System {
            return self.dispatch_system(event);
        }

        {
            let mut batch = self.batch.lock();
            if batch.depth > 0 {
                batch.queued.push(event);
                return Delivery::Queued;
            }
        }

        self.dispatch(&event)
    }

    pub fn begin_batch(&self) {
        self.batch.lock().depth += 1;
    }

    /// Close the current batch; the outermost close flushes the queue.
    /// Returns the number of events flushed.
    pub fn end_batch(&self) -> usize {
        let queued = {
            let mut batch = self.batch.lock();
            if batch.depth == 0 {
                log::warn!("end_batch called without a matching begin_batch");
                return 0;
            }
            batch.depth -= 1;
            if batch.depth > 0 {
                return 0;
            }
            std::mem::take(&mut batch.queued)
        };

        let (buffer, rest): (Vec<Event>, Vec<Event>) = queued
            .into_iter()
            .partition(|e| e.kind() == EventKind::Buffer);
        let count = buffer.len() + rest.len();

        for event in buffer.iter().chain(rest.iter()) {
            if self.shutdown.is_triggered() {
                break;
            }
            self.dispatch(event);
        }
        count
    }

    /// Run `f` inside a batch
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.begin_batch();
        let result = f();
        self.end_batch();
        result
    }

    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.batch.lock().depth > 0
    }

    /// Route an error to the handler for its event kind, else the global handler
    pub fn report_error(&self, error: EventError) {
        self.route_error(error);
    }

    /// Route an error straight to the global handler
    pub fn report_global(&self, error: EventError) {
        log_error(&error);
        let handler = self.global_error_handler.read().clone();
        match handler {
            Some(handler) => handler(&error),
            None => log::error!("unhandled error: {}", error),
        }
    }

    /// Stop accepting events; queued batch events are discarded
    pub fn shutdown(&self) {
        self.shutdown.trigger();
        let discarded = std::mem::take(&mut self.batch.lock().queued);
        if !discarded.is_empty() {
            log::debug!("shutdown discarded {} queued events", discarded.len());
        }
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Take every event recorded since the last drain
    pub fn drain_log(&self) -> Vec<Event> {
        self.log.lock().drain(..).collect()
    }

    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.lock().len()
    }

    /// Number of publishes dropped by the recursion guard
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record(&self, event: Event) {
        let mut log = self.log.lock();
        if log.len() >= LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(event);
    }

    fn enter(&self, kind: EventKind) -> Option<DepthGuard<'_>> {
        let mut depth = self.depth.lock();
        let current = depth.entry(kind).or_insert(0);
        if *current >= self.max_depth {
            return None;
        }
        *current += 1;
        Some(DepthGuard { bus: self, kind })
    }

    fn dispatch(&self, event: &Event) -> Delivery {
        let kind = event.kind();
        let Some(_guard) = self.enter(kind) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "dropping {}: {} dispatch depth limit ({}) reached, possible publish loop",
                event.describe(),
                kind,
                self.max_depth
            );
            return Delivery::Dropped;
        };

        let handlers: Vec<Subscriber> = self
            .subscribers
            .read()
            .get(&kind)
            .map(|list| list.iter().map(|(_, s)| Arc::clone(s)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            if let Err(error) = handler(event) {
                self.route_error(EventError::new(error, Some(event.clone())));
            }
        }
        Delivery::Dispatched(handlers.len())
    }

    fn dispatch_system(&self, event: Event) -> Delivery {
        let handler = self.system_handler.read().clone();
        match handler {
            Some(handler) => {
                if let Err(error) = handler(&event) {
                    self.route_error(EventError::new(error, Some(event.clone())));
                }
            }
            None => log::debug!("no system handler for {}", event.describe()),
        }
        if self.subscriber_count(EventKind::System) > 0 {
            self.dispatch(&event);
        }
        Delivery::System
    }

    fn route_error(&self, error: EventError) {
        let handler = error
            .event_kind()
            .and_then(|kind| self.error_handlers.read().get(&kind).cloned());
        match handler {
            Some(handler) => {
                log_error(&error);
                handler(&error);
            }
            None => self.report_global(error),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

fn log_error(error: &EventError) {
    use crate::error::ErrorSeverity;
    match error.error.severity {
        ErrorSeverity::Critical | ErrorSeverity::Error => {
            log::error!("[{}] {}", error.category(), error)
        }
        ErrorSeverity::Warning => log::warn!("[{}] {}", error.category(), error),
        ErrorSeverity::Info => log::info!("[{}] {}", error.category(), error),
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
