//! Snapshot / state manager
//!
//! A snapshot is the event log harvested since the previous snapshot. The
//! manager keeps a bounded, timestamp-ordered ring of them in memory and can
//! replay one into a `StateTarget` to roll the buffer back.

/// ## snapshot/ Invariants
///
/// - The ring is ordered by timestamp and never exceeds its capacity; the
///   oldest snapshot is evicted first.
/// - No two events in the ring share a dedup key, and no-op events are never stored.
/// - Recovery selects the newest snapshot at or before the requested time and
///   discards everything newer once the restore succeeds.
/// - A failed restore leaves the ring untouched.
pub mod store;

use crate::buffer::{BufferState, StateTarget};
use crate::clock::{self, Timestamp};
use crate::constants::{defaults, errors};
use crate::error::{ErrorKind, QuillError, Result};
use crate::event::Event;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use store::SnapshotStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub events: Vec<Event>,
}

impl Snapshot {
    /// Last event carrying a buffer state; events published with an error
    /// attached are audit entries and never a restore target
    #[must_use]
    pub fn latest_state_event(&self) -> Option<&Event> {
        self.events
            .iter()
            .rev()
            .find(|e| e.error.is_none() && e.buffer_change().is_some())
    }

    #[must_use]
    pub fn latest_state(&self) -> Option<&BufferState> {
        self.latest_state_event().and_then(Event::curr_state)
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub capacity: usize,
    /// Persist snapshots here when set
    pub dir: Option<PathBuf>,
    /// Document the snapshots belong to; selects a subdirectory of `dir`
    pub document: Option<PathBuf>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::SNAPSHOT_CAPACITY,
            dir: None,
            document: None,
        }
    }
}

pub struct SnapshotManager {
    ring: Mutex<VecDeque<Snapshot>>,
    capacity: usize,
    store: Option<SnapshotStore>,
}

impl SnapshotManager {
    pub fn new(config: SnapshotConfig) -> Result<Self> {
        let document = config.document;
        let store = config
            .dir
            .map(|dir| SnapshotStore::open(dir.join(store::document_key(document.as_deref()))))
            .transpose()?;
        Ok(Self {
            ring: Mutex::new(VecDeque::new()),
            capacity: config.capacity.max(1),
            store,
        })
    }

    /// In-memory manager with the given capacity
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            store: None,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    /// Timestamps in the ring, oldest first
    #[must_use]
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.ring.lock().iter().map(|s| s.timestamp).collect()
    }

    #[must_use]
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.ring.lock().back().map(|s| s.timestamp)
    }

    #[must_use]
    pub fn get(&self, timestamp: Timestamp) -> Option<Snapshot> {
        self.ring
            .lock()
            .iter()
            .find(|s| s.timestamp == timestamp)
            .cloned()
    }

    /// Store the events as a new snapshot.
    ///
    /// Duplicate and no-op events are discarded first; if nothing is left no
    /// snapshot is created and `Ok(None)` is returned. With persistence
    /// enabled the snapshot is kept in memory even if writing it fails.
    pub fn create_snapshot(&self, events: Vec<Event>) -> Result<Option<Timestamp>> {
        if events.is_empty() {
            log::warn!("snapshot requested with no events");
            return Ok(None);
        }
        let offered = events.len();

        let snapshot = {
            let mut ring = self.ring.lock();
            let mut seen: HashSet<String> = ring
                .iter()
                .flat_map(|s| s.events.iter().map(Event::dedup_key))
                .collect();
            let unique: Vec<Event> = events
                .into_iter()
                .filter(|e| !e.is_noop() && seen.insert(e.dedup_key()))
                .collect();

            if unique.is_empty() {
                log::warn!("snapshot skipped: all {} events were duplicates", offered);
                return Ok(None);
            }
            if unique.len() < offered {
                log::debug!("discarded {} duplicate events", offered - unique.len());
            }

            let snapshot = Snapshot {
                timestamp: clock::now(),
                events: unique,
            };
            Self::insert_ordered(&mut ring, snapshot.clone(), self.capacity);
            snapshot
        };

        log::debug!(
            "created snapshot {} with {} events",
            snapshot.timestamp,
            snapshot.events.len()
        );

        if let Some(store) = &self.store {
            store.save(&snapshot)?;
        }
        Ok(Some(snapshot.timestamp))
    }

    /// Insert an existing snapshot in timestamp order, evicting the oldest if full
    pub fn insert_snapshot(&self, snapshot: Snapshot) {
        let mut ring = self.ring.lock();
        Self::insert_ordered(&mut ring, snapshot, self.capacity);
    }

    fn insert_ordered(ring: &mut VecDeque<Snapshot>, snapshot: Snapshot, capacity: usize) {
        let at = ring.partition_point(|s| s.timestamp <= snapshot.timestamp);
        ring.insert(at, snapshot);
        while ring.len() > capacity {
            if let Some(evicted) = ring.pop_front() {
                log::debug!("evicted snapshot {}", evicted.timestamp);
            }
        }
    }

    /// Replay the newest in-memory snapshot at or before `timestamp` into
    /// `target`, then drop every newer snapshot. Returns the restore event.
    pub fn recover_from_snapshot(
        &self,
        timestamp: Timestamp,
        target: &mut dyn StateTarget,
    ) -> Result<(Timestamp, Event)> {
        let mut ring = self.ring.lock();
        let idx = ring.partition_point(|s| s.timestamp <= timestamp);
        if idx == 0 {
            return Err(QuillError::new(
                ErrorKind::StateConsistency,
                errors::NO_SNAPSHOT,
                format!("no snapshot at or before {}", timestamp),
            ));
        }

        let snapshot = &ring[idx - 1];
        let selected = snapshot.timestamp;
        let event = snapshot.latest_state_event().ok_or_else(|| {
            QuillError::new(
                ErrorKind::StateConsistency,
                errors::NO_STATE,
                format!("snapshot {} holds no buffer state", selected),
            )
        })?;
        let restored = target.restore(&event.data)?;

        let discarded = ring.len() - idx;
        ring.truncate(idx);
        log::info!(
            "recovered from snapshot {} (discarded {} newer)",
            selected,
            discarded
        );
        Ok((selected, restored))
    }

    /// Recover to the state at `timestamp`, falling back to persisted
    /// snapshots when the ring has nothing old enough. May touch disk.
    pub fn request_state_recovery(
        &self,
        timestamp: Timestamp,
        target: &mut dyn StateTarget,
    ) -> Result<(Timestamp, Event)> {
        let in_memory = {
            let ring = self.ring.lock();
            ring.front().is_some_and(|s| s.timestamp <= timestamp)
        };
        if in_memory {
            return self.recover_from_snapshot(timestamp, target);
        }

        let Some(store) = &self.store else {
            return self.recover_from_snapshot(timestamp, target);
        };
        let Some(found) = store.latest_at_or_before(timestamp)? else {
            return Err(QuillError::new(
                ErrorKind::StateConsistency,
                errors::NO_SNAPSHOT,
                format!("no persisted snapshot at or before {}", timestamp),
            ));
        };

        let snapshot = store.load(found)?;
        let event = snapshot.latest_state_event().ok_or_else(|| {
            QuillError::new(
                ErrorKind::StateConsistency,
                errors::NO_STATE,
                format!("persisted snapshot {} holds no buffer state", found),
            )
        })?;
        let restored = target.restore(&event.data)?;
        log::info!("recovered from persisted snapshot {}", found);

        let mut ring = self.ring.lock();
        ring.clear();
        ring.push_back(snapshot);
        Ok((found, restored))
    }

    /// Load persisted snapshots into the ring, skipping events already seen.
    ///
    /// `current` is the content the document was opened with. When the newest
    /// persisted state already matches it there is nothing to recover and the
    /// snapshots are left on disk. Returns how many snapshots were inserted.
    pub fn load_persisted(&self, current: &[String]) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let mut seen: HashSet<String> = self
            .ring
            .lock()
            .iter()
            .flat_map(|s| s.events.iter().map(Event::checksum))
            .collect();

        let mut loaded = Vec::new();
        for persisted in store.load_all()? {
            let timestamp = persisted.timestamp;
            let events: Vec<Event> = persisted
                .events
                .into_iter()
                .filter(|p| seen.insert(p.checksum.clone()))
                .map(|p| p.event)
                .collect();
            if events.is_empty() {
                log::debug!("persisted snapshot {} fully duplicate", timestamp);
                continue;
            }
            loaded.push(Snapshot { timestamp, events });
        }

        let newest = loaded.iter().rev().find_map(Snapshot::latest_state);
        if newest.is_some_and(|state| state.lines == current) {
            log::debug!("persisted snapshots match the opened document");
            return Ok(0);
        }

        let inserted = loaded.len();
        for snapshot in loaded {
            self.insert_snapshot(snapshot);
        }
        Ok(inserted)
    }
}
