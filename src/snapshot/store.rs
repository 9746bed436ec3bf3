//! On-disk snapshot persistence
//!
//! One JSON file per snapshot, named `<timestamp>.json`. Each event is stored
//! with its checksum so a reload can drop events it has already seen.

use crate::clock::Timestamp;
use crate::constants::{errors, files};
use crate::error::{ErrorKind, QuillError, Result};
use crate::event::{self, Event};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub checksum: String,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub timestamp: Timestamp,
    pub events: Vec<PersistedEvent>,
}

impl From<&Snapshot> for PersistedSnapshot {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            events: snapshot
                .events
                .iter()
                .map(|event| PersistedEvent {
                    checksum: event.checksum(),
                    event: event.clone(),
                })
                .collect(),
        }
    }
}

impl From<PersistedSnapshot> for Snapshot {
    fn from(persisted: PersistedSnapshot) -> Self {
        Self {
            timestamp: persisted.timestamp,
            events: persisted.events.into_iter().map(|p| p.event).collect(),
        }
    }
}

/// Subdirectory name for a document's snapshots: a hash of its absolute
/// path, or a fixed name for unnamed buffers
#[must_use]
pub fn document_key(document: Option<&Path>) -> String {
    let Some(path) = document else {
        return files::UNNAMED_SNAPSHOT_DIR.to_string();
    };
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    event::fnv1a_hex(absolute.to_string_lossy().as_bytes())
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, timestamp: Timestamp) -> PathBuf {
        self.dir
            .join(format!("{}.{}", timestamp, files::SNAPSHOT_EXT))
    }

    /// Write a snapshot and read it back; a mismatch is a hard failure
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let path = self.path_for(snapshot.timestamp);
        let persisted = PersistedSnapshot::from(snapshot);
        let json = serde_json::to_vec_pretty(&persisted)?;

        let temp_path = self.dir.join(format!(".{}.tmp", snapshot.timestamp));
        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(QuillError::new(
                ErrorKind::Io,
                errors::SNAPSHOT_WRITE_FAILED,
                format!("failed to write snapshot {}: {}", path.display(), e),
            ));
        }

        self.verify(snapshot.timestamp, snapshot.events.len())?;
        log::debug!(
            "persisted snapshot {} ({} events)",
            snapshot.timestamp,
            snapshot.events.len()
        );
        Ok(path)
    }

    /// Check that the stored snapshot holds `expected_events` events
    pub fn verify(&self, timestamp: Timestamp, expected_events: usize) -> Result<()> {
        let stored = self.load_persisted(timestamp)?;
        if stored.events.len() != expected_events {
            log::error!(
                "snapshot {} read back {} events, expected {}",
                timestamp,
                stored.events.len(),
                expected_events
            );
            return Err(QuillError::new(
                ErrorKind::Io,
                errors::SNAPSHOT_VERIFY_FAILED,
                format!(
                    "snapshot {} verification failed: {} of {} events read back",
                    timestamp,
                    stored.events.len(),
                    expected_events
                ),
            ));
        }
        Ok(())
    }

    pub fn load_persisted(&self, timestamp: Timestamp) -> Result<PersistedSnapshot> {
        let bytes = fs::read(self.path_for(timestamp))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn load(&self, timestamp: Timestamp) -> Result<Snapshot> {
        self.load_persisted(timestamp).map(Snapshot::from)
    }

    /// Timestamps of all stored snapshots, oldest first
    pub fn list(&self) -> Result<Vec<Timestamp>> {
        let mut stamps = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(files::SNAPSHOT_EXT) {
                continue;
            }
            if let Some(ts) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Timestamp>().ok())
            {
                stamps.push(ts);
            }
        }
        stamps.sort_unstable();
        Ok(stamps)
    }

    /// Newest stored snapshot at or before `timestamp`
    pub fn latest_at_or_before(&self, timestamp: Timestamp) -> Result<Option<Timestamp>> {
        Ok(self.list()?.into_iter().rev().find(|ts| *ts <= timestamp))
    }

    /// Every readable stored snapshot, oldest first; unreadable files are skipped
    pub fn load_all(&self) -> Result<Vec<PersistedSnapshot>> {
        let mut snapshots = Vec::new();
        for ts in self.list()? {
            match self.load_persisted(ts) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => log::warn!("skipping unreadable snapshot {}: {}", ts, e),
            }
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
