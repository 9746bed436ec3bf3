use super::*;
use crate::buffer::{Buffer, BufferState, Position};
use crate::error::ErrorSeverity;
use crate::event::{BusConfig, EventData};
use parking_lot::Mutex;

/// Buffer that refuses to restore any state containing `reject`
struct Picky {
    buffer: Buffer,
    reject: &'static str,
}

impl StateTarget for Picky {
    fn capture(&self) -> BufferState {
        self.buffer.capture_state()
    }

    fn restore(&mut self, payload: &EventData) -> Result<Event> {
        if let EventData::Buffer(change) = payload {
            if change.curr_state.joined().contains(self.reject) {
                return Err(QuillError::state_mismatch("corrupt state"));
            }
        }
        self.buffer.restore(payload)
    }
}

fn snapshot_text(buffer: &mut Buffer, snapshots: &SnapshotManager, text: &str) -> Timestamp {
    let mut events = Vec::new();
    for ch in text.chars() {
        let x = buffer.line_len(0);
        events.extend(buffer.insert_char(Position::new(x, 0), ch));
    }
    snapshots.create_snapshot(events).unwrap().unwrap()
}

fn setup(strategy: RecoveryStrategy) -> (RecoveryManager, Picky, Vec<Timestamp>) {
    let snapshots = Arc::new(SnapshotManager::in_memory(10));
    let mut buffer = Buffer::from_lines(vec![String::new()]);
    let stamps = vec![
        snapshot_text(&mut buffer, &snapshots, "a"),
        snapshot_text(&mut buffer, &snapshots, "b"),
        snapshot_text(&mut buffer, &snapshots, "X"),
    ];
    let bus = EventBus::shared(BusConfig::default());
    let manager = RecoveryManager::new(snapshots, strategy, bus);
    let target = Picky {
        buffer,
        reject: "X",
    };
    (manager, target, stamps)
}

fn cause() -> EventError {
    EventError::detached(QuillError::state_mismatch("prev state mismatch"))
}

#[test]
fn test_rollback_skips_bad_newest() {
    let (manager, mut target, stamps) = setup(RecoveryStrategy::RollbackToStable);
    let (report, event) = manager.recover(&cause(), &mut target).unwrap();

    assert_eq!(report.snapshot, stamps[1]);
    assert_eq!(report.attempts, 2);
    assert_eq!(target.buffer.lines(), ["ab"]);
    assert_eq!(event.kind(), crate::event::EventKind::Buffer);
    assert_eq!(manager.snapshots().timestamps(), stamps[..2].to_vec());
    assert!(report.to_string().contains("rolled back"));
}

#[test]
fn test_incremental_picks_oldest() {
    let (manager, mut target, stamps) = setup(RecoveryStrategy::IncrementalRecovery);
    let (report, _) = manager.recover(&cause(), &mut target).unwrap();

    assert_eq!(report.snapshot, stamps[0]);
    assert_eq!(report.attempts, 1);
    assert_eq!(target.buffer.lines(), ["a"]);
    assert_eq!(manager.snapshots().len(), 1);
}

#[test]
fn test_latest_fails_on_bad_newest() {
    let (manager, mut target, _) = setup(RecoveryStrategy::LatestSnapshot);
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();
    manager
        .bus
        .set_global_error_handler(move |e| sink.lock().push(e.error.clone()));

    let err = manager.recover(&cause(), &mut target).unwrap_err();
    assert_eq!(err.severity, ErrorSeverity::Critical);
    assert_eq!(err.kind, ErrorKind::Recovery);
    assert!(err.contains_msg("corrupt state"));

    let reported = reported.lock();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].code, errors::RECOVERY_FAILED);
    // buffer untouched
    assert_eq!(target.buffer.lines(), ["abX"]);
}

#[test]
fn test_latest_restores_newest() {
    let snapshots = Arc::new(SnapshotManager::in_memory(10));
    let mut buffer = Buffer::from_lines(vec![String::new()]);
    snapshot_text(&mut buffer, &snapshots, "ok");
    let latest = snapshot_text(&mut buffer, &snapshots, "!");
    buffer.insert_char(Position::new(0, 0), '?');

    let manager = RecoveryManager::new(
        snapshots,
        RecoveryStrategy::LatestSnapshot,
        EventBus::shared(BusConfig::default()),
    );
    let (report, _) = manager.recover(&cause(), &mut buffer).unwrap();
    assert_eq!(report.snapshot, latest);
    assert_eq!(buffer.lines(), ["ok!"]);
    assert_eq!(report.to_string(), "Recovered: restored latest snapshot");
}

#[test]
fn test_no_snapshots_is_critical() {
    let manager = RecoveryManager::new(
        Arc::new(SnapshotManager::in_memory(10)),
        RecoveryStrategy::RollbackToStable,
        EventBus::shared(BusConfig::default()),
    );
    let mut buffer = Buffer::from_lines(vec!["text".to_string()]);
    let err = manager.recover(&cause(), &mut buffer).unwrap_err();
    assert_eq!(err.code, errors::RECOVERY_FAILED);
    assert!(err.contains_msg("STATE_MISMATCH"));
}

#[test]
fn test_strategy_parsing() {
    assert_eq!(
        "latest".parse::<RecoveryStrategy>(),
        Ok(RecoveryStrategy::LatestSnapshot)
    );
    assert_eq!(
        " Rollback ".parse::<RecoveryStrategy>(),
        Ok(RecoveryStrategy::RollbackToStable)
    );
    assert_eq!(
        "incremental".parse::<RecoveryStrategy>(),
        Ok(RecoveryStrategy::IncrementalRecovery)
    );
    assert!("undo".parse::<RecoveryStrategy>().is_err());
    assert_eq!(RecoveryStrategy::default(), RecoveryStrategy::RollbackToStable);
}

#[test]
fn test_requires_recovery() {
    assert!(requires_recovery(&QuillError::state_mismatch("x")));
    assert!(!requires_recovery(&QuillError::recovery("x")));
    assert!(!requires_recovery(&QuillError::new(
        ErrorKind::Validation,
        errors::INVALID_POSITION,
        "x"
    )));
    assert!(!requires_recovery(&QuillError::new(
        ErrorKind::LoopDetected,
        errors::LOOP_DETECTED,
        "x"
    )));
}
