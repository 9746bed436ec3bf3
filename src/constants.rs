//! Global constants for the Quill editor

pub mod ui {
    /// Display text for documents with no file path
    pub const NO_NAME: &str = "[No Name]";

    /// Marker shown in the status bar for unsaved changes
    pub const DIRTY_MARKER: &str = "[+]";

    /// Filler drawn on screen rows past the end of the buffer
    pub const EMPTY_LINE: &str = "~";
}

pub mod errors {
    // Error Codes
    pub const INVALID_POSITION: &str = "INVALID_POSITION";
    pub const INVALID_STATE_TYPE: &str = "INVALID_STATE_TYPE";
    pub const STATE_MISMATCH: &str = "STATE_MISMATCH";
    pub const LOOP_DETECTED: &str = "LOOP_DETECTED";
    pub const RECOVERY_FAILED: &str = "RECOVERY_FAILED";
    pub const NO_SNAPSHOT: &str = "NO_SNAPSHOT";
    pub const NO_STATE: &str = "NO_STATE";
    pub const SNAPSHOT_WRITE_FAILED: &str = "SNAPSHOT_WRITE_FAILED";
    pub const SNAPSHOT_VERIFY_FAILED: &str = "SNAPSHOT_VERIFY_FAILED";
    pub const SNAPSHOT_DECODE_FAILED: &str = "SNAPSHOT_DECODE_FAILED";
    pub const HANDLER_FAILED: &str = "HANDLER_FAILED";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const OUT_OF_MEMORY: &str = "OUT_OF_MEMORY";
    pub const GENERIC_ERROR: &str = "GENERIC_ERROR";
    pub const TERMINAL_FAILED: &str = "TERMINAL_FAILED";
    pub const UNSAVED_CHANGES: &str = "UNSAVED_CHANGES";

    // Error Messages
    pub const MSG_UNSAVED_CHANGES: &str =
        "Unsaved changes (press Ctrl-Q again to quit without saving)";
}

pub mod defaults {
    /// Maximum re-entrant dispatch depth per event type
    pub const MAX_EVENT_DEPTH: usize = 3;
    /// In-memory snapshot ring capacity
    pub const SNAPSHOT_CAPACITY: usize = 10;
    /// Seconds between periodic snapshots of a dirty buffer
    pub const SNAPSHOT_INTERVAL_SECS: u64 = 180;
    /// Seconds between error statistics samples
    pub const STATS_INTERVAL_SECS: u64 = 30;
    /// Seconds a status message stays visible
    pub const STATUS_DURATION_SECS: u64 = 5;
    pub const TAB_WIDTH: usize = 4;
    pub const LOG_FILE: &str = "quill.log";
    /// Main loop input poll timeout
    pub const POLL_TIMEOUT_MS: u64 = 50;
}

pub mod env {
    pub const TAB_WIDTH: &str = "QUILL_TAB_WIDTH";
    pub const DEBUG: &str = "QUILL_DEBUG";
    pub const STATUS_DURATION_SECS: &str = "QUILL_STATUS_DURATION_SECS";
    pub const SNAPSHOT_INTERVAL_SECS: &str = "QUILL_SNAPSHOT_INTERVAL_SECS";
    pub const SNAPSHOT_CAPACITY: &str = "QUILL_SNAPSHOT_CAPACITY";
    pub const SNAPSHOT_DIR: &str = "QUILL_SNAPSHOT_DIR";
    pub const MAX_EVENT_DEPTH: &str = "QUILL_MAX_EVENT_DEPTH";
    pub const RECOVERY_STRATEGY: &str = "QUILL_RECOVERY_STRATEGY";
    pub const LOG_FILE: &str = "QUILL_LOG_FILE";
}

pub mod files {
    /// Suffix for last-resort recovery saves
    pub const RECOVERED_SUFFIX: &str = "recovered";
    /// File name used for a last-resort save of an unnamed buffer
    pub const UNNAMED_RECOVERY_FILE: &str = "quill.recovered";
    /// Extension of persisted snapshot files
    pub const SNAPSHOT_EXT: &str = "json";
    /// Snapshot subdirectory for buffers without a file
    pub const UNNAMED_SNAPSHOT_DIR: &str = "unnamed";
}
