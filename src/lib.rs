//! Quill - a terminal text editor whose buffer is protected by an
//! event-sourced core with snapshots and recovery

pub mod buffer;
pub mod character;
pub mod clock;
pub mod command;
pub mod config;
pub mod constants;
pub mod cursor;
pub mod document;
pub mod editor;
pub mod error;
pub mod event;
pub mod job_manager;
pub mod key;
pub mod logging;
pub mod notification;
pub mod recovery;
pub mod row;
pub mod snapshot;
pub mod term;
pub mod viewport;

#[cfg(test)]
pub mod test_utils;
