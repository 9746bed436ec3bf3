//! Logger setup
//!
//! Records always go to a file: the terminal is in raw mode while the editor
//! runs, so anything written to stderr would corrupt the screen.

use crate::config::Config;
use crate::constants::errors;
use crate::error::{ErrorKind, QuillError, Result};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;

/// Level used when `RUST_LOG` is not set
#[must_use]
pub fn level_for(config: &Config) -> LevelFilter {
    if config.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Install the global logger. Fails if the log file cannot be opened or a
/// logger is already installed.
pub fn init(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let mut builder = Builder::new();
    builder
        .filter_level(level_for(config))
        .format_timestamp_millis()
        .target(Target::Pipe(Box::new(file)));
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.try_init().map_err(|e| {
        QuillError::new(
            ErrorKind::Resource,
            errors::GENERIC_ERROR,
            format!("failed to install logger: {}", e),
        )
    })?;
    log::info!(
        "logging to {} at {}",
        config.log_file.display(),
        level_for(config)
    );
    Ok(())
}
