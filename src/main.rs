//! Quill - A terminal-based text editor
//! Main entry point

use anyhow::{Context, Result};
use quill::config::Config;
use quill::editor::Editor;
use quill::term::crossterm::CrosstermBackend;
use std::path::PathBuf;

fn main() -> Result<()> {
    let file_path = std::env::args_os().nth(1).map(PathBuf::from);

    let config = Config::from_env();
    quill::logging::init(&config).context("failed to initialize logging")?;
    log::info!("starting quill (recovery: {})", config.recovery_strategy);

    let backend = CrosstermBackend::new()
        .map_err(anyhow::Error::msg)
        .context("failed to create terminal backend")?;

    let mut editor = Editor::new(backend, file_path, config).context("failed to start editor")?;
    editor.run().context("editor error")?;
    Ok(())
}
