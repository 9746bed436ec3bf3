//! Document file I/O
//! Owns the file path and on-disk format; the buffer only ever sees lines
//! without terminators.

use crate::constants::{errors, files, ui};
use crate::error::{ErrorKind, QuillError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Line terminator used on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    LF,
    CRLF,
}

impl LineEnding {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::LF => "\n",
            LineEnding::CRLF => "\r\n",
        }
    }
}

/// File metadata for the buffer being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File path (None if new/unsaved)
    file_path: Option<PathBuf>,
    line_ending: LineEnding,
    /// Whether the file ends with a terminator
    trailing_newline: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            file_path: None,
            line_ending: LineEnding::LF,
            trailing_newline: true,
        }
    }
}

/// Split file contents into lines, detecting the terminator in use
#[must_use]
pub fn split_lines(text: &str) -> (Vec<String>, LineEnding, bool) {
    if text.is_empty() {
        return (Vec::new(), LineEnding::LF, false);
    }
    let ending = if text.contains("\r\n") {
        LineEnding::CRLF
    } else {
        LineEnding::LF
    };
    let trailing = text.ends_with('\n');
    let body = text.strip_suffix('\n').unwrap_or(text);

    let lines = body
        .split('\n')
        .map(|line| match ending {
            LineEnding::CRLF => line.strip_suffix('\r').unwrap_or(line).to_string(),
            LineEnding::LF => line.to_string(),
        })
        .collect();
    (lines, ending, trailing)
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path`, returning the document and its lines.
    /// A missing file gives an empty buffer that will be created on save.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<String>)> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("{} does not exist yet", path.display());
                let doc = Self {
                    file_path: Some(path.to_path_buf()),
                    ..Self::default()
                };
                return Ok((doc, Vec::new()));
            }
            Err(e) => return Err(e.into()),
        };

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{} is not valid UTF-8; decoding lossily", path.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let (lines, line_ending, trailing_newline) = split_lines(&text);
        log::info!("opened {} ({} lines)", path.display(), lines.len());

        Ok((
            Self {
                file_path: Some(path.to_path_buf()),
                line_ending,
                trailing_newline,
            },
            lines,
        ))
    }

    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Join lines with this document's terminator
    #[must_use]
    pub fn join_lines(&self, lines: &[String]) -> String {
        let ending = self.line_ending.as_str();
        let mut text = lines.join(ending);
        if self.trailing_newline && !lines.is_empty() {
            text.push_str(ending);
        }
        text
    }

    /// Save lines to the document's path
    pub fn save(&self, lines: &[String]) -> Result<PathBuf> {
        let path = self.file_path.as_ref().ok_or_else(|| {
            QuillError::new(ErrorKind::Io, errors::IO_ERROR, "No file name")
        })?;
        self.write_to_file(path, lines)?;
        Ok(path.clone())
    }

    /// Where a last-resort copy of the buffer goes
    #[must_use]
    pub fn recovery_path(&self) -> PathBuf {
        match &self.file_path {
            Some(path) => {
                let mut name = path.as_os_str().to_owned();
                name.push(".");
                name.push(files::RECOVERED_SUFFIX);
                PathBuf::from(name)
            }
            None => PathBuf::from(files::UNNAMED_RECOVERY_FILE),
        }
    }

    /// Write lines to the recovery path without touching the original file
    pub fn save_recovery(&self, lines: &[String]) -> Result<PathBuf> {
        let path = self.recovery_path();
        self.write_to_file(&path, lines)?;
        log::warn!("wrote recovery copy to {}", path.display());
        Ok(path)
    }

    /// Get display name for UI (filename or "[No Name]")
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.file_path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(ui::NO_NAME)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Atomic write to file
    fn write_to_file(&self, path: &Path, lines: &[String]) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("file")
        ));

        let text = self.join_lines(lines);
        let written = (|| -> io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, path)
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(QuillError::new(
                ErrorKind::Io,
                errors::IO_ERROR,
                format!("failed to write {}: {}", path.display(), e),
            ));
        }
        Ok(())
    }
}
