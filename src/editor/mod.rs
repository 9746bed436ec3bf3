//! Editor core
//! Main editor logic that ties everything together

/// ## editor/ Invariants
///
/// - Only the main loop mutates the buffer; background jobs only read it.
/// - Every key's buffer mutations are published inside one batch.
/// - Save and quit requests travel through the event core as system events.
/// - Recovery and last-resort saves run on the main loop, never inside a
///   handler.
/// - The terminal is restored on every exit path.
use crate::buffer::{Buffer, Position};
use crate::clock::{self, Timestamp};
use crate::command::{translate_key, Command};
use crate::config::Config;
use crate::constants::{defaults, errors, ui};
use crate::cursor::Cursor;
use crate::document::Document;
use crate::error::manager::ErrorManager;
use crate::error::{ErrorKind, EventError, QuillError, Result};
use crate::event::{
    self, BusConfig, Event, EventBus, EventData, EventKind, FileEvent, ShutdownSignal,
    SystemEvent, UiEvent,
};
use crate::job_manager::jobs::{take_snapshot, ErrorStatsJob, SnapshotJob};
use crate::job_manager::{JobManager, JobMessage};
use crate::key::Key;
use crate::notification::NotificationManager;
use crate::recovery::{requires_recovery, RecoveryManager};
use crate::row::Row;
use crate::snapshot::{SnapshotConfig, SnapshotManager};
use crate::term::TerminalBackend;
use crate::viewport::Viewport;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// Job messages handled per loop iteration
const MAX_JOB_MESSAGES: usize = 10;

/// Rows reserved below the text area (status bar and message line)
const RESERVED_ROWS: usize = 2;

/// Work forwarded from event core handlers to the main loop
enum Inbound {
    System(SystemEvent),
    Error(EventError),
}

/// Main editor struct
pub struct Editor<T: TerminalBackend> {
    /// Terminal backend
    pub term: T,
    buffer: Arc<RwLock<Buffer>>,
    cursor: Cursor,
    document: Document,
    bus: Arc<EventBus>,
    snapshots: Arc<SnapshotManager>,
    recovery: RecoveryManager,
    errors: ErrorManager,
    /// Background job manager
    pub job_manager: JobManager,
    viewport: Viewport,
    config: Config,
    inbox: Receiver<Inbound>,
    redraw: Arc<AtomicBool>,
    /// Set after a refused quit; the next quit discards changes
    quit_armed: bool,
    should_quit: bool,
    terminal_active: bool,
}

impl<T: TerminalBackend> Editor<T> {
    /// Create a new editor, loading `file_path` if given
    pub fn new(mut terminal: T, file_path: Option<PathBuf>, config: Config) -> Result<Self> {
        // Load the document before touching the terminal so a failed open
        // leaves the screen alone
        let (document, mut lines) = match &file_path {
            Some(path) => Document::open(path)?,
            None => (Document::new(), Vec::new()),
        };
        if lines.is_empty() {
            lines.push(String::new());
        }
        let line_total = lines.len();

        let shutdown = ShutdownSignal::new();
        let bus = Arc::new(EventBus::with_shutdown(
            BusConfig {
                max_depth: config.max_event_depth,
            },
            shutdown.clone(),
        ));
        let snapshots = Arc::new(SnapshotManager::new(SnapshotConfig {
            capacity: config.snapshot_capacity,
            dir: config.snapshot_dir.clone(),
            document: file_path.clone(),
        })?);
        let recovery = RecoveryManager::new(
            Arc::clone(&snapshots),
            config.recovery_strategy,
            Arc::clone(&bus),
        );
        let mut errors = ErrorManager::new(NotificationManager::with_duration(
            config.status_duration,
        ));

        match snapshots.load_persisted(&lines) {
            Ok(0) => {}
            Ok(n) => log::info!("loaded {} persisted snapshots", n),
            Err(e) => errors.handle(e),
        }

        let (tx, inbox) = mpsc::channel();
        let error_tx = tx.clone();
        bus.set_global_error_handler(move |error| {
            let _ = error_tx.send(Inbound::Error(error.clone()));
        });
        bus.set_system_handler(move |event| {
            if let EventData::System(system) = &event.data {
                let _ = tx.send(Inbound::System(system.clone()));
            }
            Ok(())
        });
        bus.subscribe(EventKind::Buffer, event::validate);
        let redraw = Arc::new(AtomicBool::new(true));
        let redraw_flag = Arc::clone(&redraw);
        bus.subscribe(EventKind::Ui, move |_| {
            redraw_flag.store(true, Ordering::Release);
            Ok(())
        });

        terminal.init().map_err(terminal_error)?;
        let size = match terminal.get_size() {
            Ok(size) => size,
            Err(e) => {
                terminal.deinit();
                return Err(terminal_error(e));
            }
        };
        let viewport = Viewport::new(
            (size.rows as usize).saturating_sub(RESERVED_ROWS),
            size.cols as usize,
        );

        let mut buffer = Buffer::new();
        let loaded = buffer.load_content(lines);
        let buffer = Arc::new(RwLock::new(buffer));

        let mut job_manager = JobManager::new(shutdown);
        job_manager.spawn(SnapshotJob::new(
            Arc::clone(&buffer),
            Arc::clone(&bus),
            Arc::clone(&snapshots),
            config.snapshot_interval,
        ));
        job_manager.spawn(ErrorStatsJob::new(
            errors.stats(),
            Arc::clone(&bus),
            Duration::from_secs(defaults::STATS_INTERVAL_SECS),
        ));

        let editor = Self {
            term: terminal,
            buffer,
            cursor: Cursor::new(),
            document,
            bus,
            snapshots,
            recovery,
            errors,
            job_manager,
            viewport,
            config,
            inbox,
            redraw,
            quit_armed: false,
            should_quit: false,
            terminal_active: true,
        };

        editor.bus.publish(loaded);
        if let Some(path) = editor.document.path() {
            editor.bus.publish(Event::file(FileEvent::Loaded {
                path: path.display().to_string(),
                lines: line_total,
            }));
        }
        Ok(editor)
    }

    /// Run the editor main loop
    pub fn run(&mut self) -> Result<()> {
        self.render()?;

        while !self.should_quit {
            let mut changed = self.process_job_messages();
            changed |= self.process_inbox();

            let timeout = Duration::from_millis(defaults::POLL_TIMEOUT_MS);
            if let Some(key) = self.term.poll_key(timeout).map_err(terminal_error)? {
                self.handle_key(key);
                changed = true;
            }

            let generation = self.errors.notifications().generation;
            self.errors.notifications_mut().prune_expired();
            changed |= generation != self.errors.notifications().generation;
            changed |= self.redraw.swap(false, Ordering::AcqRel);

            if changed && !self.should_quit {
                self.render()?;
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Apply one key, then settle everything it triggered
    pub fn handle_key(&mut self, key: Key) {
        let command = translate_key(key);
        if command != Command::Quit {
            self.quit_armed = false;
        }
        let bus = Arc::clone(&self.bus);
        bus.batch(|| self.execute(command));
        self.process_inbox();
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::MoveLeft => self.motion(|c, b| c.move_left(b)),
            Command::MoveRight => self.motion(|c, b| c.move_right(b)),
            Command::MoveUp => self.motion(|c, b| c.move_up(b)),
            Command::MoveDown => self.motion(|c, b| c.move_down(b)),
            Command::MoveToLineStart => self.motion(|c, _| c.move_home()),
            Command::MoveToLineEnd => self.motion(|c, b| c.move_end(b)),
            Command::PageUp => {
                let page = self.viewport.visible_rows();
                self.motion(|c, b| c.page_up(b, page));
            }
            Command::PageDown => {
                let page = self.viewport.visible_rows();
                self.motion(|c, b| c.page_down(b, page));
            }
            Command::InsertChar(ch) => self.insert_char(ch),
            Command::InsertTab => {
                for _ in 0..self.config.tab_width {
                    self.insert_char(' ');
                }
            }
            Command::InsertNewline => self.insert_newline(),
            Command::DeleteBackward => self.delete_backward(),
            Command::DeleteForward => {
                let moved = self.cursor.move_right(&self.buffer.read());
                if moved {
                    self.delete_backward();
                }
            }
            Command::Save => {
                let path = self.document.path().map(|p| p.display().to_string());
                self.bus.publish(Event::system(SystemEvent::Save { path }));
            }
            Command::Quit => {
                let force = self.quit_armed;
                self.bus.publish(Event::system(SystemEvent::Quit { force }));
            }
            Command::Recover => self.recover_latest(),
            Command::Resize(cols, rows) => {
                self.viewport.set_size(
                    (rows as usize).saturating_sub(RESERVED_ROWS),
                    cols as usize,
                );
                self.bus.publish(Event::ui(UiEvent::Resize { rows, cols }));
            }
            Command::Noop => {}
        }
    }

    fn motion(&mut self, apply: impl FnOnce(&mut Cursor, &Buffer) -> bool) {
        let moved = apply(&mut self.cursor, &*self.buffer.read());
        if moved {
            self.bus.publish(self.cursor.moved_event());
        }
    }

    /// Publish an edit's event followed by the cursor motion it caused
    fn publish_edit(&mut self, event: Option<Event>, cursor_to: Position) {
        let Some(event) = event else {
            return;
        };
        let moved = self.cursor.move_to(cursor_to, &self.buffer.read());
        self.bus.publish(event);
        if moved {
            self.bus.publish(self.cursor.moved_event());
        }
    }

    fn insert_char(&mut self, ch: char) {
        let pos = self.cursor.position();
        let event = self.buffer.write().insert_char(pos, ch);
        self.publish_edit(event, Position::new(pos.x + 1, pos.y));
    }

    fn insert_newline(&mut self) {
        let pos = self.cursor.position();
        let event = self.buffer.write().insert_newline(pos);
        self.publish_edit(event, Position::new(0, pos.y + 1));
    }

    fn delete_backward(&mut self) {
        let pos = self.cursor.position();
        let (event, target) = {
            let mut buffer = self.buffer.write();
            let target = if pos.x > 0 {
                Position::new(pos.x - 1, pos.y)
            } else if pos.y > 0 {
                Position::new(buffer.line_len(pos.y - 1), pos.y - 1)
            } else {
                pos
            };
            (buffer.delete_char(pos), target)
        };
        self.publish_edit(event, target);
    }

    /// Take a snapshot of the events recorded since the last one
    pub fn snapshot_now(&mut self) -> Result<Option<Timestamp>> {
        take_snapshot(&self.buffer, &self.bus, &self.snapshots)
    }

    fn recover_latest(&mut self) {
        let result = self
            .snapshots
            .request_state_recovery(clock::now(), &mut *self.buffer.write());
        match result {
            Ok((timestamp, event)) => {
                self.after_restore(event);
                log::info!("manual recovery restored snapshot {}", timestamp);
                self.errors
                    .notifications_mut()
                    .info("Restored latest snapshot");
            }
            Err(e) => self.errors.handle(e),
        }
    }

    fn after_restore(&mut self, event: Event) {
        self.bus.publish(event);
        if self.cursor.clamp(&self.buffer.read()) {
            self.bus.publish(self.cursor.moved_event());
        }
        self.redraw.store(true, Ordering::Release);
    }

    /// Handle everything handlers forwarded; returns whether anything arrived
    fn process_inbox(&mut self) -> bool {
        let mut any = false;
        while let Ok(message) = self.inbox.try_recv() {
            any = true;
            match message {
                Inbound::System(system) => self.handle_system(system),
                Inbound::Error(error) => self.handle_error(error),
            }
        }
        any
    }

    fn handle_system(&mut self, system: SystemEvent) {
        match system {
            SystemEvent::Save { .. } => self.save(),
            SystemEvent::Quit { force } => {
                if !force && self.buffer.read().is_dirty() {
                    self.quit_armed = true;
                    self.errors.handle(QuillError::warning(
                        ErrorKind::Validation,
                        errors::UNSAVED_CHANGES,
                        errors::MSG_UNSAVED_CHANGES,
                    ));
                } else {
                    self.should_quit = true;
                }
            }
            SystemEvent::Status { message, severity } => {
                self.errors.notifications_mut().notify(severity, message);
            }
        }
    }

    fn save(&mut self) {
        let lines = self.buffer.read().get_all_lines();
        match self.document.save(&lines) {
            Ok(path) => {
                let clean = self.buffer.write().set_dirty(false);
                if let Some(event) = clean {
                    self.bus.publish(event);
                }
                let path = path.display().to_string();
                self.errors
                    .notifications_mut()
                    .success(format!("Written {} lines to {}", lines.len(), path));
                self.bus.publish(Event::file(FileEvent::Saved {
                    path,
                    lines: lines.len(),
                }));
            }
            Err(e) => self.errors.handle(e),
        }
    }

    fn handle_error(&mut self, error: EventError) {
        let needs_recovery = requires_recovery(&error.error);
        let unrecoverable = error.error.kind == ErrorKind::Recovery;
        self.errors.handle_event_error(error.clone());

        if needs_recovery {
            let result = self.recovery.recover(&error, &mut *self.buffer.write());
            // failures were already reported to the global handler
            if let Ok((report, event)) = result {
                self.after_restore(event);
                self.errors.notifications_mut().info(report.to_string());
            }
        } else if unrecoverable {
            self.last_resort_save(&error.error);
        }
    }

    /// Write the in-memory lines next to the document before giving up
    fn last_resort_save(&mut self, cause: &QuillError) {
        let lines = self.buffer.read().get_all_lines();
        match self.document.save_recovery(&lines) {
            Ok(path) => {
                log::error!("buffer saved to {} after: {}", path.display(), cause);
                self.errors.notifications_mut().critical(format!(
                    "{}; buffer saved to {}",
                    cause.message,
                    path.display()
                ));
            }
            Err(e) => {
                log::error!("last-resort save failed: {}", e);
                self.errors.notifications_mut().critical(format!(
                    "{}; last-resort save failed: {}",
                    cause.message, e.message
                ));
            }
        }
    }

    fn process_job_messages(&mut self) -> bool {
        let mut processed = 0;
        while processed < MAX_JOB_MESSAGES {
            let Ok(message) = self.job_manager.receiver().try_recv() else {
                break;
            };
            self.job_manager.update_job_state(&message);
            match &message {
                JobMessage::SnapshotTaken(_, ts) => log::debug!("snapshot {} taken", ts),
                JobMessage::Cancelled(id) => log::debug!("job {} stopped", id),
                JobMessage::Started(_) => {}
            }
            processed += 1;
        }
        if processed > 0 {
            self.job_manager.cleanup_finished_jobs();
        }
        processed > 0
    }

    /// Draw the text area, status bar and message line
    pub fn render(&mut self) -> Result<()> {
        let buffer = self.buffer.read();
        let cursor_col = self.cursor.screen_column(&buffer);
        self.viewport
            .update(self.cursor.y(), cursor_col, buffer.line_count());
        let rows = self.viewport.visible_rows();
        let cols = self.viewport.visible_cols();
        let top = self.viewport.top_line();
        let left = self.viewport.left_col();

        let term = &mut self.term;
        term.hide_cursor().map_err(terminal_error)?;
        for screen_row in 0..rows {
            term.move_cursor(screen_row as u16, 0)
                .map_err(terminal_error)?;
            let written = match buffer.get_row(top + screen_row) {
                Some(row) => term.write(row.visible_slice(left, cols).as_bytes()),
                None => term.write(ui::EMPTY_LINE.as_bytes()),
            };
            written.map_err(terminal_error)?;
            term.clear_to_end_of_line().map_err(terminal_error)?;
        }

        let status = status_text(&self.document, &buffer, &self.cursor, cols);
        term.move_cursor(rows as u16, 0).map_err(terminal_error)?;
        term.set_reverse(true).map_err(terminal_error)?;
        term.write(status.as_bytes()).map_err(terminal_error)?;
        term.set_reverse(false).map_err(terminal_error)?;

        term.move_cursor((rows + 1) as u16, 0)
            .map_err(terminal_error)?;
        term.clear_to_end_of_line().map_err(terminal_error)?;
        if let Some(notification) = self.errors.notifications().latest() {
            let message = Row::new(notification.message.as_str());
            term.write(message.visible_slice(0, cols).as_bytes())
                .map_err(terminal_error)?;
        }

        let screen_y = self.cursor.y().saturating_sub(top);
        let screen_x = cursor_col.saturating_sub(left);
        term.move_cursor(screen_y as u16, screen_x as u16)
            .map_err(terminal_error)?;
        term.show_cursor().map_err(terminal_error)?;
        Ok(())
    }

    /// Stop background work and restore the terminal; safe to call twice
    pub fn shutdown(&mut self) {
        self.bus.shutdown();
        self.job_manager.join_all();
        if self.terminal_active {
            self.term.deinit();
            self.terminal_active = false;
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &Arc<RwLock<Buffer>> {
        &self.buffer
    }

    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    #[must_use]
    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationManager {
        self.errors.notifications()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

impl<T: TerminalBackend> Drop for Editor<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn terminal_error(message: String) -> QuillError {
    QuillError::new(ErrorKind::Resource, errors::TERMINAL_FAILED, message)
}

/// Status bar: name, dirty marker and line count on the left, cursor on the right
fn status_text(document: &Document, buffer: &Buffer, cursor: &Cursor, cols: usize) -> String {
    let dirty = if buffer.is_dirty() {
        format!(" {}", ui::DIRTY_MARKER)
    } else {
        String::new()
    };
    let left = format!(
        " {}{} - {} lines",
        document.display_name(),
        dirty,
        buffer.line_count()
    );
    let right = format!("{}:{} ", cursor.y() + 1, cursor.x() + 1);

    let used = left.width() + right.width();
    if used >= cols {
        return Row::new(left).visible_slice(0, cols).to_string();
    }
    format!("{}{}{}", left, " ".repeat(cols - used), right)
}
