use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, info, trace, warn};

use super::cursor::{CursorOp, ScanCursor};
use super::progress::{PageId, ScanEvent, ScanProgress};
use crate::catalog::TitleSink;
use crate::config::{PageConfig, ScanSettings};
use crate::title::TitleRecord;

/// Cancellation token for stopping scans
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// What a single `step` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One filesystem operation was performed
    Worked,
    /// The pass just finished and path buffers were released
    PassComplete,
    /// Nothing left to do until a rescan
    Idle,
}

/// Per-page bookkeeping alongside the cursor
#[derive(Debug, Default)]
struct PageState {
    found: usize,
    since_sort: usize,
    limit_warned: bool,
}

/// Incremental title scanner.
///
/// Each `step` performs exactly one filesystem operation for one page,
/// rotating through pages round-robin, and reports its results as
/// [`ScanEvent`]s. Nothing here touches UI state directly.
pub struct ScanWorker {
    pages: Vec<PageConfig>,
    settings: ScanSettings,
    cursors: Vec<ScanCursor>,
    state: Vec<PageState>,
    next_page: usize,
    progress: ScanProgress,
    finished: bool,
    events: Sender<ScanEvent>,
    catalog: Option<Box<dyn TitleSink>>,
}

impl ScanWorker {
    pub fn new(pages: Vec<PageConfig>, settings: ScanSettings, events: Sender<ScanEvent>) -> Self {
        let mut worker = Self {
            pages,
            settings,
            cursors: Vec::new(),
            state: Vec::new(),
            next_page: 0,
            progress: ScanProgress::default(),
            finished: false,
            events,
            catalog: None,
        };
        worker.reset();
        worker
    }

    /// Write every discovered title to `sink` as well
    pub fn with_catalog(mut self, sink: Box<dyn TitleSink>) -> Self {
        self.catalog = Some(sink);
        self
    }

    pub fn cursor(&self, page: PageId) -> Option<&ScanCursor> {
        self.cursors.get(page)
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Start a new pass over the configured pages
    pub fn rescan(&mut self) {
        for (page, config) in self.pages.iter().enumerate() {
            if !config.recent {
                self.emit(ScanEvent::PageCleared { page });
            }
        }
        self.reset();
        info!(pages = self.pages.len(), "rescan started");
    }

    fn reset(&mut self) {
        self.cursors = self
            .pages
            .iter()
            .map(|p| ScanCursor::new(if p.recent { Vec::new() } else { p.paths.clone() }))
            .collect();
        self.state = self.pages.iter().map(|_| PageState::default()).collect();
        self.next_page = 0;
        self.progress = ScanProgress::default();
        self.finished = false;
    }

    /// Perform one pending filesystem operation
    pub fn step(&mut self) -> StepOutcome {
        if self.finished {
            return StepOutcome::Idle;
        }

        let count = self.cursors.len();
        let next = (0..count)
            .map(|offset| (self.next_page + offset) % count)
            .find(|&page| self.cursors[page].remaining() > 0);

        let Some(page) = next else {
            self.finish_pass();
            return StepOutcome::PassComplete;
        };
        self.next_page = (page + 1) % count;

        match self.cursors[page].next_op() {
            CursorOp::OpenRoot(path) => self.open_root(page, &path),
            CursorOp::ReadEntry => self.read_entry(page),
            CursorOp::ScanSubdir(dir) => self.scan_subdir(page, &dir),
            CursorOp::Exhausted => {}
        }
        StepOutcome::Worked
    }

    /// Step until the pass completes; returns the number of operations
    pub fn run_pass(&mut self) -> usize {
        let mut ops = 0;
        while self.step() == StepOutcome::Worked {
            ops += 1;
        }
        ops
    }

    fn open_root(&mut self, page: PageId, path: &Path) {
        if !self.cursors[page].claim_root(path) {
            debug!(page, path = %path.display(), "search path already scanned this pass");
            self.cursors[page].advance();
            if self.cursors[page].remaining() == 0 {
                self.sort(page);
            }
            return;
        }

        match fs::read_dir(path) {
            Ok(dir) => {
                debug!(page, path = %path.display(), "opened search path");
                self.progress.dirs_scanned += 1;
                self.cursors[page].opened(dir);
            }
            Err(e) => {
                warn!(page, path = %path.display(), error = %e, "cannot open search path, skipping");
                self.progress.errors += 1;
                self.finish_root(page, path.to_path_buf());
            }
        }
    }

    fn read_entry(&mut self, page: PageId) {
        let cursor = &mut self.cursors[page];
        let Some(dir) = cursor.root_mut() else { return };

        match dir.next() {
            Some(Ok(entry)) => {
                let path = entry.path();
                // Follows symlinks, unlike DirEntry::file_type
                if path.is_dir() && !cursor.queue_subdir(path.clone()) {
                    trace!(path = %path.display(), "directory already scanned this pass");
                }
            }
            Some(Err(e)) => {
                warn!(page, error = %e, "unreadable directory entry");
                self.progress.errors += 1;
            }
            None => {
                let root = cursor.current_root().map(Path::to_path_buf).unwrap_or_default();
                self.finish_root(page, root);
            }
        }
    }

    fn scan_subdir(&mut self, page: PageId, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "cannot open subdirectory, skipping");
                self.progress.errors += 1;
                return;
            }
        };
        self.progress.dirs_scanned += 1;

        let mut executable = None;
        let mut thumbnail = None;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.eq_ignore_ascii_case(&self.settings.marker) {
                executable = Some(entry.path());
            } else if name.eq_ignore_ascii_case(&self.settings.thumbnail) {
                thumbnail = Some(entry.path());
            }
        }

        let Some(executable) = executable else {
            trace!(path = %dir.display(), "no launch marker");
            return;
        };
        if thumbnail.is_none() {
            trace!(path = %dir.display(), "title has no thumbnail");
        }

        let state = &mut self.state[page];
        if state.found >= self.settings.max_items_per_page {
            if !state.limit_warned {
                warn!(
                    page,
                    limit = self.settings.max_items_per_page,
                    "page is full, ignoring further titles"
                );
                state.limit_warned = true;
            }
            return;
        }

        let record = TitleRecord::discover(dir, executable, thumbnail, &self.settings);
        if let Some(catalog) = self.catalog.as_mut()
            && let Err(e) = catalog.record_title(page, &record)
        {
            warn!(title = %record.title, error = %e, "failed to write title to catalog");
        }

        debug!(page, title = %record.title, source = record.source.as_str(), "title found");
        self.emit(ScanEvent::TitleFound { page, record });
        self.progress.titles_found += 1;

        let state = &mut self.state[page];
        state.found += 1;
        state.since_sort += 1;
        if state.since_sort >= self.settings.resort_interval {
            self.sort(page);
        }
    }

    fn finish_root(&mut self, page: PageId, root: PathBuf) {
        self.cursors[page].advance();
        self.progress.current_path = Some(root);
        self.emit(ScanEvent::Progress(self.progress.clone()));

        if self.cursors[page].remaining() == 0 {
            debug!(page, titles = self.state[page].found, "page exhausted");
            self.sort(page);
        }
    }

    fn sort(&mut self, page: PageId) {
        self.state[page].since_sort = 0;
        if self.pages[page].is_sorted() {
            self.emit(ScanEvent::SortPage { page });
        }
    }

    fn finish_pass(&mut self) {
        for cursor in &mut self.cursors {
            cursor.release();
        }
        self.finished = true;
        info!(
            titles = self.progress.titles_found,
            dirs = self.progress.dirs_scanned,
            errors = self.progress.errors,
            "scan pass complete"
        );
        self.emit(ScanEvent::PassComplete(self.progress.clone()));
    }

    fn emit(&self, event: ScanEvent) {
        let _ = self.events.send(event);
    }

    /// Run the worker on its own thread
    pub fn spawn(self, cancel: CancellationToken) -> crate::Result<ScanHandle> {
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let thread_cancel = cancel.clone();
        let thread = std::thread::Builder::new()
            .name("title-scan".to_string())
            .spawn(move || run(self, control_rx, thread_cancel))?;

        Ok(ScanHandle {
            control: control_tx,
            cancel,
            thread: Some(thread),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Rescan,
    Shutdown,
}

fn run(mut worker: ScanWorker, control: Receiver<Control>, cancel: CancellationToken) {
    while !cancel.is_cancelled() {
        match control.try_recv() {
            Ok(Control::Rescan) => worker.rescan(),
            Ok(Control::Shutdown) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match worker.step() {
            StepOutcome::Worked => std::thread::yield_now(),
            StepOutcome::PassComplete => {}
            StepOutcome::Idle => match control.recv() {
                Ok(Control::Rescan) => worker.rescan(),
                Ok(Control::Shutdown) | Err(_) => break,
            },
        }
    }
    debug!("scan worker stopped");
}

/// Owner side of a running [`ScanWorker`]
pub struct ScanHandle {
    control: Sender<Control>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Ask the worker to start a new pass
    pub fn rescan(&self) {
        let _ = self.control.send(Control::Rescan);
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the worker and wait for its thread
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        let _ = self.control.send(Control::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
