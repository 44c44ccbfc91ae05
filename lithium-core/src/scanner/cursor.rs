use std::collections::HashSet;
use std::fs::ReadDir;
use std::path::{Path, PathBuf};

/// Position of one page's scan.
///
/// Roots are visited in order. At most one root directory is open at a time
/// and at most one subdirectory waits to be scanned for the launch marker.
#[derive(Debug)]
pub struct ScanCursor {
    paths: Vec<PathBuf>,
    path_index: usize,
    root: Option<ReadDir>,
    pending: Option<PathBuf>,
    /// Subdirectories already scanned this pass
    visited: HashSet<PathBuf>,
    /// Roots already enumerated this pass
    roots: HashSet<PathBuf>,
}

/// Next filesystem operation a cursor needs
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CursorOp {
    OpenRoot(PathBuf),
    ReadEntry,
    ScanSubdir(PathBuf),
    Exhausted,
}

impl ScanCursor {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            path_index: 0,
            root: None,
            pending: None,
            visited: HashSet::new(),
            roots: HashSet::new(),
        }
    }

    /// Number of root paths not yet exhausted or skipped
    pub fn remaining(&self) -> usize {
        self.paths.len().saturating_sub(self.path_index)
    }

    /// Whether any path storage is still held
    pub fn has_path_buffers(&self) -> bool {
        self.paths.capacity() > 0
            || self.root.is_some()
            || self.pending.is_some()
            || self.visited.capacity() > 0
            || self.roots.capacity() > 0
    }

    /// Root path currently being enumerated or about to be opened
    pub fn current_root(&self) -> Option<&Path> {
        self.paths.get(self.path_index).map(PathBuf::as_path)
    }

    pub(crate) fn next_op(&mut self) -> CursorOp {
        if let Some(dir) = self.pending.take() {
            return CursorOp::ScanSubdir(dir);
        }
        if self.root.is_some() {
            return CursorOp::ReadEntry;
        }
        match self.current_root() {
            Some(path) => CursorOp::OpenRoot(path.to_path_buf()),
            None => CursorOp::Exhausted,
        }
    }

    pub(crate) fn opened(&mut self, dir: ReadDir) {
        self.root = Some(dir);
    }

    pub(crate) fn root_mut(&mut self) -> Option<&mut ReadDir> {
        self.root.as_mut()
    }

    /// Record a root about to be opened; false if the same directory was
    /// already enumerated this pass under another spelling
    pub(crate) fn claim_root(&mut self, path: &Path) -> bool {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.roots.insert(key)
    }

    /// Queue a subdirectory unless it was already scanned this pass
    pub(crate) fn queue_subdir(&mut self, dir: PathBuf) -> bool {
        let key = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        if !self.visited.insert(key) {
            return false;
        }
        self.pending = Some(dir);
        true
    }

    /// Close the current root and move to the next path
    pub(crate) fn advance(&mut self) {
        self.root = None;
        self.pending = None;
        if self.path_index < self.paths.len() {
            self.path_index += 1;
        }
    }

    /// Drop all path storage once the pass is over
    pub(crate) fn release(&mut self) {
        self.paths = Vec::new();
        self.path_index = 0;
        self.root = None;
        self.pending = None;
        self.visited = HashSet::new();
        self.roots = HashSet::new();
    }
}
