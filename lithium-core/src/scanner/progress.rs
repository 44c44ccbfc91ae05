use std::path::PathBuf;

use crate::title::TitleRecord;

/// Index of a page in the configured page list
pub type PageId = usize;

/// UI mutation requested by the scan worker
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A title was discovered on a page
    TitleFound { page: PageId, record: TitleRecord },
    /// Re-sort the page's accumulated records
    SortPage { page: PageId },
    /// A rescan started; drop the page's records
    PageCleared { page: PageId },
    /// A root directory finished
    Progress(ScanProgress),
    /// Every page is exhausted and the path buffers are released
    PassComplete(ScanProgress),
}

/// Scanning progress statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    /// Number of directories opened, roots and title candidates
    pub dirs_scanned: u64,
    /// Number of titles emitted
    pub titles_found: u64,
    /// Number of unreadable paths or entries
    pub errors: u64,
    /// Root directory most recently finished
    pub current_path: Option<PathBuf>,
}
