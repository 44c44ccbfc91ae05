//! Page state owned by the UI thread.
//!
//! Scan results arrive as [`ScanEvent`]s and are applied here; nothing
//! outside the UI thread ever mutates a page.

use std::ops::Range;

use crate::config::PageConfig;
use crate::scanner::{PageId, ScanEvent, ScanProgress};
use crate::title::{TitleId, TitleRecord};

/// One page of titles with its cursor
#[derive(Debug, Clone)]
pub struct PageView {
    pub name: String,
    pub recent: bool,
    pub sorted: bool,
    records: Vec<TitleRecord>,
    selected: usize,
    scroll: usize,
}

impl PageView {
    pub fn new(config: &PageConfig) -> Self {
        Self {
            name: config.name.clone(),
            recent: config.recent,
            sorted: config.is_sorted(),
            records: Vec::new(),
            selected: 0,
            scroll: 0,
        }
    }

    pub fn records(&self) -> &[TitleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&TitleRecord> {
        self.records.get(self.selected)
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Stable, case-insensitive title sort that keeps the selection on the
    /// same record
    pub fn sort(&mut self) {
        let selected = self.selected_record().map(|r| r.id);
        self.records.sort_by_cached_key(TitleRecord::sort_key);
        if let Some(id) = selected {
            self.select_id(id);
        }
    }

    pub fn select_id(&mut self, id: TitleId) -> bool {
        match self.records.iter().position(|r| r.id == id) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    /// Move the selection by `delta` rows, clamped to the page
    pub fn move_selection(&mut self, delta: isize) {
        if self.records.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.records.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.records.len().saturating_sub(1);
    }

    /// Adjust scroll so the selection is inside a window of `height` rows
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + height {
            self.scroll = self.selected + 1 - height;
        }
        let max_scroll = self.records.len().saturating_sub(height);
        self.scroll = self.scroll.min(max_scroll);
    }

    /// Indices of the rows shown in a window of `height` rows
    pub fn visible_range(&self, height: usize) -> Range<usize> {
        let start = self.scroll.min(self.records.len());
        let end = (self.scroll + height).min(self.records.len());
        start..end
    }

    fn push(&mut self, record: TitleRecord) {
        self.records.push(record);
    }

    fn clear(&mut self) -> Vec<TitleRecord> {
        self.selected = 0;
        self.scroll = 0;
        std::mem::take(&mut self.records)
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.records.len().saturating_sub(1));
    }
}

/// All pages plus scan status
#[derive(Debug, Clone)]
pub struct Library {
    pages: Vec<PageView>,
    active: PageId,
    progress: ScanProgress,
    scanning: bool,
}

impl Library {
    pub fn new(pages: &[PageConfig]) -> Self {
        let pages: Vec<PageView> = pages.iter().map(PageView::new).collect();
        // Start on the first scanned page rather than the recent list
        let active = pages.iter().position(|p| !p.recent).unwrap_or(0);
        Self {
            pages,
            active,
            progress: ScanProgress::default(),
            scanning: true,
        }
    }

    /// Apply a scan event; returns records that left the library
    pub fn apply(&mut self, event: ScanEvent) -> Vec<TitleRecord> {
        match event {
            ScanEvent::TitleFound { page, record } => {
                if let Some(view) = self.pages.get_mut(page) {
                    view.push(record);
                }
            }
            ScanEvent::SortPage { page } => {
                if let Some(view) = self.pages.get_mut(page)
                    && view.sorted
                {
                    view.sort();
                }
            }
            ScanEvent::PageCleared { page } => {
                self.scanning = true;
                self.progress = ScanProgress::default();
                if let Some(view) = self.pages.get_mut(page) {
                    return view.clear();
                }
            }
            ScanEvent::Progress(progress) => self.progress = progress,
            ScanEvent::PassComplete(progress) => {
                self.progress = progress;
                self.scanning = false;
            }
        }
        Vec::new()
    }

    /// Replace the recent page's contents, newest first
    pub fn load_recent(&mut self, records: Vec<TitleRecord>) -> Vec<TitleRecord> {
        let Some(view) = self.recent_page_mut() else {
            return Vec::new();
        };
        let old = view.clear();
        for record in records {
            view.push(record);
        }
        old
    }

    /// Move or insert `record` at the front of the recent page, keeping at
    /// most `limit` entries. Returns the pruned records.
    pub fn push_recent(&mut self, record: TitleRecord, limit: usize) -> Vec<TitleRecord> {
        let Some(view) = self.recent_page_mut() else {
            return Vec::new();
        };
        view.records.retain(|r| r.id != record.id);
        view.records.insert(0, record);
        let pruned = if view.records.len() > limit {
            view.records.split_off(limit)
        } else {
            Vec::new()
        };
        view.clamp_selection();
        pruned
    }

    fn recent_page_mut(&mut self) -> Option<&mut PageView> {
        self.pages.iter_mut().find(|p| p.recent)
    }

    pub fn pages(&self) -> &[PageView] {
        &self.pages
    }

    pub fn page(&self, page: PageId) -> Option<&PageView> {
        self.pages.get(page)
    }

    pub fn active(&self) -> PageId {
        self.active
    }

    pub fn active_page(&self) -> Option<&PageView> {
        self.pages.get(self.active)
    }

    pub fn active_page_mut(&mut self) -> Option<&mut PageView> {
        self.pages.get_mut(self.active)
    }

    pub fn next_page(&mut self) {
        if !self.pages.is_empty() {
            self.active = (self.active + 1) % self.pages.len();
        }
    }

    pub fn prev_page(&mut self) {
        if !self.pages.is_empty() {
            self.active = (self.active + self.pages.len() - 1) % self.pages.len();
        }
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Whether any page still lists `id`
    pub fn contains(&self, id: TitleId) -> bool {
        self.pages
            .iter()
            .any(|p| p.records.iter().any(|r| r.id == id))
    }

    /// Total titles across scanned pages
    pub fn title_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.recent).map(PageView::len).sum()
    }
}
