use std::path::PathBuf;

use lithium_core::{Library, PageConfig, TitleId, TitleRecord};

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Browsing pages
    Browsing,
    /// Showing help overlay
    Help,
}

/// Application state
pub struct AppState {
    /// Current mode
    pub mode: AppMode,
    /// Pages and scan status
    pub library: Library,
    /// Visible list height (set by UI)
    pub visible_height: usize,
    /// Whether app should quit
    pub should_quit: bool,
    /// Spinner frame for animation
    pub spinner_frame: usize,
    /// Last launch or rescan message
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(pages: &[PageConfig]) -> Self {
        Self {
            mode: AppMode::Browsing,
            library: Library::new(pages),
            visible_height: 20,
            should_quit: false,
            spinner_frame: 0,
            status_message: None,
        }
    }

    /// Advance spinner animation
    pub fn tick_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % 10;
    }

    pub fn selected_record(&self) -> Option<&TitleRecord> {
        self.library.active_page()?.selected_record()
    }

    /// Titles on screen with their thumbnail paths; the flag marks the
    /// selected row
    pub fn visible_thumbnails(&self) -> Vec<(TitleId, PathBuf, bool)> {
        let Some(page) = self.library.active_page() else {
            return Vec::new();
        };
        page.visible_range(self.visible_height)
            .filter_map(|index| {
                let record = &page.records()[index];
                let path = record.thumbnail.clone()?;
                Some((record.id, path, index == page.selected()))
            })
            .collect()
    }

    fn move_by(&mut self, delta: isize) {
        let height = self.visible_height;
        if let Some(page) = self.library.active_page_mut() {
            page.move_selection(delta);
            page.ensure_visible(height);
        }
    }

    /// Move selection up
    pub fn move_up(&mut self) {
        self.move_by(-1);
    }

    /// Move selection down
    pub fn move_down(&mut self) {
        self.move_by(1);
    }

    /// Move selection up by a page
    pub fn page_up(&mut self) {
        let page_size = self.visible_height.saturating_sub(2).max(1);
        self.move_by(-(page_size as isize));
    }

    /// Move selection down by a page
    pub fn page_down(&mut self) {
        let page_size = self.visible_height.saturating_sub(2).max(1);
        self.move_by(page_size as isize);
    }

    /// Go to first title
    pub fn go_to_first(&mut self) {
        let height = self.visible_height;
        if let Some(page) = self.library.active_page_mut() {
            page.select_first();
            page.ensure_visible(height);
        }
    }

    /// Go to last title
    pub fn go_to_last(&mut self) {
        let height = self.visible_height;
        if let Some(page) = self.library.active_page_mut() {
            page.select_last();
            page.ensure_visible(height);
        }
    }

    pub fn next_page(&mut self) {
        self.library.next_page();
    }

    pub fn prev_page(&mut self) {
        self.library.prev_page();
    }

    /// Show help overlay
    pub fn show_help(&mut self) {
        self.mode = AppMode::Help;
    }

    /// Hide help overlay
    pub fn hide_help(&mut self) {
        self.mode = AppMode::Browsing;
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }
}
