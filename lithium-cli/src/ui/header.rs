use lithium_core::Library;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use super::progress::{progress_indicator, truncate_left};
use super::theme::Theme;

/// Header widget showing title, active page and scan status
pub struct Header<'a> {
    library: &'a Library,
    spinner_frame: usize,
    theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(library: &'a Library, spinner_frame: usize, theme: &'a Theme) -> Self {
        Self {
            library,
            spinner_frame,
            theme,
        }
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 1 {
            return;
        }

        let title = "LITHIUMX";
        let title_style = Style::default()
            .fg(self.theme.blue)
            .add_modifier(Modifier::BOLD);
        buf.set_string(area.x + 1, area.y, title, title_style);

        buf.set_string(
            area.x + 10,
            area.y,
            "─",
            Style::default().fg(self.theme.border),
        );

        // Selected title's folder
        let location = self
            .library
            .active_page()
            .and_then(|p| p.selected_record())
            .map(|r| r.folder.to_string_lossy().to_string())
            .unwrap_or_default();
        let max_len = area.width.saturating_sub(40) as usize;
        buf.set_string(
            area.x + 12,
            area.y,
            truncate_left(&location, max_len),
            Style::default().fg(self.theme.fg),
        );

        // Status (right-aligned)
        let (status, status_style) = if self.library.is_scanning() {
            (
                progress_indicator(self.library.progress(), self.spinner_frame),
                Style::default().fg(self.theme.yellow),
            )
        } else {
            (
                format!("{} titles", self.library.title_count()),
                Style::default().fg(self.theme.fg_dim),
            )
        };
        let status_x = (area.x + area.width).saturating_sub(status.chars().count() as u16 + 2);
        buf.set_string(status_x, area.y, &status, status_style);
    }
}

/// Row of page names with the active page highlighted
pub struct PageTabs<'a> {
    library: &'a Library,
    theme: &'a Theme,
}

impl<'a> PageTabs<'a> {
    pub fn new(library: &'a Library, theme: &'a Theme) -> Self {
        Self { library, theme }
    }
}

impl Widget for PageTabs<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let mut x = area.x + 1;
        let right = area.x + area.width;
        for (id, page) in self.library.pages().iter().enumerate() {
            let label = format!(" {} ({}) ", page.name, page.len());
            let width = label.chars().count() as u16;
            if x + width > right {
                break;
            }

            let style = if id == self.library.active() {
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg)
                    .add_modifier(Modifier::BOLD)
            } else if page.recent {
                Style::default().fg(self.theme.purple)
            } else {
                Style::default().fg(self.theme.fg_dim)
            };
            buf.set_string(x, area.y, &label, style);
            x += width + 1;
        }
    }
}
