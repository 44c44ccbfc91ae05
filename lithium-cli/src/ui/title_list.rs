use lithium_core::PageView;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Widget},
};

use super::progress::truncate_right;
use super::theme::Theme;

/// Thumbnail availability shown in the list gutter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbState {
    Ready,
    Loading,
    Missing,
}

impl ThumbState {
    fn glyph(self) -> &'static str {
        match self {
            ThumbState::Ready => "●",
            ThumbState::Loading => "○",
            ThumbState::Missing => "·",
        }
    }
}

/// Scrollable list of a page's titles
pub struct TitleList<'a, F> {
    page: &'a PageView,
    thumb_state: F,
    theme: &'a Theme,
}

impl<'a, F: Fn(usize) -> ThumbState> TitleList<'a, F> {
    pub fn new(page: &'a PageView, thumb_state: F, theme: &'a Theme) -> Self {
        Self {
            page,
            thumb_state,
            theme,
        }
    }
}

impl<F: Fn(usize) -> ThumbState> Widget for TitleList<'_, F> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(Style::default().fg(self.theme.border));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 1 || inner.width < 10 {
            return;
        }

        if self.page.is_empty() {
            let message = if self.page.recent {
                "Nothing launched yet"
            } else {
                "No titles found"
            };
            buf.set_string(
                inner.x + 1,
                inner.y,
                message,
                Style::default().fg(self.theme.fg_muted),
            );
            return;
        }

        let records = self.page.records();
        let dev_width = (inner.width as usize / 3).min(24);
        let name_width = (inner.width as usize).saturating_sub(dev_width + 4);

        for (row, index) in self.page.visible_range(inner.height as usize).enumerate() {
            let record = &records[index];
            let y = inner.y + row as u16;
            let is_cursor = index == self.page.selected();

            let row_style = if is_cursor {
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg)
            } else {
                Style::default().fg(self.theme.fg).bg(self.theme.bg)
            };

            // Clear the row
            for x in 0..inner.width {
                buf.set_string(inner.x + x, y, " ", row_style);
            }

            let state = (self.thumb_state)(index);
            let glyph_style = if is_cursor {
                row_style
            } else {
                let color = match state {
                    ThumbState::Ready => self.theme.green,
                    ThumbState::Loading => self.theme.yellow,
                    ThumbState::Missing => self.theme.fg_muted,
                };
                Style::default().fg(color).bg(self.theme.bg)
            };
            buf.set_string(inner.x + 1, y, state.glyph(), glyph_style);

            let name_style = if is_cursor {
                row_style.add_modifier(Modifier::BOLD)
            } else {
                Style::default()
                    .fg(self.theme.source_color(record.source))
                    .bg(self.theme.bg)
            };
            buf.set_string(
                inner.x + 3,
                y,
                truncate_right(&record.title, name_width),
                name_style,
            );

            if let Some(developer) = &record.metadata.developer {
                let dev = truncate_right(developer, dev_width);
                let dev_x = inner.x + inner.width - dev.chars().count() as u16 - 1;
                let dev_style = if is_cursor {
                    row_style
                } else {
                    Style::default().fg(self.theme.fg_muted).bg(self.theme.bg)
                };
                buf.set_string(dev_x, y, &dev, dev_style);
            }
        }
    }
}
