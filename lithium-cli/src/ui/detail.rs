use lithium_core::{DecodedImage, TitleRecord};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Paragraph, Widget, Wrap},
};

use super::progress::truncate_right;
use super::theme::Theme;
use super::thumbnail::ThumbnailView;

const UNKNOWN: &str = "Unknown";

/// Thumbnail and metadata of the selected title
pub struct DetailView<'a> {
    record: Option<&'a TitleRecord>,
    image: Option<&'a DecodedImage>,
    theme: &'a Theme,
}

impl<'a> DetailView<'a> {
    pub fn new(record: Option<&'a TitleRecord>, image: Option<&'a DecodedImage>, theme: &'a Theme) -> Self {
        Self { record, image, theme }
    }
}

impl Widget for DetailView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 12 || area.height < 4 {
            return;
        }
        let Some(record) = self.record else {
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Min(3)])
            .split(Rect::new(area.x + 1, area.y, area.width - 2, area.height));

        ThumbnailView::new(self.image, &record.title, self.theme).render(chunks[0], buf);

        let info = chunks[1];
        let width = info.width as usize;
        let label_style = Style::default().fg(self.theme.fg_muted);
        let value_style = Style::default().fg(self.theme.fg);

        buf.set_string(
            info.x,
            info.y + 1,
            truncate_right(&record.title, width),
            Style::default()
                .fg(self.theme.blue)
                .add_modifier(Modifier::BOLD),
        );

        let meta = &record.metadata;
        let title_id = record
            .xbe_title_id
            .map(|id| format!("{:08X}", id))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let rows = [
            ("Developer", meta.developer.as_deref().unwrap_or(UNKNOWN)),
            ("Publisher", meta.publisher.as_deref().unwrap_or(UNKNOWN)),
            ("Released", meta.release_date.as_deref().unwrap_or(UNKNOWN)),
            ("Rating", meta.rating.as_deref().unwrap_or(UNKNOWN)),
            ("Title ID", title_id.as_str()),
        ];

        let mut y = info.y + 3;
        for (label, value) in rows {
            if y >= info.y + info.height {
                return;
            }
            buf.set_string(info.x, y, format!("{:<11}", label), label_style);
            buf.set_string(
                info.x + 11,
                y,
                truncate_right(value, width.saturating_sub(11)),
                value_style,
            );
            y += 1;
        }

        let remaining = (info.y + info.height).saturating_sub(y + 1);
        if remaining > 0 {
            let overview = meta.overview.as_deref().unwrap_or("No description available.");
            Paragraph::new(overview)
                .style(Style::default().fg(self.theme.fg_dim))
                .wrap(Wrap { trim: true })
                .render(Rect::new(info.x, y + 1, info.width, remaining), buf);
        }
    }
}
