use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use crate::app::AppMode;

use super::theme::Theme;

/// Thumbnail pipeline numbers shown in the footer
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub resident_bytes: usize,
    pub capacity: usize,
    pub cached: usize,
    pub pending: usize,
}

/// Footer widget showing keyboard hints, the last status message and cache
/// stats
pub struct Footer<'a> {
    mode: AppMode,
    theme: &'a Theme,
    stats: CacheStats,
    status: Option<&'a str>,
}

impl<'a> Footer<'a> {
    pub fn new(mode: AppMode, theme: &'a Theme, stats: CacheStats) -> Self {
        Self {
            mode,
            theme,
            stats,
            status: None,
        }
    }

    pub fn with_status(mut self, status: Option<&'a str>) -> Self {
        self.status = status;
        self
    }
}

impl Widget for Footer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 1 {
            return;
        }

        let hints: &[(&str, &str)] = match self.mode {
            AppMode::Browsing => &[
                ("Tab", "Pages"),
                ("↑↓", "Navigate"),
                ("Enter", "Launch"),
                ("r", "Rescan"),
                ("?", "Help"),
                ("q", "Quit"),
            ],
            AppMode::Help => &[("Esc", "Close help"), ("q", "Close")],
        };

        let key_style = Style::default()
            .fg(self.theme.fg)
            .add_modifier(Modifier::BOLD);
        let desc_style = Style::default().fg(self.theme.fg_dim);
        let sep_style = Style::default().fg(self.theme.border);

        let mut x = area.x + 1;
        for (i, (key, desc)) in hints.iter().enumerate() {
            buf.set_string(x, area.y, *key, key_style);
            x += key.chars().count() as u16 + 1;

            buf.set_string(x, area.y, *desc, desc_style);
            x += desc.len() as u16;

            if i < hints.len() - 1 {
                buf.set_string(x, area.y, "  │  ", sep_style);
                x += 5;
            }

            if x >= area.x + area.width - 5 {
                break;
            }
        }

        let mut right = format!(
            "{}/{} · {} thumbs · {} decoding",
            format_bytes(self.stats.resident_bytes),
            format_bytes(self.stats.capacity),
            self.stats.cached,
            self.stats.pending
        );
        if let Some(status) = self.status {
            right = format!("{}  │  {}", status, right);
        }
        let right_x = (area.x + area.width).saturating_sub(right.chars().count() as u16 + 1);
        if right_x > x + 2 {
            buf.set_string(right_x, area.y, &right, Style::default().fg(self.theme.fg_muted));
        }
    }
}

/// Human-readable byte count with binary units
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
