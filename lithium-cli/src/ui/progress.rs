use lithium_core::ScanProgress;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Padding, Widget},
};

use super::theme::Theme;

/// Braille spinner characters
const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Progress widget shown while the active page is still empty
pub struct ProgressView<'a> {
    progress: &'a ScanProgress,
    spinner_frame: usize,
    theme: &'a Theme,
}

impl<'a> ProgressView<'a> {
    pub fn new(progress: &'a ScanProgress, spinner_frame: usize, theme: &'a Theme) -> Self {
        Self {
            progress,
            spinner_frame,
            theme,
        }
    }
}

impl Widget for ProgressView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border))
            .padding(Padding::horizontal(1));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 3 || inner.width < 20 {
            return;
        }

        let spinner = SPINNER[self.spinner_frame % SPINNER.len()];
        let spinner_style = Style::default()
            .fg(self.theme.blue)
            .add_modifier(Modifier::BOLD);
        buf.set_string(inner.x, inner.y, spinner.to_string(), spinner_style);
        buf.set_string(
            inner.x + 2,
            inner.y,
            " Scanning for titles...",
            Style::default().fg(self.theme.fg),
        );

        if let Some(path) = &self.progress.current_path {
            let path_str = path.to_string_lossy();
            let max_len = inner.width.saturating_sub(2) as usize;
            buf.set_string(
                inner.x,
                inner.y + 1,
                truncate_left(&path_str, max_len),
                Style::default().fg(self.theme.fg_dim),
            );
        }

        let stats = format!(
            "{} titles  {} dirs  {} errors",
            self.progress.titles_found, self.progress.dirs_scanned, self.progress.errors,
        );
        buf.set_string(
            inner.x,
            inner.y + 2,
            &stats,
            Style::default().fg(self.theme.fg_muted),
        );
    }
}

/// Compact progress indicator for header
pub fn progress_indicator(progress: &ScanProgress, spinner_frame: usize) -> String {
    let spinner = SPINNER[spinner_frame % SPINNER.len()];
    format!(
        "{} {} titles, {} dirs",
        spinner, progress.titles_found, progress.dirs_scanned
    )
}

/// Keep the end of `text`, prefixing "..." when it does not fit
pub fn truncate_left(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let tail: String = text.chars().skip(count - keep).collect();
    format!("...{}", tail)
}

/// Keep the start of `text`, suffixing "…" when it does not fit
pub fn truncate_right(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", head)
}
