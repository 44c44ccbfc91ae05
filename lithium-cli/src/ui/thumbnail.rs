use lithium_core::DecodedImage;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, style::Style, widgets::Widget};

use super::progress::truncate_right;
use super::theme::Theme;

/// Decoded thumbnail drawn with upper half blocks, two pixels per cell.
/// Without an image a gradient placeholder carrying the title is drawn.
pub struct ThumbnailView<'a> {
    image: Option<&'a DecodedImage>,
    title: &'a str,
    theme: &'a Theme,
}

impl<'a> ThumbnailView<'a> {
    pub fn new(image: Option<&'a DecodedImage>, title: &'a str, theme: &'a Theme) -> Self {
        Self { image, title, theme }
    }
}

impl Widget for ThumbnailView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 2 || area.height < 1 {
            return;
        }

        match self.image {
            Some(image) => {
                let Some(cells) = half_block_cells(image, area.width, area.height) else {
                    return;
                };
                let x0 = area.x + (area.width - cells.cols) / 2;
                let y0 = area.y + (area.height - cells.rows) / 2;
                for row in 0..cells.rows {
                    for col in 0..cells.cols {
                        let (top, bottom) = cells.get(col, row);
                        if let Some(cell) = buf.cell_mut((x0 + col, y0 + row)) {
                            cell.set_char('▀').set_fg(top).set_bg(bottom);
                        }
                    }
                }
            }
            None => self.render_placeholder(area, buf),
        }
    }
}

impl ThumbnailView<'_> {
    fn render_placeholder(&self, area: Rect, buf: &mut Buffer) {
        let rows = area.height.max(1);
        for row in 0..area.height {
            let color = self
                .theme
                .placeholder_color(row as f64 / (rows.saturating_sub(1).max(1)) as f64);
            let style = Style::default().bg(color);
            for col in 0..area.width {
                buf.set_string(area.x + col, area.y + row, " ", style);
            }
        }

        let text = truncate_right(self.title, area.width.saturating_sub(2) as usize);
        let x = area.x + (area.width - text.chars().count() as u16) / 2;
        let y = area.y + area.height / 2;
        let style = Style::default()
            .fg(self.theme.fg_dim)
            .bg(self.theme.placeholder_color(0.5));
        buf.set_string(x, y, &text, style);
    }
}

/// Terminal cells sampled from an image, `(top, bottom)` colors per cell
#[derive(Debug)]
pub struct HalfBlockCells {
    pub cols: u16,
    pub rows: u16,
    colors: Vec<(Color, Color)>,
}

impl HalfBlockCells {
    pub fn get(&self, col: u16, row: u16) -> (Color, Color) {
        self.colors[row as usize * self.cols as usize + col as usize]
    }
}

/// Nearest-neighbour sample of `image` into at most `max_cols` by
/// `max_rows` cells, keeping the aspect ratio (a cell is two pixels tall)
pub fn half_block_cells(image: &DecodedImage, max_cols: u16, max_rows: u16) -> Option<HalfBlockCells> {
    if image.width == 0 || image.height == 0 || max_cols == 0 || max_rows == 0 || !image.is_consistent() {
        return None;
    }

    let max_px_h = max_rows as f64 * 2.0;
    let scale = (max_cols as f64 / image.width as f64).min(max_px_h / image.height as f64);
    let cols = ((image.width as f64 * scale).floor() as u16).clamp(1, max_cols);
    let px_h = ((image.height as f64 * scale).floor() as u32).max(1);
    let rows = (px_h.div_ceil(2) as u16).clamp(1, max_rows);

    let sample = |col: u16, py: u32| -> Color {
        let sx = (col as u32 * image.width / cols as u32).min(image.width - 1);
        let sy = (py * image.height / (rows as u32 * 2)).min(image.height - 1);
        match image.rgb_at(sx, sy) {
            Some((r, g, b)) => Color::Rgb(r, g, b),
            None => Color::Reset,
        }
    };

    let mut colors = Vec::with_capacity(cols as usize * rows as usize);
    for row in 0..rows {
        for col in 0..cols {
            let top = sample(col, row as u32 * 2);
            let bottom = sample(col, row as u32 * 2 + 1);
            colors.push((top, bottom));
        }
    }

    Some(HalfBlockCells { cols, rows, colors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lithium_core::PixelFormat;

    /// Top half red, bottom half blue
    fn split_image(width: u32, height: u32) -> DecodedImage {
        let mut image = DecodedImage::blank(width, height, PixelFormat::Bgra8888);
        for y in 0..height {
            let (r, b) = if y < height / 2 { (255, 0) } else { (0, 255) };
            let row = image.row_mut(y);
            for px in row.chunks_exact_mut(4) {
                PixelFormat::Bgra8888.write(px, r, 0, b, 255);
            }
        }
        image
    }

    #[test]
    fn test_cells_keep_aspect_ratio() {
        let image = split_image(64, 32);
        let cells = half_block_cells(&image, 32, 40).unwrap();
        // 64x32 scaled to 32 wide is 32x16 pixels, 8 rows of half blocks
        assert_eq!((cells.cols, cells.rows), (32, 8));
    }

    #[test]
    fn test_cells_sample_top_and_bottom() {
        let image = split_image(4, 4);
        let cells = half_block_cells(&image, 4, 2).unwrap();
        assert_eq!((cells.cols, cells.rows), (4, 2));
        assert_eq!(cells.get(0, 0), (Color::Rgb(255, 0, 0), Color::Rgb(255, 0, 0)));
        assert_eq!(cells.get(3, 1), (Color::Rgb(0, 0, 255), Color::Rgb(0, 0, 255)));
    }

    #[test]
    fn test_render_placeholder_shows_title() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        ThumbnailView::new(None, "Halo", &theme).render(area, &mut buf);

        let middle: String = (0..20).map(|x| buf[(x, 2)].symbol().to_string()).collect();
        assert!(middle.contains("Halo"));
    }

    #[test]
    fn test_inconsistent_image_is_skipped() {
        let mut image = split_image(4, 4);
        image.pixels.truncate(3);
        assert!(half_block_cells(&image, 4, 4).is_none());
    }
}
