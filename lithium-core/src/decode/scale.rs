//! Integer box downscaling of streamed source rows into the output format.

use super::pixels::DecodedImage;

/// Smallest integer factor that brings the larger side within
/// `max_dimension`. Never below 1, so images are never enlarged.
pub fn scale_factor(width: u32, height: u32, max_dimension: u32) -> u32 {
    let largest = width.max(height);
    if max_dimension == 0 || largest <= max_dimension {
        return 1;
    }
    largest.div_ceil(max_dimension)
}

/// Output size for a given factor
pub fn scaled_dimensions(width: u32, height: u32, factor: u32) -> (u32, u32) {
    let factor = factor.max(1);
    (width.div_ceil(factor).max(1), height.div_ceil(factor).max(1))
}

/// Box averages streamed RGB source rows into the rows of a
/// [`DecodedImage`]. Only one output row of sums is held at a time.
#[derive(Debug)]
pub struct RowScaler {
    factor: u32,
    source_height: u32,
    sums: Vec<[u32; 3]>,
    counts: Vec<u32>,
}

impl RowScaler {
    pub fn new(source_height: u32, out_width: u32, factor: u32) -> Self {
        Self {
            factor: factor.max(1),
            source_height,
            sums: vec![[0; 3]; out_width as usize],
            counts: vec![0; out_width as usize],
        }
    }

    /// Add source row `y` (packed RGB). Writes the output row once the last
    /// source row of its block, or of the image, has been added.
    pub fn push_row(&mut self, y: u32, rgb: &[u8], image: &mut DecodedImage) {
        let factor = self.factor as usize;
        for (x, px) in rgb.chunks_exact(3).enumerate() {
            let Some(sum) = self.sums.get_mut(x / factor) else {
                break;
            };
            sum[0] += px[0] as u32;
            sum[1] += px[1] as u32;
            sum[2] += px[2] as u32;
            self.counts[x / factor] += 1;
        }

        if (y + 1) % self.factor != 0 && y + 1 != self.source_height {
            return;
        }

        let out_y = y / self.factor;
        if out_y >= image.height {
            return;
        }
        let format = image.format;
        let bpp = format.bytes_per_pixel();
        let row = image.row_mut(out_y);
        for ((px, sum), count) in row
            .chunks_exact_mut(bpp)
            .zip(self.sums.iter_mut())
            .zip(self.counts.iter_mut())
        {
            let n = (*count).max(1);
            format.write(
                px,
                (sum[0] / n) as u8,
                (sum[1] / n) as u8,
                (sum[2] / n) as u8,
                255,
            );
            *sum = [0; 3];
            *count = 0;
        }
    }
}
