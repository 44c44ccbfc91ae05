use serde::{Deserialize, Serialize};

/// Output pixel layout of decoded thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 16 bpp, little endian `rrrrrggg gggbbbbb`
    Rgb565,
    /// 32 bpp, bytes in B, G, R, A order
    Bgra8888,
}

impl PixelFormat {
    /// Format for a configured colour depth
    pub fn from_depth(bits: u8) -> Option<Self> {
        match bits {
            16 => Some(PixelFormat::Rgb565),
            32 => Some(PixelFormat::Bgra8888),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb565 => 2,
            PixelFormat::Bgra8888 => 4,
        }
    }

    /// Encode one pixel into `out`, which is `bytes_per_pixel` long
    pub fn write(&self, out: &mut [u8], r: u8, g: u8, b: u8, a: u8) {
        match self {
            PixelFormat::Rgb565 => {
                let packed =
                    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
                out.copy_from_slice(&packed.to_le_bytes());
            }
            PixelFormat::Bgra8888 => out.copy_from_slice(&[b, g, r, a]),
        }
    }

    /// Decode one pixel back to 8-bit RGB
    pub fn read(&self, px: &[u8]) -> (u8, u8, u8) {
        match self {
            PixelFormat::Rgb565 => {
                let packed = u16::from_le_bytes([px[0], px[1]]);
                let r = ((packed >> 11) & 0x1f) as u8;
                let g = ((packed >> 5) & 0x3f) as u8;
                let b = (packed & 0x1f) as u8;
                ((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
            }
            PixelFormat::Bgra8888 => (px[2], px[1], px[0]),
        }
    }
}

/// Raw pixel buffer produced by the decode worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Zeroed buffer of the right size, filled row by row by the decoder
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            pixels: vec![0; len],
        }
    }

    /// Resident size of the pixel buffer, used as the cache charge
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.pixels[start..start + stride]
    }

    /// 8-bit RGB of the pixel at `(x, y)`
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = y as usize * self.stride() + x as usize * bpp;
        Some(self.format.read(&self.pixels[offset..offset + bpp]))
    }

    /// Whether the buffer length matches the declared geometry
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_depth() {
        assert_eq!(PixelFormat::from_depth(16), Some(PixelFormat::Rgb565));
        assert_eq!(PixelFormat::from_depth(32), Some(PixelFormat::Bgra8888));
        assert_eq!(PixelFormat::from_depth(24), None);
    }

    #[test]
    fn test_rgb565_extremes() {
        let mut px = [0u8; 2];
        PixelFormat::Rgb565.write(&mut px, 255, 255, 255, 255);
        assert_eq!(px, [0xff, 0xff]);
        assert_eq!(PixelFormat::Rgb565.read(&px), (255, 255, 255));

        PixelFormat::Rgb565.write(&mut px, 255, 0, 0, 255);
        assert_eq!(u16::from_le_bytes(px), 0xf800);
        assert_eq!(PixelFormat::Rgb565.read(&px), (255, 0, 0));
    }

    #[test]
    fn test_bgra_layout() {
        let mut px = [0u8; 4];
        PixelFormat::Bgra8888.write(&mut px, 1, 2, 3, 4);
        assert_eq!(px, [3, 2, 1, 4]);
        assert_eq!(PixelFormat::Bgra8888.read(&px), (1, 2, 3));
    }

    #[test]
    fn test_blank_image_geometry() {
        let mut image = DecodedImage::blank(3, 2, PixelFormat::Rgb565);
        assert_eq!(image.byte_size(), 12);
        assert_eq!(image.row_mut(1).len(), 6);
        assert!(image.is_consistent());
        assert_eq!(image.rgb_at(2, 1), Some((0, 0, 0)));
        assert_eq!(image.rgb_at(3, 0), None);
    }
}
