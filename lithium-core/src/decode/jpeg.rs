use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder, Limits};
use thiserror::Error;
use tracing::debug;

use super::baseline::{BaselineJpeg, JpegError};
use super::pixels::{DecodedImage, PixelFormat};
use super::scale::{RowScaler, scale_factor, scaled_dimensions};

/// Largest source side accepted by either decode path
const MAX_SOURCE_DIMENSION: u32 = 16384;

/// Allocation ceiling for files the streaming decoder cannot handle
const MAX_FALLBACK_ALLOC: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed JPEG: {0}")]
    Malformed(JpegError),

    #[error("Unsupported colour type {0:?}")]
    UnsupportedColour(ColorType),

    #[error("Image of {width}x{height} is too large")]
    TooLarge { width: u32, height: u32 },

    #[error("Image has no pixels")]
    Empty,

    #[error("Decode was aborted")]
    Aborted,
}

impl From<JpegError> for DecodeError {
    fn from(err: JpegError) -> Self {
        match err {
            JpegError::Aborted => DecodeError::Aborted,
            other => DecodeError::Malformed(other),
        }
    }
}

/// Decode a JPEG file into `format`, scaled so neither side exceeds
/// `max_dimension`.
///
/// Baseline files are decoded one MCU row at a time and downscaled as the
/// rows arrive. Other JPEG flavours go through the `image` decoder under
/// allocation limits. `should_abort` is polled before decoding and between
/// rows; once it returns true the partial buffer is dropped and
/// [`DecodeError::Aborted`] is returned.
pub fn decode_file(
    path: &Path,
    format: PixelFormat,
    max_dimension: u32,
    should_abort: impl Fn() -> bool,
) -> Result<DecodedImage, DecodeError> {
    let data = fs::read(path)?;
    if should_abort() {
        return Err(DecodeError::Aborted);
    }

    match BaselineJpeg::parse(&data) {
        Ok(jpeg) => {
            let (width, height) = jpeg.dimensions();
            check_dimensions(width, height)?;
            let (mut image, mut scaler) = output_for(width, height, max_dimension, format);
            jpeg.decode_rows(&should_abort, |y, rgb| scaler.push_row(y, rgb, &mut image))?;
            Ok(image)
        }
        Err(JpegError::Unsupported(what)) => {
            debug!(path = %path.display(), what, "falling back to full-frame decode");
            decode_fallback(&data, format, max_dimension, &should_abort)
        }
        Err(err) => Err(err.into()),
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::Empty);
    }
    if width > MAX_SOURCE_DIMENSION || height > MAX_SOURCE_DIMENSION {
        return Err(DecodeError::TooLarge { width, height });
    }
    Ok(())
}

fn output_for(
    width: u32,
    height: u32,
    max_dimension: u32,
    format: PixelFormat,
) -> (DecodedImage, RowScaler) {
    let factor = scale_factor(width, height, max_dimension);
    let (out_width, out_height) = scaled_dimensions(width, height, factor);
    (
        DecodedImage::blank(out_width, out_height, format),
        RowScaler::new(height, out_width, factor),
    )
}

/// Whole-frame decode for progressive and other non-baseline files
fn decode_fallback(
    data: &[u8],
    format: PixelFormat,
    max_dimension: u32,
    should_abort: &impl Fn() -> bool,
) -> Result<DecodedImage, DecodeError> {
    let mut decoder = JpegDecoder::new(Cursor::new(data))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_FALLBACK_ALLOC);
    decoder.set_limits(limits)?;

    let (width, height) = decoder.dimensions();
    check_dimensions(width, height)?;
    if decoder.total_bytes() > MAX_FALLBACK_ALLOC {
        return Err(DecodeError::TooLarge { width, height });
    }

    let channels = match decoder.color_type() {
        ColorType::L8 => 1,
        ColorType::Rgb8 => 3,
        other => return Err(DecodeError::UnsupportedColour(other)),
    };

    let mut source = vec![0u8; decoder.total_bytes() as usize];
    decoder.read_image(&mut source)?;

    let (mut image, mut scaler) = output_for(width, height, max_dimension, format);
    let mut rgb = vec![0u8; width as usize * 3];
    for (y, row) in source.chunks_exact(width as usize * channels).enumerate() {
        if should_abort() {
            return Err(DecodeError::Aborted);
        }
        if channels == 1 {
            for (px, &luma) in rgb.chunks_exact_mut(3).zip(row) {
                px.fill(luma);
            }
            scaler.push_row(y as u32, &rgb, &mut image);
        } else {
            scaler.push_row(y as u32, row, &mut image);
        }
    }

    Ok(image)
}

/// Write a solid-colour JPEG (test fixture)
#[cfg(test)]
pub(crate) fn write_test_jpeg(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}
