//! Streaming decoder for baseline JPEG.
//!
//! Entropy-coded data is decoded one MCU row at a time into a small strip
//! buffer per component. Every finished pixel row is colour converted and
//! handed to the caller, so the full-resolution image never exists in
//! memory. Progressive, arithmetic-coded, 12-bit, CMYK and multi-scan
//! files are reported as [`JpegError::Unsupported`].

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JpegError {
    #[error("unsupported JPEG: {0}")]
    Unsupported(&'static str),

    #[error("corrupt JPEG: {0}")]
    Corrupt(&'static str),

    #[error("decode was aborted")]
    Aborted,
}

type Result<T> = std::result::Result<T, JpegError>;

/// Zigzag position to natural (row-major) coefficient index
const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOF0: u8 = 0xC0;
const SOF1: u8 = 0xC1;
const SOF2: u8 = 0xC2;
const DHT: u8 = 0xC4;
const DQT: u8 = 0xDB;
const DRI: u8 = 0xDD;
const SOS: u8 = 0xDA;
const APP14: u8 = 0xEE;

/// Canonical Huffman table in the decoding form of ITU T.81 F.2.2.3
#[derive(Debug, Clone)]
struct Huffman {
    maxcode: [i32; 17],
    valptr: [i32; 17],
    mincode: [i32; 17],
    values: Vec<u8>,
}

impl Huffman {
    fn new(counts: &[u8; 16], values: Vec<u8>) -> Result<Self> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != values.len() || total > 256 {
            return Err(JpegError::Corrupt("bad huffman table"));
        }

        let mut maxcode = [-1i32; 17];
        let mut valptr = [0i32; 17];
        let mut mincode = [0i32; 17];
        let mut code = 0i32;
        let mut k = 0i32;
        for len in 1..=16 {
            let n = counts[len - 1] as i32;
            if n > 0 {
                valptr[len] = k;
                mincode[len] = code;
                code += n;
                k += n;
                maxcode[len] = code - 1;
            }
            code <<= 1;
        }

        Ok(Self {
            maxcode,
            valptr,
            mincode,
            values,
        })
    }

    fn decode(&self, bits: &mut BitReader) -> Result<u8> {
        let mut code = bits.bit() as i32;
        for len in 1..=16 {
            if code <= self.maxcode[len] {
                let index = (self.valptr[len] + code - self.mincode[len]) as usize;
                return self
                    .values
                    .get(index)
                    .copied()
                    .ok_or(JpegError::Corrupt("bad huffman code"));
            }
            code = (code << 1) | bits.bit() as i32;
        }
        Err(JpegError::Corrupt("bad huffman code"))
    }
}

/// MSB-first bit reader over entropy-coded data with byte unstuffing.
///
/// Reaching a marker (or the end of the data) feeds zero bits.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u32,
    count: u32,
    at_marker: bool,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            acc: 0,
            count: 0,
            at_marker: false,
        }
    }

    fn next_byte(&mut self) -> u8 {
        if self.at_marker {
            return 0;
        }
        let Some(&byte) = self.data.get(self.pos) else {
            self.at_marker = true;
            return 0;
        };
        if byte != 0xFF {
            self.pos += 1;
            return byte;
        }
        match self.data.get(self.pos + 1) {
            Some(0x00) => {
                self.pos += 2;
                0xFF
            }
            _ => {
                self.at_marker = true;
                0
            }
        }
    }

    fn fill(&mut self) {
        while self.count <= 24 {
            let byte = self.next_byte();
            self.acc |= (byte as u32) << (24 - self.count);
            self.count += 8;
        }
    }

    fn bit(&mut self) -> u32 {
        if self.count == 0 {
            self.fill();
        }
        let bit = self.acc >> 31;
        self.acc <<= 1;
        self.count -= 1;
        bit
    }

    fn receive(&mut self, n: u8) -> i32 {
        if n == 0 {
            return 0;
        }
        let n = n as u32;
        if self.count < n {
            self.fill();
        }
        let value = self.acc >> (32 - n);
        self.acc <<= n;
        self.count -= n;
        value as i32
    }

    /// Drop buffered bits and skip past the next RSTn marker
    fn restart(&mut self) -> Result<()> {
        self.acc = 0;
        self.count = 0;
        self.at_marker = false;
        while self.pos + 1 < self.data.len() {
            if self.data[self.pos] == 0xFF && (0xD0..=0xD7).contains(&self.data[self.pos + 1]) {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(JpegError::Corrupt("missing restart marker"))
    }
}

fn extend(value: i32, size: u8) -> i32 {
    if size == 0 {
        0
    } else if value < (1 << (size - 1)) {
        value - (1 << size) + 1
    } else {
        value
    }
}

/// Separable float IDCT with a precomputed basis
struct Idct {
    basis: [[f32; 8]; 8],
}

impl Idct {
    fn new() -> Self {
        let mut basis = [[0.0f32; 8]; 8];
        for (x, row) in basis.iter_mut().enumerate() {
            for (u, value) in row.iter_mut().enumerate() {
                let scale = if u == 0 { FRAC_1_SQRT_2 } else { 1.0 };
                *value = scale * (((2 * x + 1) as f32 * u as f32 * PI) / 16.0).cos() / 2.0;
            }
        }
        Self { basis }
    }

    /// Inverse transform `coeffs` (natural order) into an 8x8 block of `out`
    fn apply(&self, coeffs: &[i32; 64], out: &mut [u8], stride: usize) {
        let mut tmp = [0.0f32; 64];
        for v in 0..8 {
            let row = &coeffs[v * 8..v * 8 + 8];
            if row.iter().all(|&c| c == 0) {
                continue;
            }
            for x in 0..8 {
                let mut sum = 0.0;
                for (u, &c) in row.iter().enumerate() {
                    sum += self.basis[x][u] * c as f32;
                }
                tmp[v * 8 + x] = sum;
            }
        }

        for y in 0..8 {
            for x in 0..8 {
                let mut sum = 0.0;
                for v in 0..8 {
                    sum += self.basis[y][v] * tmp[v * 8 + x];
                }
                out[y * stride + x] = (sum + 128.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Component {
    id: u8,
    h: usize,
    v: usize,
    quant: usize,
    dc: usize,
    ac: usize,
}

/// Component state during the scan
struct Plane<'t> {
    h: usize,
    v: usize,
    quant: &'t [u16; 64],
    dc: &'t Huffman,
    ac: &'t Huffman,
    pred: i32,
    stride: usize,
    strip: Vec<u8>,
}

/// A parsed baseline JPEG positioned at the start of its scan
pub struct BaselineJpeg<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    components: Vec<Component>,
    quant: [Option<[u16; 64]>; 4],
    dc_tables: [Option<Huffman>; 4],
    ac_tables: [Option<Huffman>; 4],
    restart_interval: usize,
    adobe_transform: Option<u8>,
    scan_start: usize,
}

impl<'a> BaselineJpeg<'a> {
    /// Read every marker segment up to the first scan
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.get(..2) != Some(&[0xFF, SOI][..]) {
            return Err(JpegError::Corrupt("missing start of image"));
        }

        let mut jpeg = Self {
            data,
            width: 0,
            height: 0,
            components: Vec::new(),
            quant: [None; 4],
            dc_tables: [None, None, None, None],
            ac_tables: [None, None, None, None],
            restart_interval: 0,
            adobe_transform: None,
            scan_start: 0,
        };

        let mut pos = 2;
        loop {
            let marker = next_marker(data, &mut pos)?;
            match marker {
                0x00 | 0x01 | SOI | 0xD0..=0xD7 => continue,
                EOI => return Err(JpegError::Corrupt("no scan before end of image")),
                _ => {}
            }

            let payload = segment(data, &mut pos)?;
            match marker {
                SOF0 | SOF1 => jpeg.read_frame(payload)?,
                SOF2 => return Err(JpegError::Unsupported("progressive")),
                0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                    return Err(JpegError::Unsupported("coding process"));
                }
                DHT => jpeg.read_huffman(payload)?,
                DQT => jpeg.read_quant(payload)?,
                DRI => {
                    jpeg.restart_interval = read_u16(payload, 0)? as usize;
                }
                APP14 if payload.starts_with(b"Adobe") && payload.len() >= 12 => {
                    jpeg.adobe_transform = Some(payload[11]);
                }
                SOS => {
                    jpeg.read_scan(payload)?;
                    jpeg.scan_start = pos;
                    return Ok(jpeg);
                }
                _ => {}
            }
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_frame(&mut self, p: &[u8]) -> Result<()> {
        if !self.components.is_empty() {
            return Err(JpegError::Corrupt("duplicate frame header"));
        }
        let precision = *p.first().ok_or(JpegError::Corrupt("short frame header"))?;
        if precision != 8 {
            return Err(JpegError::Unsupported("sample precision"));
        }
        self.height = read_u16(p, 1)? as u32;
        self.width = read_u16(p, 3)? as u32;
        if self.height == 0 {
            return Err(JpegError::Unsupported("height defined later in the stream"));
        }
        if self.width == 0 {
            return Err(JpegError::Corrupt("zero width"));
        }

        let count = *p.get(5).ok_or(JpegError::Corrupt("short frame header"))? as usize;
        if count != 1 && count != 3 {
            return Err(JpegError::Unsupported("colour components"));
        }
        for i in 0..count {
            let at = 6 + i * 3;
            let spec = p.get(at..at + 3).ok_or(JpegError::Corrupt("short frame header"))?;
            let (h, v) = ((spec[1] >> 4) as usize, (spec[1] & 0x0F) as usize);
            if !(1..=4).contains(&h) || !(1..=4).contains(&v) || spec[2] > 3 {
                return Err(JpegError::Corrupt("bad component"));
            }
            self.components.push(Component {
                id: spec[0],
                h,
                v,
                quant: spec[2] as usize,
                dc: 0,
                ac: 0,
            });
        }

        // A single component scan is non-interleaved: one block per MCU
        if let [only] = self.components.as_mut_slice() {
            only.h = 1;
            only.v = 1;
        }
        Ok(())
    }

    fn read_huffman(&mut self, mut s: &[u8]) -> Result<()> {
        while let Some(&class_id) = s.first() {
            let (class, id) = (class_id >> 4, (class_id & 0x0F) as usize);
            if class > 1 || id > 3 {
                return Err(JpegError::Corrupt("bad huffman table id"));
            }
            let mut counts = [0u8; 16];
            counts.copy_from_slice(s.get(1..17).ok_or(JpegError::Corrupt("short huffman table"))?);
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let values = s
                .get(17..17 + total)
                .ok_or(JpegError::Corrupt("short huffman table"))?
                .to_vec();

            let table = Huffman::new(&counts, values)?;
            if class == 0 {
                self.dc_tables[id] = Some(table);
            } else {
                self.ac_tables[id] = Some(table);
            }
            s = &s[17 + total..];
        }
        Ok(())
    }

    fn read_quant(&mut self, mut s: &[u8]) -> Result<()> {
        while let Some(&precision_id) = s.first() {
            let (precision, id) = (precision_id >> 4, (precision_id & 0x0F) as usize);
            if id > 3 {
                return Err(JpegError::Corrupt("bad quantization table id"));
            }
            let mut table = [0u16; 64];
            let used = if precision == 0 {
                let values = s.get(1..65).ok_or(JpegError::Corrupt("short quantization table"))?;
                for (q, &v) in table.iter_mut().zip(values) {
                    *q = v as u16;
                }
                65
            } else {
                let values = s.get(1..129).ok_or(JpegError::Corrupt("short quantization table"))?;
                for (q, pair) in table.iter_mut().zip(values.chunks_exact(2)) {
                    *q = u16::from_be_bytes([pair[0], pair[1]]);
                }
                129
            };
            self.quant[id] = Some(table);
            s = &s[used..];
        }
        Ok(())
    }

    fn read_scan(&mut self, p: &[u8]) -> Result<()> {
        if self.components.is_empty() {
            return Err(JpegError::Corrupt("scan before frame header"));
        }
        let count = *p.first().ok_or(JpegError::Corrupt("short scan header"))? as usize;
        if count != self.components.len() {
            return Err(JpegError::Unsupported("multiple scans"));
        }
        for (i, component) in self.components.iter_mut().enumerate() {
            let spec = p
                .get(1 + i * 2..3 + i * 2)
                .ok_or(JpegError::Corrupt("short scan header"))?;
            if spec[0] != component.id {
                return Err(JpegError::Unsupported("scan component order"));
            }
            component.dc = (spec[1] >> 4) as usize;
            component.ac = (spec[1] & 0x0F) as usize;
            if component.dc > 3 || component.ac > 3 {
                return Err(JpegError::Corrupt("bad huffman table id"));
            }
        }
        Ok(())
    }

    fn is_rgb(&self) -> bool {
        match self.adobe_transform {
            Some(transform) => transform == 0,
            None => self.components.iter().map(|c| c.id).eq(*b"RGB"),
        }
    }

    /// Decode the scan, calling `on_row(y, rgb)` for every pixel row in
    /// order. `should_abort` is polled before each MCU row.
    pub fn decode_rows(
        self,
        should_abort: impl Fn() -> bool,
        mut on_row: impl FnMut(u32, &[u8]),
    ) -> Result<()> {
        let width = self.width as usize;
        let height = self.height as usize;
        let hmax = self.components.iter().map(|c| c.h).max().unwrap_or(1);
        let vmax = self.components.iter().map(|c| c.v).max().unwrap_or(1);
        let (mcu_w, mcu_h) = (8 * hmax, 8 * vmax);
        let mcus_x = width.div_ceil(mcu_w);
        let mcus_y = height.div_ceil(mcu_h);
        let rgb_colour = self.is_rgb();

        let mut planes = Vec::with_capacity(self.components.len());
        for c in &self.components {
            let missing = JpegError::Corrupt("missing table");
            let stride = mcus_x * c.h * 8;
            planes.push(Plane {
                h: c.h,
                v: c.v,
                quant: self.quant[c.quant].as_ref().ok_or(missing.clone())?,
                dc: self.dc_tables[c.dc].as_ref().ok_or(missing.clone())?,
                ac: self.ac_tables[c.ac].as_ref().ok_or(missing)?,
                pred: 0,
                stride,
                strip: vec![0u8; stride * c.v * 8],
            });
        }

        let idct = Idct::new();
        let mut bits = BitReader::new(self.data, self.scan_start);
        let mut coeffs = [0i32; 64];
        let mut rgb = vec![0u8; width * 3];
        let mut until_restart = self.restart_interval;

        for my in 0..mcus_y {
            if should_abort() {
                return Err(JpegError::Aborted);
            }

            for mx in 0..mcus_x {
                if self.restart_interval > 0 {
                    if until_restart == 0 {
                        bits.restart()?;
                        for plane in &mut planes {
                            plane.pred = 0;
                        }
                        until_restart = self.restart_interval;
                    }
                    until_restart -= 1;
                }

                for plane in &mut planes {
                    for by in 0..plane.v {
                        for bx in 0..plane.h {
                            decode_block(&mut bits, plane, &mut coeffs)?;
                            let at = by * 8 * plane.stride + (mx * plane.h + bx) * 8;
                            idct.apply(&coeffs, &mut plane.strip[at..], plane.stride);
                        }
                    }
                }
            }

            let rows = mcu_h.min(height - my * mcu_h);
            for py in 0..rows {
                convert_row(&planes, py, hmax, vmax, rgb_colour, &mut rgb);
                on_row((my * mcu_h + py) as u32, &rgb);
            }
        }
        Ok(())
    }
}

fn decode_block(bits: &mut BitReader, plane: &mut Plane, out: &mut [i32; 64]) -> Result<()> {
    *out = [0; 64];

    let size = plane.dc.decode(bits)?;
    if size > 11 {
        return Err(JpegError::Corrupt("bad DC coefficient"));
    }
    plane.pred = plane.pred.wrapping_add(extend(bits.receive(size), size));
    out[0] = plane.pred.wrapping_mul(plane.quant[0] as i32);

    let mut k = 1;
    while k < 64 {
        let rs = plane.ac.decode(bits)?;
        let (run, size) = ((rs >> 4) as usize, rs & 0x0F);
        if size == 0 {
            if run == 15 {
                k += 16;
                continue;
            }
            break;
        }
        k += run;
        if k > 63 {
            return Err(JpegError::Corrupt("coefficient index out of range"));
        }
        out[ZIGZAG[k]] = extend(bits.receive(size), size) * plane.quant[k] as i32;
        k += 1;
    }
    Ok(())
}

/// Colour convert pixel row `py` of the current MCU row into RGB
fn convert_row(planes: &[Plane], py: usize, hmax: usize, vmax: usize, rgb_colour: bool, out: &mut [u8]) {
    let sample = |plane: &Plane, x: usize| -> u8 {
        let row = py * plane.v / vmax;
        plane.strip[row * plane.stride + x * plane.h / hmax]
    };

    for (x, px) in out.chunks_exact_mut(3).enumerate() {
        match planes {
            [luma] => px.fill(sample(luma, x)),
            [a, b, c] if rgb_colour => {
                px.copy_from_slice(&[sample(a, x), sample(b, x), sample(c, x)]);
            }
            [y, cb, cr] => {
                let luma = sample(y, x) as f32;
                let cb = sample(cb, x) as f32 - 128.0;
                let cr = sample(cr, x) as f32 - 128.0;
                px[0] = clamp_u8(luma + 1.402 * cr);
                px[1] = clamp_u8(luma - 0.344_136 * cb - 0.714_136 * cr);
                px[2] = clamp_u8(luma + 1.772 * cb);
            }
            _ => {}
        }
    }
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn next_marker(data: &[u8], pos: &mut usize) -> Result<u8> {
    while *pos < data.len() && data[*pos] != 0xFF {
        *pos += 1;
    }
    while *pos < data.len() && data[*pos] == 0xFF {
        *pos += 1;
    }
    let marker = *data.get(*pos).ok_or(JpegError::Corrupt("truncated"))?;
    *pos += 1;
    Ok(marker)
}

/// Payload of the length-prefixed segment at `pos`
fn segment<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = read_u16(data, *pos)? as usize;
    if len < 2 {
        return Err(JpegError::Corrupt("bad segment length"));
    }
    let payload = data
        .get(*pos + 2..*pos + len)
        .ok_or(JpegError::Corrupt("truncated segment"))?;
    *pos += len;
    Ok(payload)
}

fn read_u16(data: &[u8], at: usize) -> Result<u16> {
    data.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(JpegError::Corrupt("truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(image: image::DynamicImage) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        image.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    fn decode_all(data: &[u8]) -> (u32, u32, Vec<u8>) {
        let jpeg = BaselineJpeg::parse(data).unwrap();
        let (w, h) = jpeg.dimensions();
        let mut pixels = Vec::new();
        let mut next_row = 0;
        jpeg.decode_rows(
            || false,
            |y, row| {
                assert_eq!(y, next_row);
                next_row += 1;
                pixels.extend_from_slice(row);
            },
        )
        .unwrap();
        assert_eq!(next_row, h);
        (w, h, pixels)
    }

    #[test]
    fn test_huffman_canonical_codes() {
        // two 2-bit codes (00, 01) and one 3-bit code (100)
        let mut counts = [0u8; 16];
        counts[1] = 2;
        counts[2] = 1;
        let table = Huffman::new(&counts, vec![7, 8, 9]).unwrap();

        let data = [0b0001_1000, 0x00];
        let mut bits = BitReader::new(&data, 0);
        assert_eq!(table.decode(&mut bits).unwrap(), 7);
        assert_eq!(table.decode(&mut bits).unwrap(), 8);
        assert_eq!(table.decode(&mut bits).unwrap(), 9);
    }

    #[test]
    fn test_bit_reader_unstuffs_and_stops_at_marker() {
        let data = [0xFF, 0x00, 0xA0, 0xFF, 0xD9];
        let mut bits = BitReader::new(&data, 0);
        assert_eq!(bits.receive(8), 0xFF);
        assert_eq!(bits.receive(4), 0xA);
        assert_eq!(bits.receive(4), 0);
        // zero bits past the marker
        assert_eq!(bits.receive(16), 0);
    }

    #[test]
    fn test_extend_sign() {
        assert_eq!(extend(0, 1), -1);
        assert_eq!(extend(1, 1), 1);
        assert_eq!(extend(2, 3), -5);
        assert_eq!(extend(6, 3), 6);
    }

    #[test]
    fn test_idct_dc_only_block_is_flat() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 8 * 40;
        let mut out = [0u8; 64];
        Idct::new().apply(&coeffs, &mut out, 8);
        assert!(out.iter().all(|&v| v == 168), "{:?}", out);
    }

    #[test]
    fn test_rejects_progressive_frame() {
        let data = [
            0xFF, 0xD8, 0xFF, 0xC2, 0x00, 0x0B, 8, 0, 16, 0, 16, 1, 1, 0x11, 0,
        ];
        assert!(matches!(
            BaselineJpeg::parse(&data),
            Err(JpegError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_non_jpeg() {
        assert!(matches!(
            BaselineJpeg::parse(b"GIF89a"),
            Err(JpegError::Corrupt(_))
        ));
    }

    #[test]
    fn test_matches_reference_decoder_on_grey_gradient() {
        let source = image::RgbImage::from_fn(48, 40, |x, y| {
            let v = (x * 2 + y * 2) as u8;
            image::Rgb([v, v, v])
        });
        let data = encode(image::DynamicImage::ImageRgb8(source));

        let (w, h, pixels) = decode_all(&data);
        assert_eq!((w, h), (48, 40));

        let reference = image::load_from_memory(&data).unwrap().to_rgb8();
        let worst = pixels
            .iter()
            .zip(reference.as_raw())
            .map(|(&a, &b)| (a as i32 - b as i32).abs())
            .max()
            .unwrap();
        assert!(worst <= 3, "max channel difference {}", worst);
    }

    #[test]
    fn test_decodes_single_component_image() {
        let source = image::GrayImage::from_pixel(20, 12, image::Luma([90]));
        let data = encode(image::DynamicImage::ImageLuma8(source));

        let (w, h, pixels) = decode_all(&data);
        assert_eq!((w, h), (20, 12));
        assert!(pixels.iter().all(|&v| v.abs_diff(90) <= 2));
    }

    #[test]
    fn test_abort_polled_per_mcu_row() {
        let source = image::RgbImage::from_pixel(16, 256, image::Rgb([1, 2, 3]));
        let data = encode(image::DynamicImage::ImageRgb8(source));

        let polls = std::cell::Cell::new(0);
        let jpeg = BaselineJpeg::parse(&data).unwrap();
        let result = jpeg.decode_rows(
            || {
                polls.set(polls.get() + 1);
                polls.get() > 3
            },
            |_, _| {},
        );
        assert_eq!(result, Err(JpegError::Aborted));
        assert_eq!(polls.get(), 4);
    }
}
