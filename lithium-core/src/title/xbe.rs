//! Just enough of the XBE image header to identify a title.
//!
//! Layout (all little endian):
//! [0x000] magic "XBEH"
//! [0x104] base address the image is loaded at
//! [0x108] size of all headers
//! [0x118] virtual address of the certificate
//!
//! Certificate:
//! [0x008] title id (u32)
//! [0x00C] title name, 40 UTF-16 code units, NUL padded

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

const XBE_MAGIC: [u8; 4] = *b"XBEH";
const BASE_ADDR_OFFSET: usize = 0x104;
const HEADERS_SIZE_OFFSET: usize = 0x108;
const CERT_ADDR_OFFSET: usize = 0x118;
const CERT_TITLE_ID_OFFSET: usize = 0x08;
const CERT_TITLE_NAME_OFFSET: usize = 0x0C;
const TITLE_NAME_UNITS: usize = 40;

/// Headers are never read past this, whatever the image claims
const MAX_HEADER_BYTES: u64 = 64 * 1024;

#[derive(Debug, Error)]
pub enum XbeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not an XBE image (bad magic)")]
    BadMagic,

    #[error("XBE header truncated at offset {0:#x}")]
    Truncated(usize),

    #[error("Certificate address {cert:#x} is outside the headers (base {base:#x})")]
    CertificateOutOfRange { base: u32, cert: u32 },
}

/// Identity embedded in the launch binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub title_id: u32,
    pub title_name: String,
}

/// Read the certificate from an XBE file on disk
pub fn read_certificate(path: &Path) -> Result<Certificate, XbeError> {
    let file = File::open(path)?;
    let mut data = Vec::new();
    file.take(MAX_HEADER_BYTES).read_to_end(&mut data)?;

    // Trust the declared header size only to shrink what we parse
    if let Ok(declared) = read_u32(&data, HEADERS_SIZE_OFFSET) {
        let declared = declared as usize;
        if declared > CERT_ADDR_OFFSET && declared < data.len() {
            data.truncate(declared);
        }
    }

    parse_certificate(&data)
}

/// Parse the certificate out of the XBE header bytes
pub fn parse_certificate(data: &[u8]) -> Result<Certificate, XbeError> {
    if data.len() < XBE_MAGIC.len() || data[..4] != XBE_MAGIC {
        return Err(XbeError::BadMagic);
    }

    let base = read_u32(data, BASE_ADDR_OFFSET)?;
    let cert = read_u32(data, CERT_ADDR_OFFSET)?;

    let cert_offset = cert
        .checked_sub(base)
        .map(|offset| offset as usize)
        .filter(|offset| {
            offset + CERT_TITLE_NAME_OFFSET + TITLE_NAME_UNITS * 2 <= data.len()
        })
        .ok_or(XbeError::CertificateOutOfRange { base, cert })?;

    let title_id = read_u32(data, cert_offset + CERT_TITLE_ID_OFFSET)?;

    let name_start = cert_offset + CERT_TITLE_NAME_OFFSET;
    let units: Vec<u16> = data[name_start..name_start + TITLE_NAME_UNITS * 2]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    let title_name = String::from_utf16_lossy(&units).trim().to_string();

    Ok(Certificate {
        title_id,
        title_name,
    })
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, XbeError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(XbeError::Truncated(offset))
}

/// Build a minimal XBE header carrying a certificate (test fixture)
#[cfg(test)]
pub(crate) fn synthetic_xbe(title_id: u32, title_name: &str) -> Vec<u8> {
    let base: u32 = 0x0001_0000;
    let cert_offset: usize = 0x180;
    let mut data = vec![0u8; 0x1000];

    data[..4].copy_from_slice(&XBE_MAGIC);
    data[BASE_ADDR_OFFSET..BASE_ADDR_OFFSET + 4].copy_from_slice(&base.to_le_bytes());
    let headers_size = data.len() as u32;
    data[HEADERS_SIZE_OFFSET..HEADERS_SIZE_OFFSET + 4].copy_from_slice(&headers_size.to_le_bytes());
    data[CERT_ADDR_OFFSET..CERT_ADDR_OFFSET + 4]
        .copy_from_slice(&(base + cert_offset as u32).to_le_bytes());

    let id_at = cert_offset + CERT_TITLE_ID_OFFSET;
    data[id_at..id_at + 4].copy_from_slice(&title_id.to_le_bytes());

    let name_at = cert_offset + CERT_TITLE_NAME_OFFSET;
    for (i, unit) in title_name.encode_utf16().take(TITLE_NAME_UNITS).enumerate() {
        data[name_at + i * 2..name_at + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_certificate() {
        let data = synthetic_xbe(0x4D53_0004, "Halo");
        let cert = parse_certificate(&data).unwrap();
        assert_eq!(cert.title_id, 0x4D53_0004);
        assert_eq!(cert.title_name, "Halo");
    }

    #[test]
    fn test_bad_magic() {
        let mut data = synthetic_xbe(1, "Title");
        data[0] = b'Z';
        assert!(matches!(parse_certificate(&data), Err(XbeError::BadMagic)));
        assert!(matches!(parse_certificate(b"XB"), Err(XbeError::BadMagic)));
    }

    #[test]
    fn test_certificate_out_of_range() {
        let mut data = synthetic_xbe(1, "Title");
        data[CERT_ADDR_OFFSET..CERT_ADDR_OFFSET + 4].copy_from_slice(&0x10u32.to_le_bytes());
        assert!(matches!(
            parse_certificate(&data),
            Err(XbeError::CertificateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = synthetic_xbe(1, "Title");
        assert!(matches!(
            parse_certificate(&data[..0x100]),
            Err(XbeError::Truncated(_))
        ));
    }

    #[test]
    fn test_read_certificate_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("default.xbe");
        std::fs::write(&path, synthetic_xbe(7, "Jet Set Radio Future")).unwrap();

        let cert = read_certificate(&path).unwrap();
        assert_eq!(cert.title_id, 7);
        assert_eq!(cert.title_name, "Jet Set Radio Future");
    }
}
