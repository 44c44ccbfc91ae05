use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::decode::PixelFormat;

/// Current store format version - increment when format changes
pub const STORE_VERSION: u32 = 1;

/// Magic bytes identifying a stored thumbnail
pub const STORE_MAGIC: [u8; 4] = *b"LXTC";

/// Header stored in front of the pixel data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub version: u32,
    /// Thumbnail file the pixels were decoded from
    pub source: PathBuf,
    /// Modification time of the source at decode time
    pub source_mtime: SystemTime,
    pub source_len: u64,
    pub format: PixelFormat,
    /// Bounding box the decode was scaled into
    pub max_dimension: u32,
    pub width: u32,
    pub height: u32,
}
