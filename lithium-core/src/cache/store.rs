use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use super::metadata::{STORE_MAGIC, STORE_VERSION, StoreMetadata};
use crate::decode::{DecodedImage, PixelFormat};
use crate::{LithiumError, Result};

/// Get the store file path for a given thumbnail source
pub fn store_path_for(source: &Path, dir: &Path) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    dir.join(format!("{:016x}.ltc", hasher.finish()))
}

/// Directory of decoded thumbnails keyed by source path.
///
/// Entries are only served while the source file's mtime and length, the
/// pixel format and the bounding box all match what was stored; anything
/// else counts as a miss and the caller decodes again.
#[derive(Debug, Clone)]
pub struct ThumbnailStore {
    dir: PathBuf,
}

impl ThumbnailStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored pixels for `source`, if present and still valid
    pub fn load(&self, source: &Path, format: PixelFormat, max_dimension: u32) -> Option<DecodedImage> {
        let path = store_path_for(source, &self.dir);
        let (meta, pixels) = match read_entry(&path) {
            Ok(entry) => entry,
            Err(e) => {
                if path.exists() {
                    trace!(path = %path.display(), error = %e, "discarding unreadable store entry");
                }
                return None;
            }
        };

        let (mtime, len) = source_stamp(source)?;
        let valid = meta.source == source
            && meta.source_mtime == mtime
            && meta.source_len == len
            && meta.format == format
            && meta.max_dimension == max_dimension;
        if !valid {
            trace!(source = %source.display(), "store entry is stale");
            return None;
        }

        let image = DecodedImage {
            width: meta.width,
            height: meta.height,
            format: meta.format,
            pixels,
        };
        image.is_consistent().then_some(image)
    }

    /// Store decoded pixels for `source`
    ///
    /// File format:
    /// [4B] Magic "LXTC"
    /// [4B] Version (u32 LE)
    /// [4B] Metadata length (u32 LE)
    /// [NB] Metadata (postcard)
    /// [4B] Pixel length (u32 LE)
    /// [MB] Pixels
    /// [4B] CRC32 checksum of all preceding bytes
    pub fn save(&self, source: &Path, image: &DecodedImage, max_dimension: u32) -> Result<()> {
        let (source_mtime, source_len) = source_stamp(source)
            .ok_or_else(|| LithiumError::Store(format!("Cannot stat {}", source.display())))?;
        let meta = StoreMetadata {
            version: STORE_VERSION,
            source: source.to_path_buf(),
            source_mtime,
            source_len,
            format: image.format,
            max_dimension,
            width: image.width,
            height: image.height,
        };

        fs::create_dir_all(&self.dir)?;

        let meta_bytes = postcard::to_allocvec(&meta)
            .map_err(|e| LithiumError::Store(format!("Failed to serialize metadata: {}", e)))?;

        let mut data = Vec::with_capacity(24 + meta_bytes.len() + image.pixels.len());
        data.extend_from_slice(&STORE_MAGIC);
        data.extend_from_slice(&STORE_VERSION.to_le_bytes());
        data.extend_from_slice(&(meta_bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(&meta_bytes);
        data.extend_from_slice(&(image.pixels.len() as u32).to_le_bytes());
        data.extend_from_slice(&image.pixels);
        let checksum = crc32fast::hash(&data);
        data.extend_from_slice(&checksum.to_le_bytes());

        // Write to a temp file then rename so readers never see a partial entry
        let path = store_path_for(source, &self.dir);
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Delete the stored entry for `source`, if any
    pub fn invalidate(&self, source: &Path) -> Result<()> {
        match fs::remove_file(store_path_for(source, &self.dir)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn source_stamp(source: &Path) -> Option<(SystemTime, u64)> {
    let meta = fs::metadata(source).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| LithiumError::Store("Unexpected end of store entry".to_string()))
}

fn read_entry(path: &Path) -> Result<(StoreMetadata, Vec<u8>)> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    // magic(4) + version(4) + meta_len(4) + pixel_len(4) + checksum(4)
    if data.len() < 20 {
        return Err(LithiumError::Store("Store entry too small".to_string()));
    }

    let checksum_offset = data.len() - 4;
    let stored_checksum = read_u32(&data, checksum_offset)?;
    if stored_checksum != crc32fast::hash(&data[..checksum_offset]) {
        return Err(LithiumError::Store("Store checksum mismatch".to_string()));
    }

    if data[..4] != STORE_MAGIC {
        return Err(LithiumError::Store("Invalid store magic".to_string()));
    }

    let version = read_u32(&data, 4)?;
    if version != STORE_VERSION {
        return Err(LithiumError::Store(format!(
            "Store version mismatch: expected {}, got {}",
            STORE_VERSION, version
        )));
    }

    let mut offset = 8;
    let meta_len = read_u32(&data, offset)? as usize;
    offset += 4;
    if offset + meta_len > checksum_offset {
        return Err(LithiumError::Store("Invalid metadata length".to_string()));
    }
    let meta: StoreMetadata = postcard::from_bytes(&data[offset..offset + meta_len])
        .map_err(|e| LithiumError::Store(format!("Failed to deserialize metadata: {}", e)))?;
    offset += meta_len;

    let pixel_len = read_u32(&data, offset)? as usize;
    offset += 4;
    if offset + pixel_len != checksum_offset {
        return Err(LithiumError::Store("Invalid pixel length".to_string()));
    }

    Ok((meta, data[offset..offset + pixel_len].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_image() -> DecodedImage {
        let mut image = DecodedImage::blank(2, 2, PixelFormat::Bgra8888);
        for (i, byte) in image.pixels.iter_mut().enumerate() {
            *byte = i as u8;
        }
        image
    }

    fn setup() -> (TempDir, PathBuf, ThumbnailStore) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("default.tbn");
        fs::write(&source, b"jpeg bytes").unwrap();
        let store = ThumbnailStore::new(temp.path().join("store"));
        (temp, source, store)
    }

    #[test]
    fn test_store_path_generation() {
        let dir = PathBuf::from("/tmp/lithiumx");
        let a = store_path_for(Path::new("/games/a/default.tbn"), &dir);
        let b = store_path_for(Path::new("/games/b/default.tbn"), &dir);

        assert!(a.to_string_lossy().ends_with(".ltc"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_save_then_load() {
        let (_temp, source, store) = setup();
        let image = sample_image();

        store.save(&source, &image, 128).unwrap();
        let loaded = store.load(&source, PixelFormat::Bgra8888, 128);
        assert_eq!(loaded, Some(image));
    }

    #[test]
    fn test_load_missing_entry() {
        let (_temp, source, store) = setup();
        assert_eq!(store.load(&source, PixelFormat::Bgra8888, 128), None);
    }

    #[test]
    fn test_format_or_size_change_misses() {
        let (_temp, source, store) = setup();
        store.save(&source, &sample_image(), 128).unwrap();

        assert_eq!(store.load(&source, PixelFormat::Rgb565, 128), None);
        assert_eq!(store.load(&source, PixelFormat::Bgra8888, 64), None);
    }

    #[test]
    fn test_source_mtime_change_invalidates() {
        let (_temp, source, store) = setup();
        store.save(&source, &sample_image(), 128).unwrap();

        let file = File::options().write(true).open(&source).unwrap();
        let mtime = file.metadata().unwrap().modified().unwrap();
        file.set_modified(mtime + Duration::from_secs(60)).unwrap();
        drop(file);

        assert_eq!(store.load(&source, PixelFormat::Bgra8888, 128), None);
    }

    #[test]
    fn test_corrupted_entry_is_a_miss() {
        let (_temp, source, store) = setup();
        store.save(&source, &sample_image(), 128).unwrap();

        let entry = store_path_for(&source, store.dir());
        let mut data = fs::read(&entry).unwrap();
        let mid = data.len() / 2;
        data[mid] ^= 0xff;
        fs::write(&entry, data).unwrap();

        assert_eq!(store.load(&source, PixelFormat::Bgra8888, 128), None);
        assert!(read_entry(&entry).is_err());
    }

    #[test]
    fn test_invalidate() {
        let (_temp, source, store) = setup();
        store.save(&source, &sample_image(), 128).unwrap();
        store.invalidate(&source).unwrap();
        store.invalidate(&source).unwrap();

        assert!(!store_path_for(&source, store.dir()).exists());
    }
}
