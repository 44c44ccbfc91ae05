use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::sidecar::read_sidecar;
use super::xbe::read_certificate;
use crate::config::ScanSettings;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable identity of a title, derived from its launch path.
///
/// FNV-1a over the path bytes, so ids persisted in the catalog stay valid
/// across builds and toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TitleId(pub u64);

impl TitleId {
    pub fn for_executable(path: &Path) -> Self {
        let hash = path
            .as_os_str()
            .as_encoded_bytes()
            .iter()
            .fold(FNV_OFFSET_BASIS, |hash, &byte| {
                (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
            });
        TitleId(hash)
    }
}

impl std::fmt::Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Descriptive fields, all optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleMetadata {
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub release_date: Option<String>,
    pub rating: Option<String>,
    pub overview: Option<String>,
}

/// Where the display title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    Sidecar,
    Certificate,
    FolderName,
}

impl TitleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleSource::Sidecar => "sidecar",
            TitleSource::Certificate => "certificate",
            TitleSource::FolderName => "folder",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "sidecar" => TitleSource::Sidecar,
            "certificate" => TitleSource::Certificate,
            _ => TitleSource::FolderName,
        }
    }
}

/// A discovered launchable entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    pub id: TitleId,
    pub title: String,
    pub folder: PathBuf,
    pub executable: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub metadata: TitleMetadata,
    pub xbe_title_id: Option<u32>,
    pub source: TitleSource,
}

impl TitleRecord {
    /// Build a record for a title folder whose launch marker is `executable`.
    ///
    /// The display title comes from the sidecar, then the launch binary's
    /// certificate, then the folder name, so it is never empty.
    pub fn discover(
        folder: &Path,
        executable: PathBuf,
        thumbnail: Option<PathBuf>,
        settings: &ScanSettings,
    ) -> Self {
        let certificate = match read_certificate(&executable) {
            Ok(cert) => Some(cert),
            Err(e) => {
                debug!(path = %executable.display(), error = %e, "no certificate");
                None
            }
        };

        let sidecar_path = folder.join(&settings.sidecar);
        let sidecar = match read_sidecar(&sidecar_path) {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                trace!(path = %sidecar_path.display(), error = %e, "no usable sidecar");
                None
            }
        };

        let xbe_title_id = certificate.as_ref().map(|c| c.title_id);

        let (title, metadata, source) = match (sidecar, certificate) {
            (Some(sidecar), _) => (sidecar.title, sidecar.metadata, TitleSource::Sidecar),
            (None, Some(cert)) if !cert.title_name.is_empty() => (
                cert.title_name,
                TitleMetadata::default(),
                TitleSource::Certificate,
            ),
            _ => (
                folder_name(folder),
                TitleMetadata::default(),
                TitleSource::FolderName,
            ),
        };

        Self {
            id: TitleId::for_executable(&executable),
            title,
            folder: folder.to_path_buf(),
            executable,
            thumbnail,
            metadata,
            xbe_title_id,
            source,
        }
    }

    /// Key used for case-normalised alphabetic ordering
    pub fn sort_key(&self) -> String {
        self.title.to_lowercase()
    }
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| folder.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::xbe::synthetic_xbe;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_title_id_is_fixed_function_of_path() {
        assert_eq!(TitleId::for_executable(Path::new("")).0, FNV_OFFSET_BASIS);
        assert_eq!(TitleId::for_executable(Path::new("a")).0, 0xaf63_dc4c_8601_ec8c);
        assert_eq!(
            TitleId::for_executable(Path::new("a")).to_string(),
            "af63dc4c8601ec8c"
        );
    }

    fn title_folder(temp: &TempDir, name: &str, xbe: &[u8]) -> (PathBuf, PathBuf) {
        let folder = temp.path().join(name);
        fs::create_dir_all(&folder).unwrap();
        let exe = folder.join("default.xbe");
        fs::write(&exe, xbe).unwrap();
        (folder, exe)
    }

    #[test]
    fn test_sidecar_wins() {
        let temp = TempDir::new().unwrap();
        let (folder, exe) = title_folder(&temp, "halo", &synthetic_xbe(0x4D530004, "HALO"));
        fs::create_dir_all(folder.join("_resources")).unwrap();
        fs::write(
            folder.join("_resources/default.xml"),
            "<x><title>Halo</title><developer>Bungie</developer><rating>M</rating></x>",
        )
        .unwrap();

        let record = TitleRecord::discover(&folder, exe.clone(), None, &ScanSettings::default());
        assert_eq!(record.title, "Halo");
        assert_eq!(record.source, TitleSource::Sidecar);
        assert_eq!(record.metadata.developer.as_deref(), Some("Bungie"));
        assert_eq!(record.metadata.rating.as_deref(), Some("M"));
        assert_eq!(record.xbe_title_id, Some(0x4D530004));
        assert_eq!(record.id, TitleId::for_executable(&exe));
    }

    #[test]
    fn test_certificate_fallback() {
        let temp = TempDir::new().unwrap();
        let (folder, exe) = title_folder(&temp, "otogi", &synthetic_xbe(1, "Otogi"));
        let record = TitleRecord::discover(&folder, exe, None, &ScanSettings::default());
        assert_eq!(record.title, "Otogi");
        assert_eq!(record.source, TitleSource::Certificate);
    }

    #[test]
    fn test_folder_name_fallback() {
        let temp = TempDir::new().unwrap();
        let (folder, exe) = title_folder(&temp, "Homebrew Player", b"not an xbe");
        fs::create_dir_all(folder.join("_resources")).unwrap();
        fs::write(folder.join("_resources/default.xml"), "<x><title>oops</x>").unwrap();

        let record = TitleRecord::discover(&folder, exe, None, &ScanSettings::default());
        assert_eq!(record.title, "Homebrew Player");
        assert_eq!(record.source, TitleSource::FolderName);
        assert_eq!(record.xbe_title_id, None);
    }

    #[test]
    fn test_title_id_is_stable() {
        let a = TitleId::for_executable(Path::new("/games/a/default.xbe"));
        let b = TitleId::for_executable(Path::new("/games/a/default.xbe"));
        let c = TitleId::for_executable(Path::new("/games/b/default.xbe"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
