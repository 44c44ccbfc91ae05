use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub thumbnails: ThumbnailSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub launch: LaunchSettings,
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

impl Default for Config {
    /// One "Games" page on the working directory plus the recent page
    fn default() -> Self {
        Self {
            scan: ScanSettings::default(),
            thumbnails: ThumbnailSettings::default(),
            catalog: CatalogSettings::default(),
            launch: LaunchSettings::default(),
            pages: vec![
                PageConfig {
                    name: "Recent".to_string(),
                    paths: Vec::new(),
                    sort: SortMode::None,
                    recent: true,
                },
                PageConfig {
                    name: "Games".to_string(),
                    paths: vec![PathBuf::from(".")],
                    sort: SortMode::Name,
                    recent: false,
                },
            ],
        }
    }
}

/// How the title scan recognises and describes titles
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanSettings {
    /// File whose presence marks a subdirectory as a title
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Thumbnail image inside the title folder
    #[serde(default = "default_thumbnail")]
    pub thumbnail: String,
    /// Metadata sidecar, relative to the title folder
    #[serde(default = "default_sidecar")]
    pub sidecar: PathBuf,
    #[serde(default = "default_max_items")]
    pub max_items_per_page: usize,
    /// Number of inserted titles between two sorts of a page
    #[serde(default = "default_resort_interval")]
    pub resort_interval: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            thumbnail: default_thumbnail(),
            sidecar: default_sidecar(),
            max_items_per_page: default_max_items(),
            resort_interval: default_resort_interval(),
        }
    }
}

fn default_marker() -> String {
    "default.xbe".to_string()
}

fn default_thumbnail() -> String {
    "default.tbn".to_string()
}

fn default_sidecar() -> PathBuf {
    PathBuf::from("_resources").join("default.xml")
}

fn default_max_items() -> usize {
    1024
}

fn default_resort_interval() -> usize {
    32
}

/// Decode worker and cache tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailSettings {
    /// Output colour depth in bits per pixel (16 or 32)
    #[serde(default = "default_colour_depth")]
    pub colour_depth: u8,
    /// Largest output dimension; images are only ever scaled down
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Upper bound on queued decode jobs
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Resident byte budget of the decoded thumbnail cache
    #[serde(default = "default_cache_bytes")]
    pub cache_bytes: usize,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Keep decoded thumbnails on disk between runs
    #[serde(default = "default_disk_cache")]
    pub disk_cache: bool,
    /// Overrides the platform cache directory
    #[serde(default)]
    pub disk_cache_dir: Option<PathBuf>,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            colour_depth: default_colour_depth(),
            max_dimension: default_max_dimension(),
            pool_size: default_pool_size(),
            cache_bytes: default_cache_bytes(),
            sweep_interval_ms: default_sweep_interval_ms(),
            disk_cache: default_disk_cache(),
            disk_cache_dir: None,
        }
    }
}

fn default_colour_depth() -> u8 {
    32
}

fn default_max_dimension() -> u32 {
    128
}

fn default_pool_size() -> usize {
    16
}

fn default_cache_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_sweep_interval_ms() -> u64 {
    250
}

fn default_disk_cache() -> bool {
    true
}

/// Persistent catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    /// Database file; the front-end picks a per-user location when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: None,
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_recent_limit() -> usize {
    20
}

/// How a selected title is started
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LaunchSettings {
    /// Command template; `{exe}` and `{folder}` are substituted
    #[serde(default)]
    pub command: Option<String>,
}

/// Sort order of a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Case-insensitive title order
    #[default]
    Name,
    /// Keep insertion order
    None,
}

/// A named page backed by search paths
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    pub name: String,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub sort: SortMode,
    /// Filled from the catalog's launch history instead of a scan
    #[serde(default)]
    pub recent: bool,
}

impl PageConfig {
    /// Whether the scan worker sorts this page
    pub fn is_sorted(&self) -> bool {
        !self.recent && self.sort == SortMode::Name
    }
}
