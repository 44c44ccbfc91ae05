pub mod arena;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod decode;
pub mod error;
pub mod library;
pub mod scanner;
pub mod sweep;
pub mod thumbnails;
pub mod title;

pub use cache::{ThumbnailCache, ThumbnailStore};
pub use catalog::{SqliteCatalog, TitleSink};
pub use config::{Config, ConfigError, PageConfig, SortMode, load_config, validate_config};
pub use decode::{DecodeCompletion, DecodeConfig, DecodeError, DecodeWorker, DecodedImage, JobHandle, PixelFormat};
pub use error::{LithiumError, Result};
pub use library::{Library, PageView};
pub use scanner::{CancellationToken, PageId, ScanEvent, ScanHandle, ScanProgress, ScanWorker, StepOutcome};
pub use sweep::{AbortSweep, InFlight};
pub use thumbnails::{Request, Thumbnails};
pub use title::{TitleId, TitleMetadata, TitleRecord, TitleSource};
