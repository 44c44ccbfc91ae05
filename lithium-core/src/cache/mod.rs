//! Thumbnail caching: a byte-budgeted in-memory LRU and an optional on-disk
//! store of already decoded pixels.

mod lru;
mod metadata;
mod store;

pub use lru::ThumbnailCache;
pub use metadata::{STORE_MAGIC, STORE_VERSION, StoreMetadata};
pub use store::{ThumbnailStore, store_path_for};
