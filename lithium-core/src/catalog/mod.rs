//! Persistent title catalog.
//!
//! The scan worker writes every discovered title through a [`TitleSink`];
//! the front-end reads launch history back to fill the recent page.

mod sqlite;

pub use sqlite::SqliteCatalog;

use crate::scanner::PageId;
use crate::title::TitleRecord;

/// Destination for titles discovered by the scan worker
pub trait TitleSink: Send {
    fn record_title(&mut self, page: PageId, record: &TitleRecord) -> crate::Result<()>;
}
