mod cursor;
mod progress;
mod worker;

pub use cursor::ScanCursor;
pub use progress::{PageId, ScanEvent, ScanProgress};
pub use worker::{CancellationToken, ScanHandle, ScanWorker, StepOutcome};
