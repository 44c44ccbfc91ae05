use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::arena::Handle;

/// Handle to a submitted decode job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(pub(crate) Handle);

/// Lifecycle of a decode job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    Queued = 0,
    Decoding = 1,
    Aborted = 2,
    Done = 3,
}

impl JobState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => JobState::Queued,
            1 => JobState::Decoding,
            2 => JobState::Aborted,
            _ => JobState::Done,
        }
    }
}

/// Atomic job state shared by the submitter side and the worker
#[derive(Debug)]
pub(crate) struct JobFlag(AtomicU8);

impl JobFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(AtomicU8::new(JobState::Queued as u8)))
    }

    pub fn state(&self) -> JobState {
        JobState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_aborted(&self) -> bool {
        self.state() == JobState::Aborted
    }

    fn transition(&self, from: JobState, to: JobState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Queued -> Decoding; false if the job was aborted before it started
    pub fn begin(&self) -> bool {
        self.transition(JobState::Queued, JobState::Decoding)
    }

    /// Decoding -> Done; false if an abort arrived mid-decode
    pub fn finish(&self) -> bool {
        self.transition(JobState::Decoding, JobState::Done)
    }

    /// Queued or Decoding -> Aborted. No-op for aborted or finished jobs.
    pub fn abort(&self) -> bool {
        self.transition(JobState::Queued, JobState::Aborted)
            || self.transition(JobState::Decoding, JobState::Aborted)
    }
}

/// One occupied slot of the job pool
pub(crate) struct JobSlot<T> {
    pub path: PathBuf,
    pub tag: T,
    pub flag: Arc<JobFlag>,
}
