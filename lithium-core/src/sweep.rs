//! Periodic abort of decode jobs whose thumbnails scrolled out of view.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::decode::{DecodeWorker, JobHandle};

/// Something that can cancel a decode job
pub trait JobAbort {
    fn abort_job(&self, handle: JobHandle) -> bool;
}

impl<T> JobAbort for DecodeWorker<T> {
    fn abort_job(&self, handle: JobHandle) -> bool {
        self.abort(handle)
    }
}

/// A decode job the UI is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightJob<K> {
    pub handle: JobHandle,
    pub key: K,
    /// Exempt from the off-screen sweep
    pub protected: bool,
}

/// Decode jobs in flight, keyed by thumbnail path
#[derive(Debug)]
pub struct InFlight<K> {
    jobs: HashMap<PathBuf, InFlightJob<K>>,
}

impl<K: PartialEq> InFlight<K> {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    pub fn track(&mut self, path: PathBuf, handle: JobHandle, key: K, protected: bool) {
        self.jobs.insert(
            path,
            InFlightJob {
                handle,
                key,
                protected,
            },
        );
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.jobs.contains_key(path)
    }

    /// Stop tracking a job whose completion arrived
    pub fn complete(&mut self, path: &Path) -> Option<InFlightJob<K>> {
        self.jobs.remove(path)
    }

    /// Set or clear the sweep exemption; false if the path is not tracked
    pub fn protect(&mut self, path: &Path, protected: bool) -> bool {
        match self.jobs.get_mut(path) {
            Some(job) => {
                job.protected = protected;
                true
            }
            None => false,
        }
    }

    /// Stop tracking every job for `key`, returning their handles
    pub fn detach_key(&mut self, key: &K) -> Vec<JobHandle> {
        let mut handles = Vec::new();
        self.jobs.retain(|_, job| {
            if job.key == *key {
                handles.push(job.handle);
                false
            } else {
                true
            }
        });
        handles
    }

    /// Stop tracking everything
    pub fn drain(&mut self) -> Vec<InFlightJob<K>> {
        self.jobs.drain().map(|(_, job)| job).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl<K: PartialEq> Default for InFlight<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-period sweep over an [`InFlight`] tracker
#[derive(Debug)]
pub struct AbortSweep {
    period: Duration,
    last: Option<Instant>,
}

impl AbortSweep {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether a sweep should run at `now`; starts the next period if so
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Abort and detach every job whose key is neither visible nor
    /// protected. Returns the number of jobs detached.
    pub fn sweep<K: PartialEq>(
        &self,
        tracker: &mut InFlight<K>,
        worker: &impl JobAbort,
        is_visible: impl Fn(&K) -> bool,
    ) -> usize {
        let before = tracker.jobs.len();
        tracker.jobs.retain(|path, job| {
            if job.protected || is_visible(&job.key) {
                return true;
            }
            let aborted = worker.abort_job(job.handle);
            trace!(path = %path.display(), aborted, "off-screen decode detached");
            false
        });
        before - tracker.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<JobHandle>>);

    impl JobAbort for Recorder {
        fn abort_job(&self, handle: JobHandle) -> bool {
            self.0.borrow_mut().push(handle);
            true
        }
    }

    fn handles(n: usize) -> Vec<JobHandle> {
        let mut arena = Arena::new();
        (0..n).map(|i| JobHandle(arena.insert(i).unwrap())).collect()
    }

    #[test]
    fn test_sweep_aborts_only_hidden_unprotected() {
        let h = handles(3);
        let mut tracker = InFlight::new();
        tracker.track(PathBuf::from("/a.tbn"), h[0], 'a', false);
        tracker.track(PathBuf::from("/b.tbn"), h[1], 'b', false);
        tracker.track(PathBuf::from("/c.tbn"), h[2], 'c', true);

        let worker = Recorder::default();
        let sweep = AbortSweep::new(Duration::from_millis(250));
        let detached = sweep.sweep(&mut tracker, &worker, |key| *key == 'a');

        assert_eq!(detached, 1);
        assert_eq!(*worker.0.borrow(), vec![h[1]]);
        assert!(tracker.is_in_flight(Path::new("/a.tbn")));
        assert!(!tracker.is_in_flight(Path::new("/b.tbn")));
        assert!(tracker.is_in_flight(Path::new("/c.tbn")));
    }

    #[test]
    fn test_unprotected_job_swept_next_time() {
        let h = handles(1);
        let mut tracker = InFlight::new();
        tracker.track(PathBuf::from("/a.tbn"), h[0], 1u32, true);

        let worker = Recorder::default();
        let sweep = AbortSweep::new(Duration::ZERO);
        assert_eq!(sweep.sweep(&mut tracker, &worker, |_| false), 0);

        assert!(tracker.protect(Path::new("/a.tbn"), false));
        assert_eq!(sweep.sweep(&mut tracker, &worker, |_| false), 1);
        assert!(tracker.is_empty());
        assert!(!tracker.protect(Path::new("/a.tbn"), true));
    }

    #[test]
    fn test_due_respects_period() {
        let start = Instant::now();
        let mut sweep = AbortSweep::new(Duration::from_millis(100));

        assert!(sweep.due(start));
        assert!(!sweep.due(start + Duration::from_millis(50)));
        assert!(sweep.due(start + Duration::from_millis(100)));
        assert!(!sweep.due(start + Duration::from_millis(150)));
    }

    #[test]
    fn test_complete_and_detach_key() {
        let h = handles(2);
        let mut tracker = InFlight::new();
        tracker.track(PathBuf::from("/a.tbn"), h[0], "a", false);
        tracker.track(PathBuf::from("/b.tbn"), h[1], "b", false);

        let job = tracker.complete(Path::new("/a.tbn")).unwrap();
        assert_eq!(job.key, "a");
        assert_eq!(tracker.complete(Path::new("/a.tbn")), None);

        assert_eq!(tracker.detach_key(&"b"), vec![h[1]]);
        assert!(tracker.is_empty());
    }
}
