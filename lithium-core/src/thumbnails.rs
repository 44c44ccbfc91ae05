//! UI-side glue between the decode worker, the thumbnail cache and the
//! off-screen sweep.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::ThumbnailCache;
use crate::decode::{DecodeConfig, DecodeWorker, DecodedImage, JobHandle, SubmitError};
use crate::sweep::{AbortSweep, InFlight};

/// What `request` did for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Already decoded and resident
    Cached,
    /// A job for the same path is in flight
    Pending,
    Submitted,
    /// Decoding failed before; the placeholder stays
    Unavailable,
    /// No free job slot; try again on a later frame
    Busy,
}

/// Thumbnail pipeline as seen from the UI thread
pub struct Thumbnails<K> {
    worker: DecodeWorker<K>,
    cache: ThumbnailCache<K, DecodedImage>,
    in_flight: InFlight<K>,
    sweep: AbortSweep,
    failed: HashSet<K>,
    /// Finished jobs whose owner went away before the completion was polled
    dropped: HashSet<JobHandle>,
    busy_warned: bool,
}

impl<K: Eq + Hash + Clone + Send + 'static> Thumbnails<K> {
    pub fn new(config: DecodeConfig, cache_bytes: usize, sweep_period: Duration) -> crate::Result<Self> {
        Ok(Self {
            worker: DecodeWorker::init(config)?,
            cache: ThumbnailCache::new(cache_bytes),
            in_flight: InFlight::new(),
            sweep: AbortSweep::new(sweep_period),
            failed: HashSet::new(),
            dropped: HashSet::new(),
            busy_warned: false,
        })
    }

    /// Make sure a thumbnail for `key` is resident or on its way
    pub fn request(&mut self, key: K, path: &Path, protected: bool) -> Request {
        if self.cache.contains(&key) {
            return Request::Cached;
        }
        if self.failed.contains(&key) {
            return Request::Unavailable;
        }
        if self.in_flight.is_in_flight(path) {
            if protected {
                self.in_flight.protect(path, true);
            }
            return Request::Pending;
        }

        match self.worker.submit(path, key.clone()) {
            Ok(handle) => {
                self.in_flight.track(path.to_path_buf(), handle, key, protected);
                self.busy_warned = false;
                Request::Submitted
            }
            Err(SubmitError::PoolExhausted) => {
                if !self.busy_warned {
                    warn!(in_flight = self.in_flight.len(), "decode pool exhausted, deferring thumbnails");
                    self.busy_warned = true;
                }
                Request::Busy
            }
            Err(SubmitError::ShutDown) => Request::Busy,
        }
    }

    /// Resident thumbnail for `key`, refreshing its recency
    pub fn get(&mut self, key: &K) -> Option<&DecodedImage> {
        self.cache.get(key)
    }

    /// Resident thumbnail for `key` without touching recency
    pub fn peek(&self, key: &K) -> Option<&DecodedImage> {
        self.cache.peek(key)
    }

    pub fn is_cached(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    pub fn is_unavailable(&self, key: &K) -> bool {
        self.failed.contains(key)
    }

    /// Drain finished decodes into the cache.
    ///
    /// `on_ready` sees every completion, with `None` when the thumbnail could
    /// not be decoded. `on_release` receives whatever the cache evicts.
    pub fn poll(
        &mut self,
        mut on_ready: impl FnMut(&K, Option<&DecodedImage>),
        mut on_release: impl FnMut(K, DecodedImage),
    ) -> usize {
        let completions: Vec<_> = self.worker.completions().try_iter().collect();
        let count = completions.len();

        for completion in completions {
            if self.dropped.remove(&completion.handle) {
                continue;
            }
            self.in_flight.complete(&completion.path);
            let key = completion.tag;
            match completion.result {
                Ok(image) => {
                    let bytes = image.byte_size();
                    self.cache.put(key.clone(), image, bytes, &mut on_release);
                    on_ready(&key, self.cache.peek(&key));
                }
                Err(e) => {
                    debug!(path = %completion.path.display(), error = %e, "no thumbnail");
                    self.failed.insert(key.clone());
                    on_ready(&key, None);
                }
            }
        }
        count
    }

    /// Drop everything held for `key`, e.g. when its UI item goes away
    pub fn forget(&mut self, key: &K) -> Option<DecodedImage> {
        for handle in self.in_flight.detach_key(key) {
            self.discard(handle);
        }
        self.failed.remove(key);
        self.cache.remove(key)
    }

    /// Abort a job; if it already finished, drop its queued completion
    fn discard(&mut self, handle: JobHandle) {
        if !self.worker.abort(handle) {
            self.dropped.insert(handle);
        }
    }

    /// Run the off-screen sweep if its period elapsed
    pub fn tick(&mut self, now: Instant, is_visible: impl Fn(&K) -> bool) -> usize {
        if !self.sweep.due(now) {
            return 0;
        }
        self.sweep.sweep(&mut self.in_flight, &self.worker, is_visible)
    }

    /// Release every cached thumbnail and abort outstanding jobs
    pub fn clear(&mut self, on_release: impl FnMut(K, DecodedImage)) {
        for job in self.in_flight.drain() {
            self.discard(job.handle);
        }
        self.failed.clear();
        self.cache.clear(on_release);
    }

    pub fn resident_bytes(&self) -> usize {
        self.cache.resident_bytes()
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn worker(&self) -> &DecodeWorker<K> {
        &self.worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{PixelFormat, write_test_jpeg};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn thumbnails(cache_bytes: usize) -> Thumbnails<u32> {
        let config = DecodeConfig {
            format: PixelFormat::Bgra8888,
            max_dimension: 16,
            pool_size: 4,
            store: None,
        };
        Thumbnails::new(config, cache_bytes, Duration::from_millis(250)).unwrap()
    }

    fn poll_until(thumbs: &mut Thumbnails<u32>, n: usize) -> Vec<(u32, bool)> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while seen.len() < n && Instant::now() < deadline {
            thumbs.poll(|k, img| seen.push((*k, img.is_some())), |_, _| {});
            std::thread::sleep(Duration::from_millis(5));
        }
        seen
    }

    fn jpeg(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        write_test_jpeg(&path, 32, 32, [200, 40, 40]);
        path
    }

    #[test]
    fn test_request_decodes_then_hits_cache() {
        let temp = TempDir::new().unwrap();
        let path = jpeg(temp.path(), "a.tbn");
        let mut thumbs = thumbnails(1 << 20);

        assert_eq!(thumbs.request(1, &path, false), Request::Submitted);
        assert_eq!(thumbs.request(1, &path, false), Request::Pending);

        assert_eq!(poll_until(&mut thumbs, 1), vec![(1, true)]);
        assert_eq!(thumbs.request(1, &path, false), Request::Cached);
        assert!(thumbs.is_cached(&1));
        assert!(thumbs.peek(&2).is_none());
        let image = thumbs.get(&1).unwrap();
        assert_eq!((image.width, image.height), (16, 16));
        assert_eq!(thumbs.pending(), 0);
    }

    #[test]
    fn test_failed_decode_marks_unavailable() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.tbn");
        let mut thumbs = thumbnails(1 << 20);

        thumbs.request(7, &missing, false);
        assert_eq!(poll_until(&mut thumbs, 1), vec![(7, false)]);
        assert_eq!(thumbs.request(7, &missing, false), Request::Unavailable);

        thumbs.forget(&7);
        assert!(!thumbs.is_unavailable(&7));
    }

    #[test]
    fn test_cache_budget_evicts_oldest() {
        let temp = TempDir::new().unwrap();
        // 16x16 BGRA is 1 KiB; room for two
        let mut thumbs = thumbnails(2048);
        let paths: Vec<PathBuf> = (0..3).map(|i| jpeg(temp.path(), &format!("{}.tbn", i))).collect();

        for (i, path) in paths.iter().enumerate().take(2) {
            thumbs.request(i as u32, path, false);
        }
        poll_until(&mut thumbs, 2);

        thumbs.get(&0);
        thumbs.request(2, &paths[2], false);

        let mut released = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while thumbs.pending() > 0 && Instant::now() < deadline {
            thumbs.poll(|_, _| {}, |k, _| released.push(k));
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(released, vec![1]);
        assert_eq!(thumbs.resident_bytes(), 2048);
    }

    #[test]
    fn test_forget_releases_cached_image() {
        let temp = TempDir::new().unwrap();
        let path = jpeg(temp.path(), "a.tbn");
        let mut thumbs = thumbnails(1 << 20);

        thumbs.request(3, &path, false);
        poll_until(&mut thumbs, 1);

        assert!(thumbs.forget(&3).is_some());
        assert_eq!(thumbs.resident_bytes(), 0);
        assert_eq!(thumbs.request(3, &path, false), Request::Submitted);
    }

    #[test]
    fn test_tick_detaches_hidden_jobs() {
        let temp = TempDir::new().unwrap();
        let a = jpeg(temp.path(), "a.tbn");
        let b = jpeg(temp.path(), "b.tbn");
        let mut thumbs = thumbnails(1 << 20);

        thumbs.request(1, &a, false);
        thumbs.request(2, &b, true);
        let detached = thumbs.tick(Instant::now(), |_| false);

        // Tracked until polled, so job 1 is detached even if it already finished
        assert_eq!(detached, 1);
        assert_eq!(thumbs.pending(), 1);
        assert_eq!(thumbs.tick(Instant::now(), |_| false), 0);
    }

    #[test]
    fn test_forget_drops_already_queued_completion() {
        let temp = TempDir::new().unwrap();
        let a = jpeg(temp.path(), "a.tbn");
        let mut thumbs = thumbnails(1 << 20);

        assert_eq!(thumbs.request(1, &a, false), Request::Submitted);
        let deadline = Instant::now() + Duration::from_secs(10);
        while thumbs.worker().completions().is_empty() {
            assert!(Instant::now() < deadline, "decode never finished");
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(thumbs.forget(&1).is_none());
        let mut ready = Vec::new();
        assert_eq!(thumbs.poll(|k, _| ready.push(*k), |_, _| {}), 1);
        assert!(ready.is_empty());
        assert!(!thumbs.is_cached(&1));
        assert_eq!(thumbs.resident_bytes(), 0);

        // A fresh request decodes again and lands normally
        assert_eq!(thumbs.request(1, &a, false), Request::Submitted);
        assert_eq!(poll_until(&mut thumbs, 1), vec![(1, true)]);
        assert!(thumbs.is_cached(&1));
    }
}
