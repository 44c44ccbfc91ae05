use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::pixels::{DecodedImage, PixelFormat};
use super::job::{JobFlag, JobHandle, JobSlot, JobState};
use super::jpeg::{DecodeError, decode_file};
use crate::arena::Arena;
use crate::cache::ThumbnailStore;

/// Decode worker configuration
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    pub format: PixelFormat,
    pub max_dimension: u32,
    /// Upper bound on jobs queued or decoding at once
    pub pool_size: usize,
    /// Optional on-disk store consulted before decoding
    pub store: Option<ThumbnailStore>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Decode job pool is exhausted")]
    PoolExhausted,

    #[error("Decode worker has shut down")]
    ShutDown,
}

/// Result of a decode job that was not aborted
#[derive(Debug)]
pub struct DecodeCompletion<T> {
    pub handle: JobHandle,
    pub tag: T,
    pub path: PathBuf,
    pub result: Result<DecodedImage, DecodeError>,
}

struct Shared<T> {
    pool: Mutex<Arena<JobSlot<T>>>,
}

impl<T> Shared<T> {
    fn pool(&self) -> MutexGuard<'_, Arena<JobSlot<T>>> {
        self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Background thread decoding thumbnails one job at a time.
///
/// Jobs live in a bounded slot arena guarded by a mutex. The FIFO queue is a
/// bounded channel of handles, which also acts as the counting semaphore the
/// worker thread waits on. Completions go out on a separate channel, never
/// while the pool lock is held.
pub struct DecodeWorker<T> {
    shared: Arc<Shared<T>>,
    queue: Option<Sender<JobHandle>>,
    completions: Receiver<DecodeCompletion<T>>,
    thread: Option<JoinHandle<()>>,
    /// Worker ends of the channels until the thread is spawned
    parked: Option<(Receiver<JobHandle>, Sender<DecodeCompletion<T>>)>,
    config: DecodeConfig,
}

impl<T: Send + 'static> DecodeWorker<T> {
    /// Start the worker thread
    pub fn init(config: DecodeConfig) -> crate::Result<Self> {
        let mut worker = Self::parked(config);
        worker.start()?;
        Ok(worker)
    }

    /// Build the pool and queue without starting the thread
    fn parked(config: DecodeConfig) -> Self {
        let pool_size = config.pool_size.max(1);
        let shared = Arc::new(Shared {
            pool: Mutex::new(Arena::bounded(pool_size)),
        });
        let (queue_tx, queue_rx) = crossbeam_channel::bounded(pool_size);
        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        Self {
            shared,
            queue: Some(queue_tx),
            completions: done_rx,
            thread: None,
            parked: Some((queue_rx, done_tx)),
            config,
        }
    }

    fn start(&mut self) -> crate::Result<()> {
        let Some((queue_rx, done_tx)) = self.parked.take() else {
            return Ok(());
        };

        let thread_shared = Arc::clone(&self.shared);
        let thread_config = self.config.clone();
        let thread = std::thread::Builder::new()
            .name("thumb-decode".to_string())
            .spawn(move || run(thread_shared, queue_rx, done_tx, thread_config))?;
        self.thread = Some(thread);

        debug!(
            format = ?self.config.format,
            max_dimension = self.config.max_dimension,
            pool_size = self.config.pool_size,
            "decode worker started"
        );
        Ok(())
    }

    /// Queue a file for decoding
    pub fn submit(&self, path: impl Into<PathBuf>, tag: T) -> Result<JobHandle, SubmitError> {
        let queue = self.queue.as_ref().ok_or(SubmitError::ShutDown)?;

        let slot = JobSlot {
            path: path.into(),
            tag,
            flag: JobFlag::new(),
        };
        let handle = match self.shared.pool().insert(slot) {
            Ok(handle) => JobHandle(handle),
            Err(_) => return Err(SubmitError::PoolExhausted),
        };

        match queue.try_send(handle) {
            Ok(()) => Ok(handle),
            Err(e) => {
                self.shared.pool().remove(handle.0);
                match e {
                    TrySendError::Full(_) => Err(SubmitError::PoolExhausted),
                    TrySendError::Disconnected(_) => Err(SubmitError::ShutDown),
                }
            }
        }
    }

    /// Abort everything outstanding, stop the thread and wait for it
    pub fn deinit(&mut self) {
        self.shutdown();
    }
}

impl<T> DecodeWorker<T> {
    /// Cancel a job. Returns false for jobs that already finished, were
    /// already aborted, or are unknown.
    pub fn abort(&self, handle: JobHandle) -> bool {
        let pool = self.shared.pool();
        match pool.get(handle.0) {
            Some(slot) => slot.flag.abort(),
            None => false,
        }
    }

    /// Current state of a job still holding a slot
    pub fn state(&self, handle: JobHandle) -> Option<JobState> {
        self.shared.pool().get(handle.0).map(|slot| slot.flag.state())
    }

    /// Receiver of finished (or failed) jobs
    pub fn completions(&self) -> &Receiver<DecodeCompletion<T>> {
        &self.completions
    }

    /// Number of occupied job slots
    pub fn in_flight(&self) -> usize {
        self.shared.pool().len()
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    fn shutdown(&mut self) {
        for (_, slot) in self.shared.pool().iter() {
            slot.flag.abort();
        }
        self.queue = None;
        self.parked = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl<T> Drop for DecodeWorker<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<T>(
    shared: Arc<Shared<T>>,
    queue: Receiver<JobHandle>,
    done: Sender<DecodeCompletion<T>>,
    config: DecodeConfig,
) {
    for handle in queue.iter() {
        let (path, flag) = match shared.pool().get(handle.0) {
            Some(slot) => (slot.path.clone(), Arc::clone(&slot.flag)),
            None => continue,
        };

        if !flag.begin() {
            trace!(path = %path.display(), "skipping aborted job");
            shared.pool().remove(handle.0);
            continue;
        }

        let result = decode_job(&path, &config, &flag);
        let completed = flag.finish();

        // The slot goes back to the pool before anyone hears about the job
        let slot = shared.pool().remove(handle.0);

        match (completed, slot) {
            (true, Some(slot)) => {
                if let Err(e) = &result {
                    debug!(path = %path.display(), error = %e, "thumbnail decode failed");
                }
                let completion = DecodeCompletion {
                    handle,
                    tag: slot.tag,
                    path,
                    result,
                };
                if done.send(completion).is_err() {
                    break;
                }
            }
            _ => {
                trace!(path = %path.display(), "discarding aborted decode");
            }
        }
    }

    trace!("decode worker exiting");
}

fn decode_job(
    path: &Path,
    config: &DecodeConfig,
    flag: &JobFlag,
) -> Result<DecodedImage, DecodeError> {
    if let Some(store) = &config.store
        && let Some(image) = store.load(path, config.format, config.max_dimension)
    {
        trace!(path = %path.display(), "thumbnail served from disk store");
        return Ok(image);
    }

    let image = decode_file(path, config.format, config.max_dimension, || {
        flag.is_aborted()
    })?;

    if let Some(store) = &config.store
        && let Err(e) = store.save(path, &image, config.max_dimension)
    {
        warn!(path = %path.display(), error = %e, "could not persist thumbnail");
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::jpeg::write_test_jpeg;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(10);
    const QUIET: Duration = Duration::from_millis(300);

    fn config(pool_size: usize) -> DecodeConfig {
        DecodeConfig {
            format: PixelFormat::Bgra8888,
            max_dimension: 32,
            pool_size,
            store: None,
        }
    }

    fn wait_until_idle<T: Send + 'static>(worker: &DecodeWorker<T>) {
        let deadline = Instant::now() + TIMEOUT;
        while worker.in_flight() > 0 {
            assert!(Instant::now() < deadline, "worker never drained");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_decode_completes_with_buffer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("default.tbn");
        write_test_jpeg(&path, 64, 64, [0, 200, 0]);

        let worker = DecodeWorker::init(config(4)).unwrap();
        let handle = worker.submit(&path, 7u32).unwrap();

        let completion = worker.completions().recv_timeout(TIMEOUT).unwrap();
        assert_eq!(completion.handle, handle);
        assert_eq!(completion.tag, 7);
        assert_eq!(completion.path, path);
        let image = completion.result.unwrap();
        assert_eq!((image.width, image.height), (32, 32));
    }

    #[test]
    fn test_missing_file_reports_failure_and_frees_slot() {
        let worker = DecodeWorker::init(config(2)).unwrap();

        // pool_size + 1 sequential jobs never exhaust the pool
        for i in 0..3u32 {
            worker.submit("/nonexistent/default.tbn", i).unwrap();
            let completion = worker.completions().recv_timeout(TIMEOUT).unwrap();
            assert_eq!(completion.tag, i);
            assert!(completion.result.is_err());
        }
        wait_until_idle(&worker);
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut worker: DecodeWorker<u32> = DecodeWorker::parked(config(2));
        worker.submit("/nonexistent/a.tbn", 1).unwrap();
        worker.submit("/nonexistent/b.tbn", 2).unwrap();
        assert_eq!(
            worker.submit("/nonexistent/c.tbn", 3),
            Err(SubmitError::PoolExhausted)
        );

        worker.start().unwrap();
        let mut tags = vec![
            worker.completions().recv_timeout(TIMEOUT).unwrap().tag,
            worker.completions().recv_timeout(TIMEOUT).unwrap().tag,
        ];
        tags.sort();
        assert_eq!(tags, vec![1, 2]);
        wait_until_idle(&worker);
        assert!(worker.submit("/nonexistent/c.tbn", 3).is_ok());
    }

    #[test]
    fn test_abort_before_dequeue_never_completes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("default.tbn");
        write_test_jpeg(&path, 16, 16, [9, 9, 9]);

        let mut worker: DecodeWorker<u32> = DecodeWorker::parked(config(4));
        let aborted = worker.submit(&path, 1).unwrap();
        let kept = worker.submit(&path, 2).unwrap();

        assert!(worker.abort(aborted));
        assert_eq!(worker.state(aborted), Some(JobState::Aborted));
        worker.start().unwrap();

        let completion = worker.completions().recv_timeout(TIMEOUT).unwrap();
        assert_eq!(completion.handle, kept);
        assert_eq!(completion.tag, 2);
        assert!(completion.result.is_ok());
        assert!(worker.completions().recv_timeout(QUIET).is_err());
        wait_until_idle(&worker);
    }

    #[test]
    fn test_abort_while_decoding_discards_result() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("default.tbn");
        write_test_jpeg(&path, 1024, 1024, [40, 80, 120]);

        let worker = DecodeWorker::init(config(4)).unwrap();
        let handle = worker.submit(&path, 1u32).unwrap();

        let deadline = Instant::now() + TIMEOUT;
        while worker.state(handle) != Some(JobState::Decoding) {
            assert!(Instant::now() < deadline, "job never started");
            std::hint::spin_loop();
        }
        assert!(worker.abort(handle));
        assert!(!worker.abort(handle));

        assert!(worker.completions().recv_timeout(QUIET).is_err());
        wait_until_idle(&worker);
        assert_eq!(worker.state(handle), None);
    }

    #[test]
    fn test_abort_twice_is_noop() {
        let worker: DecodeWorker<u32> = DecodeWorker::parked(config(4));
        let handle = worker.submit("/nonexistent/default.tbn", 1).unwrap();

        assert!(worker.abort(handle));
        assert!(!worker.abort(handle));
        assert_eq!(worker.in_flight(), 1);
    }

    #[test]
    fn test_abort_after_completion_is_noop() {
        let worker = DecodeWorker::init(config(4)).unwrap();
        let handle = worker.submit("/nonexistent/default.tbn", 1u32).unwrap();
        worker.completions().recv_timeout(TIMEOUT).unwrap();

        assert!(!worker.abort(handle));
        assert_eq!(worker.state(handle), None);
    }

    #[test]
    fn test_deinit_stops_worker() {
        let mut worker: DecodeWorker<u32> = DecodeWorker::init(config(4)).unwrap();
        worker.deinit();
        assert_eq!(
            worker.submit("/nonexistent/default.tbn", 1),
            Err(SubmitError::ShutDown)
        );
    }
}
