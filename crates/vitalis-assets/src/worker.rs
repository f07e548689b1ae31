//! Background fetch and decode of model assets.
//!
//! Workers read from an [`AssetSource`] in fixed-size chunks, decode on their own
//! thread, and report back through a channel. They never touch the cache; the loader
//! applies every result on the render thread.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::decoder::ModelDecoder;
use crate::error::AssetLoadError;
use crate::model::ModelData;
use crate::quality::AssetKey;
use crate::source::AssetSource;

/// Bytes read between cancellation checks.
pub const READ_CHUNK_BYTES: usize = 64 * 1024;

/// One asset to fetch.
#[derive(Clone, Debug)]
pub struct FetchJob {
    pub key: AssetKey,
    pub url: String,
    pub cancelled: Arc<AtomicBool>,
}

/// What a worker reports back.
#[derive(Debug)]
pub enum WorkerMessage {
    Progress { key: AssetKey, percent: u8 },
    Ready {
        key: AssetKey,
        url: String,
        model: ModelData,
    },
    Failed { key: AssetKey, error: AssetLoadError },
    Cancelled { key: AssetKey },
}

/// Fixed pool of named fetch threads.
pub struct FetchWorkerPool {
    job_sender: Option<Sender<FetchJob>>,
    message_receiver: Receiver<WorkerMessage>,
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
}

impl FetchWorkerPool {
    /// Spawn `thread_count` workers with room for `queue_capacity` queued jobs.
    pub fn new(
        thread_count: usize,
        queue_capacity: usize,
        source: Arc<dyn AssetSource>,
        decoder: Arc<dyn ModelDecoder>,
    ) -> Self {
        let (job_sender, job_receiver) = crossbeam_channel::bounded::<FetchJob>(queue_capacity.max(1));
        let (message_sender, message_receiver) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(thread_count);
        for _ in 0..thread_count.max(1) {
            let jobs = job_receiver.clone();
            let messages = message_sender.clone();
            let source = Arc::clone(&source);
            let decoder = Arc::clone(&decoder);
            let shutdown = Arc::clone(&shutdown);
            let in_flight = Arc::clone(&in_flight);

            let handle = std::thread::Builder::new()
                .name("asset-fetch-worker".into())
                .spawn(move || {
                    while let Ok(job) = jobs.recv() {
                        let message = run_job(&job, &*source, &*decoder, &shutdown, &messages);
                        let _ = messages.send(message);
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .expect("Failed to spawn asset fetch worker thread");
            handles.push(handle);
        }

        Self {
            job_sender: Some(job_sender),
            message_receiver,
            handles,
            shutdown,
            in_flight,
        }
    }

    /// Queue a job. Returns `Err(job)` if the queue is full or the pool is shut down.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, job: FetchJob) -> Result<(), FetchJob> {
        let Some(sender) = &self.job_sender else {
            return Err(job);
        };
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        sender.try_send(job).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            e.into_inner()
        })
    }

    /// Collect every message posted since the last call. Render thread only.
    pub fn drain(&self) -> Vec<WorkerMessage> {
        self.message_receiver.try_iter().collect()
    }

    /// Jobs queued or running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Stop accepting jobs, abandon running reads, and join every worker.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.job_sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for FetchWorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_job(
    job: &FetchJob,
    source: &dyn AssetSource,
    decoder: &dyn ModelDecoder,
    shutdown: &AtomicBool,
    messages: &Sender<WorkerMessage>,
) -> WorkerMessage {
    let key = job.key;
    let stopped = || job.cancelled.load(Ordering::Relaxed) || shutdown.load(Ordering::Relaxed);

    if stopped() {
        return WorkerMessage::Cancelled { key };
    }

    let mut stream = match source.open(&job.url) {
        Ok(stream) => stream,
        Err(error) => return WorkerMessage::Failed { key, error },
    };

    let mut bytes = Vec::with_capacity(stream.len.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut last_percent = 0u8;
    loop {
        if stopped() {
            return WorkerMessage::Cancelled { key };
        }
        let n = match stream.reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return WorkerMessage::Failed {
                    key,
                    error: AssetLoadError::Io {
                        url: job.url.clone(),
                        source,
                    },
                };
            }
        };
        bytes.extend_from_slice(&chunk[..n]);

        if let Some(total) = stream.len.filter(|&t| t > 0) {
            let percent = ((bytes.len() as u64 * 100) / total).min(100) as u8;
            if percent > last_percent {
                last_percent = percent;
                let _ = messages.send(WorkerMessage::Progress { key, percent });
            }
        }
    }

    let model = match decoder.decode(&job.url, &bytes) {
        Ok(model) => model,
        Err(error) => return WorkerMessage::Failed { key, error },
    };
    if stopped() {
        return WorkerMessage::Cancelled { key };
    }
    WorkerMessage::Ready {
        key,
        url: job.url.clone(),
        model,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use vitalis_geometry::BodyRegion;

    use super::*;
    use crate::decoder::GltfDecoder;
    use crate::decoder::tests::triangle_glb;
    use crate::quality::ModelQuality;
    use crate::source::MemorySource;

    fn key() -> AssetKey {
        AssetKey::new(BodyRegion::Head, ModelQuality::Standard)
    }

    fn job(url: &str) -> FetchJob {
        FetchJob {
            key: key(),
            url: url.into(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn wait_for_terminal(pool: &FetchWorkerPool) -> Vec<WorkerMessage> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut messages = Vec::new();
        while Instant::now() < deadline {
            messages.extend(pool.drain());
            if messages
                .iter()
                .any(|m| !matches!(m, WorkerMessage::Progress { .. }))
            {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        messages
    }

    /// A worker fetches and decodes a GLB and reports it ready.
    #[test]
    fn test_worker_decodes_asset() {
        let mut source = MemorySource::new();
        source.insert("head.glb", triangle_glb());
        let pool = FetchWorkerPool::new(1, 4, Arc::new(source), Arc::new(GltfDecoder));
        pool.submit(job("head.glb")).unwrap();

        let messages = wait_for_terminal(&pool);
        let ready = messages.iter().find_map(|m| match m {
            WorkerMessage::Ready { model, .. } => Some(model),
            _ => None,
        });
        assert_eq!(ready.unwrap().triangle_count(), 1);
        assert!(
            messages
                .iter()
                .any(|m| matches!(m, WorkerMessage::Progress { percent: 100, .. }))
        );
    }

    #[test]
    fn test_missing_asset_reports_failure() {
        let pool = FetchWorkerPool::new(
            1,
            4,
            Arc::new(MemorySource::new()),
            Arc::new(GltfDecoder),
        );
        pool.submit(job("missing.glb")).unwrap();
        let messages = wait_for_terminal(&pool);
        assert!(messages.iter().any(|m| matches!(
            m,
            WorkerMessage::Failed {
                error: AssetLoadError::NotFound(_),
                ..
            }
        )));
    }

    /// A job cancelled before it starts never touches the source.
    #[test]
    fn test_cancelled_before_start() {
        let mut source = MemorySource::new();
        source.insert("head.glb", triangle_glb());
        let pool = FetchWorkerPool::new(1, 4, Arc::new(source), Arc::new(GltfDecoder));
        let job = job("head.glb");
        job.cancelled.store(true, Ordering::Relaxed);
        pool.submit(job).unwrap();
        let messages = wait_for_terminal(&pool);
        assert!(matches!(messages.last(), Some(WorkerMessage::Cancelled { .. })));
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let mut pool = FetchWorkerPool::new(
            1,
            4,
            Arc::new(MemorySource::new()),
            Arc::new(GltfDecoder),
        );
        pool.shutdown();
        assert!(pool.submit(job("head.glb")).is_err());
        assert_eq!(pool.in_flight_count(), 0);
    }
}
