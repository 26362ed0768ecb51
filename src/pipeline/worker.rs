//! Worker thread logic
//!
//! Each worker loops pulling jobs from the shared queue and dispatches by
//! job kind to the matching fix strategy. Failures feed a single, kind-
//! agnostic retry policy: increment the job's failure count and push it
//! back for another (possibly different) worker, until five total attempts
//! have failed, at which point the job is abandoned with an error log.
//! Abandoned jobs never abort the run.

use crate::config::FixConfig;
use crate::error::{JobError, WorkerError};
use crate::fix;
use crate::job::{Job, JobKind};
use crate::pipeline::queue::{JobQueueReceiver, JobQueueSender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long an idle worker sleeps before polling the queue again
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Jobs that reached terminal success
    pub succeeded: AtomicU64,

    /// Plain copies completed
    pub copied: AtomicU64,

    /// XML fixes completed
    pub xml_fixed: AtomicU64,

    /// PDF fixes completed
    pub pdf_fixed: AtomicU64,

    /// Failed attempts that were re-enqueued
    pub retries: AtomicU64,

    /// Jobs abandoned after exhausting the retry ceiling
    pub abandoned: AtomicU64,

    /// Bytes written by plain copies
    pub bytes_copied: AtomicU64,
}

/// Aggregated totals across all workers
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerTotals {
    pub succeeded: u64,
    pub copied: u64,
    pub xml_fixed: u64,
    pub pdf_fixed: u64,
    pub retries: u64,
    pub abandoned: u64,
    pub bytes_copied: u64,
}

impl WorkerTotals {
    /// Fold one worker's counters into the totals
    pub fn accumulate(&mut self, stats: &WorkerStats) {
        self.succeeded += stats.succeeded.load(Ordering::Relaxed);
        self.copied += stats.copied.load(Ordering::Relaxed);
        self.xml_fixed += stats.xml_fixed.load(Ordering::Relaxed);
        self.pdf_fixed += stats.pdf_fixed.load(Ordering::Relaxed);
        self.retries += stats.retries.load(Ordering::Relaxed);
        self.abandoned += stats.abandoned.load(Ordering::Relaxed);
        self.bytes_copied += stats.bytes_copied.load(Ordering::Relaxed);
    }
}

/// A worker thread that processes jobs
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        config: Arc<FixConfig>,
        queue_rx: JobQueueReceiver,
        queue_tx: JobQueueSender,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("fixer-{}", id))
            .spawn(move || {
                worker_loop(id, config, queue_rx, queue_tx, shutdown, stats_clone);
            })
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Get a shared handle to this worker's statistics
    ///
    /// Lets the coordinator read final counters after the worker has been
    /// consumed by `join`.
    pub fn stats_handle(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            })?;
        }
        Ok(())
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    config: Arc<FixConfig>,
    queue_rx: JobQueueReceiver,
    queue_tx: JobQueueSender,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) {
    info!(worker = id, "Worker starting");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!(worker = id, "Shutdown signal received");
            break;
        }

        match queue_rx.recv_guarded() {
            Some((job, _guard)) => {
                // The guard arrived with the job and covers the attempt
                // *and* any re-enqueue, so the completion check can't
                // observe a false empty queue
                process(id, job, &config, &queue_tx, &stats);
            }
            None => {
                // Idle; exit once the walker is done, the queue is empty,
                // and no other worker might still requeue a retry
                if queue_rx.is_drained() {
                    break;
                }
                thread::sleep(IDLE_POLL);
            }
        }
    }

    info!(
        worker = id,
        succeeded = stats.succeeded.load(Ordering::Relaxed),
        abandoned = stats.abandoned.load(Ordering::Relaxed),
        "Worker exiting"
    );
}

/// Execute one attempt of a job
fn process(
    id: usize,
    job: Job,
    config: &FixConfig,
    queue_tx: &JobQueueSender,
    stats: &WorkerStats,
) {
    if job.failures > 0 {
        debug!(
            worker = id,
            kind = %job.kind,
            dest = %job.dest.display(),
            retry = job.failures,
            "Processing job (retry)"
        );
    } else {
        debug!(
            worker = id,
            kind = %job.kind,
            dest = %job.dest.display(),
            "Processing job"
        );
    }

    let bad = config.bad_lccn.as_bytes();
    let good = config.good_lccn.as_bytes();

    let outcome = match job.kind {
        JobKind::Copy => fix::copy_file(&job.source, &job.dest).map(|bytes| {
            stats.copied.fetch_add(1, Ordering::Relaxed);
            stats.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
        }),
        JobKind::TextSubstitute => fix::fix_xml(&job.source, &job.dest, bad, good)
            .map(|()| {
                stats.xml_fixed.fetch_add(1, Ordering::Relaxed);
            }),
        JobKind::MetadataSubstitute => {
            fix::fix_pdf(&config.exiftool, &job.source, &job.dest, bad, good).map(|()| {
                stats.pdf_fixed.fetch_add(1, Ordering::Relaxed);
            })
        }
    };

    match outcome {
        Ok(()) => {
            stats.succeeded.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => retry(id, job, e, queue_tx, stats),
    }
}

/// Put a failed job back on the queue, or abandon it past the ceiling
fn retry(id: usize, mut job: Job, err: JobError, queue_tx: &JobQueueSender, stats: &WorkerStats) {
    if !job.record_failure() {
        stats.abandoned.fetch_add(1, Ordering::Relaxed);
        error!(
            worker = id,
            dest = %job.dest.display(),
            error = %err,
            attempts = job.failures,
            "Giving up on job"
        );
        return;
    }

    warn!(
        worker = id,
        dest = %job.dest.display(),
        error = %err,
        retry = job.failures,
        "Job failed; trying again"
    );
    stats.retries.fetch_add(1, Ordering::Relaxed);

    if queue_tx.requeue(job).is_err() {
        // Queue torn down mid-retry; nothing left to do but count it
        stats.abandoned.fetch_add(1, Ordering::Relaxed);
        error!(worker = id, "Queue closed; dropping retried job");
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> WorkerTotals {
    let mut totals = WorkerTotals::default();
    for worker in workers {
        totals.accumulate(&worker.stats);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RETRY_CEILING;
    use crate::pipeline::queue::JobQueue;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn test_config(source: PathBuf, dest: PathBuf) -> Arc<FixConfig> {
        Arc::new(FixConfig {
            source_dir: source,
            dest_dir: dest,
            bad_lccn: "1234".into(),
            good_lccn: "5678".into(),
            worker_count: 1,
            force: false,
            show_progress: false,
            verbose: false,
            exiftool: "exiftool".into(),
        })
    }

    #[test]
    fn test_worker_copies_a_job() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("page.tif");
        let dest = dir.path().join("out.tif");
        std::fs::write(&src, b"image bytes").unwrap();

        let queue = JobQueue::new();
        queue
            .sender()
            .push(Job::new(src, dest.clone(), JobKind::Copy))
            .unwrap();
        queue.seal();

        let worker = Worker::spawn(
            0,
            test_config(dir.path().to_path_buf(), dir.path().join("d")),
            queue.receiver(),
            queue.sender(),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        assert_eq!(worker.id(), 0);
        let stats = Arc::clone(&worker.stats);
        worker.join().unwrap();

        assert_eq!(stats.succeeded.load(Ordering::Relaxed), 1);
        assert_eq!(stats.copied.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_copied.load(Ordering::Relaxed), 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"image bytes");
    }

    #[test]
    fn test_final_attempt_success_is_not_abandoned() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("page.tif");
        let dest = dir.path().join("out.tif");
        std::fs::write(&src, b"image bytes").unwrap();

        // Four attempts already failed; the fifth succeeds
        let mut job = Job::new(src, dest.clone(), JobKind::Copy);
        job.failures = RETRY_CEILING - 1;

        let queue = JobQueue::new();
        let stats = WorkerStats::default();
        let config = test_config(dir.path().to_path_buf(), dir.path().join("d"));
        process(0, job, &config, &queue.sender(), &stats);

        assert_eq!(stats.succeeded.load(Ordering::Relaxed), 1);
        assert_eq!(stats.abandoned.load(Ordering::Relaxed), 0);
        assert_eq!(stats.retries.load(Ordering::Relaxed), 0);
        assert!(queue.is_empty());
        assert_eq!(std::fs::read(&dest).unwrap(), b"image bytes");
    }

    #[test]
    fn test_missing_source_is_retried_then_abandoned() {
        let dir = tempdir().unwrap();

        let queue = JobQueue::new();
        queue
            .sender()
            .push(Job::new(
                dir.path().join("missing.tif"),
                dir.path().join("out.tif"),
                JobKind::Copy,
            ))
            .unwrap();
        queue.seal();

        let worker = Worker::spawn(
            0,
            test_config(dir.path().to_path_buf(), dir.path().join("d")),
            queue.receiver(),
            queue.sender(),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        let stats = Arc::clone(&worker.stats);
        worker.join().unwrap();

        // Five total attempts: four re-enqueues, then abandonment
        assert_eq!(stats.retries.load(Ordering::Relaxed), u64::from(RETRY_CEILING) - 1);
        assert_eq!(stats.abandoned.load(Ordering::Relaxed), 1);
        assert_eq!(stats.succeeded.load(Ordering::Relaxed), 0);
        assert_eq!(
            queue.stats().requeued.load(Ordering::Relaxed),
            u64::from(RETRY_CEILING) - 1
        );
    }

    #[test]
    fn test_aggregate_stats_sums_workers() {
        let dir = tempdir().unwrap();
        let queue = JobQueue::new();

        for i in 0..3 {
            let src = dir.path().join(format!("f{i}.bin"));
            std::fs::write(&src, b"x").unwrap();
            queue
                .sender()
                .push(Job::new(
                    src,
                    dir.path().join(format!("o{i}.bin")),
                    JobKind::Copy,
                ))
                .unwrap();
        }
        queue.seal();

        let workers: Vec<Worker> = (0..2)
            .map(|id| {
                Worker::spawn(
                    id,
                    test_config(dir.path().to_path_buf(), dir.path().join("d")),
                    queue.receiver(),
                    queue.sender(),
                    Arc::new(AtomicBool::new(false)),
                )
                .unwrap()
            })
            .collect();

        // Wait for the pool to drain before reading stats
        while !queue.is_complete() {
            thread::sleep(Duration::from_millis(10));
        }
        let totals = aggregate_stats(&workers);
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(totals.succeeded, 3);
        assert_eq!(totals.copied, 3);
        assert_eq!(totals.bytes_copied, 3);
        assert_eq!(totals.abandoned, 0);
    }
}
