//! Fix coordinator - orchestrates the parallel batch fix
//!
//! The coordinator is responsible for:
//! - Setting up the job queue and workers
//! - Running the walker, then sealing the queue once it finishes
//! - Waiting for the pool to drain (tolerating mid-retry re-enqueues)
//! - Signal handling hooks (graceful shutdown)
//! - Final statistics
//!
//! Sequencing is the shutdown contract: workers start first, the walker
//! runs to completion on the coordinator's thread, and only then is the
//! queue sealed. Workers can never observe "sealed and empty" before the
//! walker has produced everything, so no startup grace period is needed.

use crate::config::FixConfig;
use crate::error::Result;
use crate::pipeline::queue::JobQueue;
use crate::pipeline::walker::Walker;
use crate::pipeline::worker::{aggregate_stats, Worker, WorkerTotals};
use crate::progress::ProgressReporter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of a completed fix run
#[derive(Debug)]
pub struct FixResult {
    /// Files the walker enqueued
    pub files_enqueued: u64,

    /// Jobs that reached terminal success
    pub succeeded: u64,

    /// Plain copies completed
    pub copied: u64,

    /// XML fixes completed
    pub xml_fixed: u64,

    /// PDF fixes completed
    pub pdf_fixed: u64,

    /// Failed attempts that were re-enqueued
    pub retries: u64,

    /// Jobs abandoned after the retry ceiling
    pub abandoned: u64,

    /// Non-regular files skipped by the walker
    pub skipped: u64,

    /// Files dropped because their destination directory couldn't be made
    pub dir_create_failures: u64,

    /// Bytes written by plain copies
    pub bytes_copied: u64,

    /// Wall-clock time for the run
    pub duration: Duration,

    /// Whether the walk ran to completion (vs was interrupted)
    pub completed: bool,
}

impl FixResult {
    /// True when every discovered file reached terminal success
    pub fn is_clean(&self) -> bool {
        self.completed && self.abandoned == 0 && self.dir_create_failures == 0
    }
}

/// Coordinates the parallel batch fix
pub struct FixCoordinator {
    /// Configuration
    config: Arc<FixConfig>,

    /// Shared job queue
    queue: JobQueue,

    /// Worker threads
    workers: Vec<Worker>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,

    /// Optional progress display
    progress: Option<ProgressReporter>,
}

impl FixCoordinator {
    /// Create a new coordinator
    pub fn new(config: FixConfig) -> Self {
        // A missing exiftool only matters for PDF jobs; those will fail,
        // retry, and be abandoned with their own error logs
        if which::which(&config.exiftool).is_err() {
            warn!(
                program = %config.exiftool,
                "exiftool not found on PATH; PDF metadata fixes will fail"
            );
        }

        Self {
            config: Arc::new(config),
            queue: JobQueue::new(),
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Attach a progress reporter, updated while the pool drains
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the fix: walk, drain, join, aggregate
    pub fn run(mut self) -> Result<FixResult> {
        let start_time = Instant::now();

        info!(
            source = %self.config.source_dir.display(),
            dest = %self.config.dest_dir.display(),
            bad = %self.config.bad_lccn,
            good = %self.config.good_lccn,
            workers = self.config.worker_count,
            "Starting batch fix"
        );

        self.spawn_workers()?;

        if let Some(ref progress) = self.progress {
            progress.set_status("Walking source tree...");
        }

        // The walker runs on this thread, concurrently with the workers
        let walker = Walker::new(
            Arc::clone(&self.config),
            self.queue.sender(),
            Arc::clone(&self.shutdown),
        );
        let walk_completed = match walker.walk() {
            Ok(completed) => completed,
            Err(e) => {
                // Don't leave detached workers polling a queue nobody owns
                self.shutdown.store(true, Ordering::SeqCst);
                self.join_workers();
                return Err(e);
            }
        };
        let walker_stats = walker.stats();

        // Production is done (or interrupted); tell the pool so it can
        // exit once the queue empties and retries settle
        self.queue.seal();
        info!(
            files = walker_stats.files_enqueued.load(Ordering::Relaxed),
            "Walk finished; waiting for workers to drain the queue"
        );

        let drained = self.wait_for_completion();

        // Wake any worker still parked on the idle poll
        self.shutdown.store(true, Ordering::SeqCst);
        let totals = self.join_workers();

        let duration = start_time.elapsed();
        let completed = walk_completed && drained;

        if let Some(ref progress) = self.progress {
            if completed {
                progress.finish("Fix completed");
            } else {
                progress.finish("Fix interrupted");
            }
        }

        info!(
            succeeded = totals.succeeded,
            abandoned = totals.abandoned,
            retries = totals.retries,
            duration_secs = duration.as_secs(),
            "Batch fix finished"
        );

        Ok(FixResult {
            files_enqueued: walker_stats.files_enqueued.load(Ordering::Relaxed),
            succeeded: totals.succeeded,
            copied: totals.copied,
            xml_fixed: totals.xml_fixed,
            pdf_fixed: totals.pdf_fixed,
            retries: totals.retries,
            abandoned: totals.abandoned,
            skipped: walker_stats.skipped_special.load(Ordering::Relaxed),
            dir_create_failures: walker_stats.dir_create_failures.load(Ordering::Relaxed),
            bytes_copied: totals.bytes_copied,
            duration,
            completed,
        })
    }

    /// Spawn worker threads
    fn spawn_workers(&mut self) -> Result<()> {
        for id in 0..self.config.worker_count {
            let worker = Worker::spawn(
                id,
                Arc::clone(&self.config),
                self.queue.receiver(),
                self.queue.sender(),
                Arc::clone(&self.shutdown),
            )?;

            self.workers.push(worker);
        }

        info!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    /// Wait until the sealed queue is fully drained or shutdown is signalled
    ///
    /// The completion condition is re-evaluated on every pass: a retried job
    /// re-enters the queue while its worker is still counted in flight, so a
    /// single sample could never race past a pending retry. The consecutive
    /// stable checks mirror the workers' own exit condition.
    fn wait_for_completion(&self) -> bool {
        let check_interval = Duration::from_millis(50);
        let stable_checks_required = 3;
        let mut stable_count = 0;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown signal received while draining");
                return false;
            }

            if self.queue.is_complete() {
                stable_count += 1;
                if stable_count >= stable_checks_required {
                    return true;
                }
            } else {
                stable_count = 0;
            }

            if let Some(ref progress) = self.progress {
                progress.update(
                    aggregate_stats(&self.workers),
                    self.queue.len(),
                    self.queue.in_flight(),
                    self.workers.len(),
                );
            }

            thread::sleep(check_interval);
        }
    }

    /// Join all worker threads and collect final stats
    ///
    /// Counters are read only after every thread has joined, so a job that
    /// was mid-process when draining finished is still counted.
    fn join_workers(&mut self) -> WorkerTotals {
        let workers = std::mem::take(&mut self.workers);
        let stats: Vec<_> = workers.iter().map(Worker::stats_handle).collect();

        for worker in workers {
            if let Err(e) = worker.join() {
                warn!(error = %e, "Worker failed to join cleanly");
            }
        }

        let mut totals = WorkerTotals::default();
        for worker_stats in &stats {
            totals.accumulate(worker_stats);
        }
        totals
    }
}
