//! Shared job queue
//!
//! A concurrency-safe MPMC buffer of pending jobs. The channel is unbounded
//! so neither the walker nor a retrying worker ever blocks on a push; the
//! real concurrency budget is the worker count, not the queue depth.
//!
//! Completion is a three-part condition, re-evaluated rather than sampled
//! once: the queue has been sealed ("no more jobs will be produced"), no
//! worker holds a job in flight (an in-flight job may still be re-enqueued
//! by the retry logic), and the channel is empty. Taking a job raises the
//! in-flight count *before* the channel is polled, and workers push a
//! retried job back *before* releasing their guard, so at no instant does
//! a live job exist outside both the channel and the in-flight count.

use crate::job::Job;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Statistics for the job queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total jobs enqueued by the walker
    pub enqueued: AtomicU64,

    /// Total jobs handed to workers (includes retried attempts)
    pub dequeued: AtomicU64,

    /// Jobs pushed back for another attempt
    pub requeued: AtomicU64,
}

/// The shared job queue
pub struct JobQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,

    /// Set once the walker has finished producing
    sealed: Arc<AtomicBool>,

    /// Number of workers currently executing a job
    in_flight: Arc<AtomicUsize>,

    stats: Arc<QueueStats>,
}

impl JobQueue {
    /// Create an empty, unsealed queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            sender,
            receiver,
            sealed: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a producer handle (for the walker and for worker retries)
    pub fn sender(&self) -> JobQueueSender {
        JobQueueSender {
            sender: self.sender.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a consumer handle (clone one per worker)
    pub fn receiver(&self) -> JobQueueReceiver {
        JobQueueReceiver {
            receiver: self.receiver.clone(),
            sealed: Arc::clone(&self.sealed),
            in_flight: Arc::clone(&self.in_flight),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Mark that no new jobs will be produced
    ///
    /// Retried jobs may still re-enter the queue after sealing; only the
    /// walker's production stops.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    /// Check whether all work is finished
    ///
    /// The in-flight count is read before the emptiness check: a worker
    /// re-enqueues before dropping its guard, so in-flight == 0 implies any
    /// retry has already landed in the channel.
    pub fn is_complete(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
            && self.in_flight.load(Ordering::SeqCst) == 0
            && self.receiver.is_empty()
    }

    /// Current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Number of workers currently executing a job
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for pushing jobs onto the queue
#[derive(Clone)]
pub struct JobQueueSender {
    sender: Sender<Job>,
    stats: Arc<QueueStats>,
}

impl JobQueueSender {
    /// Enqueue a fresh job from the walker
    pub fn push(&self, job: Job) -> Result<(), ()> {
        self.sender.send(job).map_err(|_| ())?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Push a failed job back for another attempt
    pub fn requeue(&self, job: Job) -> Result<(), ()> {
        self.sender.send(job).map_err(|_| ())?;
        self.stats.requeued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Handle for pulling jobs off the queue
#[derive(Clone)]
pub struct JobQueueReceiver {
    receiver: Receiver<Job>,
    sealed: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    stats: Arc<QueueStats>,
}

impl JobQueueReceiver {
    /// Take a job, already marked in flight
    ///
    /// The in-flight count is raised before the channel is polled; on a
    /// miss the guard drops and the count falls back. A returned job is
    /// therefore guarded from the moment it leaves the channel, and
    /// `is_complete()` can never slip between the dequeue and the guard.
    pub fn recv_guarded(&self) -> Option<(Job, WorkGuard<'_>)> {
        let guard = WorkGuard::new(self);
        match self.receiver.try_recv() {
            Ok(job) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some((job, guard))
            }
            Err(_) => None,
        }
    }

    /// Check whether this worker should exit: producers are done, nothing
    /// is queued, and no other worker might requeue a retry
    pub fn is_drained(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
            && self.in_flight.load(Ordering::SeqCst) == 0
            && self.receiver.is_empty()
    }

    fn begin_work(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn end_work(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard marking a job as in flight
///
/// Issued only by `recv_guarded`, together with the job it covers. Held
/// for the full duration of an attempt, including the re-enqueue of a
/// failed job, so the completion check never misses a pending retry.
pub struct WorkGuard<'a> {
    receiver: &'a JobQueueReceiver,
}

impl<'a> WorkGuard<'a> {
    fn new(receiver: &'a JobQueueReceiver) -> Self {
        receiver.begin_work();
        Self { receiver }
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        self.receiver.end_work();
    }
}
