//! The concurrent remediation pipeline
//!
//! One producer (the walker) feeds a shared job queue drained by a fixed
//! pool of worker threads; the coordinator wires the pieces together and
//! owns the shutdown handshake.

pub mod coordinator;
pub mod queue;
pub mod walker;
pub mod worker;

pub use coordinator::{FixCoordinator, FixResult};
pub use queue::{JobQueue, JobQueueReceiver, JobQueueSender, WorkGuard};
pub use walker::{translate_dest_path, Walker};
pub use worker::{Worker, WorkerTotals};
