//! lccn-fixer - Batch LCCN Remediation
//!
//! Copies an archival batch (XML metadata, PDFs, page images) to a new
//! directory tree while swapping a bad LCCN for the good one everywhere it
//! matters: in directory names, in XML file contents, and in PDF embedded
//! metadata (via exiftool).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Source Tree                          │
//! └───────────────────────────┬─────────────────────────────┘
//!                             │ walkdir
//!                             ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │  Walker                                                  │
//! │  - translates paths (bad LCCN segment → good)            │
//! │  - creates destination directories eagerly               │
//! │  - classifies: copy / XML fix / PDF fix                  │
//! └───────────────────────────┬─────────────────────────────┘
//!                             │ one job per file
//!                             ▼
//!              ┌──────────────────────────┐
//!              │      Job Queue           │
//!              │  (crossbeam unbounded)   │
//!              │  - sealed after walk     │
//!              │  - retries re-enter here │
//!              └────────────┬─────────────┘
//!                           │
//!        ┌─────────┬────────┴─┬─────────┐
//!        ▼         ▼          ▼         ▼
//!   ┌─────────┐┌─────────┐┌─────────┐┌─────────┐
//!   │Worker 1 ││Worker 2 ││Worker 3 ││Worker N │   N = 2× CPUs
//!   └────┬────┘└────┬────┘└────┬────┘└────┬────┘
//!        └──────────┴─────┬────┴──────────┘
//!                         ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Destination Tree                        │
//! │  copy: durable byte copy (sync before success)           │
//! │  XML:  literal bad→good substitution in content          │
//! │  PDF:  copy + exiftool export/patch/import round trip    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failed attempt goes back on the queue for up to five total attempts;
//! a job that exhausts its attempts is logged and abandoned without
//! aborting the run.
//!
//! # Example
//!
//! ```bash
//! lccn-fixer /archive/batch_oru_123 /ready/batch_oru_123 sn99063854 sn96088356
//! ```

pub mod config;
pub mod error;
pub mod fix;
pub mod job;
pub mod pipeline;
pub mod progress;

pub use config::{CliArgs, FixConfig};
pub use error::{FixerError, Result};
pub use job::{classify, Job, JobKind};
pub use pipeline::{FixCoordinator, FixResult};
