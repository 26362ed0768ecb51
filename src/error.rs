//! Error types for lccn-fixer
//!
//! This module defines the error hierarchy covering:
//! - Configuration and CLI validation errors
//! - Per-job failures (file I/O, exiftool invocations)
//! - Worker thread errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Job failures carry the path and stage so retry/abandon logs are useful
//! - Every job failure is retryable; only destination-directory creation
//!   and startup validation are terminal

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the lccn-fixer application
#[derive(Error, Debug)]
pub enum FixerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel closed unexpectedly
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Source directory missing or unreadable
    #[error("Source '{path}' is invalid: {reason}")]
    InvalidSource { path: PathBuf, reason: String },

    /// Source exists but is not a directory
    #[error("Source '{path}' is invalid: not a directory")]
    SourceNotDirectory { path: PathBuf },

    /// Destination already exists and --force was not given
    #[error("Destination '{path}' already exists (use --force to reuse it)")]
    DestinationExists { path: PathBuf },

    /// --force was given but the destination is missing or not a directory
    #[error("Destination '{path}' is invalid for --force: {reason}")]
    InvalidForcedDestination { path: PathBuf, reason: String },

    /// Source and destination resolve to the same path
    #[error("Source and destination are the same path: '{path}'")]
    SamePath { path: PathBuf },

    /// An LCCN argument was empty
    #[error("The {which} LCCN must not be empty")]
    EmptyLccn { which: &'static str },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },
}

/// A failure while executing a single job
///
/// All of these feed the retry loop; none abort the run.
#[derive(Error, Debug)]
pub enum JobError {
    /// Failed to open the source file for reading
    #[error("unable to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create the destination file
    #[error("unable to create '{path}': {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed while streaming bytes to the destination
    #[error("unable to write to '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to flush the destination to stable storage
    #[error("unable to sync '{path}': {source}")]
    SyncFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// exiftool export (read metadata) failed
    #[error("unable to get EXIF data for '{path}': {reason}")]
    MetadataExportFailed { path: PathBuf, reason: String },

    /// exiftool import (write metadata) failed
    #[error("unable to write EXIF data for '{path}': {reason}")]
    MetadataImportFailed { path: PathBuf, reason: String },

    /// Could not create or write the temp file holding the EXIF JSON
    #[error("unable to store EXIF JSON for '{path}': {reason}")]
    TempFileFailed { path: PathBuf, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker initialization failed
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },
}

/// Result type alias for FixerError
pub type Result<T> = std::result::Result<T, FixerError>;

/// Result type alias for JobError
pub type JobResult<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let cfg_err = ConfigError::EmptyLccn { which: "bad" };
        let top: FixerError = cfg_err.into();
        assert!(matches!(top, FixerError::Config(_)));
    }

    #[test]
    fn test_job_error_display_includes_path() {
        let err = JobError::ReadFailed {
            path: PathBuf::from("/batch/issue.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/batch/issue.xml"));
        assert!(msg.contains("unable to read"));
    }
}
