//! Durable file copy
//!
//! The copy primitive used for plain-copy jobs and as the first step of the
//! PDF metadata fix. Success means the destination's bytes have been synced
//! to stable storage; a failure at any stage (open, create, stream, sync)
//! is reported with the path so the retry log is actionable.

use crate::error::{JobError, JobResult};
use std::fs::File;
use std::io;
use std::path::Path;

/// Copy `src` to `dest`, creating or truncating the destination, and sync
/// the result to disk before declaring success
///
/// Returns the number of bytes copied.
pub fn copy_file(src: &Path, dest: &Path) -> JobResult<u64> {
    let mut reader = File::open(src).map_err(|e| JobError::ReadFailed {
        path: src.to_path_buf(),
        source: e,
    })?;

    let mut writer = File::create(dest).map_err(|e| JobError::CreateFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let bytes = io::copy(&mut reader, &mut writer).map_err(|e| JobError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    // A write that never reaches the platter is not a copy. sync_all also
    // surfaces deferred write errors the way a close check would.
    writer.sync_all().map_err(|e| JobError::SyncFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(bytes)
}
