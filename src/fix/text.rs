//! XML content substitution
//!
//! Batch metadata XML embeds the LCCN in issue and reel records, so the
//! whole file is read into memory, every literal occurrence of the bad
//! LCCN is replaced, and the result is written to the destination. These
//! files are small (tens of KB), so whole-file buffering is fine.

use crate::error::{JobError, JobResult};
use crate::fix::replace_all;
use std::fs;
use std::path::Path;

/// Copy `src` to `dest` with every occurrence of `bad` replaced by `good`
pub fn fix_xml(src: &Path, dest: &Path, bad: &[u8], good: &[u8]) -> JobResult<()> {
    let content = fs::read(src).map_err(|e| JobError::ReadFailed {
        path: src.to_path_buf(),
        source: e,
    })?;

    let fixed = replace_all(&content, bad, good);

    fs::write(dest, fixed).map_err(|e| JobError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })
}
