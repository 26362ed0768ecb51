//! Job model and classification
//!
//! A job is one file's pending transformation: where it comes from, where
//! the fixed copy goes, and which strategy the workers should apply.
//! Classification is keyed on the file's base name and is deliberately
//! simple: long XML files are batch metadata and get content substitution,
//! PDFs get their embedded metadata rewritten via exiftool, and everything
//! else is a straight copy.

use std::fmt;
use std::path::PathBuf;

/// Maximum total attempts (including the first) before a job is abandoned
pub const RETRY_CEILING: u32 = 5;

/// Base names at or below this length are treated as short auxiliary XML
/// (checksum manifests and the like) and copied verbatim rather than fixed.
/// This threshold is a historical quirk of the batch layout; keep it.
const XML_NAME_THRESHOLD: usize = 10;

/// The kind of processing a file needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Byte-for-byte durable copy
    Copy,

    /// Copy with every occurrence of the bad LCCN replaced in the content
    TextSubstitute,

    /// Copy, then rewrite the bad LCCN inside the PDF's embedded metadata
    MetadataSubstitute,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobKind::Copy => "file copy",
            JobKind::TextSubstitute => "XML fix",
            JobKind::MetadataSubstitute => "PDF fix",
        };
        f.write_str(label)
    }
}

/// One file's pending transformation
#[derive(Debug, Clone)]
pub struct Job {
    /// Absolute path of the file in the source tree
    pub source: PathBuf,

    /// Absolute, already LCCN-corrected path in the destination tree
    pub dest: PathBuf,

    /// Which strategy to apply
    pub kind: JobKind,

    /// How many attempts have failed so far
    pub failures: u32,
}

impl Job {
    /// Create a fresh job with no recorded failures
    pub fn new(source: PathBuf, dest: PathBuf, kind: JobKind) -> Self {
        Self {
            source,
            dest,
            kind,
            failures: 0,
        }
    }

    /// Record a failed attempt, returning true if the job may be retried
    pub fn record_failure(&mut self) -> bool {
        self.failures += 1;
        self.failures < RETRY_CEILING
    }
}

/// Classify a file by its base name
///
/// The extension is the text after the last '.', compared case-insensitively.
/// Base names longer than 10 characters with an "xml" extension are batch
/// metadata and get content substitution; "pdf" gets metadata substitution;
/// everything else (including short XML files) is a plain copy.
pub fn classify(file_name: &str) -> JobKind {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("xml") if file_name.chars().count() > XML_NAME_THRESHOLD => JobKind::TextSubstitute,
        Some("pdf") => JobKind::MetadataSubstitute,
        _ => JobKind::Copy,
    }
}
