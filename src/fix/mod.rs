//! Per-file transformation strategies
//!
//! Three strategies, matching the three job kinds:
//! - [`copy`]: durable byte-for-byte duplication
//! - [`text`]: copy with literal LCCN substitution in the content
//! - [`metadata`]: copy plus an exiftool round trip to fix PDF metadata
//!
//! Each strategy takes a source/destination pair and returns a
//! [`JobError`](crate::error::JobError) on failure; the worker's retry loop
//! handles everything from there.

pub mod copy;
pub mod metadata;
pub mod text;

pub use copy::copy_file;
pub use metadata::fix_pdf;
pub use text::fix_xml;

/// Replace every occurrence of `needle` in `haystack` with `replacement`
///
/// Plain literal byte substitution, no overlap handling needed since the
/// search resumes after each match.
pub(crate) fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut last = 0;

    for start in memchr::memmem::find_iter(haystack, needle) {
        out.extend_from_slice(&haystack[last..start]);
        out.extend_from_slice(replacement);
        last = start + needle.len();
    }
    out.extend_from_slice(&haystack[last..]);
    out
}
