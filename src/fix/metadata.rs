//! PDF metadata substitution via exiftool
//!
//! PDFs carry the LCCN in their embedded descriptive fields, not just the
//! path, so a plain copy isn't enough. The fix works on the destination
//! copy only (never the source):
//!
//! 1. Durable copy to the destination.
//! 2. `exiftool -json <dest>` exports the metadata as a JSON blob.
//! 3. Literal substitution of the bad LCCN across the whole blob. The odds
//!    of the bad LCCN appearing in EXIF data and *not* needing the change
//!    are slim enough that we don't parse the schema.
//! 4. The `SourceFile` field is forcibly set to the destination path. Its
//!    original value is always stale once the file has moved, and exiftool
//!    refuses a mismatched SourceFile on import.
//! 5. The blob goes to a temp file (exiftool wants its JSON from a file,
//!    not stdin) and `exiftool -json=<tmp> -overwrite_original <dest>`
//!    writes it back in place.
//!
//! The temp file is removed on every exit path; any failed step is a
//! retryable job failure.

use crate::error::{JobError, JobResult};
use crate::fix::{copy_file, replace_all};
use regex::bytes::{NoExpand, Regex};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;
use tempfile::NamedTempFile;

/// Matches the SourceFile field in exiftool's JSON output
static SOURCE_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""SourceFile":\s*"[^"]+""#).expect("Invalid SourceFile regex")
});

/// Copy a PDF to `dest` and rewrite the bad LCCN inside its metadata
pub fn fix_pdf(exiftool: &str, src: &Path, dest: &Path, bad: &[u8], good: &[u8]) -> JobResult<()> {
    // Always operate on a copy, never the original
    copy_file(src, dest)?;

    let blob = export_metadata(exiftool, dest)?;
    let fixed = replace_all(&blob, bad, good);
    let fixed = rewrite_source_file(&fixed, dest);

    let tmp = write_blob(&fixed, dest)?;
    import_metadata(exiftool, tmp.path(), dest)

    // tmp dropped here - the temp file is removed whether import worked or not
}

/// Run exiftool in export mode and return the serialized metadata blob
fn export_metadata(exiftool: &str, dest: &Path) -> JobResult<Vec<u8>> {
    let output = Command::new(exiftool)
        .arg("-json")
        .arg(dest)
        .output()
        .map_err(|e| JobError::MetadataExportFailed {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(JobError::MetadataExportFailed {
            path: dest.to_path_buf(),
            reason: exit_reason(&output.stderr, output.status.code()),
        });
    }

    Ok(output.stdout)
}

/// Run exiftool in import mode, overwriting the destination's metadata in
/// place (no `_original` backup sibling)
fn import_metadata(exiftool: &str, json: &Path, dest: &Path) -> JobResult<()> {
    let output = Command::new(exiftool)
        .arg(format!("-json={}", json.display()))
        .arg("-overwrite_original")
        .arg(dest)
        .output()
        .map_err(|e| JobError::MetadataImportFailed {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(JobError::MetadataImportFailed {
            path: dest.to_path_buf(),
            reason: exit_reason(&output.stderr, output.status.code()),
        });
    }

    Ok(())
}

/// Force the SourceFile field to the destination path, whether or not the
/// bad LCCN appeared in it
fn rewrite_source_file(blob: &[u8], dest: &Path) -> Vec<u8> {
    let source_line = format!(r#""SourceFile": "{}""#, dest.display());
    SOURCE_FILE_RE
        .replace_all(blob, NoExpand(source_line.as_bytes()))
        .into_owned()
}

/// Write the fixed blob to a scoped temp file
fn write_blob(blob: &[u8], dest: &Path) -> JobResult<NamedTempFile> {
    let mut tmp = NamedTempFile::new().map_err(|e| JobError::TempFileFailed {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    })?;

    // write_all rejects a partial write; a short blob on disk would make
    // exiftool silently drop fields
    tmp.write_all(blob).map_err(|e| JobError::TempFileFailed {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    })?;
    tmp.flush().map_err(|e| JobError::TempFileFailed {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(tmp)
}

fn exit_reason(stderr: &[u8], code: Option<i32>) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        match code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".into(),
        }
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_rewrite_source_file_always_forces_dest() {
        // No bad LCCN anywhere - the field is still rewritten
        let blob = br#"[{"SourceFile": "/old/place/issue.pdf","Title":"x"}]"#;
        let dest = PathBuf::from("/new/place/issue.pdf");

        let out = rewrite_source_file(blob, &dest);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#""SourceFile": "/new/place/issue.pdf""#));
        assert!(!out.contains("/old/place"));
        assert!(out.contains(r#""Title":"x""#));
    }

    #[test]
    fn test_rewrite_source_file_tolerates_spacing() {
        let blob = br#"{"SourceFile":"/a/b.pdf"}"#;
        let out = rewrite_source_file(blob, &PathBuf::from("/c/d.pdf"));
        assert_eq!(out, br#"{"SourceFile": "/c/d.pdf"}"#);
    }

    #[test]
    fn test_rewrite_source_file_literal_dollar_in_path() {
        // NoExpand keeps $ in the path from being treated as a capture ref
        let blob = br#"{"SourceFile": "/a/b.pdf"}"#;
        let out = rewrite_source_file(blob, &PathBuf::from("/odd/$1/b.pdf"));
        assert_eq!(out, br#"{"SourceFile": "/odd/$1/b.pdf"}"#);
    }

    #[test]
    fn test_fix_pdf_with_missing_tool_fails_after_copy() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("in.pdf");
        let dest = dir.path().join("out.pdf");
        fs::write(&src, b"%PDF-1.4 fake").unwrap();

        let err = fix_pdf(
            "definitely-not-a-real-exiftool",
            &src,
            &dest,
            b"1234",
            b"5678",
        )
        .unwrap_err();

        assert!(matches!(err, JobError::MetadataExportFailed { .. }));
        // The copy step ran; the destination is left in its partial state
        assert_eq!(fs::read(&dest).unwrap(), b"%PDF-1.4 fake");
    }
}
