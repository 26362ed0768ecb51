//! Source tree walker and path translation
//!
//! Enumerates every regular file under the source root, computes the
//! LCCN-corrected destination path, eagerly creates the destination
//! directory, classifies the file, and enqueues one job per file.
//!
//! Path translation only replaces directory segments that *equal* the bad
//! LCCN exactly. A segment that merely contains it as a substring is left
//! alone, and the base name is never touched; content-level substitution
//! is the job handlers' business.

use crate::config::FixConfig;
use crate::error::{FixerError, Result};
use crate::job::{classify, Job};
use crate::pipeline::queue::JobQueueSender;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, trace, warn};
use walkdir::WalkDir;

/// Statistics collected by the walker
#[derive(Debug, Default)]
pub struct WalkerStats {
    /// Jobs enqueued
    pub files_enqueued: AtomicU64,

    /// Symlinks and other non-regular files skipped
    pub skipped_special: AtomicU64,

    /// Traversal errors (unreadable directories, etc.)
    pub walk_errors: AtomicU64,

    /// Files dropped because their destination directory couldn't be made
    pub dir_create_failures: AtomicU64,
}

/// Walks the source tree and feeds the job queue
pub struct Walker {
    config: Arc<FixConfig>,
    queue: JobQueueSender,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WalkerStats>,
}

impl Walker {
    /// Create a new walker
    pub fn new(config: Arc<FixConfig>, queue: JobQueueSender, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            config,
            queue,
            shutdown,
            stats: Arc::new(WalkerStats::default()),
        }
    }

    /// Get walker statistics
    pub fn stats(&self) -> Arc<WalkerStats> {
        Arc::clone(&self.stats)
    }

    /// Enumerate the source tree, enqueueing one job per regular file
    ///
    /// Returns `Ok(false)` if the walk was cut short by a shutdown signal.
    pub fn walk(&self) -> Result<bool> {
        for entry in WalkDir::new(&self.config.source_dir) {
            if self.shutdown.load(Ordering::Relaxed) {
                warn!("Shutdown requested, abandoning walk");
                return Ok(false);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.stats.walk_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "Skipping unreadable path");
                    continue;
                }
            };

            // Directories never produce jobs; symlinks and other special
            // files are out of scope
            if entry.file_type().is_dir() {
                continue;
            }
            if !entry.file_type().is_file() {
                self.stats.skipped_special.fetch_add(1, Ordering::Relaxed);
                trace!(path = %entry.path().display(), "Skipping non-regular file");
                continue;
            }

            self.submit(entry.path())?;
        }

        Ok(true)
    }

    /// Translate, classify, and enqueue a single file
    fn submit(&self, path: &Path) -> Result<()> {
        let dest = translate_dest_path(
            &self.config.source_dir,
            &self.config.dest_dir,
            path,
            &self.config.bad_lccn,
            &self.config.good_lccn,
        );

        // Eager, idempotent directory creation; failure here is filesystem
        // misconfiguration and retrying the job wouldn't help
        if let Some(dest_dir) = dest.parent() {
            if let Err(e) = fs::create_dir_all(dest_dir) {
                self.stats
                    .dir_create_failures
                    .fetch_add(1, Ordering::Relaxed);
                error!(
                    dir = %dest_dir.display(),
                    error = %e,
                    "Could not create destination directory; skipping file"
                );
                return Ok(());
            }
        }

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = classify(&file_name);

        info!(
            source = %path.display(),
            dest = %dest.display(),
            kind = %kind,
            "Analyzing file"
        );

        self.queue
            .push(Job::new(path.to_path_buf(), dest, kind))
            .map_err(|_| FixerError::ChannelClosed)?;
        self.stats.files_enqueued.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }
}

/// Map a source-tree path to its destination-tree path
///
/// Every directory segment of the source-relative path that equals the bad
/// LCCN exactly is replaced with the good LCCN. Substring matches within a
/// segment are not replaced, and the base name is preserved unmodified.
/// Pure and deterministic; does no I/O.
pub fn translate_dest_path(
    source_root: &Path,
    dest_root: &Path,
    path: &Path,
    bad: &str,
    good: &str,
) -> PathBuf {
    let rel = path.strip_prefix(source_root).unwrap_or(path);
    let mut dest = dest_root.to_path_buf();

    if let Some(parent) = rel.parent() {
        for segment in parent.components() {
            let segment = segment.as_os_str();
            if segment == OsStr::new(bad) {
                dest.push(good);
            } else {
                dest.push(segment);
            }
        }
    }

    if let Some(name) = rel.file_name() {
        dest.push(name);
    }

    dest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;
    use crate::pipeline::queue::JobQueue;
    use tempfile::tempdir;

    fn translate(path: &str, bad: &str, good: &str) -> PathBuf {
        translate_dest_path(
            Path::new("/src"),
            Path::new("/dest"),
            Path::new(path),
            bad,
            good,
        )
    }

    #[test]
    fn test_exact_segment_is_replaced() {
        assert_eq!(
            translate("/src/1234/issue.xml", "1234", "5678"),
            PathBuf::from("/dest/5678/issue.xml")
        );
    }

    #[test]
    fn test_substring_segment_is_not_replaced() {
        assert_eq!(
            translate("/src/batch_1234/page.tif", "1234", "5678"),
            PathBuf::from("/dest/batch_1234/page.tif")
        );
    }

    #[test]
    fn test_base_name_is_never_touched() {
        // Even a base name equal to the bad LCCN is preserved; content-level
        // substitution is a separate concern
        assert_eq!(
            translate("/src/1234/1234", "1234", "5678"),
            PathBuf::from("/dest/5678/1234")
        );
    }

    #[test]
    fn test_multiple_matching_segments() {
        assert_eq!(
            translate("/src/1234/reel/1234/p1.tif", "1234", "5678"),
            PathBuf::from("/dest/5678/reel/5678/p1.tif")
        );
    }

    #[test]
    fn test_file_directly_under_root() {
        assert_eq!(
            translate("/src/manifest.txt", "1234", "5678"),
            PathBuf::from("/dest/manifest.txt")
        );
    }

    fn test_config(source: PathBuf, dest: PathBuf) -> FixConfig {
        FixConfig {
            source_dir: source,
            dest_dir: dest,
            bad_lccn: "1234".into(),
            good_lccn: "5678".into(),
            worker_count: 1,
            force: false,
            show_progress: false,
            verbose: false,
            exiftool: "exiftool".into(),
        }
    }

    #[test]
    fn test_walker_enqueues_classified_jobs() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("batch");
        let dest = dir.path().join("fixed");

        std::fs::create_dir_all(source.join("1234")).unwrap();
        std::fs::create_dir_all(source.join("abc1234")).unwrap();
        std::fs::write(source.join("1234/issue_page.xml"), "<x/>").unwrap();
        std::fs::write(source.join("1234/x.xml"), "<x/>").unwrap();
        std::fs::write(source.join("1234/issue.pdf"), "%PDF").unwrap();
        std::fs::write(source.join("abc1234/page.tif"), "tif").unwrap();

        let queue = JobQueue::new();
        let walker = Walker::new(
            Arc::new(test_config(source, dest.clone())),
            queue.sender(),
            Arc::new(AtomicBool::new(false)),
        );

        assert!(walker.walk().unwrap());
        assert_eq!(
            walker.stats().files_enqueued.load(Ordering::Relaxed),
            4
        );

        let rx = queue.receiver();
        let mut jobs = Vec::new();
        while let Some((job, _guard)) = rx.recv_guarded() {
            jobs.push(job);
        }
        assert_eq!(jobs.len(), 4);

        let find = |name: &str| {
            jobs.iter()
                .find(|j| j.dest.file_name().unwrap() == name)
                .unwrap()
        };

        assert_eq!(find("issue_page.xml").kind, JobKind::TextSubstitute);
        assert_eq!(find("issue_page.xml").dest, dest.join("5678/issue_page.xml"));
        assert_eq!(find("x.xml").kind, JobKind::Copy);
        assert_eq!(find("issue.pdf").kind, JobKind::MetadataSubstitute);
        assert_eq!(find("page.tif").kind, JobKind::Copy);
        assert_eq!(find("page.tif").dest, dest.join("abc1234/page.tif"));

        // Destination directories were created eagerly
        assert!(dest.join("5678").is_dir());
        assert!(dest.join("abc1234").is_dir());
    }

    #[test]
    fn test_walker_shutdown_aborts_early() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("batch");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("a.tif"), "x").unwrap();

        let queue = JobQueue::new();
        let walker = Walker::new(
            Arc::new(test_config(source, dir.path().join("fixed"))),
            queue.sender(),
            Arc::new(AtomicBool::new(true)),
        );

        assert!(!walker.walk().unwrap());
        assert_eq!(walker.stats().files_enqueued.load(Ordering::Relaxed), 0);
    }
}
