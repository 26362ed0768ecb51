//! Configuration types for lccn-fixer
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//!
//! The validated `FixConfig` is constructed once at startup and shared
//! read-only by the walker and every worker.

use crate::error::ConfigError;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Fix a bad LCCN throughout an archival batch
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lccn-fixer",
    version,
    about = "Copies a batch to a new tree, fixing a bad LCCN in paths, XML, and PDF metadata",
    long_about = "Finds files in a given source directory that need an LCCN fix. This includes\n\
                  the XML files as well as PDF metadata. After fixes are applied, files are\n\
                  copied to the destination directory.\n\n\
                  The source directory should be either the pristine dark archive files or else\n\
                  a copy of those files (TIFFs aren't necessary, however). The destination\n\
                  should be where the batch should live when it's ready for ingest.",
    after_help = "EXAMPLES:\n    \
        lccn-fixer /archive/batch_oru_123 /ready/batch_oru_123 sn99063854 sn96088356\n    \
        lccn-fixer /archive/batch /ready/batch sn99063854 sn96088356 -w 16 --force"
)]
pub struct CliArgs {
    /// Source directory (the pristine batch)
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination directory (where the fixed batch lands)
    #[arg(value_name = "DEST")]
    pub dest: PathBuf,

    /// The incorrect LCCN present in the batch
    #[arg(value_name = "BAD_LCCN")]
    pub bad_lccn: String,

    /// The LCCN the batch should have
    #[arg(value_name = "GOOD_LCCN")]
    pub good_lccn: String,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Reuse an existing destination directory instead of requiring a new one
    #[arg(long)]
    pub force: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show per-job activity)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Name or path of the exiftool executable used for PDF metadata
    #[arg(long, default_value = "exiftool", value_name = "PROGRAM")]
    pub exiftool: String,
}

fn default_workers() -> usize {
    // Default to 2x CPU cores; jobs are I/O bound (disk plus exiftool round trips)
    num_cpus::get() * 2
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct FixConfig {
    /// Absolute source root (exists, is a directory)
    pub source_dir: PathBuf,

    /// Absolute destination root
    pub dest_dir: PathBuf,

    /// The LCCN to replace
    pub bad_lccn: String,

    /// The replacement LCCN
    pub good_lccn: String,

    /// Number of worker threads
    pub worker_count: usize,

    /// Whether an existing destination may be reused
    pub force: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,

    /// exiftool program name or path
    pub exiftool: String,
}

impl FixConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let source_dir = args
            .source
            .canonicalize()
            .map_err(|e| ConfigError::InvalidSource {
                path: args.source.clone(),
                reason: e.to_string(),
            })?;

        if !source_dir.is_dir() {
            return Err(ConfigError::SourceNotDirectory { path: source_dir });
        }

        let dest_dir = absolutize(&args.dest).map_err(|e| ConfigError::InvalidForcedDestination {
            path: args.dest.clone(),
            reason: e.to_string(),
        })?;

        if args.force {
            // Reusing a destination: it must already be a directory
            if !dest_dir.exists() {
                return Err(ConfigError::InvalidForcedDestination {
                    path: dest_dir,
                    reason: "does not exist".into(),
                });
            }
            if !dest_dir.is_dir() {
                return Err(ConfigError::InvalidForcedDestination {
                    path: dest_dir,
                    reason: "not a directory".into(),
                });
            }
        } else if dest_dir.exists() {
            return Err(ConfigError::DestinationExists { path: dest_dir });
        }

        if source_dir == dest_dir {
            return Err(ConfigError::SamePath { path: source_dir });
        }

        if args.bad_lccn.is_empty() {
            return Err(ConfigError::EmptyLccn { which: "bad" });
        }
        if args.good_lccn.is_empty() {
            return Err(ConfigError::EmptyLccn { which: "good" });
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        Ok(Self {
            source_dir,
            dest_dir,
            bad_lccn: args.bad_lccn,
            good_lccn: args.good_lccn,
            worker_count: args.workers,
            force: args.force,
            show_progress: !args.quiet,
            verbose: args.verbose,
            exiftool: args.exiftool,
        })
    }
}

/// Make a path absolute against the current directory without requiring it
/// to exist (the destination usually doesn't yet)
fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(source: PathBuf, dest: PathBuf) -> CliArgs {
        CliArgs {
            source,
            dest,
            bad_lccn: "sn99063854".into(),
            good_lccn: "sn96088356".into(),
            workers: 4,
            force: false,
            quiet: true,
            verbose: false,
            exiftool: "exiftool".into(),
        }
    }

    #[test]
    fn test_valid_config() {
        let src = tempdir().unwrap();
        let dest = src.path().join("out");

        let config = FixConfig::from_args(args(src.path().to_path_buf(), dest)).unwrap();
        assert_eq!(config.bad_lccn, "sn99063854");
        assert_eq!(config.worker_count, 4);
        assert!(config.source_dir.is_absolute());
        assert!(config.dest_dir.is_absolute());
    }

    #[test]
    fn test_missing_source_rejected() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let dest = dir.path().join("out");

        let err = FixConfig::from_args(args(missing, dest)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSource { .. }));
    }

    #[test]
    fn test_existing_destination_rejected_without_force() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();

        let err =
            FixConfig::from_args(args(src.path().to_path_buf(), dest.path().to_path_buf()))
                .unwrap_err();
        assert!(matches!(err, ConfigError::DestinationExists { .. }));
    }

    #[test]
    fn test_force_accepts_existing_directory() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();

        let mut a = args(src.path().to_path_buf(), dest.path().to_path_buf());
        a.force = true;
        let config = FixConfig::from_args(a).unwrap();
        assert!(config.force);
    }

    #[test]
    fn test_force_requires_existing_directory() {
        let src = tempdir().unwrap();
        let dest = src.path().join("missing");

        let mut a = args(src.path().to_path_buf(), dest);
        a.force = true;
        let err = FixConfig::from_args(a).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidForcedDestination { .. }));
    }

    #[test]
    fn test_same_path_rejected() {
        let src = tempdir().unwrap();
        let canonical = src.path().canonicalize().unwrap();

        let mut a = args(canonical.clone(), canonical);
        a.force = true;
        let err = FixConfig::from_args(a).unwrap_err();
        assert!(matches!(err, ConfigError::SamePath { .. }));
    }

    #[test]
    fn test_empty_lccn_rejected() {
        let src = tempdir().unwrap();
        let dest = src.path().join("out");

        let mut a = args(src.path().to_path_buf(), dest);
        a.bad_lccn = String::new();
        let err = FixConfig::from_args(a).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLccn { which: "bad" }));
    }

    #[test]
    fn test_worker_count_bounds() {
        let src = tempdir().unwrap();
        let dest = src.path().join("out");

        let mut a = args(src.path().to_path_buf(), dest);
        a.workers = 0;
        let err = FixConfig::from_args(a).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorkerCount { .. }));
    }
}
