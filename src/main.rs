//! lccn-fixer - Batch LCCN Remediation
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use lccn_fixer::config::{CliArgs, FixConfig};
use lccn_fixer::pipeline::FixCoordinator;
use lccn_fixer::progress::{print_header, print_summary, ProgressReporter};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the fix; `Ok(false)` means the run finished but not cleanly
/// (abandoned jobs, unwritable directories, or an interrupt)
fn run() -> Result<bool> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = FixConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(
            &config.source_dir.display().to_string(),
            &config.dest_dir.display().to_string(),
            &config.bad_lccn,
            &config.good_lccn,
            config.worker_count,
        );
    }

    let mut coordinator = FixCoordinator::new(config.clone());
    if config.show_progress {
        coordinator = coordinator.with_progress(ProgressReporter::new());
    }

    // Graceful shutdown: stop the walker, let in-flight jobs finish or fail
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let result = coordinator.run().context("Fix failed")?;

    if config.show_progress {
        print_summary(&result);
    }

    if result.abandoned > 0 {
        info!(
            abandoned = result.abandoned,
            "Some files were abandoned after repeated failures; see error logs"
        );
    }

    Ok(result.is_clean())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("lccn_fixer=debug,warn")
    } else {
        EnvFilter::new("lccn_fixer=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
