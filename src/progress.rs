//! Progress reporting for the batch fix
//!
//! Provides a live status line using an indicatif spinner, plus the
//! header/summary blocks printed around a run.

use crate::pipeline::coordinator::FixResult;
use crate::pipeline::worker::WorkerTotals;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays fix status while the pool drains
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, totals: WorkerTotals, queued: usize, in_flight: usize, workers: usize) {
        let msg = format!(
            "Fixed: {} | Retries: {} | Abandoned: {} | Queue: {} | Workers: {}/{}",
            format_number(totals.succeeded),
            format_number(totals.retries),
            format_number(totals.abandoned),
            queued,
            in_flight,
            workers,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(source: &str, dest: &str, bad: &str, good: &str, workers: usize) {
    println!();
    println!(
        "{} {}",
        style("lccn-fixer").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Source:").bold(), source);
    println!("  {} {}", style("Destination:").bold(), dest);
    println!("  {} {} → {}", style("LCCN:").bold(), bad, good);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!();
}

/// Print a summary of the fix results
pub fn print_summary(result: &FixResult) {
    let duration_secs = result.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        result.succeeded as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    if result.is_clean() {
        println!("{}", style("Fix Complete").green().bold());
    } else if result.completed {
        println!("{}", style("Fix Complete (with failures)").yellow().bold());
    } else {
        println!("{}", style("Fix Interrupted").red().bold());
    }
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Files:").bold(),
        format_number(result.files_enqueued)
    );
    println!(
        "  {} {}",
        style("Copied:").bold(),
        format_number(result.copied)
    );
    println!(
        "  {} {}",
        style("XML fixed:").bold(),
        format_number(result.xml_fixed)
    );
    println!(
        "  {} {}",
        style("PDF fixed:").bold(),
        format_number(result.pdf_fixed)
    );
    println!(
        "  {} {}",
        style("Copied bytes:").bold(),
        format_size(result.bytes_copied, BINARY)
    );
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if result.retries > 0 {
        println!(
            "  {} {}",
            style("Retries:").yellow().bold(),
            format_number(result.retries)
        );
    }
    if result.abandoned > 0 {
        println!(
            "  {} {}",
            style("Abandoned:").red().bold(),
            format_number(result.abandoned)
        );
    }
    if result.dir_create_failures > 0 {
        println!(
            "  {} {}",
            style("Unwritable dirs:").red().bold(),
            format_number(result.dir_create_failures)
        );
    }
    println!();
}
