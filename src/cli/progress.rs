//! Progress bar utilities for CLI output
//!
//! Turns the status messages reported by core operations into an indicatif
//! spinner / progress bar, and provides the console helpers shared by all
//! commands.
//!
//! Key features:
//! - Progress bars that suspend cleanly when printing warnings
//! - Consistent visual styling across all operations

use crate::core::progress::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the spinner style for scanning operations
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷")
}

/// Get the progress bar style for per-file operations
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

/// Get the style for completed progress bars
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━━")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Progress sink backed by indicatif
// ============================================================================

/// Shows core status messages on the terminal
///
/// Starts as a spinner. A "Found N files ..." message turns it into a bar of
/// length N, each "Processing"/"Moving"/"Deleted" message advances it, and
/// failure messages are printed above the bar as warnings.
pub struct CliProgress {
    bar: ProgressBar,
    start_time: Instant,
    failures: AtomicUsize,
}

impl CliProgress {
    /// Create a progress display with an initial message
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(bar, message)
    }

    /// A progress display that draws nothing
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden(), "")
    }

    fn with_bar(bar: ProgressBar, message: &str) -> Self {
        bar.set_message(message.to_string());
        Self {
            bar,
            start_time: Instant::now(),
            failures: AtomicUsize::new(0),
        }
    }

    /// Switch from spinner to a bar of `total` items
    pub fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(progress_bar_style());
        self.bar.set_message(String::new());
    }

    /// Number of failure messages seen so far
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Current bar position
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Current bar length, if it has one
    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    /// Finish the display, keeping a summary line
    pub fn finish(&self, summary: &str) {
        if self.bar.length().is_some() {
            self.bar.set_style(completed_style());
        }
        self.bar.finish_with_message(format!(
            "{} ({})",
            summary,
            format_duration(self.start_time.elapsed())
        ));
    }

    /// Remove the display entirely
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for CliProgress {
    fn report(&self, message: &str) {
        if let Some(total) = parse_found(message) {
            self.set_total(total);
            return;
        }

        if message.starts_with("Error processing") || message.starts_with("Failed") {
            self.failures.fetch_add(1, Ordering::Relaxed);
            self.bar.suspend(|| print_warning(message));
            // Deletions announce only their outcome.
            if message.starts_with("Failed to delete") {
                self.bar.inc(1);
            }
            return;
        }

        match ["Processing ", "Moving ", "Deleted: "]
            .iter()
            .find_map(|prefix| message.strip_prefix(prefix))
        {
            Some(item) => {
                let item = item.rsplit(": ").next().unwrap_or(item);
                let display: String = item.chars().take(40).collect();
                self.bar.set_message(display);
                self.bar.inc(1);
            }
            None => self.bar.set_message(message.to_string()),
        }
    }
}

/// Total from a "Found N files ..." message
fn parse_found(message: &str) -> Option<u64> {
    let rest = message.strip_prefix("Found ")?;
    let count = rest.split_whitespace().next()?;
    if !rest[count.len()..].trim_start().starts_with("files") {
        return None;
    }
    count.parse().ok()
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================
