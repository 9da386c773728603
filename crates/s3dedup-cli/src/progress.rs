use indicatif::{ProgressBar, ProgressStyle};
use s3dedup_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

/// Progress bar for the strong-hash pass.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_hash_start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "  {spinner:.cyan} Hashing [{bar:30.cyan/dim}] {pos}/{len} objects ({eta} remaining)",
        )
        .map(|style| style.progress_chars("━╸─").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_hash_progress(&self, done: usize, _total: usize) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(done as u64);
            }
        }
    }

    fn on_hash_complete(&self, hashed: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        if failed == 0 {
            eprintln!(
                "  \x1b[32m✓\x1b[0m Hash complete: {} objects in {:.2}s",
                hashed, duration_secs
            );
        } else {
            eprintln!(
                "  \x1b[33m!\x1b[0m Hash complete: {} objects in {:.2}s, {} unavailable",
                hashed, duration_secs, failed
            );
        }
    }
}
