use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use scangraph_core::ProgressReporter;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan and commit phases: spinner
/// - Hash phase: progress bar (total files known from the walk)
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar.lock().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        self.spinner("Scanning files...");
    }

    fn on_scan_progress(&self, entries_found: usize, _current_path: &str) {
        if let Some(pb) = self.bar.lock().as_ref() {
            pb.set_message(format!("Scanning... {} entries found", entries_found));
        }
    }

    fn on_scan_complete(&self, total_files: usize, total_folders: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files, {} folders in {:.2}s",
            total_files, total_folders, duration_secs
        );
    }

    fn on_hash_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Hashing [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_hash_progress(&self, files_hashed: usize, _total_files: usize) {
        if let Some(pb) = self.bar.lock().as_ref() {
            pb.set_position(files_hashed as u64);
        }
    }

    fn on_hash_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Hash complete: {} checksums in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_interpret_start(&self, _total_files: usize) {
        self.spinner("Interpreting files...");
    }

    fn on_interpret_complete(&self, attached: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Interpretation complete: {} attached in {:.2}s",
            attached, duration_secs
        );
    }

    fn on_commit_start(&self) {
        self.spinner("Committing scan to graph...");
    }

    fn on_commit_complete(&self, files_linked: usize, folders_linked: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Commit complete: {} files, {} folders linked in {:.2}s",
            files_linked, folders_linked, duration_secs
        );
    }
}
