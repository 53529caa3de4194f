/// Trait for reporting ingest progress.
///
/// The CLI implements it with indicatif. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _entries_found: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _total_files: usize, _total_folders: usize, _duration_secs: f64) {}
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_hash_progress(&self, _files_hashed: usize, _total_files: usize) {}
    fn on_hash_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_interpret_start(&self, _total_files: usize) {}
    fn on_interpret_complete(&self, _attached: usize, _duration_secs: f64) {}
    fn on_commit_start(&self) {}
    fn on_commit_complete(&self, _files_linked: usize, _folders_linked: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
