pub mod walk;

use crate::identity;
use crate::model::{FileRow, FolderRow};
use crate::progress::ProgressReporter;
use dashmap::DashMap;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

/// Rows produced by one pass over the scan roots.
#[derive(Debug, Default)]
pub struct ScanBatch {
    pub files: Vec<FileRow>,
    pub folders: Vec<FolderRow>,
    /// Paths that were discovered but could not be read.
    pub errors: Vec<String>,
}

impl ScanBatch {
    /// Number of checksums shared by more than one file.
    pub fn duplicate_checksums(&self) -> usize {
        let groups: DashMap<&str, usize> = DashMap::new();
        self.files.par_iter().for_each(|row| {
            *groups.entry(row.checksum.as_str()).or_default() += 1;
        });
        groups.iter().filter(|entry| *entry.value() > 1).count()
    }
}

/// Walk `roots`, then read metadata and checksum every file in parallel.
pub fn scan(
    roots: &[String],
    ignore_globs: &[String],
    reporter: &dyn ProgressReporter,
) -> io::Result<ScanBatch> {
    let patterns = walk::compile_patterns(ignore_globs);
    let roots: Vec<PathBuf> = roots.iter().map(|r| absolute(Path::new(r))).collect();

    reporter.on_scan_start();
    let scan_start = Instant::now();
    let discovery = walk::discover(&roots, &patterns, |found, path| {
        reporter.on_scan_progress(found, &path.to_string_lossy());
    })?;
    let scan_secs = scan_start.elapsed().as_secs_f64();
    reporter.on_scan_complete(discovery.files.len(), discovery.folders.len(), scan_secs);
    info!(
        "Discovered {} files and {} folders in {:.2}s",
        discovery.files.len(),
        discovery.folders.len(),
        scan_secs
    );

    let folders: Vec<FolderRow> = discovery
        .folders
        .iter()
        .map(|(path, parent)| {
            let path = path_string(path);
            let parent = parent.as_deref().map(path_string).unwrap_or_default();
            FolderRow::new(&path, &parent)
        })
        .collect();

    let total = discovery.files.len();
    reporter.on_hash_start(total);
    let hash_start = Instant::now();
    let hashed = AtomicUsize::new(0);
    let failures: DashMap<PathBuf, String> = DashMap::new();
    let mut files: Vec<FileRow> = discovery
        .files
        .par_iter()
        .filter_map(|path| {
            let row = match file_row(path) {
                Ok(row) => Some(row),
                Err(e) => {
                    error!("Error processing file '{}': {}", path.display(), e);
                    failures.insert(path.clone(), e.to_string());
                    None
                }
            };
            let done = hashed.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_hash_progress(done, total);
            row
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    let hash_secs = hash_start.elapsed().as_secs_f64();
    reporter.on_hash_complete(files.len(), hash_secs);
    debug!("Hashed {} files in {:.2}s", files.len(), hash_secs);

    let mut errors = discovery.skipped;
    errors.extend(failures.into_iter().map(|(path, _)| path_string(&path)));
    errors.sort();

    Ok(ScanBatch {
        files,
        folders,
        errors,
    })
}

/// Build a row for one file. Zero-byte files are valid datasets.
pub fn file_row(path: &Path) -> io::Result<FileRow> {
    let metadata = fs::metadata(path)?;
    let checksum = identity::file_checksum(path)?;
    let path_str = path_string(path);
    let extension = identity::normalize_extension(path);
    let mime_type = identity::guess_mime(&extension).to_string();
    Ok(FileRow {
        filename: identity::file_name(&path_str),
        folder: identity::parent_dir(&path_str),
        extension,
        size: metadata.len(),
        created: epoch_secs(metadata.created().ok()),
        modified: epoch_secs(metadata.modified().ok()),
        mime_type,
        checksum,
        interpreters: Vec::new(),
        path: path_str,
    })
}

fn epoch_secs(time: Option<SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
