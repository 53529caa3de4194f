use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::WalkDir;

/// Entries discovered under the scan roots, before any content is read.
#[derive(Debug, Default)]
pub struct Discovery {
    /// (directory, parent directory or `None` for a root)
    pub folders: Vec<(PathBuf, Option<PathBuf>)>,
    pub files: Vec<PathBuf>,
    /// Entries that were skipped because they could not be read.
    pub skipped: Vec<String>,
}

pub fn compile_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Walk every root, collecting directories and regular files. Symlinks are not
/// followed, ignored paths are pruned and unreadable directories are skipped.
pub fn discover(
    roots: &[PathBuf],
    ignore_patterns: &[Pattern],
    mut on_entry: impl FnMut(usize, &Path),
) -> io::Result<Discovery> {
    let mut discovery = Discovery::default();
    let ignored = |path: &Path| ignore_patterns.iter().any(|p| p.matches_path(path));

    for root in roots {
        if !root.is_dir() {
            warn!("Scan root {} is not a directory; skipping", root.display());
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !ignored(entry.path()));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    let location = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    match err.io_error().map(|e| e.kind()) {
                        Some(io::ErrorKind::PermissionDenied) => {
                            error!("Access denied reading {}: {}", location, err);
                            discovery.skipped.push(location);
                            continue;
                        }
                        Some(kind) => {
                            return Err(io::Error::new(
                                kind,
                                format!("Error walking {}: {}", location, err),
                            ))
                        }
                        None => {
                            error!("Skipping {}: {}", location, err);
                            discovery.skipped.push(location);
                            continue;
                        }
                    }
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                continue;
            }
            let path = entry.path().to_path_buf();
            if file_type.is_dir() {
                let parent = if entry.depth() == 0 {
                    None
                } else {
                    path.parent().map(Path::to_path_buf)
                };
                discovery.folders.push((path, parent));
            } else if file_type.is_file() {
                discovery.files.push(path);
            }
            on_entry(discovery.files.len() + discovery.folders.len(), entry.path());
        }
    }

    Ok(discovery)
}
