//! Scan commit: one entry point that turns a scan batch into a verified
//! commit against whichever store is active.

use crate::model::{FileRow, FolderRow, ScanMeta, ScanVerification};
use crate::store::GraphStore;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Verified,
    /// Accepted by the store but not confirmed by read-back.
    Unconfirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub scan_id: String,
    pub scan_exists: bool,
    pub files_linked: usize,
    pub folders_linked: usize,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommitResult {
    fn from_verification(scan_id: &str, verification: ScanVerification) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            scan_exists: verification.scan_exists,
            files_linked: verification.files_linked,
            folders_linked: verification.folders_linked,
            verified: verification.verified,
            error: None,
        }
    }

    fn failed(scan_id: &str, message: String) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            error: Some(message),
            ..Default::default()
        }
    }

    pub fn status(&self) -> CommitStatus {
        if self.error.is_some() {
            CommitStatus::Failed
        } else if self.verified {
            CommitStatus::Verified
        } else {
            CommitStatus::Unconfirmed
        }
    }
}

/// Commit a scan batch. Errors never escape: they are reported in
/// `CommitResult::error`, and nothing is retried here.
pub fn commit(
    store: &dyn GraphStore,
    meta: &ScanMeta,
    files: &[FileRow],
    folders: &[FolderRow],
) -> CommitResult {
    if meta.id.trim().is_empty() {
        error!("Refusing to commit scan without an id");
        return CommitResult::failed("", "scan metadata is missing an id".to_string());
    }

    let mut meta = meta.clone();
    meta.checksums.extend(
        files
            .iter()
            .filter(|row| !row.checksum.is_empty())
            .map(|row| row.checksum.clone()),
    );

    info!(
        "Committing scan {} to {} store ({} files, {} folders)",
        meta.id,
        store.backend_name(),
        files.len(),
        folders.len()
    );
    let start = Instant::now();
    let result = match store.commit_scan(&meta, files, folders) {
        Ok(verification) => CommitResult::from_verification(&meta.id, verification),
        Err(e) => {
            error!("Commit of scan {} failed: {}", meta.id, e);
            return CommitResult::failed(&meta.id, e.to_string());
        }
    };
    debug!(
        "Commit of scan {} finished in {:.2}s: {} files, {} folders linked",
        meta.id,
        start.elapsed().as_secs_f64(),
        result.files_linked,
        result.folders_linked
    );
    if !result.verified {
        warn!("Scan {} committed but durability is unconfirmed", meta.id);
    }
    result
}

/// Re-run verification for an already committed scan without rewriting it.
pub fn reverify(store: &dyn GraphStore, scan_id: &str) -> CommitResult {
    match store.verify_scan(scan_id) {
        Ok(verification) => CommitResult::from_verification(scan_id, verification),
        Err(e) => CommitResult::failed(scan_id, e.to_string()),
    }
}
