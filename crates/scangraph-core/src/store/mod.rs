pub mod folders;
pub mod local;

use crate::config::{Backend, GraphConfig};
use crate::error::Result;
use crate::model::{
    Dataset, FileRow, FolderRow, Interpretation, Label, ResearchObject, ScanMeta,
    ScanVerification,
};
use crate::remote::RemoteGraphStore;
use crate::schema::{SchemaSummary, SchemaTriples};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub use local::LocalGraphStore;

/// Backend-agnostic graph store contract.
///
/// Operations that reference an unknown checksum or scan id are no-ops that
/// report `Ok(false)` rather than errors; callers rely on being able to, for
/// example, attach an interpretation after a failed upsert without aborting.
pub trait GraphStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn upsert_dataset(&self, dataset: Dataset) -> Result<Dataset>;

    /// Returns whether a Dataset with `checksum` was found.
    fn add_interpretation(
        &self,
        checksum: &str,
        interpreter_id: &str,
        interpretation: Interpretation,
    ) -> Result<bool>;

    fn commit_scan(
        &self,
        scan: &ScanMeta,
        rows: &[FileRow],
        folder_rows: &[FolderRow],
    ) -> Result<ScanVerification>;

    fn verify_scan(&self, scan_id: &str) -> Result<ScanVerification>;

    /// Returns whether the scan existed.
    fn delete_scan(&self, scan_id: &str) -> Result<bool>;

    fn upsert_research_object(&self, research_object: ResearchObject) -> Result<String>;

    fn list_instances(&self, label: Label) -> Result<Vec<Value>>;

    fn schema_summary(&self) -> Result<SchemaSummary>;

    fn schema_triples(&self, limit: usize) -> Result<SchemaTriples>;
}

/// Select the backend named by the configuration. A remote backend that cannot
/// be configured or reached falls back to the local store with a warning.
pub fn open_store(config: &GraphConfig) -> Arc<dyn GraphStore> {
    match config.backend {
        Backend::Local => {
            info!("Using local in-process graph store");
            Arc::new(LocalGraphStore::new())
        }
        Backend::Remote => {
            let Some(remote) = config.remote.as_ref() else {
                warn!("Remote graph backend selected but no [graph.remote] settings found; falling back to local store");
                return Arc::new(LocalGraphStore::new());
            };
            match RemoteGraphStore::connect(remote) {
                Ok(store) => {
                    store.ensure_constraints();
                    info!("Using remote graph store at {}", remote.url);
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(
                        "Remote graph store at '{}' unavailable ({}); falling back to local store",
                        remote.url, e
                    );
                    Arc::new(LocalGraphStore::new())
                }
            }
        }
    }
}
