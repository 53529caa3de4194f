use super::folders::{FolderRecord, FolderView};
use super::GraphStore;
use crate::error::{Error, Result};
use crate::identity;
use crate::model::{
    Dataset, FileRow, FolderRow, Interpretation, Label, ResearchObject, ScanMeta,
    ScanVerification,
};
use crate::schema::{
    EdgeTriple, SchemaSummary, SchemaTriples, REL_CONTAINS, REL_INTERPRETED_AS, REL_SCANNED_IN,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone)]
struct ScanRecord {
    meta: ScanMeta,
    files: BTreeSet<String>,
    folders: BTreeSet<String>,
}

#[derive(Default)]
struct LocalState {
    /// Keyed by checksum.
    datasets: HashMap<String, Dataset>,
    folders: HashMap<String, FolderRecord>,
    scans: BTreeMap<String, ScanRecord>,
    research_objects: BTreeMap<String, ResearchObject>,
}

impl LocalState {
    fn folder_view(&self) -> FolderView {
        FolderView::build(self.datasets.values().map(|d| d.path.as_str()), &self.folders)
    }

    fn interpreter_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for dataset in self.datasets.values() {
            for interpreter_id in dataset.interpretations.keys() {
                *counts.entry(interpreter_id.clone()).or_default() += 1;
            }
        }
        counts
    }

    fn verification(&self, scan_id: &str) -> ScanVerification {
        match self.scans.get(scan_id) {
            Some(scan) => ScanVerification::new(true, scan.files.len(), scan.folders.len()),
            None => ScanVerification::missing(),
        }
    }
}

/// In-process graph store. All state lives behind one read-write lock:
/// mutations hold the write lock for their whole operation, reads share it.
#[derive(Default)]
pub struct LocalGraphStore {
    state: RwLock<LocalState>,
}

impl LocalGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self, checksum: &str) -> Option<Dataset> {
        self.state.read().datasets.get(checksum).cloned()
    }

    pub fn dataset_count(&self) -> usize {
        self.state.read().datasets.len()
    }

    /// Current Folder→Folder containment edges as (parent, child).
    pub fn folder_edges(&self) -> Vec<(String, String)> {
        self.state.read().folder_view().folder_edges()
    }

    fn dataset_row(dataset: &Dataset) -> Value {
        json!({
            "id": dataset.id,
            "checksum": dataset.checksum,
            "path": dataset.path,
            "filename": dataset.filename,
            "extension": dataset.extension,
            "size": dataset.size,
            "created": dataset.created,
            "modified": dataset.modified,
            "mimeType": dataset.mime_type,
            "state": dataset.state.as_str(),
            "interpreters": dataset.interpretations.keys().collect::<Vec<_>>(),
        })
    }

    fn scan_row(scan: &ScanRecord) -> Value {
        json!({
            "id": scan.meta.id,
            "sourcePath": scan.meta.source_path,
            "provider": scan.meta.provider,
            "hostId": scan.meta.host_id,
            "hostName": scan.meta.host_name,
            "startedAt": scan.meta.started_at.map(|t| t.to_rfc3339()),
            "finishedAt": scan.meta.finished_at.map(|t| t.to_rfc3339()),
            "fileCount": scan.files.len(),
            "folderCount": scan.folders.len(),
        })
    }
}

impl GraphStore for LocalGraphStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    fn upsert_dataset(&self, dataset: Dataset) -> Result<Dataset> {
        let mut state = self.state.write();
        if let Some(existing) = state.datasets.get_mut(&dataset.checksum) {
            existing.merge_descriptive(&dataset);
            debug!("Updated dataset {} at {}", existing.id, existing.path);
            return Ok(existing.clone());
        }

        let mut created = dataset;
        created.id = identity::dataset_id(&created.checksum);
        created.interpretations.clear();
        debug!("Created dataset {} at {}", created.id, created.path);
        state
            .datasets
            .insert(created.checksum.clone(), created.clone());
        Ok(created)
    }

    fn add_interpretation(
        &self,
        checksum: &str,
        interpreter_id: &str,
        interpretation: Interpretation,
    ) -> Result<bool> {
        let mut state = self.state.write();
        match state.datasets.get_mut(checksum) {
            Some(dataset) => {
                dataset
                    .interpretations
                    .insert(interpreter_id.to_string(), interpretation);
                Ok(true)
            }
            // Unknown checksum is deliberately not an error: interpretation is
            // best effort and always follows an upsert in the same run.
            None => {
                debug!(
                    "Ignoring interpretation '{}' for unknown checksum {}",
                    interpreter_id, checksum
                );
                Ok(false)
            }
        }
    }

    fn commit_scan(
        &self,
        scan: &ScanMeta,
        _rows: &[FileRow],
        folder_rows: &[FolderRow],
    ) -> Result<ScanVerification> {
        if scan.id.is_empty() {
            return Err(Error::InvalidScan("scan id is empty".to_string()));
        }

        let mut state = self.state.write();
        for row in folder_rows {
            state
                .folders
                .insert(row.path.clone(), FolderRecord::from(row));
        }

        // Folders join a scan only through explicit rows, as on the remote backend.
        let linked_folders: Vec<String> =
            folder_rows.iter().map(|row| row.path.clone()).collect();
        let linked_files: Vec<String> = scan
            .checksums
            .iter()
            .filter(|checksum| state.datasets.contains_key(*checksum))
            .cloned()
            .collect();

        let record = state
            .scans
            .entry(scan.id.clone())
            .or_insert_with(|| ScanRecord {
                meta: ScanMeta {
                    checksums: BTreeSet::new(),
                    ..scan.clone()
                },
                files: BTreeSet::new(),
                folders: BTreeSet::new(),
            });
        record.files.extend(linked_files);
        record.folders.extend(linked_folders);

        let verification = state.verification(&scan.id);
        debug!(
            "Committed scan {}: {} files, {} folders linked",
            scan.id, verification.files_linked, verification.folders_linked
        );
        Ok(verification)
    }

    fn verify_scan(&self, scan_id: &str) -> Result<ScanVerification> {
        Ok(self.state.read().verification(scan_id))
    }

    fn delete_scan(&self, scan_id: &str) -> Result<bool> {
        let removed = self.state.write().scans.remove(scan_id).is_some();
        if removed {
            debug!("Deleted scan {}", scan_id);
        }
        Ok(removed)
    }

    fn upsert_research_object(&self, research_object: ResearchObject) -> Result<String> {
        let id = research_object.resolved_id();
        let stored = ResearchObject {
            id: Some(id.clone()),
            ..research_object
        };
        self.state
            .write()
            .research_objects
            .insert(id.clone(), stored);
        Ok(id)
    }

    fn list_instances(&self, label: Label) -> Result<Vec<Value>> {
        let state = self.state.read();
        let rows = match label {
            Label::File => {
                let mut datasets: Vec<&Dataset> = state.datasets.values().collect();
                datasets.sort_by(|a, b| a.path.cmp(&b.path));
                datasets.into_iter().map(Self::dataset_row).collect()
            }
            Label::Folder => state
                .folder_view()
                .iter()
                .map(|folder| {
                    json!({
                        "path": folder.path,
                        "name": folder.name,
                        "parent": folder.parent,
                        "fileCount": folder.file_count,
                    })
                })
                .collect(),
            Label::Scan => state.scans.values().map(Self::scan_row).collect(),
            Label::ResearchObject => {
                let view = state.folder_view();
                state
                    .research_objects
                    .iter()
                    .map(|(id, ro)| {
                        json!({
                            "id": id,
                            "key": ro.key,
                            "name": ro.name,
                            "fileCount": ro.checksums.iter().filter(|c| state.datasets.contains_key(*c)).count(),
                            "folderCount": ro.folders.iter().filter(|f| view.contains(f)).count(),
                        })
                    })
                    .collect()
            }
            Label::Interpreter => state
                .interpreter_counts()
                .into_iter()
                .map(|(id, count)| json!({ "id": id, "datasetCount": count }))
                .collect(),
        };
        Ok(rows)
    }

    fn schema_summary(&self) -> Result<SchemaSummary> {
        let triples = self.schema_triples(usize::MAX)?;
        let interpreters = self
            .state
            .read()
            .interpreter_counts()
            .into_keys()
            .collect();
        Ok(SchemaSummary::from_triples(&triples, interpreters))
    }

    fn schema_triples(&self, limit: usize) -> Result<SchemaTriples> {
        let state = self.state.read();
        let view = state.folder_view();
        let interpreters = state.interpreter_counts();

        let nodes = vec![
            (Label::File.to_string(), state.datasets.len()),
            (Label::Folder.to_string(), view.len()),
            (Label::Scan.to_string(), state.scans.len()),
            (Label::ResearchObject.to_string(), state.research_objects.len()),
            (Label::Interpreter.to_string(), interpreters.len()),
        ];

        let scanned_files: usize = state.scans.values().map(|s| s.files.len()).sum();
        let scanned_folders: usize = state.scans.values().map(|s| s.folders.len()).sum();
        let ro_files: usize = state
            .research_objects
            .values()
            .map(|ro| {
                ro.checksums
                    .iter()
                    .filter(|c| state.datasets.contains_key(*c))
                    .count()
            })
            .sum();
        let ro_folders: usize = state
            .research_objects
            .values()
            .map(|ro| ro.folders.iter().filter(|f| view.contains(f)).count())
            .sum();

        let edges = vec![
            EdgeTriple::new("Folder", REL_CONTAINS, "File", view.file_edge_count()),
            EdgeTriple::new("Folder", REL_CONTAINS, "Folder", view.folder_edges().len()),
            EdgeTriple::new(
                "File",
                REL_INTERPRETED_AS,
                "Interpreter",
                interpreters.values().sum(),
            ),
            EdgeTriple::new("File", REL_SCANNED_IN, "Scan", scanned_files),
            EdgeTriple::new("Folder", REL_SCANNED_IN, "Scan", scanned_folders),
            EdgeTriple::new("ResearchObject", REL_CONTAINS, "File", ro_files),
            EdgeTriple::new("ResearchObject", REL_CONTAINS, "Folder", ro_folders),
        ];

        Ok(SchemaTriples::from_counts(nodes, edges, limit))
    }
}
