//! Graph store client for a networked FalkorDB-compatible database.

pub mod connection;
pub mod cypher;
pub mod resp;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::identity;
use crate::model::{
    Dataset, FileRow, FolderRow, Interpretation, Label, ResearchObject, ScanMeta,
    ScanVerification,
};
use crate::schema::{EdgeTriple, SchemaSummary, SchemaTriples};
use crate::store::folders::hierarchy_edges;
use crate::store::GraphStore;
use connection::{Connector, GraphConnection, QueryResult};
use cypher::Statement;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const FILE_COLUMNS: &[&str] = &[
    "id",
    "checksum",
    "path",
    "filename",
    "extension",
    "size",
    "created",
    "modified",
    "mimeType",
    "state",
    "interpreters",
];
const FOLDER_COLUMNS: &[&str] = &["path", "name", "parent", "fileCount"];
const SCAN_COLUMNS: &[&str] = &[
    "id",
    "sourcePath",
    "provider",
    "hostId",
    "hostName",
    "startedAt",
    "finishedAt",
    "fileCount",
    "folderCount",
];
const RESEARCH_OBJECT_COLUMNS: &[&str] = &["id", "key", "name", "fileCount", "folderCount"];
const INTERPRETER_COLUMNS: &[&str] = &["id", "datasetCount"];

pub const DEFAULT_POOL_SIZE: usize = 4;

type Slot = Mutex<Option<Box<dyn GraphConnection>>>;

/// Each statement takes the next pool slot round-robin and holds only that
/// slot's lock for its round trip.
pub struct RemoteGraphStore {
    connector: Connector,
    pool: Vec<Slot>,
    next: AtomicUsize,
    host: String,
    base_timeout: Duration,
    per_row_timeout: Duration,
}

impl RemoteGraphStore {
    /// Validate the settings and open the first connection eagerly, so an
    /// unreachable server is detected at selection time.
    pub fn connect(config: &RemoteConfig) -> Result<Self> {
        let address = resp::parse_url(&config.url)?;
        if !config.no_auth && config.password.is_none() {
            return Err(Error::Connection(
                "credentials required unless no_auth is set".to_string(),
            ));
        }

        let graph = config.database.clone();
        let credentials = config
            .credentials()
            .map(|(user, password)| (user.map(str::to_string), password.to_string()));
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let connector: Connector = Box::new(move || {
            let creds = credentials
                .as_ref()
                .map(|(user, password)| (user.as_deref(), password.as_str()));
            let conn = resp::RespConnection::open(&address, &graph, creds, connect_timeout)?;
            Ok(Box::new(conn) as Box<dyn GraphConnection>)
        });

        let host = config.host.clone().unwrap_or_else(local_host_name);
        let store = Self::with_connector(
            connector,
            &host,
            Duration::from_secs(config.base_timeout_secs),
            Duration::from_millis(config.per_row_timeout_ms),
        )
        .with_pool_size(config.pool_size);
        store.with_connection(|conn| conn.ping())?;
        Ok(store)
    }

    pub fn with_connector(
        connector: Connector,
        host: &str,
        base_timeout: Duration,
        per_row_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            pool: Self::empty_pool(DEFAULT_POOL_SIZE),
            next: AtomicUsize::new(0),
            host: host.to_string(),
            base_timeout,
            per_row_timeout,
        }
    }

    /// Resize the pool. Zero is treated as one.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool = Self::empty_pool(size.max(1));
        self
    }

    fn empty_pool(size: usize) -> Vec<Slot> {
        (0..size).map(|_| Mutex::new(None)).collect()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Bulk operations get `base + per_row * rows`.
    pub fn op_timeout(&self, rows: usize) -> Duration {
        self.base_timeout + self.per_row_timeout * rows as u32
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut dyn GraphConnection) -> Result<T>,
    ) -> Result<T> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        let mut guard = self.pool[slot].lock();
        if guard.is_none() {
            debug!("Opening graph connection in pool slot {}", slot);
            *guard = Some((self.connector)()?);
        }
        let conn = guard
            .as_mut()
            .ok_or_else(|| Error::Connection("no graph connection".to_string()))?;
        let result = op(conn.as_mut());
        if let Err(e) = &result {
            if e.is_connection_fault() {
                debug!("Dropping graph connection in slot {} after fault: {}", slot, e);
                *guard = None;
            }
        }
        result
    }

    fn run(&self, statement: &Statement) -> Result<QueryResult> {
        self.run_with_timeout(statement, self.base_timeout)
    }

    fn run_with_timeout(&self, statement: &Statement, timeout: Duration) -> Result<QueryResult> {
        self.with_connection(|conn| {
            conn.set_timeout(timeout)?;
            conn.run(statement)
        })
    }

    /// Declare indexes and uniqueness on the natural keys: checksum for File,
    /// path and host for Folder. Failures are logged; writes match on the
    /// natural key either way.
    pub fn ensure_constraints(&self) {
        let indexes = [
            cypher::INDEX_SCAN_ID,
            cypher::INDEX_FILE_CHECKSUM,
            cypher::INDEX_FOLDER_KEY,
        ];
        for text in indexes {
            if let Err(e) = self.run(&Statement::new(text)) {
                debug!("Index declaration skipped ({}): {}", text, e);
            }
        }
        let keys: [(Label, &[&str]); 2] = [
            (Label::File, &["checksum"]),
            (Label::Folder, &["path", "host"]),
        ];
        for (label, properties) in keys {
            match self.with_connection(|conn| {
                conn.create_unique_constraint(label.as_str(), properties)
            }) {
                Ok(()) => debug!(
                    "Unique constraint on {}({}) declared",
                    label,
                    properties.join(", ")
                ),
                Err(e) => warn!(
                    "Could not declare unique constraint on {}({}): {}",
                    label,
                    properties.join(", "),
                    e
                ),
            }
        }
    }

    /// Write a whole scan in one statement. Returns the distinct file and
    /// folder counts that were sent.
    pub fn write_scan(
        &self,
        rows: &[FileRow],
        folder_rows: &[FolderRow],
        meta: &ScanMeta,
    ) -> Result<(usize, usize)> {
        if meta.id.is_empty() {
            return Err(Error::InvalidScan("scan id is empty".to_string()));
        }
        let statement = self.write_scan_statement(rows, folder_rows, meta);
        let timeout = self.op_timeout(rows.len() + folder_rows.len());
        let start = Instant::now();
        let result = self.run_with_timeout(&statement, timeout)?;
        let files = result.first_usize(1);
        let folders = result.first_usize(2);
        debug!(
            "Wrote scan {} ({} files, {} folders) in {:?}",
            meta.id,
            files,
            folders,
            start.elapsed()
        );
        Ok((files, folders))
    }

    pub fn write_scan_statement(
        &self,
        rows: &[FileRow],
        folder_rows: &[FolderRow],
        meta: &ScanMeta,
    ) -> Statement {
        let mut latest: BTreeMap<&str, &FolderRow> = BTreeMap::new();
        for row in folder_rows {
            latest.insert(row.path.as_str(), row);
        }
        let folders: Vec<Value> = latest
            .values()
            .map(|row| {
                let name = if row.name.is_empty() {
                    identity::file_name(&row.path)
                } else {
                    row.name.clone()
                };
                json!({ "path": row.path, "name": name, "parent": row.parent })
            })
            .collect();
        let folder_edges: Vec<Value> = hierarchy_edges(folder_rows)
            .into_iter()
            .map(|(parent, child)| json!({ "parent": parent, "child": child }))
            .collect();

        // One File node per checksum; the last row for a checksum sets its path.
        let mut latest_files: BTreeMap<&str, &FileRow> = BTreeMap::new();
        for row in rows {
            latest_files.insert(row.checksum.as_str(), row);
        }
        let files: Vec<Value> = latest_files
            .values()
            .map(|row| {
                json!({
                    "path": row.path,
                    "id": identity::dataset_id(&row.checksum),
                    "checksum": row.checksum,
                    "filename": row.filename,
                    "extension": row.extension,
                    "size": row.size,
                    "created": row.created,
                    "modified": row.modified,
                    "mime_type": row.mime_type,
                })
            })
            .collect();

        let mut interpretations = Vec::new();
        let mut folder_files = Vec::new();
        for row in rows {
            for interpreter in &row.interpreters {
                interpretations
                    .push(json!({ "checksum": row.checksum, "interpreter": interpreter }));
            }
            if !row.folder.is_empty() {
                folder_files.push(json!({ "folder": row.folder, "checksum": row.checksum }));
            }
        }

        Statement::new(cypher::WRITE_SCAN)
            .param("scan_id", meta.id.as_str())
            .param("source_path", meta.source_path.as_str())
            .param("provider", meta.provider.as_str())
            .param("host_id", meta.host_id.as_str())
            .param("host_name", meta.host_name.as_str())
            .param("started_at", meta.started_at.map(|t| t.to_rfc3339()))
            .param("finished_at", meta.finished_at.map(|t| t.to_rfc3339()))
            .param("host", self.host.as_str())
            .param("folders", folders)
            .param("folder_edges", folder_edges)
            .param("files", files)
            .param("interpretations", interpretations)
            .param("folder_files", folder_files)
    }

    pub fn verify(&self, scan_id: &str, rows: usize) -> Result<ScanVerification> {
        let statement = Statement::new(cypher::VERIFY_SCAN).param("scan_id", scan_id);
        let result = self.run_with_timeout(&statement, self.op_timeout(rows))?;
        Ok(ScanVerification::new(
            result.first_usize(0) > 0,
            result.first_usize(1),
            result.first_usize(2),
        ))
    }
}

fn local_host_name() -> String {
    whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string())
}

impl GraphStore for RemoteGraphStore {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    fn upsert_dataset(&self, dataset: Dataset) -> Result<Dataset> {
        let mut stored = dataset;
        stored.id = identity::dataset_id(&stored.checksum);
        let statement = Statement::new(cypher::UPSERT_DATASET)
            .param("path", stored.path.as_str())
            .param("host", self.host.as_str())
            .param("id", stored.id.as_str())
            .param("checksum", stored.checksum.as_str())
            .param("filename", stored.filename.as_str())
            .param("extension", stored.extension.as_str())
            .param("size", stored.size)
            .param("created", stored.created)
            .param("modified", stored.modified)
            .param("mime_type", stored.mime_type.as_str())
            .param("state", stored.state.as_str());
        self.run(&statement)?;
        stored.interpretations.clear();
        Ok(stored)
    }

    fn add_interpretation(
        &self,
        checksum: &str,
        interpreter_id: &str,
        interpretation: Interpretation,
    ) -> Result<bool> {
        let statement = Statement::new(cypher::ADD_INTERPRETATION)
            .param("checksum", checksum)
            .param("interpreter", interpreter_id)
            .param("status", interpretation.status.as_str())
            .param("version", interpretation.version.as_str())
            .param("payload", serde_json::to_string(&interpretation.payload)?)
            .param("timestamp", interpretation.timestamp.to_rfc3339());
        let matched = self.run(&statement)?.first_usize(0) > 0;
        if !matched {
            debug!(
                "Ignoring interpretation '{}' for unknown checksum {}",
                interpreter_id, checksum
            );
        }
        Ok(matched)
    }

    fn commit_scan(
        &self,
        scan: &ScanMeta,
        rows: &[FileRow],
        folder_rows: &[FolderRow],
    ) -> Result<ScanVerification> {
        let (files, folders) = self.write_scan(rows, folder_rows, scan)?;
        let verification = self.verify(&scan.id, files + folders)?;
        if !verification.verified {
            warn!(
                "Scan {} written ({} files, {} folders) but not confirmed by read-back",
                scan.id, files, folders
            );
        }
        Ok(verification)
    }

    fn verify_scan(&self, scan_id: &str) -> Result<ScanVerification> {
        self.verify(scan_id, 0)
    }

    fn delete_scan(&self, scan_id: &str) -> Result<bool> {
        let statement = Statement::new(cypher::DELETE_SCAN).param("scan_id", scan_id);
        let deleted = self.run(&statement)?.first_usize(0) > 0;
        if deleted {
            info!("Deleted scan {}", scan_id);
        }
        Ok(deleted)
    }

    fn upsert_research_object(&self, research_object: ResearchObject) -> Result<String> {
        let id = research_object.resolved_id();
        self.run(
            &Statement::new(cypher::UPSERT_RESEARCH_OBJECT)
                .param("id", id.as_str())
                .param("key", research_object.key.as_str())
                .param("name", research_object.name.as_str()),
        )?;
        if !research_object.checksums.is_empty() {
            let checksums: Vec<Value> = research_object
                .checksums
                .iter()
                .map(|c| Value::from(c.as_str()))
                .collect();
            self.run(
                &Statement::new(cypher::LINK_RESEARCH_FILES)
                    .param("id", id.as_str())
                    .param("checksums", checksums),
            )?;
        }
        if !research_object.folders.is_empty() {
            let folders: Vec<Value> = research_object
                .folders
                .iter()
                .map(|f| Value::from(f.as_str()))
                .collect();
            self.run(
                &Statement::new(cypher::LINK_RESEARCH_FOLDERS)
                    .param("id", id.as_str())
                    .param("folders", folders)
                    .param("host", self.host.as_str()),
            )?;
        }
        Ok(id)
    }

    fn list_instances(&self, label: Label) -> Result<Vec<Value>> {
        let (text, columns) = match label {
            Label::File => (cypher::LIST_FILES, FILE_COLUMNS),
            Label::Folder => (cypher::LIST_FOLDERS, FOLDER_COLUMNS),
            Label::Scan => (cypher::LIST_SCANS, SCAN_COLUMNS),
            Label::ResearchObject => (cypher::LIST_RESEARCH_OBJECTS, RESEARCH_OBJECT_COLUMNS),
            Label::Interpreter => (cypher::LIST_INTERPRETERS, INTERPRETER_COLUMNS),
        };
        Ok(self.run(&Statement::new(text))?.to_objects(columns))
    }

    fn schema_summary(&self) -> Result<SchemaSummary> {
        let triples = self.schema_triples(usize::MAX)?;
        let interpreters = self
            .run(&Statement::new(cypher::INTERPRETERS_IN_USE))?
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(|cell| cell.as_string()))
            .collect();
        Ok(SchemaSummary::from_triples(&triples, interpreters))
    }

    fn schema_triples(&self, limit: usize) -> Result<SchemaTriples> {
        let node_rows = self.run(&Statement::new(cypher::NODE_COUNTS))?;
        let nodes: Vec<(String, usize)> = node_rows
            .rows
            .iter()
            .filter_map(|row| {
                let label = row.first()?.as_string()?;
                Some((label, row.get(1)?.as_usize()))
            })
            .collect();

        let edge_rows = self.run(&Statement::new(cypher::EDGE_COUNTS))?;
        let edges: Vec<EdgeTriple> = edge_rows
            .rows
            .iter()
            .filter_map(|row| {
                Some(EdgeTriple::new(
                    &row.first()?.as_string()?,
                    &row.get(1)?.as_string()?,
                    &row.get(2)?.as_string()?,
                    row.get(3)?.as_usize(),
                ))
            })
            .collect();

        Ok(SchemaTriples::from_counts(nodes, edges, limit))
    }
}
