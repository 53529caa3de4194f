use crate::config::{self, AppConfig};
use crate::error::{Error, Result};
use crate::identity;
use crate::interpret::{self, Interpreter};
use crate::model::{Dataset, FileRow, Interpretation, InterpretationStatus, ScanMeta};
use crate::pipeline::{self, CommitResult};
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::store::GraphStore;
use chrono::Utc;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct IngestEngine {
    config: AppConfig,
    store: Arc<dyn GraphStore>,
    interpreters: Vec<Box<dyn Interpreter>>,
}

#[derive(Debug)]
pub struct IngestReport {
    pub scan_id: String,
    pub scan_duration: Duration,
    pub upsert_duration: Duration,
    pub interpret_duration: Duration,
    pub commit_duration: Duration,
    pub files: usize,
    pub folders: usize,
    pub unreadable: usize,
    pub duplicate_checksums: usize,
    pub interpretations: usize,
    pub commit: CommitResult,
}

impl IngestEngine {
    pub fn new(config: AppConfig, store: Arc<dyn GraphStore>) -> Self {
        Self {
            config,
            store,
            interpreters: interpret::builtin_interpreters(),
        }
    }

    pub fn with_interpreters(mut self, interpreters: Vec<Box<dyn Interpreter>>) -> Self {
        self.interpreters = interpreters;
        self
    }

    /// Run the full ingest:
    /// 1. Walk the roots and checksum every file
    /// 2. Upsert one Dataset per file
    /// 3. Run interpreters and attach their output
    /// 4. Commit the scan and verify it
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<IngestReport> {
        let roots = config::non_overlapping_directories(self.config.scan.root_paths.clone());
        if roots.is_empty() {
            return Err(Error::InvalidScan("no root paths configured".to_string()));
        }
        info!("Processing directories: {:?}", roots);
        let started_at = Utc::now();

        // Phase 1: Scan
        let scan_start = Instant::now();
        let mut batch = scanner::scan(&roots, &self.config.scan.ignore_patterns, reporter)?;
        let scan_duration = scan_start.elapsed();
        if !batch.errors.is_empty() {
            warn!("{} entries could not be read", batch.errors.len());
        }

        // Phase 2: Upsert datasets
        info!("Upserting {} datasets...", batch.files.len());
        let upsert_start = Instant::now();
        for row in &batch.files {
            self.store.upsert_dataset(Dataset::from_row(row))?;
        }
        let upsert_duration = upsert_start.elapsed();
        debug!("Upsert completed in {:.2}s", upsert_duration.as_secs_f64());

        // Phase 3: Interpret
        reporter.on_interpret_start(batch.files.len());
        let interpret_start = Instant::now();
        let interpretations = self.attach_interpretations(&mut batch.files)?;
        let interpret_duration = interpret_start.elapsed();
        reporter.on_interpret_complete(interpretations, interpret_duration.as_secs_f64());

        // Phase 4: Commit
        let meta = self.scan_meta(&roots, started_at, &batch.files);
        reporter.on_commit_start();
        let commit_start = Instant::now();
        let commit = pipeline::commit(self.store.as_ref(), &meta, &batch.files, &batch.folders);
        let commit_duration = commit_start.elapsed();
        reporter.on_commit_complete(
            commit.files_linked,
            commit.folders_linked,
            commit_duration.as_secs_f64(),
        );

        Ok(IngestReport {
            scan_id: meta.id,
            scan_duration,
            upsert_duration,
            interpret_duration,
            commit_duration,
            files: batch.files.len(),
            folders: batch.folders.len(),
            unreadable: batch.errors.len(),
            duplicate_checksums: batch.duplicate_checksums(),
            interpretations,
            commit,
        })
    }

    /// Interpret files in parallel, then attach results one at a time. Rows
    /// record the interpreters that succeeded.
    fn attach_interpretations(&self, rows: &mut [FileRow]) -> Result<usize> {
        let results: Vec<(usize, String, Interpretation)> = rows
            .par_iter()
            .enumerate()
            .flat_map_iter(|(index, row)| {
                self.interpreters
                    .iter()
                    .filter(|interpreter| interpreter.accepts(row))
                    .map(move |interpreter| {
                        let outcome = match interpreter.interpret(Path::new(&row.path)) {
                            Ok(payload) => Interpretation::success(payload, interpreter.version()),
                            Err(e) => {
                                debug!(
                                    "Interpreter '{}' failed on {}: {}",
                                    interpreter.id(),
                                    row.path,
                                    e
                                );
                                Interpretation::error(&e.to_string(), interpreter.version())
                            }
                        };
                        (index, interpreter.id().to_string(), outcome)
                    })
            })
            .collect();

        let mut attached = 0;
        for (index, interpreter_id, interpretation) in results {
            let succeeded = interpretation.status == InterpretationStatus::Success;
            let row = &mut rows[index];
            if self
                .store
                .add_interpretation(&row.checksum, &interpreter_id, interpretation)?
            {
                attached += 1;
                if succeeded {
                    row.interpreters.push(interpreter_id);
                }
            }
        }
        Ok(attached)
    }

    fn scan_meta(
        &self,
        roots: &[String],
        started_at: chrono::DateTime<Utc>,
        rows: &[FileRow],
    ) -> ScanMeta {
        let host_name =
            whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
        let mut meta = ScanMeta::new(&uuid::Uuid::new_v4().to_string(), &roots.join(";"))
            .with_checksums(rows.iter().map(|row| row.checksum.clone()));
        meta.provider = self.config.scan.provider.clone();
        meta.host_id = identity::stable_id("host", &host_name);
        meta.host_name = host_name;
        meta.started_at = Some(started_at);
        meta.finished_at = Some(Utc::now());
        meta
    }
}
