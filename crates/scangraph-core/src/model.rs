use crate::identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Active,
    Archived,
    Missing,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "active",
            LifecycleState::Archived => "archived",
            LifecycleState::Missing => "missing",
        }
    }
}

/// One physical file, identified by its content checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Derived from the checksum; filled in by the store on first upsert.
    #[serde(default)]
    pub id: String,
    pub checksum: String,
    pub path: String,
    pub filename: String,
    pub extension: String,
    pub size: u64,
    pub created: i64,
    pub modified: i64,
    pub mime_type: String,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(default)]
    pub interpretations: BTreeMap<String, Interpretation>,
}

impl Dataset {
    pub fn new(checksum: &str, path: &str, size: u64) -> Self {
        let extension = identity::normalize_extension(std::path::Path::new(path));
        let mime_type = identity::guess_mime(&extension).to_string();
        Self {
            id: String::new(),
            checksum: checksum.to_string(),
            path: path.to_string(),
            filename: identity::file_name(path),
            extension,
            size,
            created: 0,
            modified: 0,
            mime_type,
            state: LifecycleState::Active,
            interpretations: BTreeMap::new(),
        }
    }

    pub fn from_row(row: &FileRow) -> Self {
        Self {
            id: String::new(),
            checksum: row.checksum.clone(),
            path: row.path.clone(),
            filename: row.filename.clone(),
            extension: row.extension.clone(),
            size: row.size,
            created: row.created,
            modified: row.modified,
            mime_type: row.mime_type.clone(),
            state: LifecycleState::Active,
            interpretations: BTreeMap::new(),
        }
    }

    pub fn parent_dir(&self) -> String {
        identity::parent_dir(&self.path)
    }

    /// Overwrite descriptive fields from `other`, keeping identity and interpretations.
    pub(crate) fn merge_descriptive(&mut self, other: &Dataset) {
        self.path = other.path.clone();
        self.filename = other.filename.clone();
        self.extension = other.extension.clone();
        self.size = other.size;
        self.created = other.created;
        self.modified = other.modified;
        self.mime_type = other.mime_type.clone();
        self.state = other.state;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpretationStatus {
    Success,
    Error,
}

impl InterpretationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpretationStatus::Success => "success",
            InterpretationStatus::Error => "error",
        }
    }
}

/// Latest output of one interpreter for one Dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub status: InterpretationStatus,
    pub payload: Value,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl Interpretation {
    pub fn success(payload: Value, version: &str) -> Self {
        Self {
            status: InterpretationStatus::Success,
            payload,
            version: version.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: &str, version: &str) -> Self {
        Self {
            status: InterpretationStatus::Error,
            payload: serde_json::json!({ "error": message }),
            version: version.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// A file as reported by the scanning collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileRow {
    pub path: String,
    pub filename: String,
    pub extension: String,
    pub size: u64,
    pub created: i64,
    pub modified: i64,
    pub mime_type: String,
    /// Immediate parent folder path; empty when unknown.
    pub folder: String,
    pub checksum: String,
    /// Interpreters that ran successfully on this file.
    #[serde(default)]
    pub interpreters: Vec<String>,
}

/// A directory as reported by the scanning collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FolderRow {
    pub path: String,
    pub name: String,
    /// Parent folder path; empty for a scan root.
    pub parent: String,
}

impl FolderRow {
    pub fn new(path: &str, parent: &str) -> Self {
        Self {
            path: path.to_string(),
            name: identity::file_name(path),
            parent: parent.to_string(),
        }
    }
}

/// A recorded scanning session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanMeta {
    pub id: String,
    pub source_path: String,
    pub provider: String,
    pub host_id: String,
    pub host_name: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Checksums of every Dataset the scan touched.
    #[serde(default)]
    pub checksums: BTreeSet<String>,
}

impl ScanMeta {
    pub fn new(id: &str, source_path: &str) -> Self {
        Self {
            id: id.to_string(),
            source_path: source_path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_checksums<I, S>(mut self, checksums: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checksums.extend(checksums.into_iter().map(Into::into));
        self
    }
}

/// Read-back of a scan's effects in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanVerification {
    pub scan_exists: bool,
    pub files_linked: usize,
    pub folders_linked: usize,
    pub verified: bool,
}

impl ScanVerification {
    pub fn new(scan_exists: bool, files_linked: usize, folders_linked: usize) -> Self {
        Self {
            scan_exists,
            files_linked,
            folders_linked,
            verified: scan_exists && (files_linked > 0 || folders_linked > 0),
        }
    }

    pub fn missing() -> Self {
        Self::new(false, 0, 0)
    }
}

/// Optional higher-level grouping of Datasets and Folders.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResearchObject {
    #[serde(default)]
    pub id: Option<String>,
    /// Caller-supplied natural key (path or name) hashed into the id when no id is given.
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub checksums: BTreeSet<String>,
    #[serde(default)]
    pub folders: BTreeSet<String>,
}

impl ResearchObject {
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn resolved_id(&self) -> String {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => identity::research_object_id(&self.key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    File,
    Folder,
    Scan,
    ResearchObject,
    Interpreter,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::File => "File",
            Label::Folder => "Folder",
            Label::Scan => "Scan",
            Label::ResearchObject => "ResearchObject",
            Label::Interpreter => "Interpreter",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "dataset" => Ok(Label::File),
            "folder" => Ok(Label::Folder),
            "scan" => Ok(Label::Scan),
            "researchobject" | "research_object" | "research-object" => {
                Ok(Label::ResearchObject)
            }
            "interpreter" => Ok(Label::Interpreter),
            other => Err(format!("unknown label '{}'", other)),
        }
    }
}
