//! Parameterized Cypher statements for the remote graph database.
//!
//! File nodes are keyed by content checksum, so one node stands for every
//! path holding the same bytes. Folder nodes are keyed by path and host.
//!
//! Parameters travel in the `CYPHER name=<literal> ...` query header. Every
//! value is rendered as an escaped literal, so caller data never becomes part
//! of the statement text itself.

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: &'static str,
    pub params: BTreeMap<String, Value>,
}

impl Statement {
    pub fn new(text: &'static str) -> Self {
        Self {
            text,
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Full query text with the parameter header prepended.
    pub fn render(&self) -> String {
        if self.params.is_empty() {
            return self.text.to_string();
        }
        let header: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| format!("{}={}", name, literal(value)))
            .collect();
        format!("CYPHER {} {}", header.join(" "), self.text)
    }
}

pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => format!("{:?}", f),
                    _ => "0.0".to_string(),
                }
            }
        }
        Value::String(s) => string_literal(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", map_key(k), literal(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

pub fn string_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('\'');
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

fn map_key(key: &str) -> String {
    let mut chars = key.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        key.to_string()
    } else {
        format!("`{}`", key.replace('`', "``"))
    }
}

pub const WRITE_SCAN: &str = "\
MERGE (s:Scan {id: $scan_id}) \
SET s.source_path = $source_path, s.provider = $provider, s.host_id = $host_id, \
s.host_name = $host_name, s.started_at = $started_at, s.finished_at = $finished_at \
FOREACH (fr IN $folders | \
MERGE (d:Folder {path: fr.path, host: $host}) \
SET d.name = fr.name, d.parent = fr.parent \
MERGE (d)-[:SCANNED_IN]->(s)) \
FOREACH (edge IN $folder_edges | \
MERGE (p:Folder {path: edge.parent, host: $host}) \
MERGE (c:Folder {path: edge.child, host: $host}) \
MERGE (p)-[:CONTAINS]->(c)) \
FOREACH (r IN $files | \
MERGE (f:File {checksum: r.checksum}) \
SET f.id = r.id, f.path = r.path, f.host = $host, f.filename = r.filename, f.extension = r.extension, \
f.size = r.size, f.created = r.created, f.modified = r.modified, f.mime_type = r.mime_type, \
f.state = 'active' \
MERGE (f)-[:SCANNED_IN]->(s)) \
FOREACH (link IN $interpretations | \
MERGE (f:File {checksum: link.checksum}) \
MERGE (i:Interpreter {id: link.interpreter}) \
MERGE (f)-[:INTERPRETED_AS]->(i)) \
FOREACH (link IN $folder_files | \
MERGE (d:Folder {path: link.folder, host: $host}) \
MERGE (f:File {checksum: link.checksum}) \
MERGE (d)-[:CONTAINS]->(f)) \
RETURN s.id AS scan_id, size($files) AS files, size($folders) AS folders";

pub const VERIFY_SCAN: &str = "\
OPTIONAL MATCH (s:Scan {id: $scan_id}) \
OPTIONAL MATCH (f:File)-[:SCANNED_IN]->(s) \
WITH s, count(DISTINCT f.checksum) AS files \
OPTIONAL MATCH (d:Folder)-[:SCANNED_IN]->(s) \
RETURN count(DISTINCT s) AS scans, files, count(DISTINCT d) AS folders";

pub const DELETE_SCAN: &str = "\
MATCH (s:Scan {id: $scan_id}) \
DETACH DELETE s \
RETURN count(*) AS deleted";

pub const UPSERT_DATASET: &str = "\
MERGE (f:File {checksum: $checksum}) \
SET f.id = $id, f.path = $path, f.host = $host, f.filename = $filename, f.extension = $extension, \
f.size = $size, f.created = $created, f.modified = $modified, f.mime_type = $mime_type, \
f.state = $state \
RETURN f.id AS id";

pub const ADD_INTERPRETATION: &str = "\
MATCH (f:File {checksum: $checksum}) \
MERGE (i:Interpreter {id: $interpreter}) \
MERGE (f)-[r:INTERPRETED_AS]->(i) \
SET r.status = $status, r.version = $version, r.payload = $payload, r.timestamp = $timestamp \
RETURN count(f) AS matched";

pub const UPSERT_RESEARCH_OBJECT: &str = "\
MERGE (r:ResearchObject {id: $id}) \
SET r.key = $key, r.name = $name \
RETURN r.id AS id";

pub const LINK_RESEARCH_FILES: &str = "\
MATCH (r:ResearchObject {id: $id}) \
MATCH (f:File) WHERE f.checksum IN $checksums \
MERGE (r)-[:CONTAINS]->(f) \
RETURN count(f) AS linked";

pub const LINK_RESEARCH_FOLDERS: &str = "\
MATCH (r:ResearchObject {id: $id}) \
MATCH (d:Folder) WHERE d.path IN $folders AND d.host = $host \
MERGE (r)-[:CONTAINS]->(d) \
RETURN count(d) AS linked";

pub const LIST_FILES: &str = "\
MATCH (f:File) \
OPTIONAL MATCH (f)-[:INTERPRETED_AS]->(i:Interpreter) \
RETURN f.id, f.checksum, f.path, f.filename, f.extension, f.size, f.created, f.modified, \
f.mime_type, f.state, collect(i.id) \
ORDER BY f.path";

pub const LIST_FOLDERS: &str = "\
MATCH (d:Folder) \
OPTIONAL MATCH (d)-[:CONTAINS]->(f:File) \
RETURN d.path, d.name, d.parent, count(DISTINCT f.checksum) \
ORDER BY d.path";

pub const LIST_SCANS: &str = "\
MATCH (s:Scan) \
OPTIONAL MATCH (f:File)-[:SCANNED_IN]->(s) \
WITH s, count(DISTINCT f.checksum) AS files \
OPTIONAL MATCH (d:Folder)-[:SCANNED_IN]->(s) \
RETURN s.id, s.source_path, s.provider, s.host_id, s.host_name, s.started_at, s.finished_at, \
files, count(DISTINCT d) \
ORDER BY s.id";

pub const LIST_RESEARCH_OBJECTS: &str = "\
MATCH (r:ResearchObject) \
OPTIONAL MATCH (r)-[:CONTAINS]->(f:File) \
WITH r, count(DISTINCT f.checksum) AS files \
OPTIONAL MATCH (r)-[:CONTAINS]->(d:Folder) \
RETURN r.id, r.key, r.name, files, count(DISTINCT d) \
ORDER BY r.id";

pub const LIST_INTERPRETERS: &str = "\
MATCH (i:Interpreter) \
OPTIONAL MATCH (f:File)-[:INTERPRETED_AS]->(i) \
RETURN i.id, count(f) \
ORDER BY i.id";

pub const NODE_COUNTS: &str = "\
MATCH (n) \
RETURN labels(n)[0] AS label, count(n) AS count";

pub const EDGE_COUNTS: &str = "\
MATCH (a)-[r]->(b) \
RETURN labels(a)[0] AS start_label, type(r) AS rel_type, labels(b)[0] AS end_label, count(r) AS count";

pub const INTERPRETERS_IN_USE: &str = "\
MATCH (:File)-[:INTERPRETED_AS]->(i:Interpreter) \
RETURN DISTINCT i.id \
ORDER BY i.id";

pub const INDEX_SCAN_ID: &str = "CREATE INDEX FOR (s:Scan) ON (s.id)";
pub const INDEX_FILE_CHECKSUM: &str = "CREATE INDEX FOR (f:File) ON (f.checksum)";
pub const INDEX_FOLDER_KEY: &str = "CREATE INDEX FOR (d:Folder) ON (d.path, d.host)";
