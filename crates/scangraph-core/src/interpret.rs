//! Interpreters derive structured payloads from a file's content.

use crate::error::Result;
use crate::identity;
use crate::model::FileRow;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

pub trait Interpreter: Send + Sync {
    fn id(&self) -> &str;

    fn version(&self) -> &str;

    fn accepts(&self, row: &FileRow) -> bool;

    fn interpret(&self, path: &Path) -> Result<Value>;
}

/// Line, word and byte counts for text files.
pub struct TextStatsInterpreter {
    /// Files above this size are not read.
    max_bytes: u64,
}

impl TextStatsInterpreter {
    pub const ID: &'static str = "text-stats";

    pub fn new() -> Self {
        Self {
            max_bytes: 16 * 1024 * 1024,
        }
    }

    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl Default for TextStatsInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter for TextStatsInterpreter {
    fn id(&self) -> &str {
        Self::ID
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn accepts(&self, row: &FileRow) -> bool {
        identity::is_text_mime(&row.mime_type) && row.size <= self.max_bytes
    }

    fn interpret(&self, path: &Path) -> Result<Value> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(json!({
            "lines": text.lines().count(),
            "words": text.split_whitespace().count(),
            "bytes": bytes.len(),
        }))
    }
}

/// Interpreters enabled by default.
pub fn builtin_interpreters() -> Vec<Box<dyn Interpreter>> {
    vec![Box::new(TextStatsInterpreter::new())]
}
