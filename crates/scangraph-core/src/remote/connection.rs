use super::cypher::Statement;
use crate::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// A decoded result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    String(String),
    Integer(i64),
    Boolean(bool),
    Double(f64),
    Array(Vec<Cell>),
    Map(BTreeMap<String, Cell>),
    /// Graph entities (nodes, edges, paths) are never projected by our queries.
    Unsupported(i64),
}

impl Cell {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Integer(v) => Some(*v),
            Cell::Double(v) => Some(*v as i64),
            Cell::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> usize {
        self.as_i64().map(|v| v.max(0) as usize).unwrap_or(0)
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Cell::String(s) => Some(s.clone()),
            Cell::Integer(v) => Some(v.to_string()),
            Cell::Double(v) => Some(v.to_string()),
            Cell::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null | Cell::Unsupported(_) => Value::Null,
            Cell::String(s) => Value::String(s.clone()),
            Cell::Integer(v) => Value::from(*v),
            Cell::Boolean(b) => Value::Bool(*b),
            Cell::Double(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Array(items) => Value::Array(items.iter().map(Cell::to_json).collect()),
            Cell::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Integer(value as i64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns: Vec::new(),
            rows,
        }
    }

    /// Integer in the first row at `index`, zero when absent.
    pub fn first_usize(&self, index: usize) -> usize {
        self.rows
            .first()
            .and_then(|row| row.get(index))
            .map(Cell::as_usize)
            .unwrap_or(0)
    }

    /// Project each row onto `keys` by position.
    pub fn to_objects(&self, keys: &[&str]) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::new();
                for (i, key) in keys.iter().enumerate() {
                    let value = row.get(i).map(Cell::to_json).unwrap_or(Value::Null);
                    object.insert((*key).to_string(), value);
                }
                Value::Object(object)
            })
            .collect()
    }
}

/// One session with the graph database.
pub trait GraphConnection: Send {
    fn run(&mut self, statement: &Statement) -> Result<QueryResult>;

    /// Declare a uniqueness constraint over `properties` of `label`.
    fn create_unique_constraint(&mut self, label: &str, properties: &[&str]) -> Result<()>;

    fn set_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn ping(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens a fresh connection; called lazily and again after a connection fault.
pub type Connector = Box<dyn Fn() -> Result<Box<dyn GraphConnection>> + Send + Sync>;
