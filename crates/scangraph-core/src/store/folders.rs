//! Folder containment derived from Dataset paths and explicit folder rows.
//!
//! Folders are never a second source of truth: the view is rebuilt from the
//! stored Datasets plus the folder registry each time it is needed.

use crate::identity;
use crate::model::FolderRow;
use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// An explicitly reported folder. The parent is last-write-wins across scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    pub name: String,
    pub parent: String,
}

impl From<&FolderRow> for FolderRecord {
    fn from(row: &FolderRow) -> Self {
        let name = if row.name.is_empty() {
            identity::file_name(&row.path)
        } else {
            row.name.clone()
        };
        Self {
            name,
            parent: row.parent.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub path: String,
    pub name: String,
    pub parent: String,
    pub file_count: usize,
}

#[derive(Debug, Default)]
pub struct FolderView {
    folders: BTreeMap<String, FolderNode>,
}

impl FolderView {
    /// Aggregate the immediate parent of every Dataset path and union it with
    /// the explicitly registered folders.
    pub fn build<'a, I>(dataset_paths: I, registry: &HashMap<String, FolderRecord>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: AHashMap<String, usize> = AHashMap::new();
        for path in dataset_paths {
            let parent = identity::parent_dir(path);
            if parent.is_empty() {
                continue;
            }
            *counts.entry(parent).or_default() += 1;
        }

        let mut folders = BTreeMap::new();
        for (path, file_count) in &counts {
            folders.insert(
                path.clone(),
                FolderNode {
                    path: path.clone(),
                    name: identity::file_name(path),
                    parent: identity::parent_dir(path),
                    file_count: *file_count,
                },
            );
        }
        for (path, record) in registry {
            let node = folders.entry(path.clone()).or_insert_with(|| FolderNode {
                path: path.clone(),
                name: record.name.clone(),
                parent: record.parent.clone(),
                file_count: 0,
            });
            node.name = record.name.clone();
            node.parent = record.parent.clone();
        }

        Self { folders }
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.folders.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&FolderNode> {
        self.folders.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FolderNode> {
        self.folders.values()
    }

    /// Folder→File containment count.
    pub fn file_edge_count(&self) -> usize {
        self.folders.values().map(|f| f.file_count).sum()
    }

    /// Folder→Folder edges, only between two folders present in the view.
    pub fn folder_edges(&self) -> Vec<(String, String)> {
        self.folders
            .values()
            .filter(|f| !f.parent.is_empty() && f.parent != f.path && self.contains(&f.parent))
            .map(|f| (f.parent.clone(), f.path.clone()))
            .collect()
    }
}

/// Parent→child edges among a batch of folder rows. A later row for the same
/// path replaces an earlier one; parents outside the batch produce no edge.
pub fn hierarchy_edges(rows: &[FolderRow]) -> Vec<(String, String)> {
    let mut parents: BTreeMap<&str, &str> = BTreeMap::new();
    for row in rows {
        parents.insert(row.path.as_str(), row.parent.as_str());
    }
    let observed: BTreeSet<&str> = parents.keys().copied().collect();
    parents
        .iter()
        .filter(|(path, parent)| !parent.is_empty() && *parent != *path && observed.contains(*parent))
        .map(|(path, parent)| (parent.to_string(), path.to_string()))
        .collect()
}
