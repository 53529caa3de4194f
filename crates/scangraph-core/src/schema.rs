//! Read-only aggregate description of the graph's shape.
//!
//! Both backends reduce their raw counts through [`SchemaTriples::from_counts`]
//! so the zero filtering, ordering and truncation rules are identical.

use serde::Serialize;
use std::collections::BTreeMap;

pub const REL_CONTAINS: &str = "CONTAINS";
pub const REL_SCANNED_IN: &str = "SCANNED_IN";
pub const REL_INTERPRETED_AS: &str = "INTERPRETED_AS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeTriple {
    pub start_label: String,
    pub rel_type: String,
    pub end_label: String,
    pub count: usize,
}

impl EdgeTriple {
    pub fn new(start_label: &str, rel_type: &str, end_label: &str, count: usize) -> Self {
        Self {
            start_label: start_label.to_string(),
            rel_type: rel_type.to_string(),
            end_label: end_label.to_string(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchemaTriples {
    pub nodes: Vec<NodeCount>,
    pub edges: Vec<EdgeTriple>,
    pub truncated: bool,
}

impl SchemaTriples {
    /// Drop zero counts, merge duplicate keys, sort by count descending and
    /// keep at most `limit` edge triples.
    pub fn from_counts<N, E>(nodes: N, edges: E, limit: usize) -> Self
    where
        N: IntoIterator<Item = (String, usize)>,
        E: IntoIterator<Item = EdgeTriple>,
    {
        let mut node_counts: BTreeMap<String, usize> = BTreeMap::new();
        for (label, count) in nodes {
            *node_counts.entry(label).or_default() += count;
        }
        let mut nodes: Vec<NodeCount> = node_counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(label, count)| NodeCount { label, count })
            .collect();
        nodes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

        let mut edge_counts: BTreeMap<(String, String, String), usize> = BTreeMap::new();
        for edge in edges {
            *edge_counts
                .entry((edge.start_label, edge.rel_type, edge.end_label))
                .or_default() += edge.count;
        }
        let mut edges: Vec<EdgeTriple> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|((start_label, rel_type, end_label), count)| EdgeTriple {
                start_label,
                rel_type,
                end_label,
                count,
            })
            .collect();
        // BTreeMap order makes ties deterministic after the stable sort.
        edges.sort_by(|a, b| b.count.cmp(&a.count));

        let truncated = edges.len() > limit;
        edges.truncate(limit);

        Self {
            nodes,
            edges,
            truncated,
        }
    }

    pub fn node_count(&self, label: &str) -> usize {
        self.nodes
            .iter()
            .find(|n| n.label == label)
            .map(|n| n.count)
            .unwrap_or(0)
    }

    pub fn relation_count(&self, rel_type: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.rel_type == rel_type)
            .map(|e| e.count)
            .sum()
    }
}

/// Coarse node and relation counts for UI rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchemaSummary {
    pub nodes: BTreeMap<String, usize>,
    pub relations: BTreeMap<String, usize>,
    pub interpreters: Vec<String>,
}

impl SchemaSummary {
    /// Build from an untruncated triple set. `Scan` and `ResearchObject`
    /// appear only when present; the three relation kinds always appear.
    pub fn from_triples(triples: &SchemaTriples, mut interpreters: Vec<String>) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("Dataset".to_string(), triples.node_count("File"));
        nodes.insert("Folder".to_string(), triples.node_count("Folder"));
        for label in ["Scan", "ResearchObject"] {
            let count = triples.node_count(label);
            if count > 0 {
                nodes.insert(label.to_string(), count);
            }
        }

        let mut relations = BTreeMap::new();
        for rel in [REL_INTERPRETED_AS, REL_CONTAINS, REL_SCANNED_IN] {
            relations.insert(rel.to_string(), triples.relation_count(rel));
        }

        interpreters.sort();
        interpreters.dedup();

        Self {
            nodes,
            relations,
            interpreters,
        }
    }
}
