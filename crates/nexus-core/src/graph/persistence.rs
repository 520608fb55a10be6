//! Graph persistence, grounded on
//! `original_source/src/services/graph_persistence.py`: a node-link JSON
//! dump, skipped on `save` when the dirty flag is clear.

use super::{GraphEdge, GraphNode, KnowledgeGraph, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `networkx.node_link_data` equivalent: nodes and edges as flat arrays,
/// edges referencing nodes by id rather than array index so the format is
/// stable across insert/remove cycles.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub edge: GraphEdge,
}

impl KnowledgeGraph {
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self.graph.node_weights().cloned().collect();
        let edges = self
            .graph
            .edge_indices()
            .filter_map(|idx| {
                let (source_idx, target_idx) = self.graph.edge_endpoints(idx)?;
                let source = self.graph.node_weight(source_idx)?.id.clone();
                let target = self.graph.node_weight(target_idx)?.id.clone();
                let edge = self.graph.edge_weight(idx)?.clone();
                Some(SnapshotEdge { source, target, edge })
            })
            .collect();
        GraphSnapshot { nodes, edges }
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = Self::new();
        for node in snapshot.nodes {
            match node.kind {
                super::NodeKind::Chunk => {
                    graph.add_chunk_node(&node.id);
                }
                super::NodeKind::Entity => {
                    graph.add_entity_node(&node.id, node.entity_type.unwrap_or(crate::entities::EntityType::Concept));
                }
            }
        }
        for snapshot_edge in snapshot.edges {
            let _ = graph.add_relationship(
                &snapshot_edge.source,
                snapshot_edge.edge.kind,
                &snapshot_edge.target,
                snapshot_edge.edge.confidence,
            );
        }
        graph.dirty = false;
        graph
    }

    /// Writes `graph.json` (or `path`) unless the graph is clean and
    /// `force` is false.
    pub fn save(&mut self, path: &Path, force: bool) -> Result<bool> {
        if !force && !self.dirty {
            return Ok(false);
        }
        let snapshot = self.to_snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        self.dirty = false;
        Ok(true)
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let snapshot: GraphSnapshot = serde_json::from_str(&contents)?;
        Ok(Some(Self::from_snapshot(snapshot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityType;
    use crate::graph::EdgeKind;

    #[test]
    fn save_is_skipped_when_clean() {
        let mut graph = KnowledgeGraph::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        graph.save(&path, false).unwrap();
        assert!(!path.exists(), "empty, never-dirtied graph should not write a file");
    }

    #[test]
    fn round_trips_through_snapshot() {
        let mut graph = KnowledgeGraph::new();
        graph.add_chunk_node("chunk-1");
        graph.add_entity_node("tesla", EntityType::Org);
        graph.add_relationship("chunk-1", EdgeKind::Mentions, "tesla", 0.8).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        assert!(graph.save(&path, true).unwrap());
        assert!(!graph.is_dirty());

        let loaded = KnowledgeGraph::load(&path).unwrap().unwrap();
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.edge_count(), 1);
        assert_eq!(loaded.get_neighbors("chunk-1", Some(EdgeKind::Mentions)), vec!["tesla".to_string()]);
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(KnowledgeGraph::load(&path).unwrap().is_none());
    }
}
