//! C7 KnowledgeGraph facade (spec §3-4): a directed multi-relation graph of
//! chunk and entity nodes, backed by `petgraph::stable_graph::StableDiGraph`
//! so removals never invalidate the `chunk_id`/`entity_id -> NodeIndex` map
//! the way a plain `Graph` would — the same pattern `VectorIndex` uses for
//! `usearch`'s integer keys.
//!
//! Decomposed the way `original_source`'s `graph_node_manager.py` /
//! `graph_edge_manager.py` / `graph_persistence.py` / `graph_query_engine.py`
//! split `GraphService`: `nodes`, `edges`, `persistence` each hold one
//! `impl KnowledgeGraph` block; `query` (C8) holds the read-only algorithms.

mod edges;
mod nodes;
mod persistence;
pub mod query;

pub use persistence::GraphSnapshot;
pub use query::GraphQueryEngine;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("edge not found: {0} -> {1}")]
    EdgeNotFound(String, String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Chunk,
    Entity,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    References,
    Mentions,
    SimilarTo,
    RelatedTo,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::References => "references",
            EdgeKind::Mentions => "mentions",
            EdgeKind::SimilarTo => "similar_to",
            EdgeKind::RelatedTo => "related_to",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub entity_type: Option<crate::entities::EntityType>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl GraphNode {
    pub fn chunk(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: NodeKind::Chunk, entity_type: None, metadata: HashMap::new() }
    }

    pub fn entity(id: impl Into<String>, entity_type: crate::entities::EntityType) -> Self {
        Self { id: id.into(), kind: NodeKind::Entity, entity_type: Some(entity_type), metadata: HashMap::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub confidence: f32,
    pub frequency: u32,
    pub importance: f32,
    pub decay_score: f32,
}

impl GraphEdge {
    pub fn new(kind: EdgeKind, confidence: f32) -> Self {
        Self { kind, confidence, frequency: 1, importance: confidence, decay_score: 1.0 }
    }
}

/// Directed multi-relation graph over chunk and entity nodes.
///
/// Spec §5 calls for a single lock over the whole facade, not
/// per-sub-manager locking; callers wrap one `KnowledgeGraph` in one
/// `parking_lot::RwLock` (see `NexusEngine`) rather than locking `nodes`,
/// `edges`, `query`, and `persistence` separately.
pub struct KnowledgeGraph {
    pub(crate) graph: StableDiGraph<GraphNode, GraphEdge>,
    pub(crate) index: HashMap<String, NodeIndex>,
    dirty: bool,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self { graph: StableDiGraph::new(), index: HashMap::new(), dirty: false }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }
}
