//! Edge CRUD, grounded on `original_source/src/services/graph_edge_manager.py`.

use super::{EdgeKind, GraphEdge, GraphError, KnowledgeGraph, Result};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

impl KnowledgeGraph {
    /// Adds (or reinforces, if one already exists) a typed edge. Re-adding
    /// an existing `(source, kind, target)` edge bumps `frequency` and
    /// averages `confidence` rather than duplicating the edge.
    pub fn add_relationship(&mut self, source: &str, kind: EdgeKind, target: &str, confidence: f32) -> Result<()> {
        let source_idx = self.node_index(source).ok_or_else(|| GraphError::NodeNotFound(source.to_string()))?;
        let target_idx = self.node_index(target).ok_or_else(|| GraphError::NodeNotFound(target.to_string()))?;

        if let Some(existing) = self
            .graph
            .edges_connecting(source_idx, target_idx)
            .find(|e| e.weight().kind == kind)
            .map(|e| e.id())
        {
            let edge = self.graph.edge_weight_mut(existing).expect("edge id just found to exist");
            edge.frequency += 1;
            edge.confidence = (edge.confidence + confidence) / 2.0;
        } else {
            self.graph.add_edge(source_idx, target_idx, GraphEdge::new(kind, confidence));
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn remove_edge(&mut self, source: &str, target: &str) -> Result<()> {
        let source_idx = self.node_index(source).ok_or_else(|| GraphError::NodeNotFound(source.to_string()))?;
        let target_idx = self.node_index(target).ok_or_else(|| GraphError::NodeNotFound(target.to_string()))?;
        let edge_id = self
            .graph
            .find_edge(source_idx, target_idx)
            .ok_or_else(|| GraphError::EdgeNotFound(source.to_string(), target.to_string()))?;
        self.graph.remove_edge(edge_id);
        self.mark_dirty();
        Ok(())
    }

    /// Outgoing neighbor ids, optionally filtered by edge kind.
    pub fn get_neighbors(&self, id: &str, kind: Option<EdgeKind>) -> Vec<String> {
        let Some(idx) = self.node_index(id) else { return Vec::new() };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| kind.is_none_or(|k| e.weight().kind == k))
            .filter_map(|e| self.graph.node_weight(e.target()))
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn get_predecessors(&self, id: &str, kind: Option<EdgeKind>) -> Vec<String> {
        let Some(idx) = self.node_index(id) else { return Vec::new() };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| kind.is_none_or(|k| e.weight().kind == k))
            .filter_map(|e| self.graph.node_weight(e.source()))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Every edge as a `(source_id, target_id, edge)` triple. Used by
    /// whole-graph consumers (the Bayesian network builder's pruning and
    /// structural hashing) that need to walk the edge set directly rather
    /// than per-node.
    pub fn all_edges(&self) -> Vec<(String, String, GraphEdge)> {
        self.graph
            .edge_indices()
            .filter_map(|idx| {
                let (source_idx, target_idx) = self.graph.edge_endpoints(idx)?;
                let source = self.graph.node_weight(source_idx)?.id.clone();
                let target = self.graph.node_weight(target_idx)?.id.clone();
                let edge = self.graph.edge_weight(idx)?.clone();
                Some((source, target, edge))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityType;

    fn sample_graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.add_chunk_node("chunk-1");
        graph.add_entity_node("tesla", EntityType::Org);
        graph.add_relationship("chunk-1", EdgeKind::Mentions, "tesla", 0.9).unwrap();
        graph
    }

    #[test]
    fn add_relationship_requires_existing_nodes() {
        let mut graph = KnowledgeGraph::new();
        let err = graph.add_relationship("missing-a", EdgeKind::Mentions, "missing-b", 0.5);
        assert!(err.is_err());
    }

    #[test]
    fn re_adding_edge_reinforces_instead_of_duplicating() {
        let mut graph = sample_graph();
        graph.add_relationship("chunk-1", EdgeKind::Mentions, "tesla", 0.5).unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn get_neighbors_filters_by_kind() {
        let graph = sample_graph();
        assert_eq!(graph.get_neighbors("chunk-1", Some(EdgeKind::Mentions)), vec!["tesla".to_string()]);
        assert!(graph.get_neighbors("chunk-1", Some(EdgeKind::SimilarTo)).is_empty());
    }

    #[test]
    fn get_predecessors_follows_incoming_edges() {
        let graph = sample_graph();
        assert_eq!(graph.get_predecessors("tesla", Some(EdgeKind::Mentions)), vec!["chunk-1".to_string()]);
    }

    #[test]
    fn remove_edge_requires_existing_edge() {
        let mut graph = sample_graph();
        assert!(graph.remove_edge("tesla", "chunk-1").is_err());
        graph.remove_edge("chunk-1", "tesla").unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn all_edges_lists_every_triple() {
        let graph = sample_graph();
        let edges = graph.all_edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].0, "chunk-1");
        assert_eq!(edges[0].1, "tesla");
        assert_eq!(edges[0].2.kind, EdgeKind::Mentions);
    }
}
