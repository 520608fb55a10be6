//! Node CRUD, grounded on `original_source/src/services/graph_node_manager.py`.

use super::{GraphError, GraphNode, KnowledgeGraph, NodeKind, Result};
use crate::entities::EntityType;

impl KnowledgeGraph {
    pub fn add_chunk_node(&mut self, chunk_id: &str) -> bool {
        if self.index.contains_key(chunk_id) {
            return false;
        }
        let idx = self.graph.add_node(GraphNode::chunk(chunk_id));
        self.index.insert(chunk_id.to_string(), idx);
        self.mark_dirty();
        true
    }

    pub fn add_entity_node(&mut self, entity_id: &str, entity_type: EntityType) -> bool {
        if self.index.contains_key(entity_id) {
            return false;
        }
        let idx = self.graph.add_node(GraphNode::entity(entity_id, entity_type));
        self.index.insert(entity_id.to_string(), idx);
        self.mark_dirty();
        true
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index(id).and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        let idx = self.node_index(id).ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        self.graph.remove_node(idx);
        self.index.remove(id);
        self.mark_dirty();
        Ok(())
    }

    pub fn node_ids_by_kind(&self, kind: NodeKind) -> Vec<String> {
        self.graph.node_weights().filter(|n| n.kind == kind).map(|n| n.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_chunk_is_idempotent() {
        let mut graph = KnowledgeGraph::new();
        assert!(graph.add_chunk_node("chunk-1"));
        assert!(!graph.add_chunk_node("chunk-1"));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn remove_missing_node_errors() {
        let mut graph = KnowledgeGraph::new();
        assert!(graph.remove_node("missing").is_err());
    }

    #[test]
    fn node_ids_by_kind_filters() {
        let mut graph = KnowledgeGraph::new();
        graph.add_chunk_node("chunk-1");
        graph.add_entity_node("tesla", EntityType::Org);
        assert_eq!(graph.node_ids_by_kind(NodeKind::Entity), vec!["tesla".to_string()]);
    }
}
