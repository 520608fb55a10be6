//! C13 — extracts entities from the query (C3), matches them against the
//! knowledge graph, and ranks chunks by Personalized PageRank (C8),
//! grounded on `original_source/src/services/hipporag_service.py`.

use std::collections::HashMap;

use crate::entities::{normalize_entity_text, EntityExtractor};
use crate::graph::query::{DEFAULT_ALPHA, DEFAULT_MAX_HOPS, DEFAULT_MAX_ITER, DEFAULT_TOLERANCE};
use crate::graph::{GraphQueryEngine, KnowledgeGraph};

use super::{ChunkSource, Tier, TierCandidate};

pub const DEFAULT_TOP_K: usize = 50;

pub struct GraphSearchTier<'a, X: EntityExtractor> {
    extractor: &'a X,
    graph: &'a KnowledgeGraph,
}

impl<'a, X: EntityExtractor> GraphSearchTier<'a, X> {
    pub fn new(extractor: &'a X, graph: &'a KnowledgeGraph) -> Self {
        Self { extractor, graph }
    }

    /// `multi_hop`: expand the matched entity set via BFS to
    /// `DEFAULT_MAX_HOPS` before running PPR over the expanded set,
    /// rather than seeding PPR directly from the matched entities.
    pub fn search(&self, query: &str, chunks: &impl ChunkSource, top_k: usize, multi_hop: bool) -> Vec<TierCandidate> {
        let matched: Vec<String> = self
            .extractor
            .extract(query)
            .into_iter()
            .map(|span| normalize_entity_text(&span.text))
            .filter(|id| self.graph.contains_node(id))
            .collect();

        if matched.is_empty() {
            return Vec::new();
        }

        let engine = GraphQueryEngine::new(self.graph);
        let seeds = if multi_hop {
            engine.multi_hop_search(&matched, DEFAULT_MAX_HOPS, None).entities
        } else {
            matched
        };

        let scores = engine.personalized_pagerank(&seeds, DEFAULT_ALPHA, DEFAULT_MAX_ITER, DEFAULT_TOLERANCE);
        if scores.is_empty() {
            return Vec::new();
        }

        engine
            .rank_chunks_by_ppr(&scores, top_k)
            .into_iter()
            .filter_map(|(chunk_id, score)| {
                let chunk = chunks.get_chunk(&chunk_id)?;
                Some(TierCandidate { chunk_id, text: chunk.text, score, metadata: HashMap::new(), tier: Tier::Graph })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntityType, RegexEntityExtractor};
    use crate::graph::EdgeKind;
    use crate::memory::{Chunk, ChunkMetadata};

    fn sample() -> (KnowledgeGraph, HashMap<String, Chunk>) {
        let mut graph = KnowledgeGraph::new();
        graph.add_chunk_node("c1");
        graph.add_entity_node("tesla", EntityType::Org);
        graph.add_relationship("c1", EdgeKind::Mentions, "tesla", 0.9).unwrap();
        let chunks = HashMap::from([("c1".to_string(), Chunk::new("c1", "Tesla makes electric cars", ChunkMetadata::default()))]);
        (graph, chunks)
    }

    #[test]
    fn unmatched_query_returns_empty() {
        let (graph, chunks) = sample();
        let extractor = RegexEntityExtractor;
        let tier = GraphSearchTier::new(&extractor, &graph);
        let results = tier.search("lowercase only, no entities here", &chunks, DEFAULT_TOP_K, false);
        assert!(results.is_empty());
    }

    #[test]
    fn matched_entity_surfaces_mentioning_chunk() {
        let (graph, chunks) = sample();
        let extractor = RegexEntityExtractor;
        let tier = GraphSearchTier::new(&extractor, &graph);
        let results = tier.search("I love Tesla quarterly earnings", &chunks, DEFAULT_TOP_K, false);
        assert!(results.iter().any(|c| c.chunk_id == "c1" && c.tier == Tier::Graph));
    }

    #[test]
    fn multi_hop_variant_still_finds_direct_match() {
        let (graph, chunks) = sample();
        let extractor = RegexEntityExtractor;
        let tier = GraphSearchTier::new(&extractor, &graph);
        let results = tier.search("I love Tesla quarterly earnings", &chunks, DEFAULT_TOP_K, true);
        assert!(results.iter().any(|c| c.chunk_id == "c1"));
    }
}
