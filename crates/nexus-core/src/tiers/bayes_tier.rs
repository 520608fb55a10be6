//! C14 — scales candidate scores by the posterior probability of a query
//! entity being "true" under the cached Bayesian network (§4.10). Returns
//! `[]` whenever the network has no variable for the query, or the engine
//! times out, so a missing or stale network degrades to vector+graph.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bayes::{BayesianNetwork, ProbabilisticEngine, STATES};
use crate::entities::{normalize_entity_text, EntityExtractor};
use crate::graph::{EdgeKind, KnowledgeGraph};

use super::{ChunkSource, Tier, TierCandidate};

pub struct BayesianTier<'a, X: EntityExtractor> {
    extractor: &'a X,
    graph: &'a KnowledgeGraph,
    engine: &'a ProbabilisticEngine,
}

impl<'a, X: EntityExtractor> BayesianTier<'a, X> {
    pub fn new(extractor: &'a X, graph: &'a KnowledgeGraph, engine: &'a ProbabilisticEngine) -> Self {
        Self { extractor, graph, engine }
    }

    /// Takes the first entity mentioned in `query` that is also a variable
    /// in `network`, queries its posterior `P(true | evidence)`, and
    /// returns every chunk that mentions it with its score set to that
    /// posterior.
    pub fn search(
        &self,
        query: &str,
        chunks: &impl ChunkSource,
        network: &Arc<BayesianNetwork>,
        evidence: &HashMap<String, String>,
    ) -> Vec<TierCandidate> {
        let Some(variable) = self
            .extractor
            .extract(query)
            .into_iter()
            .map(|span| normalize_entity_text(&span.text))
            .find(|id| network.contains_variable(id))
        else {
            return Vec::new();
        };

        let Some(result) = self.engine.query_conditional(network, std::slice::from_ref(&variable), evidence) else {
            return Vec::new();
        };

        let Some((distribution, _entropy)) = result.results.get(&variable) else { return Vec::new() };
        let posterior = distribution.get(STATES[0]).copied().unwrap_or(0.0);

        self.graph
            .get_predecessors(&variable, Some(EdgeKind::Mentions))
            .into_iter()
            .filter_map(|chunk_id| {
                let chunk = chunks.get_chunk(&chunk_id)?;
                let mut metadata = HashMap::new();
                metadata.insert("bayesian_variable".to_string(), variable.clone());
                Some(TierCandidate { chunk_id, text: chunk.text, score: posterior, metadata, tier: Tier::Bayesian })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bayes::{BayesianNetworkBuilder, BuilderConfig};
    use crate::entities::{EntityType, RegexEntityExtractor};
    use crate::memory::{Chunk, ChunkMetadata};

    fn sample() -> (KnowledgeGraph, HashMap<String, Chunk>, Arc<BayesianNetwork>) {
        let mut graph = KnowledgeGraph::new();
        graph.add_chunk_node("c1");
        graph.add_entity_node("tesla", EntityType::Org);
        graph.add_entity_node("musk", EntityType::Person);
        graph.add_relationship("c1", EdgeKind::Mentions, "tesla", 0.9).unwrap();
        graph.add_relationship("musk", EdgeKind::RelatedTo, "tesla", 0.9).unwrap();
        let chunks = HashMap::from([("c1".to_string(), Chunk::new("c1", "Tesla earnings beat estimates", ChunkMetadata::default()))]);
        let builder = BayesianNetworkBuilder::new(BuilderConfig::default());
        let network = builder.build(&graph).unwrap();
        (graph, chunks, network)
    }

    #[test]
    fn query_without_known_variable_returns_empty() {
        let (graph, chunks, network) = sample();
        let extractor = RegexEntityExtractor;
        let engine = ProbabilisticEngine::default();
        let tier = BayesianTier::new(&extractor, &graph, &engine);
        let results = tier.search("lowercase only, no entities here", &chunks, &network, &HashMap::new());
        assert!(results.is_empty());
    }

    #[test]
    fn matched_variable_scales_mentioning_chunk_by_posterior() {
        let (graph, chunks, network) = sample();
        let extractor = RegexEntityExtractor;
        let engine = ProbabilisticEngine::default();
        let tier = BayesianTier::new(&extractor, &graph, &engine);
        let results = tier.search("I love Tesla quarterly earnings", &chunks, &network, &HashMap::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "c1");
        assert_eq!(results[0].tier, Tier::Bayesian);
        assert!(results[0].score >= 0.0 && results[0].score <= 1.0);
    }

    #[test]
    fn evidence_shifts_posterior_score() {
        let (graph, chunks, network) = sample();
        let extractor = RegexEntityExtractor;
        let engine = ProbabilisticEngine::default();
        let tier = BayesianTier::new(&extractor, &graph, &engine);
        let baseline = tier.search("I love Tesla quarterly earnings", &chunks, &network, &HashMap::new());
        let evidence = HashMap::from([("musk".to_string(), "true".to_string())]);
        let conditioned = tier.search("I love Tesla quarterly earnings", &chunks, &network, &evidence);
        assert_eq!(baseline.len(), conditioned.len());
    }
}
