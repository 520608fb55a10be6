//! C10 — prunes and confidence-filters the knowledge graph into a DAG,
//! estimates CPDs, and caches the result by structural hash with a TTL.
//! Grounded on `original_source/src/bayesian/network_builder.py`'s
//! `NetworkBuilder`, with its `estimate_cpds` replaced: the original
//! samples 100 rows of `random.choice(states)` dummy data and runs
//! maximum-likelihood estimation over them, which is equivalent to a
//! uniform-random CPD regardless of graph structure. This estimates each
//! CPD row directly from a graph-informed weight (the variable's mean
//! inbound edge confidence in the *source* knowledge graph, blended with
//! the fraction of a row's parent states that are `"true"`), per the
//! resolved Open Question forbidding uniform-random estimation.

use std::collections::{hash_map::DefaultHasher, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::graph::KnowledgeGraph;

use super::network::{all_assignments, BayesianNetwork, Cpd};
use super::{BayesError, Result};

pub const DEFAULT_MAX_NODES: usize = 1000;
pub const DEFAULT_MIN_EDGE_CONFIDENCE: f32 = 0.3;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub max_nodes: usize,
    pub min_edge_confidence: f32,
    pub cache_ttl: Duration,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self { max_nodes: DEFAULT_MAX_NODES, min_edge_confidence: DEFAULT_MIN_EDGE_CONFIDENCE, cache_ttl: DEFAULT_CACHE_TTL }
    }
}

struct CacheEntry {
    network: Arc<BayesianNetwork>,
    built_at: Instant,
}

/// Builds (and caches) Bayesian networks from a `KnowledgeGraph` snapshot.
/// Cache entries are immutable once inserted, so a plain `Mutex` around
/// insert/lookup suffices (spec §5).
pub struct BayesianNetworkBuilder {
    config: BuilderConfig,
    cache: Mutex<HashMap<u64, CacheEntry>>,
}

impl BayesianNetworkBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config, cache: Mutex::new(HashMap::new()) }
    }

    /// Returns the cached network for `graph`'s current structure if one
    /// exists and has not exceeded the TTL; otherwise builds, caches, and
    /// returns a fresh one. Errors (cyclic or empty result) are not
    /// cached, matching the original's behavior of only caching on
    /// success.
    pub fn build(&self, graph: &KnowledgeGraph) -> Result<Arc<BayesianNetwork>> {
        let key = Self::structural_hash(graph);

        if let Some(entry) = self.cache.lock().get(&key) {
            if entry.built_at.elapsed() < self.config.cache_ttl {
                return Ok(entry.network.clone());
            }
        }

        let network = Arc::new(self.build_uncached(graph)?);
        self.cache.lock().insert(key, CacheEntry { network: network.clone(), built_at: Instant::now() });
        Ok(network)
    }

    /// MD5-over-sorted-lists in the original; SipHash over the same
    /// sorted node-id and edge-triple lists here (spec §5 — only the
    /// TTL/dirty-on-miss behavior is load-bearing, not the algorithm).
    fn structural_hash(graph: &KnowledgeGraph) -> u64 {
        let mut nodes: Vec<String> = graph
            .node_ids_by_kind(crate::graph::NodeKind::Chunk)
            .into_iter()
            .chain(graph.node_ids_by_kind(crate::graph::NodeKind::Entity))
            .collect();
        nodes.sort();

        let mut edges: Vec<String> = graph
            .all_edges()
            .into_iter()
            .map(|(source, target, edge)| format!("{source}->{}->{target}", edge.kind.as_str()))
            .collect();
        edges.sort();

        let mut hasher = DefaultHasher::new();
        nodes.hash(&mut hasher);
        edges.hash(&mut hasher);
        hasher.finish()
    }

    fn build_uncached(&self, graph: &KnowledgeGraph) -> Result<BayesianNetwork> {
        let kept = self.select_nodes(graph);
        let edges = self.filtered_edges(graph, &kept);
        if edges.is_empty() {
            return Err(BayesError::EmptyNetwork);
        }

        let mut network = BayesianNetwork::new();
        for node in &kept {
            network.add_variable(node);
        }
        for (source, target) in &edges {
            network.add_edge(source, target)?;
        }

        self.estimate_cpds(&mut network, graph);
        Ok(network)
    }

    /// Ranks nodes by `degree * frequency` (node frequency approximated as
    /// the sum of incident edge frequencies, matching the original's
    /// `graph.nodes[node].get("frequency", 1)` fallback) and keeps the
    /// top `max_nodes`.
    fn select_nodes(&self, graph: &KnowledgeGraph) -> Vec<String> {
        let all: Vec<String> = graph
            .node_ids_by_kind(crate::graph::NodeKind::Chunk)
            .into_iter()
            .chain(graph.node_ids_by_kind(crate::graph::NodeKind::Entity))
            .collect();

        if all.len() <= self.config.max_nodes {
            return all;
        }

        let mut scored: Vec<(String, u64)> = all
            .into_iter()
            .map(|id| {
                let degree = (graph.get_neighbors(&id, None).len() + graph.get_predecessors(&id, None).len()) as u64;
                let frequency = self.node_frequency(graph, &id);
                (id, degree * frequency)
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(self.config.max_nodes);
        scored.into_iter().map(|(id, _)| id).collect()
    }

    fn node_frequency(&self, graph: &KnowledgeGraph, id: &str) -> u64 {
        let incident_frequency: u64 = graph
            .all_edges()
            .into_iter()
            .filter(|(source, target, _)| source == id || target == id)
            .map(|(_, _, edge)| edge.frequency as u64)
            .sum();
        incident_frequency.max(1)
    }

    fn filtered_edges(&self, graph: &KnowledgeGraph, kept: &[String]) -> Vec<(String, String)> {
        let kept_set: HashSet<&str> = kept.iter().map(String::as_str).collect();
        graph
            .all_edges()
            .into_iter()
            .filter(|(source, target, edge)| {
                kept_set.contains(source.as_str()) && kept_set.contains(target.as_str()) && edge.confidence >= self.config.min_edge_confidence
            })
            .map(|(source, target, _)| (source, target))
            .collect()
    }

    /// Graph-informed weight for a variable: the mean confidence of its
    /// inbound edges in the source knowledge graph, or a neutral 0.5 prior
    /// when it has none.
    fn graph_informed_weight(graph: &KnowledgeGraph, variable: &str) -> f64 {
        let inbound: Vec<f32> = graph
            .all_edges()
            .into_iter()
            .filter(|(_, target, _)| target == variable)
            .map(|(_, _, edge)| edge.confidence)
            .collect();

        if inbound.is_empty() {
            0.5
        } else {
            (inbound.iter().sum::<f32>() / inbound.len() as f32) as f64
        }
    }

    /// Estimates one CPD per variable. Root variables get a two-state
    /// distribution directly from their graph-informed weight; variables
    /// with parents get one row per parent-state combination, blending
    /// the variable's own graph-informed weight with the fraction of
    /// parents assigned `"true"` in that row — more true parents pushes
    /// `P(true)` up, matching the intuition that a referenced entity is
    /// more likely itself referenced when its graph neighbors are.
    fn estimate_cpds(&self, network: &mut BayesianNetwork, graph: &KnowledgeGraph) {
        let variables = network.variables();
        for variable in &variables {
            let weight = Self::graph_informed_weight(graph, variable);
            let parents = network.parents_of(variable);

            if parents.is_empty() {
                network.set_cpd(Cpd::root(variable.clone(), vec![weight, 1.0 - weight]));
                continue;
            }

            let mut table = HashMap::new();
            for assignment in all_assignments(parents.len()) {
                let true_count = assignment.iter().filter(|&&s| s == 0).count();
                let fraction_true = true_count as f64 / parents.len() as f64;
                let p_true = (weight * 0.5 + fraction_true * 0.5).clamp(0.05, 0.95);
                table.insert(assignment, vec![p_true, 1.0 - p_true]);
            }
            network.set_cpd(Cpd::with_table(variable.clone(), parents, table));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::network::{state_index, STATES};
    use crate::entities::EntityType;
    use crate::graph::EdgeKind;

    fn sample_graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.add_entity_node("tesla", EntityType::Org);
        graph.add_entity_node("musk", EntityType::Person);
        graph.add_entity_node("spacex", EntityType::Org);
        graph.add_relationship("musk", EdgeKind::RelatedTo, "tesla", 0.9).unwrap();
        graph.add_relationship("musk", EdgeKind::RelatedTo, "spacex", 0.8).unwrap();
        graph
    }

    #[test]
    fn builds_network_from_graph() {
        let graph = sample_graph();
        let builder = BayesianNetworkBuilder::new(BuilderConfig::default());
        let network = builder.build(&graph).unwrap();
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 2);
        assert!(network.cpd("tesla").is_some());
    }

    #[test]
    fn empty_graph_after_filtering_is_an_error() {
        let mut graph = KnowledgeGraph::new();
        graph.add_entity_node("lonely", EntityType::Concept);
        let builder = BayesianNetworkBuilder::new(BuilderConfig::default());
        assert!(matches!(builder.build(&graph), Err(BayesError::EmptyNetwork)));
    }

    #[test]
    fn low_confidence_edges_are_filtered() {
        let mut graph = KnowledgeGraph::new();
        graph.add_entity_node("a", EntityType::Concept);
        graph.add_entity_node("b", EntityType::Concept);
        graph.add_relationship("a", EdgeKind::RelatedTo, "b", 0.1).unwrap();
        let builder = BayesianNetworkBuilder::new(BuilderConfig::default());
        assert!(matches!(builder.build(&graph), Err(BayesError::EmptyNetwork)));
    }

    #[test]
    fn repeated_build_hits_cache() {
        let graph = sample_graph();
        let builder = BayesianNetworkBuilder::new(BuilderConfig::default());
        let first = builder.build(&graph).unwrap();
        let second = builder.build(&graph).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cpd_probabilities_sum_to_one() {
        let graph = sample_graph();
        let builder = BayesianNetworkBuilder::new(BuilderConfig::default());
        let network = builder.build(&graph).unwrap();
        for variable in network.variables() {
            let cpd = network.cpd(&variable).unwrap();
            for distribution in cpd.table.values() {
                let total: f64 = distribution.iter().sum();
                assert!((total - 1.0).abs() < 1e-9, "{variable} row sums to {total}");
            }
        }
    }

    #[test]
    fn state_index_resolves_known_states() {
        assert_eq!(state_index(STATES[0]), Some(0));
    }
}
