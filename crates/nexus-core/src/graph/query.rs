//! C8 — Personalized PageRank and multi-hop traversal, grounded on
//! `original_source/src/services/graph_query_engine.py`. Read-only over a
//! `&KnowledgeGraph`; no external PageRank crate is in the dependency
//! stack, so PPR is a hand-rolled power iteration matching
//! `networkx.pagerank`'s personalization/damping/tolerance contract.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::{EdgeKind, KnowledgeGraph, NodeKind};

pub const DEFAULT_ALPHA: f64 = 0.85;
pub const DEFAULT_MAX_ITER: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_HOPS: usize = 3;
pub const DEFAULT_MAX_SYNONYMS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct MultiHopResult {
    pub entities: Vec<String>,
    pub paths: HashMap<String, Vec<String>>,
    pub distances: HashMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct EntityNeighborhood {
    pub entities: Vec<String>,
    pub chunks: Vec<String>,
}

/// Borrows a `KnowledgeGraph` for the duration of one query; holds no
/// state of its own.
pub struct GraphQueryEngine<'g> {
    graph: &'g KnowledgeGraph,
}

impl<'g> GraphQueryEngine<'g> {
    pub fn new(graph: &'g KnowledgeGraph) -> Self {
        Self { graph }
    }

    /// Runs Personalized PageRank seeded uniformly on `query_nodes`.
    /// Returns an empty map if none of the seeds exist in the graph.
    pub fn personalized_pagerank(&self, query_nodes: &[String], alpha: f64, max_iter: usize, tol: f64) -> HashMap<String, f64> {
        let valid_seeds: Vec<&String> = query_nodes.iter().filter(|n| self.graph.contains_node(n)).collect();
        if valid_seeds.is_empty() {
            return HashMap::new();
        }

        let n = self.graph.node_count();
        if n == 0 {
            return HashMap::new();
        }

        let personalization_weight = 1.0 / valid_seeds.len() as f64;
        let mut personalization: HashMap<String, f64> = HashMap::new();
        for seed in &valid_seeds {
            personalization.insert((*seed).clone(), personalization_weight);
        }

        let node_ids: Vec<String> = self.graph.index.keys().cloned().collect();
        let mut scores: HashMap<String, f64> = node_ids.iter().map(|id| (id.clone(), 1.0 / n as f64)).collect();

        let out_degree: HashMap<&str, usize> = node_ids
            .iter()
            .map(|id| {
                let idx = self.graph.node_index(id).expect("node id came from the graph's own index");
                (id.as_str(), self.graph.graph.edges_directed(idx, Direction::Outgoing).count())
            })
            .collect();

        for _ in 0..max_iter {
            let mut next: HashMap<String, f64> = node_ids.iter().map(|id| (id.clone(), 0.0)).collect();

            let mut dangling_mass = 0.0;
            for id in &node_ids {
                let degree = out_degree[id.as_str()];
                let score = scores[id];
                if degree == 0 {
                    dangling_mass += score;
                    continue;
                }
                let idx = self.graph.node_index(id).expect("node id came from the graph's own index");
                let share = score / degree as f64;
                for neighbor_idx in self.graph.graph.neighbors_directed(idx, Direction::Outgoing) {
                    if let Some(neighbor) = self.graph.graph.node_weight(neighbor_idx) {
                        *next.entry(neighbor.id.clone()).or_insert(0.0) += share;
                    }
                }
            }

            let mut max_delta = 0.0_f64;
            for id in &node_ids {
                let teleport = personalization.get(id).copied().unwrap_or(0.0);
                let redistributed_dangling = dangling_mass * teleport;
                let value = alpha * (next[id] + redistributed_dangling) + (1.0 - alpha) * teleport;
                max_delta = max_delta.max((value - scores[id]).abs());
                next.insert(id.clone(), value);
            }

            scores = next;
            if max_delta < tol {
                break;
            }
        }

        let total: f64 = scores.values().sum();
        if total > 0.0 {
            for value in scores.values_mut() {
                *value /= total;
            }
        }
        scores
    }

    /// Aggregates PPR scores onto chunks by summing the scores of entities
    /// each chunk mentions, returning the top `top_k` chunks descending.
    pub fn rank_chunks_by_ppr(&self, ppr_scores: &HashMap<String, f64>, top_k: usize) -> Vec<(String, f64)> {
        if ppr_scores.is_empty() {
            return Vec::new();
        }

        let mut chunk_scores: Vec<(String, f64)> = self
            .graph
            .node_ids_by_kind(NodeKind::Chunk)
            .into_iter()
            .filter_map(|chunk_id| {
                let mentioned = self.graph.get_neighbors(&chunk_id, Some(EdgeKind::Mentions));
                let score: f64 = mentioned.iter().filter_map(|e| ppr_scores.get(e)).sum();
                (score > 0.0).then_some((chunk_id, score))
            })
            .collect();

        chunk_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        chunk_scores.truncate(top_k);
        chunk_scores
    }

    pub fn get_entity_neighbors(&self, entity_id: &str, edge_kind: Option<EdgeKind>) -> Vec<String> {
        self.graph.get_neighbors(entity_id, edge_kind)
    }

    /// BFS from `start_nodes` up to `max_hops`, optionally restricted to
    /// `edge_kinds`. Every node visited is recorded in `distances`/`paths`;
    /// `entities` collects only entity-typed nodes (start nodes included).
    pub fn multi_hop_search(&self, start_nodes: &[String], max_hops: usize, edge_kinds: Option<&[EdgeKind]>) -> MultiHopResult {
        let mut visited: HashSet<String> = HashSet::new();
        let mut distances: HashMap<String, usize> = HashMap::new();
        let mut paths: HashMap<String, Vec<String>> = HashMap::new();
        let mut entities: HashSet<String> = start_nodes.iter().cloned().collect();
        let mut queue: VecDeque<(String, usize, Vec<String>)> = VecDeque::new();

        for node in start_nodes {
            if self.graph.contains_node(node) {
                visited.insert(node.clone());
                distances.insert(node.clone(), 0);
                paths.insert(node.clone(), vec![node.clone()]);
                queue.push_back((node.clone(), 0, vec![node.clone()]));
            }
        }

        while let Some((current, distance, path)) = queue.pop_front() {
            if distance >= max_hops {
                continue;
            }

            let Some(idx) = self.graph.node_index(&current) else { continue };
            for edge in self.graph.graph.edges_directed(idx, Direction::Outgoing) {
                if let Some(kinds) = edge_kinds {
                    if !kinds.contains(&edge.weight().kind) {
                        continue;
                    }
                }
                let Some(neighbor) = self.graph.graph.node_weight(edge.target()) else { continue };
                if visited.contains(&neighbor.id) {
                    continue;
                }

                visited.insert(neighbor.id.clone());
                let new_distance = distance + 1;
                let mut new_path = path.clone();
                new_path.push(neighbor.id.clone());

                distances.insert(neighbor.id.clone(), new_distance);
                paths.insert(neighbor.id.clone(), new_path.clone());

                if neighbor.kind == NodeKind::Entity {
                    entities.insert(neighbor.id.clone());
                }

                queue.push_back((neighbor.id.clone(), new_distance, new_path));
            }
        }

        MultiHopResult { entities: entities.into_iter().collect(), paths, distances }
    }

    /// Expands a seed entity list with up to `max_synonyms` `similar_to`
    /// neighbors per seed.
    pub fn expand_with_synonyms(&self, entity_ids: &[String], max_synonyms: usize) -> Vec<String> {
        let mut expanded: HashSet<String> = entity_ids.iter().cloned().collect();
        for entity in entity_ids {
            let synonyms = self.graph.get_neighbors(entity, Some(EdgeKind::SimilarTo));
            expanded.extend(synonyms.into_iter().take(max_synonyms));
        }
        expanded.into_iter().collect()
    }

    pub fn get_entity_neighborhood(&self, entity_id: &str, hops: usize, include_chunks: bool) -> EntityNeighborhood {
        if !self.graph.contains_node(entity_id) {
            return EntityNeighborhood::default();
        }

        let result = self.multi_hop_search(std::slice::from_ref(&entity_id.to_string()), hops, None);
        let chunks = if include_chunks { self.connected_chunks(&result.entities) } else { Vec::new() };
        EntityNeighborhood { entities: result.entities, chunks }
    }

    fn connected_chunks(&self, entity_ids: &[String]) -> Vec<String> {
        let mut chunks: HashSet<String> = HashSet::new();
        for entity in entity_ids {
            for chunk in self.graph.get_predecessors(entity, Some(EdgeKind::Mentions)) {
                chunks.insert(chunk);
            }
        }
        chunks.into_iter().collect()
    }
}
