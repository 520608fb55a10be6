//! C15 — the five-step standard operating procedure every query flows
//! through: route, parallel tier fan-out, fuse, confidence-filter,
//! rerank + budget-cap. Grounded on `original_source/src/nexus/public_api.py`
//! (`MemoryMCPQueryService.semantic_search` → `NexusProcessor.process`),
//! recast per spec §9: the reference bridges an async handler to a
//! synchronous core via `asyncio.to_thread`; here the core is plain
//! synchronous code and fan-out uses `std::thread::scope` — the same
//! plain-thread idiom `bayes::engine`'s timeout guard already uses,
//! rather than pulling in an async runtime just to join three calls.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use crate::router::{resolve_mode, QueryMode};
use crate::tiers::{Tier, TierCandidate};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct TierWeights {
    pub vector: f64,
    pub graph: f64,
    pub bayesian: f64,
}

impl TierWeights {
    pub fn equal() -> Self {
        Self { vector: 1.0, graph: 1.0, bayesian: 1.0 }
    }

    fn weight_for(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Vector => self.vector,
            Tier::Graph => self.graph,
            Tier::Bayesian => self.bayesian,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FusedCandidate {
    pub chunk_id: String,
    pub text: String,
    pub score: f64,
    pub metadata: HashMap<String, String>,
    pub tier: Tier,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub route_ms: u64,
    pub fan_out_ms: u64,
    pub fuse_ms: u64,
    pub filter_ms: u64,
    pub rerank_ms: u64,
    pub total_ms: u64,
    pub tiers_attempted: usize,
    pub vector_count: usize,
    pub graph_count: usize,
    pub bayesian_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub core: Vec<FusedCandidate>,
    pub extended: Vec<FusedCandidate>,
    pub mode: QueryMode,
    pub stats: PipelineStats,
}

/// Approximates token count the way the reference does: `ceil(len(text)/4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Runs the three tier closures on dedicated threads and joins all of
/// them. Any closure that panics is treated as a tier failure
/// contributing `[]`, matching "tier failure becomes empty candidate
/// list" (spec §5) — a thread panic should never propagate to the
/// caller as a panic of its own.
fn fan_out<V, G, B>(vector: V, graph: G, bayesian: B) -> (Vec<TierCandidate>, Vec<TierCandidate>, Vec<TierCandidate>)
where
    V: FnOnce() -> Vec<TierCandidate> + Send,
    G: FnOnce() -> Vec<TierCandidate> + Send,
    B: FnOnce() -> Vec<TierCandidate> + Send,
{
    std::thread::scope(|scope| {
        let vector_handle = scope.spawn(vector);
        let graph_handle = scope.spawn(graph);
        let bayesian_handle = scope.spawn(bayesian);
        (vector_handle.join().unwrap_or_default(), graph_handle.join().unwrap_or_default(), bayesian_handle.join().unwrap_or_default())
    })
}

/// Concatenates and deduplicates by `chunk_id`, keeping the
/// highest-scoring entry, then applies the (normalized) per-tier weight.
fn fuse(vector: Vec<TierCandidate>, graph: Vec<TierCandidate>, bayesian: Vec<TierCandidate>, weights: &TierWeights) -> Vec<FusedCandidate> {
    let total_weight = weights.vector + weights.graph + weights.bayesian;
    let normalized = if total_weight > 0.0 {
        TierWeights { vector: weights.vector / total_weight, graph: weights.graph / total_weight, bayesian: weights.bayesian / total_weight }
    } else {
        TierWeights::equal()
    };

    let mut by_chunk: HashMap<String, FusedCandidate> = HashMap::new();
    for candidate in vector.into_iter().chain(graph).chain(bayesian) {
        let weighted_score = candidate.score * normalized.weight_for(candidate.tier);
        by_chunk
            .entry(candidate.chunk_id.clone())
            .and_modify(|existing| {
                if weighted_score > existing.score {
                    existing.score = weighted_score;
                    existing.tier = candidate.tier;
                    existing.metadata = candidate.metadata.clone();
                }
            })
            .or_insert(FusedCandidate { chunk_id: candidate.chunk_id, text: candidate.text, score: weighted_score, metadata: candidate.metadata, tier: candidate.tier });
    }

    let mut fused: Vec<FusedCandidate> = by_chunk.into_values().collect();
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Drops candidates below `threshold`. Monotone: an empty input yields
/// an empty output (spec §4.7 step 4).
fn apply_confidence_filter(candidates: Vec<FusedCandidate>, threshold: f64) -> Vec<FusedCandidate> {
    candidates.into_iter().filter(|c| c.score >= threshold).collect()
}

/// Takes candidates in descending score order under a token budget, then
/// splits into `core`/`extended` by the resolved mode's sizes.
fn rerank_and_cap(mut candidates: Vec<FusedCandidate>, mode: QueryMode, token_budget: usize) -> (Vec<FusedCandidate>, Vec<FusedCandidate>) {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut accepted = Vec::new();
    let mut tokens_used = 0usize;
    for candidate in candidates {
        let tokens = estimate_tokens(&candidate.text);
        if tokens_used + tokens > token_budget {
            break;
        }
        tokens_used += tokens;
        accepted.push(candidate);
    }

    let core: Vec<FusedCandidate> = accepted.iter().take(mode.core_size()).cloned().collect();
    let extended: Vec<FusedCandidate> = accepted.into_iter().skip(mode.core_size()).take(mode.extended_size()).collect();
    (core, extended)
}

/// The five-step SOP (spec §4.7). `tier_calls` are three closures the
/// caller wires up against its own embedder/graph/Bayesian state — kept
/// generic so `NexusProcessor` has no dependency on `NexusEngine`'s
/// concrete types.
pub struct NexusProcessor {
    pub confidence_threshold: f64,
    pub weights: TierWeights,
}

impl Default for NexusProcessor {
    fn default() -> Self {
        Self { confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD, weights: TierWeights::equal() }
    }
}

impl NexusProcessor {
    pub fn new(confidence_threshold: f64, weights: TierWeights) -> Self {
        Self { confidence_threshold, weights }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process<V, G, B>(&self, query: &str, explicit_mode: Option<QueryMode>, token_budget: usize, vector_tier: V, graph_tier: G, bayesian_tier: B) -> ProcessResult
    where
        V: FnOnce() -> Vec<TierCandidate> + Send,
        G: FnOnce() -> Vec<TierCandidate> + Send,
        B: FnOnce() -> Vec<TierCandidate> + Send,
    {
        let route_start = Instant::now();
        let detection = resolve_mode(explicit_mode, query);
        let route_ms = route_start.elapsed().as_millis() as u64;

        let fan_out_start = Instant::now();
        let (vector, graph, bayesian) = fan_out(vector_tier, graph_tier, bayesian_tier);
        let fan_out_ms = fan_out_start.elapsed().as_millis() as u64;
        let (vector_count, graph_count, bayesian_count) = (vector.len(), graph.len(), bayesian.len());

        let fuse_start = Instant::now();
        let fused = fuse(vector, graph, bayesian, &self.weights);
        let fuse_ms = fuse_start.elapsed().as_millis() as u64;

        let filter_start = Instant::now();
        let filtered = apply_confidence_filter(fused, self.confidence_threshold);
        let filter_ms = filter_start.elapsed().as_millis() as u64;

        let rerank_start = Instant::now();
        let (core, extended) = rerank_and_cap(filtered, detection.mode, token_budget);
        let rerank_ms = rerank_start.elapsed().as_millis() as u64;

        let total_ms = route_ms + fan_out_ms + fuse_ms + filter_ms + rerank_ms;

        ProcessResult {
            core,
            extended,
            mode: detection.mode,
            stats: PipelineStats { route_ms, fan_out_ms, fuse_ms, filter_ms, rerank_ms, total_ms, tiers_attempted: 3, vector_count, graph_count, bayesian_count },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, text: &str, score: f64, tier: Tier) -> TierCandidate {
        TierCandidate { chunk_id: id.to_string(), text: text.to_string(), score, metadata: HashMap::new(), tier }
    }

    #[test]
    fn empty_tiers_yield_empty_result_with_finite_stats() {
        let processor = NexusProcessor::default();
        let result = processor.process("anything", None, 10_000, Vec::new, Vec::new, Vec::new);
        assert!(result.core.is_empty());
        assert!(result.extended.is_empty());
        assert_eq!(result.stats.tiers_attempted, 3);
    }

    #[test]
    fn fuse_deduplicates_keeping_highest_score() {
        let processor = NexusProcessor::default();
        let result = processor.process(
            "tesla",
            Some(QueryMode::Execution),
            10_000,
            || vec![candidate("c1", "Tesla text", 0.9, Tier::Vector)],
            || vec![candidate("c1", "Tesla text", 0.4, Tier::Graph)],
            Vec::new,
        );
        assert_eq!(result.core.len(), 1);
        assert!(result.core[0].score > 0.0);
    }

    #[test]
    fn confidence_filter_drops_low_scoring_candidates() {
        let processor = NexusProcessor::new(0.9, TierWeights::equal());
        let result = processor.process("tesla", Some(QueryMode::Execution), 10_000, || vec![candidate("c1", "low", 0.1, Tier::Vector)], Vec::new, Vec::new);
        assert!(result.core.is_empty());
        assert!(result.extended.is_empty());
    }

    #[test]
    fn core_and_extended_respect_mode_sizes() {
        let processor = NexusProcessor::new(0.0, TierWeights::equal());
        let many: Vec<TierCandidate> = (0..30).map(|i| candidate(&format!("c{i}"), "short", 1.0 - (i as f64 * 0.01), Tier::Vector)).collect();
        let result = processor.process("query", Some(QueryMode::Execution), 1_000_000, move || many, Vec::new, Vec::new);
        assert_eq!(result.core.len(), QueryMode::Execution.core_size());
        assert!(result.extended.len() <= QueryMode::Execution.extended_size());
    }

    #[test]
    fn no_duplicate_chunk_ids_across_core_and_extended() {
        let processor = NexusProcessor::new(0.0, TierWeights::equal());
        let vector_candidates: Vec<TierCandidate> = (0..10).map(|i| candidate(&format!("c{i}"), "short", 1.0 - (i as f64 * 0.01), Tier::Vector)).collect();
        let graph_candidates = vector_candidates.clone();
        let result = processor.process("query", Some(QueryMode::Execution), 1_000_000, move || vector_candidates, move || graph_candidates, Vec::new);
        let mut seen = std::collections::HashSet::new();
        for c in result.core.iter().chain(result.extended.iter()) {
            assert!(seen.insert(c.chunk_id.clone()), "duplicate chunk_id {}", c.chunk_id);
        }
    }

    #[test]
    fn token_budget_is_respected() {
        let processor = NexusProcessor::new(0.0, TierWeights::equal());
        let long_text = "x".repeat(400);
        let candidates: Vec<TierCandidate> = (0..5).map(|i| candidate(&format!("c{i}"), &long_text, 1.0 - (i as f64 * 0.01), Tier::Vector)).collect();
        let result = processor.process("query", Some(QueryMode::Execution), 250, move || candidates, Vec::new, Vec::new);
        let total_tokens: usize = result.core.iter().chain(result.extended.iter()).map(|c| estimate_tokens(&c.text)).sum();
        assert!(total_tokens <= 250);
    }
}
