//! C12-C14 retrieval tiers (spec §4.7 step 2, §4.8-4.10): each tier takes
//! a query and returns `[{chunk_id, text, score, metadata, tier}]`,
//! contributing the empty list on any internal failure so the SOP
//! fan-out degrades gracefully rather than failing the whole query.

pub mod bayes_tier;
pub mod graph_tier;
pub mod vector_tier;

pub use bayes_tier::BayesianTier;
pub use graph_tier::GraphSearchTier;
pub use vector_tier::VectorSearchTier;

use std::collections::HashMap;

use serde::Serialize;

use crate::memory::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Vector,
    Graph,
    Bayesian,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Vector => "vector",
            Tier::Graph => "graph",
            Tier::Bayesian => "bayesian",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TierCandidate {
    pub chunk_id: String,
    pub text: String,
    pub score: f64,
    pub metadata: HashMap<String, String>,
    pub tier: Tier,
}

/// The read-only chunk lookup every tier needs to turn a bare `chunk_id`
/// into retrievable text and metadata. `NexusEngine` implements this over
/// its KV-backed chunk store; tests use a plain `HashMap`.
pub trait ChunkSource {
    fn get_chunk(&self, chunk_id: &str) -> Option<Chunk>;
}

impl ChunkSource for HashMap<String, Chunk> {
    fn get_chunk(&self, chunk_id: &str) -> Option<Chunk> {
        self.get(chunk_id).cloned()
    }
}
