//! # Nexus Core
//!
//! A triple-tier retrieval-augmented memory engine: dense-vector nearest-
//! neighbor search, a personalized-PageRank/multi-hop knowledge graph, and
//! Bayesian probabilistic inference, unified by one five-step query
//! pipeline and a four-stage memory lifecycle.
//!
//! - **Vector tier**: HNSW approximate nearest-neighbor search over chunk
//!   embeddings via `usearch`.
//! - **Graph tier**: a directed multi-relation knowledge graph
//!   (`petgraph`), queried by personalized PageRank and bounded multi-hop
//!   traversal.
//! - **Bayesian tier**: a DAG pruned from the knowledge graph, with exact
//!   variable-elimination inference over conditional/marginal/MAP queries.
//! - **Lifecycle**: every chunk moves through `Active -> Demoted ->
//!   Archived -> Rehydratable`, each tier carrying a different score
//!   multiplier and a different persistence shape.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use nexus_core::{NexusConfig, NexusEngine};
//!
//! let engine = NexusEngine::open(NexusConfig::default())?;
//! let chunk = engine.memory_store("Tesla was founded in 2003.".into(), Default::default())?;
//! let result = engine.unified_search("when was tesla founded", None)?;
//! ```
//!
//! ## Feature flags
//!
//! - `embeddings` (default): local embedding generation via `fastembed`.
//! - `vector-search` (default): HNSW vector search via `usearch`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod bayes;
pub mod chunker;
pub mod config;
pub mod consolidation;
pub mod engine;
pub mod entities;
pub mod error;
pub mod events;
pub mod graph;
pub mod ingest;
pub mod lifecycle;
pub mod memory;
pub mod router;
pub mod sop;
pub mod storage;
pub mod tagging;
pub mod tiers;

#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
pub mod embeddings;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod vector;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use chunker::{Chunker, ChunkerConfig, ChunkerError, TextChunk};
pub use config::NexusConfig;
pub use consolidation::{ConsolidationReport, EntityConsolidator};
pub use engine::{NexusEngine, QueryOptions, QueryResponse};
pub use entities::{EntityExtractor, EntitySpan, EntityType, RegexEntityExtractor};
pub use error::{NexusError, Result};
pub use events::{EventRecord, EventType};
pub use graph::{EdgeKind, GraphQueryEngine, KnowledgeGraph, NodeKind};
pub use ingest::{IngestRequest, MemoryStoreService};
pub use lifecycle::{LifecycleManager, LifecycleScheduler, StageStats};
pub use memory::{Chunk, ChunkMetadata, ChunkStore, LifecycleTier};
pub use router::{detect_mode, resolve_mode, ModeDetection, QueryMode};
pub use sop::{FusedCandidate, NexusProcessor, PipelineStats, ProcessResult};
pub use storage::{Storage, StorageError};
pub use tagging::{SourceType, TagPolicy, TagQuadruple, TaggedMetadata};
pub use tiers::{BayesianTier, ChunkSource, GraphSearchTier, Tier, TierCandidate, VectorSearchTier};

pub use bayes::{BayesError, BayesianNetwork, BayesianNetworkBuilder, ProbabilisticEngine};

#[cfg(feature = "embeddings")]
pub use embeddings::{cosine_similarity, EmbeddingProvider, EmbeddingService, EMBEDDING_DIMENSIONS};

#[cfg(feature = "vector-search")]
pub use vector::{VectorIndex, VectorIndexConfig, VectorIndexStats, VectorSearchError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        Chunk, ChunkMetadata, ChunkStore, LifecycleTier, NexusConfig, NexusEngine, NexusError, QueryMode, QueryOptions, QueryResponse, Result,
        Storage, StorageError,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::{EmbeddingProvider, EmbeddingService};

    #[cfg(feature = "vector-search")]
    pub use crate::VectorIndex;
}
