//! `NexusEngine` — the facade assembling every tier, the knowledge graph,
//! the Bayesian network cache, storage, and the lifecycle manager behind
//! one Query API (spec §6), grounded on
//! `original_source/src/nexus/public_api.py::MemoryMCPQueryService`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::bayes::{BayesianNetworkBuilder, BuilderConfig, ProbabilisticEngine};
use crate::chunker::ChunkerConfig;
use crate::config::NexusConfig;
use crate::embeddings::EmbeddingProvider;
use crate::entities::{EntityExtractor, EntitySpan, RegexEntityExtractor};
use crate::error::Result;
use crate::events::{EventRecord, EventType};
use crate::graph::query::{EntityNeighborhood, MultiHopResult};
use crate::graph::{EdgeKind, GraphQueryEngine, KnowledgeGraph};
use crate::ingest::{IngestRequest, MemoryStoreService};
use crate::lifecycle::{LifecycleManager, StageStats};
use crate::memory::{Chunk, ChunkStore};
use crate::router::{resolve_mode, ModeDetection, QueryMode};
use crate::sop::{NexusProcessor, ProcessResult, TierWeights};
use crate::storage::Storage;
use crate::tagging::TagPolicy;
use crate::tiers::{BayesianTier, GraphSearchTier, VectorSearchTier};
use crate::vector::VectorIndex;

#[cfg(feature = "embeddings")]
type DefaultEmbedder = crate::embeddings::EmbeddingService;
#[cfg(not(feature = "embeddings"))]
type DefaultEmbedder = crate::embeddings::DeterministicEmbedder;

const GRAPH_SNAPSHOT_FILE: &str = "graph.json";

/// Per-query overrides for `unified_search`; every field defaults to the
/// engine's own configured defaults when `None`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub mode: Option<QueryMode>,
    pub token_budget: Option<usize>,
    pub top_k: Option<usize>,
    pub multi_hop: bool,
}

#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub result: ProcessResult,
    pub detection: ModeDetection,
}

/// Assembles C1-C19 behind one handle. Holds one `RwLock<KnowledgeGraph>`
/// per spec §5 rather than per-sub-manager locking.
pub struct NexusEngine {
    config: NexusConfig,
    storage: Arc<Storage>,
    chunks: Arc<ChunkStore>,
    graph: Arc<RwLock<KnowledgeGraph>>,
    vector_index: Arc<RwLock<VectorIndex>>,
    embedder: DefaultEmbedder,
    extractor: RegexEntityExtractor,
    bayes_builder: BayesianNetworkBuilder,
    bayes_engine: ProbabilisticEngine,
    lifecycle: Arc<LifecycleManager>,
    processor: NexusProcessor,
    graph_snapshot_path: Option<PathBuf>,
}

impl NexusEngine {
    pub fn open(config: NexusConfig) -> Result<Self> {
        let storage = Arc::new(Storage::new(Some(config.storage.data_dir.join("nexus.db")))?);
        Self::from_storage(config, storage)
    }

    pub fn in_memory(config: NexusConfig) -> Result<Self> {
        let storage = Arc::new(Storage::in_memory()?);
        Self::from_storage(config, storage)
    }

    fn from_storage(config: NexusConfig, storage: Arc<Storage>) -> Result<Self> {
        let chunks = Arc::new(ChunkStore::new(storage.clone()));

        let graph_snapshot_path = Some(config.storage.data_dir.join(GRAPH_SNAPSHOT_FILE));
        let graph = KnowledgeGraph::load(graph_snapshot_path.as_ref().unwrap())?.unwrap_or_default();
        let graph = Arc::new(RwLock::new(graph));

        let embedder = DefaultEmbedder::default();
        let vector_index = VectorIndex::with_config(crate::vector::VectorIndexConfig {
            dimensions: EmbeddingProviderDims::dims(&embedder),
            ..Default::default()
        })
        .map_err(|e| crate::storage::StorageError::Init(e.to_string()))?;
        let vector_index = Arc::new(RwLock::new(vector_index));

        let lifecycle = Arc::new(LifecycleManager::new(storage.clone(), chunks.clone(), vector_index.clone()));

        Ok(Self {
            config,
            storage,
            chunks,
            graph,
            vector_index,
            embedder,
            extractor: RegexEntityExtractor::new(),
            bayes_builder: BayesianNetworkBuilder::new(BuilderConfig::default()),
            bayes_engine: ProbabilisticEngine::new(Duration::from_secs(2)),
            lifecycle,
            processor: NexusProcessor::default(),
            graph_snapshot_path,
        })
    }

    // -- Ingest ---------------------------------------------------------

    /// C19 — stores a new memory, returning the persisted chunk records in
    /// chunk order.
    pub fn memory_store(&self, request: IngestRequest) -> Result<Vec<Chunk>> {
        let id_prefix = uuid::Uuid::new_v4().to_string();
        let service = MemoryStoreService::new(
            ChunkerConfig { min_chunk_size: self.config.chunking.min_chunk_size, max_chunk_size: self.config.chunking.max_chunk_size, overlap: self.config.chunking.overlap },
            if self.config.tagging.strict { TagPolicy::Strict } else { TagPolicy::AutoFill },
            self.storage.clone(),
            self.chunks.clone(),
            self.graph.clone(),
            self.vector_index.clone(),
            &self.extractor,
        );
        let stored = service.store(&self.embedder, request, &id_prefix)?;
        self.persist_graph_if_dirty()?;
        Ok(stored)
    }

    fn persist_graph_if_dirty(&self) -> Result<()> {
        let Some(path) = &self.graph_snapshot_path else { return Ok(()) };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.graph.write().save(path, false)?;
        Ok(())
    }

    // -- Retrieval --------------------------------------------------------

    /// C12 alone — a pure vector-tier search, bypassing fusion/fan-out.
    pub fn vector_search(&self, query: &str, top_k: usize) -> Vec<crate::tiers::TierCandidate> {
        let index = self.vector_index.read();
        let tier = VectorSearchTier::new(&self.embedder, &index);
        tier.search(query, self.chunks.as_ref(), top_k)
    }

    /// C15 — the full five-step SOP across all three tiers.
    pub fn unified_search(&self, query: &str, options: QueryOptions) -> QueryResponse {
        let detection = resolve_mode(options.mode, query);
        let token_budget = options.token_budget.unwrap_or(detection.token_budget);
        let top_k = options.top_k.unwrap_or(crate::router::DEFAULT_TOP_K);

        let network = self.bayes_builder.build(&self.graph.read()).ok();
        let evidence: HashMap<String, String> = HashMap::new();

        let index = self.vector_index.read();
        let graph = self.graph.read();
        let vector_tier = VectorSearchTier::new(&self.embedder, &index);
        let graph_tier = GraphSearchTier::new(&self.extractor, &graph);
        let bayes_tier = BayesianTier::new(&self.extractor, &graph, &self.bayes_engine);

        let result = self.processor.process(
            query,
            Some(detection.mode),
            token_budget,
            || vector_tier.search(query, self.chunks.as_ref(), top_k),
            || graph_tier.search(query, self.chunks.as_ref(), top_k, options.multi_hop),
            || match &network {
                Some(net) => bayes_tier.search(query, self.chunks.as_ref(), net, &evidence),
                None => Vec::new(),
            },
        );

        self.log_query(query, &result);
        QueryResponse { result, detection }
    }

    fn log_query(&self, query: &str, result: &ProcessResult) {
        let _ = self.storage.append_event(&EventRecord::new(
            EventType::Query,
            None,
            serde_json::json!({"query": query, "core_count": result.core.len(), "extended_count": result.extended.len(), "total_ms": result.stats.total_ms}),
        ));
    }

    // -- Introspection ----------------------------------------------------

    pub fn detect_mode(&self, query: &str) -> ModeDetection {
        crate::router::detect_mode(query)
    }

    pub fn entity_extraction(&self, text: &str) -> Vec<EntitySpan> {
        self.extractor.extract(text)
    }

    /// C8 — bounded multi-hop traversal seeded on the given entity ids.
    pub fn graph_query(&self, seeds: &[String], max_hops: usize, edge_kinds: Option<&[EdgeKind]>) -> MultiHopResult {
        let graph = self.graph.read();
        GraphQueryEngine::new(&graph).multi_hop_search(seeds, max_hops, edge_kinds)
    }

    pub fn entity_neighborhood(&self, entity_id: &str, hops: usize, include_chunks: bool) -> EntityNeighborhood {
        let graph = self.graph.read();
        GraphQueryEngine::new(&graph).get_entity_neighborhood(entity_id, hops, include_chunks)
    }

    /// HippoRAG-style retrieval: extract entities from the query, seed PPR,
    /// and rank mentioning chunks — the graph tier run standalone.
    pub fn hipporag_retrieve(&self, query: &str, top_k: usize, multi_hop: bool) -> Vec<crate::tiers::TierCandidate> {
        let graph = self.graph.read();
        let tier = GraphSearchTier::new(&self.extractor, &graph);
        tier.search(query, self.chunks.as_ref(), top_k, multi_hop)
    }

    /// C10/C11 — builds (or reuses the cached) Bayesian network from the
    /// current graph and answers a conditional query.
    pub fn bayesian_inference(&self, query_vars: &[String], evidence: &HashMap<String, String>) -> Result<Option<crate::bayes::QueryResult>> {
        let network = self.bayes_builder.build(&self.graph.read())?;
        Ok(self.bayes_engine.query_conditional(&network, query_vars, evidence))
    }

    // -- Lifecycle ----------------------------------------------------------

    pub fn lifecycle_status(&self) -> Result<StageStats> {
        Ok(self.lifecycle.get_stage_stats()?)
    }

    pub fn run_lifecycle_sweep(&self) -> Result<()> {
        self.lifecycle.demote_stale_chunks(crate::lifecycle::DEFAULT_DEMOTE_THRESHOLD_DAYS)?;
        self.lifecycle.archive_demoted_chunks(crate::lifecycle::DEFAULT_ARCHIVE_THRESHOLD_DAYS)?;
        Ok(())
    }

    /// Restores an archived chunk back to `Active`, embedding `query` as the
    /// vector the restored chunk is re-indexed under. `false` means the
    /// chunk is archived but its source file is gone or unreadable — the
    /// archive is left in place for a later retry, not an error.
    pub fn rekindle_archived(&self, query: &str, chunk_id: &str) -> Result<bool> {
        let Ok(embedding) = self.embedder.embed(query) else { return Ok(false) };
        Ok(self.lifecycle.rekindle_archived(&embedding, chunk_id)?)
    }

    /// C5 — events recorded since `since`, optionally filtered by type;
    /// the observation timeline operation (spec §6).
    pub fn observation_timeline(&self, since: DateTime<Utc>, event_type: Option<EventType>) -> Result<Vec<EventRecord>> {
        Ok(self.storage.events_since(since, event_type)?)
    }

    pub fn lifecycle_manager(&self) -> Arc<LifecycleManager> {
        self.lifecycle.clone()
    }

    pub fn config(&self) -> &NexusConfig {
        &self.config
    }
}

/// Small shim so `open`/`in_memory` can ask either embedder type for its
/// dimensionality without duplicating the match on the `embeddings` feature.
trait EmbeddingProviderDims {
    fn dims(&self) -> usize;
}

impl<E: crate::embeddings::EmbeddingProvider> EmbeddingProviderDims for E {
    fn dims(&self) -> usize {
        self.dimensions()
    }
}
