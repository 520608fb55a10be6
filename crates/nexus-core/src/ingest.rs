//! C19 — the memory-store ingest path (spec §6): tag validation, chunking,
//! embedding, graph construction, and persistence for one piece of raw
//! text, grounded on
//! `original_source/src/nexus/public_api.py::MemoryMCPQueryService.memory_store`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::chunker::{Chunker, ChunkerConfig};
use crate::embeddings::EmbeddingProvider;
use crate::entities::{normalize_entity_text, EntityExtractor};
use crate::events::{EventRecord, EventType};
use crate::graph::{EdgeKind, KnowledgeGraph};
use crate::memory::{Chunk, ChunkMetadata, ChunkStore};
use crate::storage::{Result, Storage};
use crate::tagging::{apply_tag_policy, SourceType, TagPolicy, TagQuadruple};
use crate::vector::VectorIndex;

/// One `memory_store` call's input: raw text plus the tagging quadruple
/// and provenance the caller supplies (spec §3, §6).
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub text: String,
    pub file_path: Option<String>,
    pub tags: TagQuadruple,
    pub agent_name: String,
    pub intent: String,
    /// How this text was obtained; drives the derived confidence (spec §3)
    /// unless `confidence` overrides it explicitly.
    pub source_type: Option<SourceType>,
    pub confidence: Option<f64>,
}

pub struct MemoryStoreService<'a, X: EntityExtractor> {
    chunker: Chunker,
    tag_policy: TagPolicy,
    storage: Arc<Storage>,
    chunks: Arc<ChunkStore>,
    graph: Arc<RwLock<KnowledgeGraph>>,
    vector_index: Arc<RwLock<VectorIndex>>,
    extractor: &'a X,
}

impl<'a, X: EntityExtractor> MemoryStoreService<'a, X> {
    pub fn new(
        chunker_config: ChunkerConfig,
        tag_policy: TagPolicy,
        storage: Arc<Storage>,
        chunks: Arc<ChunkStore>,
        graph: Arc<RwLock<KnowledgeGraph>>,
        vector_index: Arc<RwLock<VectorIndex>>,
        extractor: &'a X,
    ) -> Self {
        Self { chunker: Chunker::new(chunker_config), tag_policy, storage, chunks, graph, vector_index, extractor }
    }

    /// Splits `request.text` into chunks, tags/embeds/persists each, wires
    /// each chunk and its mentioned entities into the knowledge graph, and
    /// logs one `ingest` event per chunk. Returns the stored chunks in
    /// chunk order.
    pub fn store<E: EmbeddingProvider>(&self, embedder: &E, request: IngestRequest, id_prefix: &str) -> Result<Vec<Chunk>> {
        let text_chunks = self
            .chunker
            .chunk(&request.text, request.file_path.clone())
            .map_err(|e| crate::storage::StorageError::Init(e.to_string()))?;

        let tagged = apply_tag_policy(request.tags.clone(), self.tag_policy, &request.agent_name, &request.intent)
            .map_err(|e| crate::storage::StorageError::Init(e.to_string()))?;

        let mut stored = Vec::with_capacity(text_chunks.len());
        for text_chunk in text_chunks {
            let chunk_id = format!("{id_prefix}-{}", text_chunk.chunk_index);

            let mut metadata = ChunkMetadata {
                file_path: request.file_path.clone(),
                chunk_index: text_chunk.chunk_index as i64,
                confidence: request
                    .confidence
                    .or_else(|| request.source_type.map(SourceType::confidence))
                    .unwrap_or(crate::tagging::DEFAULT_CONFIDENCE),
                tags: vec![tagged.envelope.get("project").cloned().unwrap_or_else(|| "untagged".to_string())],
                extras: tagged.envelope.clone(),
                ..Default::default()
            };
            metadata.extras.extend(text_chunk.metadata.clone());

            let mut chunk = Chunk::new(&chunk_id, &text_chunk.text, metadata);

            let embedding = embedder.embed(&chunk.text).ok();
            if let Some(vector) = &embedding {
                self.vector_index.write().add(&chunk_id, vector).map_err(|e| crate::storage::StorageError::Init(e.to_string()))?;
            }
            chunk.embedding = embedding;

            {
                let mut graph = self.graph.write();
                graph.add_chunk_node(&chunk_id);
                for span in self.extractor.extract(&chunk.text) {
                    let entity_id = normalize_entity_text(&span.text);
                    graph.add_entity_node(&entity_id, span.entity_type);
                    let _ = graph.add_relationship(&chunk_id, EdgeKind::Mentions, &entity_id, 0.8);
                }
            }

            self.chunks.put(&chunk)?;
            self.storage.append_event(&EventRecord::new(EventType::Ingest, Some(chunk_id.clone()), serde_json::json!({"chunk_index": chunk.metadata.chunk_index})))?;

            stored.push(chunk);
        }

        Ok(stored)
    }
}
