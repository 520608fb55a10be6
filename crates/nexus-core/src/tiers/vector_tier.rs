//! C12 — embeds the query once (C2) and asks the vector index (C4) for
//! its top-k nearest neighbors, grounded on
//! `original_source/src/mcp/tools/vector_search.py`.

use std::collections::HashMap;

use crate::embeddings::EmbeddingProvider;
use crate::vector::VectorIndex;

use super::{ChunkSource, Tier, TierCandidate};

pub const DEFAULT_K_VECTOR: usize = 50;

/// Borrows an embedder and an index for the duration of one query.
pub struct VectorSearchTier<'a, E: EmbeddingProvider> {
    embedder: &'a E,
    index: &'a VectorIndex,
}

impl<'a, E: EmbeddingProvider> VectorSearchTier<'a, E> {
    pub fn new(embedder: &'a E, index: &'a VectorIndex) -> Self {
        Self { embedder, index }
    }

    /// Returns `[]` on an embedding or index failure rather than
    /// propagating the error — tier failures degrade to an empty
    /// contribution (spec §4.7 step 2), never the whole query.
    pub fn search(&self, query: &str, chunks: &impl ChunkSource, k: usize) -> Vec<TierCandidate> {
        let Ok(query_vector) = self.embedder.embed(query) else { return Vec::new() };
        let Ok(hits) = self.index.search(&query_vector, k) else { return Vec::new() };

        hits.into_iter()
            .filter_map(|(chunk_id, score)| {
                let chunk = chunks.get_chunk(&chunk_id)?;
                Some(TierCandidate {
                    chunk_id,
                    text: chunk.text,
                    score: score as f64,
                    metadata: HashMap::new(),
                    tier: Tier::Vector,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::DeterministicEmbedder;
    use crate::memory::{Chunk, ChunkMetadata};
    use crate::vector::{VectorIndex, VectorIndexConfig};

    fn index_with(embedder: &DeterministicEmbedder, entries: &[(&str, &str)]) -> (VectorIndex, HashMap<String, Chunk>) {
        let config = VectorIndexConfig { dimensions: embedder.dimensions(), ..VectorIndexConfig::default() };
        let mut index = VectorIndex::with_config(config).unwrap();
        let mut chunks = HashMap::new();
        for (id, text) in entries {
            let vector = embedder.embed(text).unwrap();
            index.add(id, &vector).unwrap();
            chunks.insert(id.to_string(), Chunk::new(*id, *text, ChunkMetadata::default()));
        }
        (index, chunks)
    }

    #[test]
    fn search_surfaces_closest_chunk_with_text_and_tier() {
        let embedder = DeterministicEmbedder;
        let (index, chunks) = index_with(&embedder, &[("c1", "Tesla founded by Elon Musk"), ("c2", "pizza recipe dough yeast")]);
        let tier = VectorSearchTier::new(&embedder, &index);
        let results = tier.search("Tesla electric cars", &chunks, DEFAULT_K_VECTOR);
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, "c1");
        assert_eq!(results[0].tier, Tier::Vector);
        assert_eq!(results[0].text, "Tesla founded by Elon Musk");
    }

    #[test]
    fn empty_index_returns_no_candidates() {
        let embedder = DeterministicEmbedder;
        let config = VectorIndexConfig { dimensions: embedder.dimensions(), ..VectorIndexConfig::default() };
        let index = VectorIndex::with_config(config).unwrap();
        let tier = VectorSearchTier::new(&embedder, &index);
        let results = tier.search("anything", &HashMap::new(), DEFAULT_K_VECTOR);
        assert!(results.is_empty());
    }
}
