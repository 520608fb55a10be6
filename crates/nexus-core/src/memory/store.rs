//! Persists `Chunk` records (full text, metadata, lifecycle tier) in the
//! key-value store under `chunk:{id}`. `VectorIndex` (C4) holds only
//! embeddings keyed by chunk id — the original's Chroma collection
//! doubles as both a vector index and a metadata store queryable by
//! `stage`/`last_accessed`, a capability `usearch` does not have. This is
//! the from-scratch adapter that fills that gap, scanning the schemaless
//! KV store under the `chunk:` prefix since there is no query language
//! to push a stage/age filter down to.

use std::sync::Arc;

use crate::memory::{Chunk, LifecycleTier};
use crate::storage::{Result, Storage};
use crate::tiers::ChunkSource;

const CHUNK_KEY_PREFIX: &str = "chunk:";

fn chunk_key(chunk_id: &str) -> String {
    format!("{CHUNK_KEY_PREFIX}{chunk_id}")
}

/// Thin adapter over `Storage`'s generic KV methods, giving chunk records
/// a stable home independent of the vector index lifecycle.
pub struct ChunkStore {
    storage: Arc<Storage>,
}

impl ChunkStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn put(&self, chunk: &Chunk) -> Result<()> {
        let value = serde_json::to_value(chunk)?;
        self.storage.kv_set(&chunk_key(&chunk.chunk_id), &value)
    }

    pub fn get(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        let Some(value) = self.storage.kv_get(&chunk_key(chunk_id))? else { return Ok(None) };
        Ok(serde_json::from_value(value).ok())
    }

    pub fn delete(&self, chunk_id: &str) -> Result<bool> {
        self.storage.kv_delete(&chunk_key(chunk_id))
    }

    /// Every chunk currently held by the store, regardless of tier.
    pub fn all(&self) -> Result<Vec<Chunk>> {
        let keys = self.storage.kv_list_prefix(CHUNK_KEY_PREFIX)?;
        let mut chunks = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.storage.kv_get(&key)? {
                if let Ok(chunk) = serde_json::from_value::<Chunk>(value) {
                    chunks.push(chunk);
                }
            }
        }
        Ok(chunks)
    }

    pub fn list_by_tier(&self, tier: LifecycleTier) -> Result<Vec<Chunk>> {
        Ok(self.all()?.into_iter().filter(|c| c.lifecycle_tier == tier).collect())
    }
}

impl ChunkSource for ChunkStore {
    fn get_chunk(&self, chunk_id: &str) -> Option<Chunk> {
        self.get(chunk_id).ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ChunkMetadata;

    fn store() -> ChunkStore {
        ChunkStore::new(Arc::new(Storage::in_memory().unwrap()))
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = store();
        let chunk = Chunk::new("c1", "hello world", ChunkMetadata::default());
        store.put(&chunk).unwrap();
        let fetched = store.get("c1").unwrap().unwrap();
        assert_eq!(fetched.text, "hello world");
    }

    #[test]
    fn missing_chunk_is_none() {
        let store = store();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn delete_removes_chunk() {
        let store = store();
        let chunk = Chunk::new("c1", "hello", ChunkMetadata::default());
        store.put(&chunk).unwrap();
        assert!(store.delete("c1").unwrap());
        assert!(store.get("c1").unwrap().is_none());
    }

    #[test]
    fn list_by_tier_filters_correctly() {
        let store = store();
        let mut active = Chunk::new("active-1", "a", ChunkMetadata::default());
        active.lifecycle_tier = LifecycleTier::Active;
        let mut demoted = Chunk::new("demoted-1", "d", ChunkMetadata::default());
        demoted.lifecycle_tier = LifecycleTier::Demoted;
        store.put(&active).unwrap();
        store.put(&demoted).unwrap();

        let active_chunks = store.list_by_tier(LifecycleTier::Active).unwrap();
        assert_eq!(active_chunks.len(), 1);
        assert_eq!(active_chunks[0].chunk_id, "active-1");
    }

    #[test]
    fn chunk_source_impl_matches_get() {
        let store = store();
        let chunk = Chunk::new("c1", "hello", ChunkMetadata::default());
        store.put(&chunk).unwrap();
        let via_trait: &dyn ChunkSource = &store;
        assert_eq!(via_trait.get_chunk("c1").unwrap().text, "hello");
    }
}
