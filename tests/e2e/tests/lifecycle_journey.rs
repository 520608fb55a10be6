//! Scenario 4: the full four-stage lifecycle round trip — demote, archive,
//! mark rehydratable, rekindle — driven directly against `LifecycleManager`
//! the way the lifecycle scheduler's tick does, end to end in one test.

use std::sync::Arc;

use chrono::{Duration, Utc};
use nexus_core::vector::DEFAULT_DIMENSIONS;
use nexus_core::{Chunk, ChunkMetadata, ChunkStore, LifecycleManager, LifecycleTier, Storage, VectorIndex};
use parking_lot::RwLock;

fn manager() -> (LifecycleManager, Arc<Storage>, Arc<ChunkStore>, Arc<RwLock<VectorIndex>>) {
    let storage = Arc::new(Storage::in_memory().unwrap());
    let chunks = Arc::new(ChunkStore::new(storage.clone()));
    let vector_index = Arc::new(RwLock::new(VectorIndex::new().unwrap()));
    let manager = LifecycleManager::new(storage.clone(), chunks.clone(), vector_index.clone());
    (manager, storage, chunks, vector_index)
}

#[test]
fn demote_archive_rehydrate_rekindle_round_trips_to_active() {
    let (manager, storage, chunks, vector_index) = manager();

    let source_file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(source_file.path(), "Tesla was founded by Elon Musk.").unwrap();
    let file_path = source_file.path().to_str().unwrap().to_string();

    let mut metadata = ChunkMetadata::default();
    metadata.file_path = Some(file_path.clone());
    let mut chunk = Chunk::new("c1", "Tesla was founded by Elon Musk.", metadata.clone());
    chunk.last_accessed = Utc::now() - Duration::days(8);
    let embedding = vec![0.2_f32; DEFAULT_DIMENSIONS];
    chunk.embedding = Some(embedding.clone());

    chunks.put(&chunk).unwrap();
    vector_index.write().add("c1", &embedding).unwrap();
    assert!(vector_index.read().contains("c1"));

    // Stage 1: demote. The chunk stays searchable (half weight) but is
    // marked demoted.
    let demoted = manager.demote_stale_chunks(7).unwrap();
    assert_eq!(demoted, 1);
    let after_demote = chunks.get("c1").unwrap().unwrap();
    assert_eq!(after_demote.lifecycle_tier, LifecycleTier::Demoted);
    assert!(after_demote.metadata.demoted_at.is_some());
    assert!(vector_index.read().contains("c1"), "demoted chunks remain searchable");

    // Backdate demoted_at past the archive threshold.
    let mut aged = after_demote;
    aged.metadata.demoted_at = Some(Utc::now() - Duration::days(31));
    chunks.put(&aged).unwrap();

    // Stage 2: archive. Drops out of the vector index; only a compact
    // summary survives in KV.
    let archived = manager.archive_demoted_chunks(30).unwrap();
    assert_eq!(archived, 1);
    assert!(chunks.get("c1").unwrap().is_none());
    assert!(!vector_index.read().contains("c1"));

    // Backdate the archive summary past the rehydrate threshold directly
    // in KV (the summary's own `archived_at`, not its key's presence).
    let summary_key = "archived:c1";
    let mut summary_value = storage.kv_get(summary_key).unwrap().unwrap();
    summary_value["archived_at"] = serde_json::json!((Utc::now() - Duration::days(91)).to_rfc3339());
    storage.kv_set(summary_key, &summary_value).unwrap();

    // Stage 3: mark rehydratable.
    let marked = manager.make_rehydratable(90).unwrap();
    assert_eq!(marked, 1);
    assert!(storage.kv_get("rehydratable:c1").unwrap().is_some());

    // Stage 4: rekindle, reading the text back from the real file the
    // archived summary's structured file path points at.
    let fresh_embedding = vec![0.3_f32; DEFAULT_DIMENSIONS];
    let restored = manager.rekindle_archived(&fresh_embedding, "c1").unwrap();
    assert!(restored, "a readable source file must rekindle successfully");

    let chunk = chunks.get("c1").unwrap().unwrap();
    assert_eq!(chunk.lifecycle_tier, LifecycleTier::Active);
    assert_eq!(chunk.text, "Tesla was founded by Elon Musk.");
    assert!(chunk.metadata.rekindled_at.is_some());
    assert_eq!(chunk.metadata.file_path.as_deref(), Some(file_path.as_str()));
    assert!(vector_index.read().contains("c1"));
    assert!(storage.kv_get("archived:c1").unwrap().is_none());
    assert!(storage.kv_get("rehydratable:c1").unwrap().is_none());
}

#[test]
fn stage_stats_reflect_every_tier_after_a_partial_sweep() {
    let (manager, _storage, chunks, _vector_index) = manager();

    let mut stale = Chunk::new("stale", "old content", ChunkMetadata::default());
    stale.last_accessed = Utc::now() - Duration::days(10);
    chunks.put(&stale).unwrap();

    let mut fresh = Chunk::new("fresh", "new content", ChunkMetadata::default());
    fresh.last_accessed = Utc::now();
    chunks.put(&fresh).unwrap();

    manager.demote_stale_chunks(7).unwrap();

    let stats = manager.get_stage_stats().unwrap();
    assert_eq!(stats.demoted, 1);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.archived, 0);
    assert_eq!(stats.rehydratable, 0);
}
