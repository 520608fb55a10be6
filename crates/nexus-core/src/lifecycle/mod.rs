//! C16 — the four-stage memory lifecycle (spec §3): demotes stale active
//! chunks, archives long-demoted ones to a compact KV summary, marks old
//! archives rehydratable, and rekindles an archived chunk back into the
//! vector index on demand. Grounded on
//! `original_source/src/memory/lifecycle_manager.py`, with two corrections
//! (see `make_rehydratable` and `rekindle_archived` below): age-based
//! rehydration instead of a key-presence check, and a rekindle that actually
//! reads the archived source file back off disk instead of re-threading
//! text the caller already discarded.

pub mod scheduler;

pub use scheduler::LifecycleScheduler;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::embeddings::cosine_similarity;
use crate::events::{EventRecord, EventType};
use crate::memory::{Chunk, ChunkStore, LifecycleTier};
use crate::storage::{Result, Storage, StorageError};
use crate::vector::VectorIndex;

pub const DEFAULT_DEMOTE_THRESHOLD_DAYS: i64 = 7;
pub const DEFAULT_ARCHIVE_THRESHOLD_DAYS: i64 = 30;
pub const DEFAULT_REHYDRATE_THRESHOLD_DAYS: i64 = 90;
pub const DEFAULT_CONSOLIDATION_THRESHOLD: f32 = 0.95;
pub const DEFAULT_EVENT_RETENTION_DAYS: i64 = 30;

const ARCHIVED_KEY_PREFIX: &str = "archived:";
const REHYDRATABLE_KEY_PREFIX: &str = "rehydratable:";

fn archived_key(chunk_id: &str) -> String {
    format!("{ARCHIVED_KEY_PREFIX}{chunk_id}")
}

fn rehydratable_key(chunk_id: &str) -> String {
    format!("{REHYDRATABLE_KEY_PREFIX}{chunk_id}")
}

/// `archived:{id}:metadata` — the full `ChunkMetadata` alongside the
/// compact summary under `archived:{id}`, so a later rekindle restores
/// more than a blank record (spec §4.13: "archived:{id} and
/// archived:{id}:metadata").
fn metadata_key(chunk_id: &str) -> String {
    format!("{}:metadata", archived_key(chunk_id))
}

/// A compact stand-in for an archived chunk's full text: first line plus a
/// character count, cheap enough to keep for every archive indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub chunk_id: String,
    pub summary: String,
    pub original_length: usize,
    pub file_path: Option<String>,
    pub archived_at: DateTime<Utc>,
}

fn summarize(chunk: &Chunk) -> ArchiveSummary {
    let first_line = chunk.text.lines().next().unwrap_or("").trim();
    let mut summary = first_line.chars().take(200).collect::<String>();
    if summary.len() < chunk.text.len() {
        summary.push_str("...");
    }
    ArchiveSummary {
        chunk_id: chunk.chunk_id.clone(),
        summary,
        original_length: chunk.text.len(),
        file_path: chunk.metadata.file_path.clone(),
        archived_at: Utc::now(),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StageStats {
    pub active: usize,
    pub demoted: usize,
    pub archived: usize,
    pub rehydratable: usize,
}

pub struct LifecycleManager {
    storage: Arc<Storage>,
    chunks: Arc<ChunkStore>,
    vector_index: Arc<RwLock<VectorIndex>>,
}

impl LifecycleManager {
    pub fn new(storage: Arc<Storage>, chunks: Arc<ChunkStore>, vector_index: Arc<RwLock<VectorIndex>>) -> Self {
        Self { storage, chunks, vector_index }
    }

    fn log(&self, event_type: EventType, chunk_id: &str, payload: serde_json::Value) -> Result<()> {
        self.storage.append_event(&EventRecord::new(event_type, Some(chunk_id.to_string()), payload))
    }

    /// Moves every `Active` chunk untouched for `threshold_days` into
    /// `Demoted`. Demotion only rewrites `lifecycle_tier`/`demoted_at`; the
    /// chunk stays in the vector index (§3: demoted chunks remain
    /// searchable at half weight).
    pub fn demote_stale_chunks(&self, threshold_days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(threshold_days);
        let mut demoted = 0;
        for mut chunk in self.chunks.list_by_tier(LifecycleTier::Active)? {
            if chunk.last_accessed >= cutoff {
                continue;
            }
            chunk.lifecycle_tier = LifecycleTier::Demoted;
            chunk.metadata.demoted_at = Some(Utc::now());
            self.log(EventType::Demote, &chunk.chunk_id, serde_json::json!({"from": "active", "to": "demoted"}))?;
            self.chunks.put(&chunk)?;
            demoted += 1;
        }
        Ok(demoted)
    }

    /// Moves every `Demoted` chunk untouched for `threshold_days` into
    /// `Archived`: writes a compact `ArchiveSummary` under `archived:{id}`,
    /// drops the embedding from the vector index (archived chunks are never
    /// searchable directly, §3), and deletes the full `Chunk` record —
    /// only the summary survives until rekindled.
    pub fn archive_demoted_chunks(&self, threshold_days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(threshold_days);
        let mut archived = 0;
        for chunk in self.chunks.list_by_tier(LifecycleTier::Demoted)? {
            let demoted_at = match chunk.metadata.demoted_at {
                Some(ts) => ts,
                None => continue,
            };
            if demoted_at >= cutoff {
                continue;
            }
            let summary = summarize(&chunk);
            let value = serde_json::to_value(&summary)?;
            self.storage.kv_set(&archived_key(&chunk.chunk_id), &value)?;
            self.storage.kv_set(&metadata_key(&chunk.chunk_id), &serde_json::to_value(&chunk.metadata)?)?;
            self.vector_index.write().remove(&chunk.chunk_id).map_err(|e| StorageError::Init(e.to_string()))?;
            self.chunks.delete(&chunk.chunk_id)?;
            self.log(EventType::Archive, &chunk.chunk_id, serde_json::json!({"original_length": summary.original_length}))?;
            archived += 1;
        }
        Ok(archived)
    }

    /// Marks archived chunks older than `threshold_days` as rehydratable by
    /// writing a pointer under `rehydratable:{id}`.
    ///
    /// The original's `make_rehydratable` checked `"archived_at" in
    /// metadata_str` — a substring test against the metadata blob's key
    /// names, which is true for every archived chunk regardless of age and
    /// never actually compares against `threshold_days`. This compares the
    /// real `archived_at` timestamp against the cutoff.
    pub fn make_rehydratable(&self, threshold_days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(threshold_days);
        let mut marked = 0;
        for key in self.storage.kv_list_prefix(ARCHIVED_KEY_PREFIX)? {
            let Some(value) = self.storage.kv_get(&key)? else { continue };
            let Ok(summary) = serde_json::from_value::<ArchiveSummary>(value) else { continue };
            if summary.archived_at >= cutoff {
                continue;
            }
            let already = self.storage.kv_get(&rehydratable_key(&summary.chunk_id))?.is_some();
            if already {
                continue;
            }
            self.storage.kv_set(&rehydratable_key(&summary.chunk_id), &serde_json::json!({"marked_at": Utc::now()}))?;
            marked += 1;
        }
        Ok(marked)
    }

    /// Restores an archived or rehydratable chunk back to `Active`: reads
    /// the summary (and, if present, the full metadata saved alongside it)
    /// from KV, reads the full text from the file path it references, and
    /// re-indexes it with `embedding` (spec §4.11).
    ///
    /// The original's `rekindle_archived` recovered the source file path by
    /// splitting a stringified Python dict (`metadata_str.split("file_path")
    /// [1].split(",")[0]...`), falling back to a hardcoded
    /// `/default/path.md` whenever that parse failed, and never actually
    /// read the file back off disk. There is nothing to parse here: the
    /// file path is a structured `Option<String>` field on the archived
    /// summary, and the text is read straight off it. A missing summary is
    /// an error (there is nothing to rekindle); a missing or unreadable
    /// source file is not — per spec §9's resolved open question, that
    /// degrades to `Ok(false)` rather than failing the call.
    pub fn rekindle_archived(&self, embedding: &[f32], chunk_id: &str) -> Result<bool> {
        let Some(summary_value) = self.storage.kv_get(&archived_key(chunk_id))? else {
            return Err(StorageError::NotFound(format!("no archived chunk for {chunk_id}")));
        };
        let summary: ArchiveSummary = serde_json::from_value(summary_value)?;

        let Some(file_path) = summary.file_path.as_deref() else {
            return Ok(false);
        };
        let Ok(text) = std::fs::read_to_string(file_path) else {
            return Ok(false);
        };

        let mut metadata = match self.storage.kv_get(&metadata_key(chunk_id))? {
            Some(value) => serde_json::from_value(value).unwrap_or_default(),
            None => crate::memory::ChunkMetadata { file_path: summary.file_path.clone(), ..Default::default() },
        };
        metadata.rekindled_at = Some(Utc::now());

        let mut chunk = Chunk::new(chunk_id, &text, metadata);
        chunk.lifecycle_tier = LifecycleTier::Active;
        chunk.embedding = Some(embedding.to_vec());

        self.vector_index.write().add(chunk_id, embedding).map_err(|e| StorageError::Init(e.to_string()))?;
        self.chunks.put(&chunk)?;
        self.storage.kv_delete(&archived_key(chunk_id))?;
        self.storage.kv_delete(&metadata_key(chunk_id))?;
        self.storage.kv_delete(&rehydratable_key(chunk_id))?;
        self.log(EventType::Rekindle, chunk_id, serde_json::json!({}))?;

        Ok(true)
    }

    /// Merges near-duplicate active chunks: for every pair whose embeddings
    /// cosine-similarity exceeds `threshold`, keeps the more recently
    /// accessed one, marks it `consolidated`, and deletes the other from
    /// both the chunk store and the vector index.
    pub fn consolidate_similar(&self, threshold: f32) -> Result<usize> {
        let mut active = self.chunks.list_by_tier(LifecycleTier::Active)?;
        active.retain(|c| c.embedding.is_some());
        let mut absorbed: HashMap<String, bool> = HashMap::new();
        let mut merges = 0;

        for i in 0..active.len() {
            if absorbed.contains_key(&active[i].chunk_id) {
                continue;
            }
            for j in (i + 1)..active.len() {
                if absorbed.contains_key(&active[j].chunk_id) {
                    continue;
                }
                let (a, b) = (&active[i], &active[j]);
                let sim = cosine_similarity(a.embedding.as_ref().unwrap(), b.embedding.as_ref().unwrap());
                if sim < threshold {
                    continue;
                }
                let (keep, drop) = if a.last_accessed >= b.last_accessed { (a.chunk_id.clone(), b.chunk_id.clone()) } else { (b.chunk_id.clone(), a.chunk_id.clone()) };

                if let Some(mut keep_chunk) = self.chunks.get(&keep)? {
                    keep_chunk.metadata.consolidated = true;
                    keep_chunk.metadata.consolidated_at = Some(Utc::now());
                    self.chunks.put(&keep_chunk)?;
                }
                self.chunks.delete(&drop)?;
                self.vector_index.write().remove(&drop).map_err(|e| StorageError::Init(e.to_string()))?;
                self.log(EventType::ConsolidationMerge, &keep, serde_json::json!({"absorbed": drop.clone(), "similarity": sim}))?;

                absorbed.insert(drop, true);
                merges += 1;
            }
        }
        Ok(merges)
    }

    /// Aggregate counts across all four tiers, for the lifecycle-status
    /// Query API operation (spec §6).
    pub fn get_stage_stats(&self) -> Result<StageStats> {
        let mut stats = StageStats::default();
        for chunk in self.chunks.all()? {
            match chunk.lifecycle_tier {
                LifecycleTier::Active => stats.active += 1,
                LifecycleTier::Demoted => stats.demoted += 1,
                LifecycleTier::Archived => stats.archived += 1,
                LifecycleTier::Rehydratable => stats.rehydratable += 1,
            }
        }
        stats.archived += self.storage.kv_list_prefix(ARCHIVED_KEY_PREFIX)?.len();
        stats.rehydratable += self.storage.kv_list_prefix(REHYDRATABLE_KEY_PREFIX)?.len();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ChunkMetadata;

    fn manager() -> LifecycleManager {
        let storage = Arc::new(Storage::in_memory().unwrap());
        let chunks = Arc::new(ChunkStore::new(storage.clone()));
        let vector_index = Arc::new(RwLock::new(VectorIndex::new().unwrap()));
        LifecycleManager::new(storage, chunks, vector_index)
    }

    fn aged_chunk(id: &str, days_old: i64) -> Chunk {
        let mut chunk = Chunk::new(id, format!("body of {id}"), ChunkMetadata::default());
        chunk.last_accessed = Utc::now() - Duration::days(days_old);
        chunk
    }

    #[test]
    fn demote_stale_chunks_moves_only_old_ones() {
        let mgr = manager();
        mgr.chunks.put(&aged_chunk("stale", 10)).unwrap();
        mgr.chunks.put(&aged_chunk("fresh", 1)).unwrap();

        let demoted = mgr.demote_stale_chunks(7).unwrap();
        assert_eq!(demoted, 1);
        assert_eq!(mgr.chunks.get("stale").unwrap().unwrap().lifecycle_tier, LifecycleTier::Demoted);
        assert_eq!(mgr.chunks.get("fresh").unwrap().unwrap().lifecycle_tier, LifecycleTier::Active);
    }

    #[test]
    fn archive_demoted_chunks_respects_age_not_substring() {
        let mgr = manager();
        let mut old_demotion = aged_chunk("old", 40);
        old_demotion.lifecycle_tier = LifecycleTier::Demoted;
        old_demotion.metadata.demoted_at = Some(Utc::now() - Duration::days(40));

        let mut recent_demotion = aged_chunk("recent", 5);
        recent_demotion.lifecycle_tier = LifecycleTier::Demoted;
        recent_demotion.metadata.demoted_at = Some(Utc::now() - Duration::days(5));

        mgr.chunks.put(&old_demotion).unwrap();
        mgr.chunks.put(&recent_demotion).unwrap();

        let archived = mgr.archive_demoted_chunks(30).unwrap();
        assert_eq!(archived, 1);
        assert!(mgr.chunks.get("old").unwrap().is_none());
        assert!(mgr.chunks.get("recent").unwrap().is_some());
        assert!(mgr.storage.kv_get(&archived_key("old")).unwrap().is_some());
    }

    #[test]
    fn make_rehydratable_is_age_based_not_key_presence() {
        let mgr = manager();
        let fresh_summary = ArchiveSummary {
            chunk_id: "fresh".to_string(),
            summary: "x".to_string(),
            original_length: 1,
            file_path: None,
            archived_at: Utc::now(),
        };
        let old_summary = ArchiveSummary {
            chunk_id: "old".to_string(),
            summary: "y".to_string(),
            original_length: 1,
            file_path: None,
            archived_at: Utc::now() - Duration::days(100),
        };
        mgr.storage.kv_set(&archived_key("fresh"), &serde_json::to_value(&fresh_summary).unwrap()).unwrap();
        mgr.storage.kv_set(&archived_key("old"), &serde_json::to_value(&old_summary).unwrap()).unwrap();

        let marked = mgr.make_rehydratable(90).unwrap();
        assert_eq!(marked, 1, "only the genuinely old archive crosses the threshold");
        assert!(mgr.storage.kv_get(&rehydratable_key("old")).unwrap().is_some());
        assert!(mgr.storage.kv_get(&rehydratable_key("fresh")).unwrap().is_none());
    }

    #[test]
    fn rekindle_archived_reads_the_file_and_restores_metadata() {
        let mgr = manager();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "recovered text, read from disk").unwrap();
        let file_path = file.path().to_str().unwrap().to_string();

        let mut metadata = ChunkMetadata::default();
        metadata.file_path = Some(file_path.clone());
        metadata.tags = vec!["manual".to_string()];
        mgr.storage.kv_set(&metadata_key("c1"), &serde_json::to_value(&metadata).unwrap()).unwrap();

        let summary = ArchiveSummary {
            chunk_id: "c1".to_string(),
            summary: "...".to_string(),
            original_length: 10,
            file_path: Some(file_path.clone()),
            archived_at: Utc::now() - Duration::days(40),
        };
        mgr.storage.kv_set(&archived_key("c1"), &serde_json::to_value(&summary).unwrap()).unwrap();

        let embedding = vec![0.1_f32; crate::vector::DEFAULT_DIMENSIONS];
        let restored = mgr.rekindle_archived(&embedding, "c1").unwrap();
        assert!(restored, "a readable source file must rekindle successfully");

        let chunk = mgr.chunks.get("c1").unwrap().unwrap();
        assert_eq!(chunk.text, "recovered text, read from disk");
        assert_eq!(chunk.metadata.file_path.as_deref(), Some(file_path.as_str()));
        assert_eq!(chunk.metadata.tags, vec!["manual".to_string()]);
        assert_eq!(chunk.lifecycle_tier, LifecycleTier::Active);
        assert!(chunk.metadata.rekindled_at.is_some());
        assert!(mgr.vector_index.read().contains("c1"));
        assert!(mgr.storage.kv_get(&archived_key("c1")).unwrap().is_none());
        assert!(mgr.storage.kv_get(&metadata_key("c1")).unwrap().is_none());
    }

    #[test]
    fn rekindle_archived_with_missing_source_file_returns_false() {
        let mgr = manager();
        let summary = ArchiveSummary {
            chunk_id: "c1".to_string(),
            summary: "...".to_string(),
            original_length: 10,
            file_path: Some("/nonexistent/path/does-not-exist.md".to_string()),
            archived_at: Utc::now() - Duration::days(40),
        };
        mgr.storage.kv_set(&archived_key("c1"), &serde_json::to_value(&summary).unwrap()).unwrap();

        let embedding = vec![0.1_f32; crate::vector::DEFAULT_DIMENSIONS];
        let restored = mgr.rekindle_archived(&embedding, "c1").unwrap();
        assert!(!restored, "a missing source file must degrade to Ok(false), not an error");

        // the archive is left in place so a later retry is still possible
        assert!(mgr.storage.kv_get(&archived_key("c1")).unwrap().is_some());
        assert!(mgr.chunks.get("c1").unwrap().is_none());
    }

    #[test]
    fn rekindle_unknown_chunk_fails() {
        let mgr = manager();
        let embedding = vec![0.0_f32; crate::vector::DEFAULT_DIMENSIONS];
        assert!(mgr.rekindle_archived(&embedding, "missing").is_err());
    }

    #[test]
    fn consolidate_similar_merges_near_duplicates() {
        let mgr = manager();
        let embedding = vec![0.5_f32; crate::vector::DEFAULT_DIMENSIONS];

        let mut a = Chunk::new("a", "duplicate text", ChunkMetadata::default());
        a.embedding = Some(embedding.clone());
        a.last_accessed = Utc::now() - Duration::hours(2);

        let mut b = Chunk::new("b", "duplicate text again", ChunkMetadata::default());
        b.embedding = Some(embedding.clone());
        b.last_accessed = Utc::now();

        mgr.chunks.put(&a).unwrap();
        mgr.chunks.put(&b).unwrap();

        let merges = mgr.consolidate_similar(0.99).unwrap();
        assert_eq!(merges, 1);
        assert!(mgr.chunks.get("a").unwrap().is_none());
        let kept = mgr.chunks.get("b").unwrap().unwrap();
        assert!(kept.metadata.consolidated);
    }

    #[test]
    fn stage_stats_aggregate_across_tiers() {
        let mgr = manager();
        mgr.chunks.put(&Chunk::new("c1", "t", ChunkMetadata::default())).unwrap();
        mgr.storage.kv_set(&archived_key("c2"), &serde_json::json!({"x": 1})).unwrap();

        let stats = mgr.get_stage_stats().unwrap();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.archived, 1);
    }
}
