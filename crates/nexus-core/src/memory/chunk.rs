//! The `Chunk` — the primary unit of stored memory (spec §3).
//!
//! Invariants: `score_multiplier` is determined by `lifecycle_tier`;
//! `last_accessed >= created_at`; a chunk in `Archived`/`Rehydratable` is
//! never present in the vector index.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleTier {
    #[default]
    Active,
    Demoted,
    Archived,
    Rehydratable,
}

impl LifecycleTier {
    /// Score multiplier per spec §3: 1.0 / 0.5 / 0.1 / 0.01.
    pub fn score_multiplier(self) -> f64 {
        match self {
            LifecycleTier::Active => 1.0,
            LifecycleTier::Demoted => 0.5,
            LifecycleTier::Archived => 0.1,
            LifecycleTier::Rehydratable => 0.01,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleTier::Active => "active",
            LifecycleTier::Demoted => "demoted",
            LifecycleTier::Archived => "archived",
            LifecycleTier::Rehydratable => "rehydratable",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LifecycleTier::Active),
            "demoted" => Some(LifecycleTier::Demoted),
            "archived" => Some(LifecycleTier::Archived),
            "rehydratable" => Some(LifecycleTier::Rehydratable),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The typed envelope produced by the tagging protocol (spec §6), plus a
/// free-form extras map for anything else the caller supplied.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub file_path: Option<String>,
    pub chunk_index: i64,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub demoted_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub rekindled_at: Option<DateTime<Utc>>,
    pub consolidated: bool,
    pub consolidated_at: Option<DateTime<Utc>>,
    /// Everything from the tagging envelope (WHO/WHEN/PROJECT/WHY,
    /// agent_name, timestamps, intent, tagging version) plus any
    /// caller-supplied extras not otherwise modeled.
    pub extras: HashMap<String, String>,
}

impl ChunkMetadata {
    pub fn text_preview(&self, text: &str, len: usize) -> String {
        if text.len() <= len {
            text.to_string()
        } else {
            let mut cut = len;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &text[..cut])
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
    pub lifecycle_tier: LifecycleTier,
    pub last_accessed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(chunk_id: impl Into<String>, text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        let now = Utc::now();
        Self {
            chunk_id: chunk_id.into(),
            text: text.into(),
            embedding: None,
            metadata,
            lifecycle_tier: LifecycleTier::Active,
            last_accessed: now,
            created_at: now,
        }
    }

    pub fn score_multiplier(&self) -> f64 {
        self.lifecycle_tier.score_multiplier()
    }

    /// A chunk in Archived/Rehydratable state must not be present in the
    /// vector index — this predicate is the contract the lifecycle manager
    /// enforces on every state transition.
    pub fn in_vector_index(&self) -> bool {
        matches!(
            self.lifecycle_tier,
            LifecycleTier::Active | LifecycleTier::Demoted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_tier_multipliers() {
        assert_eq!(LifecycleTier::Active.score_multiplier(), 1.0);
        assert_eq!(LifecycleTier::Demoted.score_multiplier(), 0.5);
        assert_eq!(LifecycleTier::Archived.score_multiplier(), 0.1);
        assert_eq!(LifecycleTier::Rehydratable.score_multiplier(), 0.01);
    }

    #[test]
    fn lifecycle_tier_roundtrip() {
        for tier in [
            LifecycleTier::Active,
            LifecycleTier::Demoted,
            LifecycleTier::Archived,
            LifecycleTier::Rehydratable,
        ] {
            assert_eq!(LifecycleTier::parse_name(tier.as_str()), Some(tier));
        }
    }

    #[test]
    fn new_chunk_defaults_to_active_and_in_index() {
        let chunk = Chunk::new("c1", "hello world", ChunkMetadata::default());
        assert_eq!(chunk.lifecycle_tier, LifecycleTier::Active);
        assert!(chunk.in_vector_index());
        assert_eq!(chunk.last_accessed, chunk.created_at);
    }

    #[test]
    fn archived_chunk_not_in_vector_index() {
        let mut chunk = Chunk::new("c1", "hello", ChunkMetadata::default());
        chunk.lifecycle_tier = LifecycleTier::Archived;
        assert!(!chunk.in_vector_index());
    }
}
