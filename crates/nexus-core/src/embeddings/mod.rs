//! C2 — the embedder is an opaque encoder (spec §1): `EmbeddingProvider` is
//! the trait every tier/service depends on; `EmbeddingService` (feature
//! `embeddings`) is the production fastembed-backed implementation,
//! `DeterministicEmbedder` is the always-available test/fallback one.

pub mod deterministic;
#[cfg(feature = "embeddings")]
mod local;
pub mod similarity;

pub use deterministic::DeterministicEmbedder;
#[cfg(feature = "embeddings")]
pub use local::{EmbeddingError, EmbeddingService, EMBEDDING_DIMENSIONS};
pub use similarity::{cosine_distance, cosine_similarity, distance_to_similarity, dot_product, euclidean_distance};

pub trait EmbeddingProvider {
    type Error: std::error::Error;

    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, Self::Error>;
}
