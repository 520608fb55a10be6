//! A dependency-free `EmbeddingProvider` used by tests and by any build
//! without the `embeddings` feature enabled. Deterministic so tests can
//! assert on exact similarity relationships without a model download.

use super::EmbeddingProvider;
use std::convert::Infallible;

pub const DETERMINISTIC_DIMENSIONS: usize = 32;

pub struct DeterministicEmbedder;

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self
    }
}

/// Hashes each word into a bucket and accumulates a bag-of-words vector,
/// then L2-normalizes — enough structure for "similar text -> similar
/// vector" without pulling in a real model.
fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; DETERMINISTIC_DIMENSIONS];
    for word in text.to_lowercase().split_whitespace() {
        let bucket = fnv1a(word.as_bytes()) as usize % DETERMINISTIC_DIMENSIONS;
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl EmbeddingProvider for DeterministicEmbedder {
    type Error = Infallible;

    fn dimensions(&self) -> usize {
        DETERMINISTIC_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, Infallible> {
        Ok(embed_text(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, Infallible> {
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::similarity::cosine_similarity;

    #[test]
    fn identical_text_is_identical_vector() {
        let embedder = DeterministicEmbedder;
        let a = embedder.embed("Tesla was founded by Elon Musk").unwrap();
        let b = embedder.embed("Tesla was founded by Elon Musk").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn overlapping_text_is_more_similar_than_unrelated_text() {
        let embedder = DeterministicEmbedder;
        let query = embedder.embed("Tesla founded California").unwrap();
        let related = embedder.embed("Tesla California electric cars").unwrap();
        let unrelated = embedder.embed("pizza recipe dough yeast").unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }
}
