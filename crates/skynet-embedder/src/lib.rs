//! Deterministic text → fixed-dimension vector embedding (C1).
//!
//! Narrow interface, same shape as `skynet-agent::provider::LlmProvider`:
//! the rest of the system depends on the `Embedder` trait object, not on a
//! concrete model. The default implementation needs no network call and no
//! model weights, so "offline operation without an embedding model" holds
//! trivially for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedder backend error: {0}")]
    Backend(String),
}

/// L2-normalized fixed-length vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Cosine similarity. Both vectors are expected L2-normalized (callers
    /// get that for free from `Embedder::embed`), so this reduces to a dot
    /// product; kept as a full cosine for vectors obtained elsewhere.
    pub fn cosine_similarity(&self, other: &Embedding) -> f64 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum();
        let norm_a: f32 = self.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b: f32 = other.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (dot / (norm_a * norm_b)) as f64
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn from_json(s: &str) -> Option<Embedding> {
        serde_json::from_str::<Vec<f32>>(s).ok().map(Embedding)
    }
}

/// Text → vector embedder. A pure function of input plus the configured
/// dimension: identical text always yields an identical vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedderError> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }
}

/// Hashing-based bag-of-tokens embedder: tokenizes on whitespace/punctuation,
/// hashes each token into a bucket in `[0, dimension)`, accumulates signed
/// weight per bucket (feature hashing / "hashing trick"), then L2-normalizes.
/// Deterministic, needs no model and no RNG.
pub struct DeterministicEmbedder {
    dimension: usize,
}

impl DeterministicEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }

    /// FNV-1a, stable across process runs/platforms — required for
    /// determinism (unlike `std::hash::Hash`, whose `DefaultHasher` is
    /// seeded randomly per-process).
    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for &b in bytes {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError> {
        let mut vec = vec![0f32; self.dimension];
        for token in Self::tokenize(text) {
            let h = Self::fnv1a(token.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            // Sign bit from a second, independent hash bit avoids every
            // token incrementing the same direction (collapses to a
            // bag-of-words magnitude vector otherwise).
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vec.iter_mut() {
                *v /= norm;
            }
        }
        Ok(Embedding(vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_for_identical_input() {
        let e = DeterministicEmbedder::new(64);
        let a = e.embed("I like chocolate").await.unwrap();
        let b = e.embed("I like chocolate").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fixed_dimension() {
        let e = DeterministicEmbedder::new(64);
        let v = e.embed("hello world").await.unwrap();
        assert_eq!(v.dimension(), 64);
    }

    #[tokio::test]
    async fn similar_text_scores_higher_than_unrelated() {
        let e = DeterministicEmbedder::new(256);
        let chocolate_a = e.embed("I like chocolate").await.unwrap();
        let chocolate_b = e.embed("I love chocolate a lot").await.unwrap();
        let unrelated = e.embed("the weather in paris is rainy today").await.unwrap();
        let sim_related = chocolate_a.cosine_similarity(&chocolate_b);
        let sim_unrelated = chocolate_a.cosine_similarity(&unrelated);
        assert!(sim_related > sim_unrelated);
    }

    #[test]
    fn embedding_json_round_trips() {
        let e = Embedding(vec![0.1, -0.2, 0.3]);
        let json = e.to_json();
        let back = Embedding::from_json(&json).unwrap();
        assert_eq!(e, back);
    }
}
