//! Embedding and vector index collaborators.
//!
//! The core never generates embeddings or ranks vectors itself. Both are
//! delegated to these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;

/// Text embedding service.
///
/// Returns a fixed-dimension vector for a text input. Treated as a black box.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>>;
}

/// One passage returned by a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    /// Stable passage id, used as the evidence source id
    pub id: String,

    /// Passage text
    pub text: String,

    /// Similarity score (higher is closer)
    pub score: f32,
}

impl IndexHit {
    pub fn new(id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            score,
        }
    }
}

/// Vector similarity search over a document index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` passages nearest to `embedding`.
    ///
    /// Hits come back ranked best first; equal scores keep index
    /// insertion order.
    async fn search(&self, embedding: &[f32], top_k: usize) -> ProviderResult<Vec<IndexHit>>;
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
