//! In-memory vector index for tests, demos and small corpora.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::{ProviderError, ProviderResult};
use crate::traits::index::{cosine_similarity, IndexHit, VectorIndex};

/// A stored passage with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Linear-scan cosine index.
///
/// Passages keep insertion order, which breaks score ties. Not suitable for
/// large corpora: every search scans every passage.
#[derive(Default)]
pub struct MemoryIndex {
    passages: RwLock<Vec<Passage>>,
}

impl MemoryIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a passage, replacing any passage with the same id in place.
    pub fn insert(&self, id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) {
        let passage = Passage {
            id: id.into(),
            text: text.into(),
            embedding,
        };
        let mut passages = self.passages.write().unwrap_or_else(|e| e.into_inner());
        match passages.iter_mut().find(|p| p.id == passage.id) {
            Some(existing) => *existing = passage,
            None => passages.push(passage),
        }
    }

    /// Number of stored passages.
    pub fn len(&self) -> usize {
        self.passages.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all passages.
    pub fn clear(&self) {
        self.passages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn search(&self, embedding: &[f32], top_k: usize) -> ProviderResult<Vec<IndexHit>> {
        let passages = self
            .passages
            .read()
            .map_err(|_| ProviderError::Unavailable("memory index lock poisoned".into()))?;

        let mut hits: Vec<IndexHit> = passages
            .iter()
            .map(|p| IndexHit::new(&p.id, &p.text, cosine_similarity(embedding, &p.embedding)))
            .collect();

        // Stable: equal scores keep insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}
