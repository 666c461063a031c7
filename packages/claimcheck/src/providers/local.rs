//! Local evidence from a vector index.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::traits::{
    index::{Embedder, VectorIndex},
    provider::EvidenceProvider,
};
use crate::types::claim::clamp_unit;
use crate::types::evidence::{EvidenceItem, EvidenceSet, SourceType};

/// Evidence provider backed by an embedder and a vector index.
///
/// # Example
///
/// ```rust,ignore
/// let provider = LocalEvidenceProvider::new(embedder, MemoryIndex::new());
/// let evidence = provider.search("The Eiffel Tower is in Paris", 5).await?;
/// ```
pub struct LocalEvidenceProvider<E: Embedder, V: VectorIndex> {
    embedder: E,
    index: V,
    min_score: f32,
}

impl<E: Embedder, V: VectorIndex> LocalEvidenceProvider<E, V> {
    /// Create a provider that keeps every passage the index returns.
    pub fn new(embedder: E, index: V) -> Self {
        Self {
            embedder,
            index,
            min_score: 0.0,
        }
    }

    /// Drop passages scoring below `min_score` (clamped into [0, 1]).
    ///
    /// Default: 0.0 (keep whatever the index returns).
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = clamp_unit(min_score);
        self
    }

    /// The backing index.
    pub fn index(&self) -> &V {
        &self.index
    }
}

#[async_trait]
impl<E: Embedder, V: VectorIndex> EvidenceProvider for LocalEvidenceProvider<E, V> {
    fn name(&self) -> &'static str {
        "local"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Local
    }

    async fn search(&self, query: &str, top_k: usize) -> ProviderResult<EvidenceSet> {
        if top_k == 0 {
            return Err(ProviderError::InvalidRequest("top_k must be > 0".into()));
        }

        // Any embedder failure means the index is unreachable for this query
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| match e {
                ProviderError::InvalidRequest(reason) => ProviderError::InvalidRequest(reason),
                other => ProviderError::Unavailable(format!("embedding failed: {}", other)),
            })?;

        let hits = self.index.search(&embedding, top_k).await.map_err(|e| match e {
            ProviderError::Unavailable(message) => ProviderError::Unavailable(message),
            other => ProviderError::Unavailable(format!("vector index failed: {}", other)),
        })?;

        let returned = hits.len();
        let evidence = EvidenceSet::from_items(
            hits.into_iter()
                .map(|hit| EvidenceItem::local(hit.id, hit.text, hit.score)),
        )
        .above(self.min_score)
        .truncated(top_k);

        debug!(
            returned = returned,
            kept = evidence.len(),
            min_score = self.min_score,
            "Local search complete"
        );

        Ok(evidence)
    }
}
