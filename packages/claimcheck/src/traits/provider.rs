//! Evidence provider trait.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::evidence::{EvidenceSet, SourceType};

/// A source of ranked evidence for a query.
///
/// # Implementations
///
/// - `LocalEvidenceProvider` - embedder + vector index
/// - `WebEvidenceProvider` - web search with timeout and quota
/// - `MockEvidenceProvider` - for testing
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// The kind of evidence this provider yields.
    fn source_type(&self) -> SourceType;

    /// Return at most `top_k` items, best first.
    ///
    /// An empty set is a valid answer, not an error.
    async fn search(&self, query: &str, top_k: usize) -> ProviderResult<EvidenceSet>;
}
