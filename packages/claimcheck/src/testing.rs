//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the claimcheck library
//! without making real model, embedding or network calls.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};
use crate::traits::{
    index::Embedder,
    model::{LanguageModel, PromptPayload},
    provider::EvidenceProvider,
    searcher::{WebHit, WebSearcher},
};
use crate::types::evidence::{EvidenceSet, SourceType};

/// A mock embedder.
///
/// Returns predefined embeddings by exact text, and a deterministic
/// hash-derived vector for anything else.
pub struct MockEmbedder {
    /// Predefined embeddings by text
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,

    /// Dimension of generated embeddings
    embedding_dim: usize,

    /// Error returned for every call, if set
    failure: Option<ProviderError>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    /// Create a mock producing 3-dimensional embeddings.
    pub fn new() -> Self {
        Self {
            embeddings: Arc::new(RwLock::new(HashMap::new())),
            embedding_dim: 3,
            failure: None,
        }
    }

    /// Set the dimension of generated embeddings.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Add a predefined embedding for text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap()
            .insert(text.into(), embedding);
        self
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Generate a deterministic embedding based on text.
    fn generate_deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();

        (0..self.embedding_dim)
            .map(|i| {
                let byte = hash[i % 32] as f32;
                // Normalize to [-1, 1] range
                (byte / 127.5) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        if let Some(embedding) = self.embeddings.read().unwrap().get(text) {
            return Ok(embedding.clone());
        }

        Ok(self.generate_deterministic_embedding(text))
    }
}

/// A mock web searcher.
///
/// Unknown queries return no hits.
#[derive(Default)]
pub struct MockWebSearcher {
    /// Predefined hits by query
    hits: Arc<RwLock<HashMap<String, Vec<WebHit>>>>,

    /// Delay before answering
    delay: Option<Duration>,

    /// Error returned for every call, if set
    failure: Option<ProviderError>,

    /// Queries received, in order
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockWebSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add predefined hits for a query.
    pub fn with_hits(self, query: impl Into<String>, hits: Vec<WebHit>) -> Self {
        self.hits.write().unwrap().insert(query.into(), hits);
        self
    }

    /// Sleep before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str, top_k: usize) -> ProviderResult<Vec<WebHit>> {
        self.queries.write().unwrap().push(query.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let hits = self
            .hits
            .read()
            .unwrap()
            .get(query)
            .map(|hits| hits.iter().take(top_k).cloned().collect())
            .unwrap_or_default();

        Ok(hits)
    }
}

/// A mock language model.
///
/// Replies are consumed in the order they were queued. Every prompt is
/// recorded for assertions.
#[derive(Default)]
pub struct MockLanguageModel {
    /// Queued replies
    replies: Arc<RwLock<VecDeque<String>>>,

    /// Delay before answering
    delay: Option<Duration>,

    /// Error returned for every call, if set
    failure: Option<ProviderError>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<PromptPayload>>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.replies.write().unwrap().push_back(reply.into());
        self
    }

    /// Sleep before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Get all prompts sent to this mock.
    pub fn calls(&self) -> Vec<PromptPayload> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, prompt: &PromptPayload) -> ProviderResult<String> {
        self.calls.write().unwrap().push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        self.replies
            .write()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::Unavailable("no reply queued".into()))
    }
}

/// A mock evidence provider returning a fixed set.
pub struct MockEvidenceProvider {
    source_type: SourceType,
    evidence: EvidenceSet,
    delay: Option<Duration>,
    failure: Option<ProviderError>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockEvidenceProvider {
    fn with_source(source_type: SourceType, evidence: EvidenceSet) -> Self {
        Self {
            source_type,
            evidence,
            delay: None,
            failure: None,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A local provider answering with `evidence`.
    pub fn local(evidence: EvidenceSet) -> Self {
        Self::with_source(SourceType::Local, evidence)
    }

    /// A web provider answering with `evidence`.
    pub fn web(evidence: EvidenceSet) -> Self {
        Self::with_source(SourceType::Web, evidence)
    }

    /// A provider that fails every call with `error`.
    pub fn failing(source_type: SourceType, error: ProviderError) -> Self {
        Self {
            failure: Some(error),
            ..Self::with_source(source_type, EvidenceSet::empty())
        }
    }

    /// Sleep before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl EvidenceProvider for MockEvidenceProvider {
    fn name(&self) -> &'static str {
        self.source_type.as_str()
    }

    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn search(&self, query: &str, top_k: usize) -> ProviderResult<EvidenceSet> {
        self.calls.write().unwrap().push(query.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        Ok(self.evidence.clone().truncated(top_k))
    }
}
