//! Core trait abstractions.
//!
//! Collaborators (embedder, vector index, web search, language model) are
//! thin external services the application plugs in. `EvidenceProvider` is
//! the seam the orchestrator routes through.

pub mod index;
pub mod model;
pub mod provider;
pub mod searcher;
