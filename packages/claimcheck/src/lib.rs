//! Evidence-Routed Claim Verification
//!
//! Decides whether a natural-language claim is TRUE, FALSE, or INSUFFICIENT,
//! with a short justification and the ids of the evidence it relied on.
//!
//! # Design Philosophy
//!
//! **"Local first, web when needed, never uncited"**
//!
//! - Private corpus is searched first; the web is a fallback
//! - The model only judges fixed evidence, it never picks tools
//! - Every TRUE/FALSE verdict cites evidence that was actually retrieved
//! - Web trouble degrades the answer instead of failing the request
//!
//! # Usage
//!
//! ```rust,ignore
//! use claimcheck::{LocalEvidenceProvider, MemoryIndex, Orchestrator, VerifyConfig};
//! use claimcheck::{TavilyWebSearcher, WebEvidenceProvider};
//! use claimcheck::ai::OpenAI;
//!
//! let ai = OpenAI::new("sk-...");
//! let local = LocalEvidenceProvider::new(ai.clone(), MemoryIndex::new());
//! let web = WebEvidenceProvider::new(TavilyWebSearcher::new("tvly-..."));
//! let orchestrator = Orchestrator::new(local, web, ai, VerifyConfig::default())?;
//!
//! let result = orchestrator.verify("The Eiffel Tower is located in Paris").await?;
//! println!("{} ({:.2})", result.verdict(), result.confidence());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (Embedder, VectorIndex, WebSearcher, LanguageModel)
//! - [`types`] - Claims, verdicts, evidence and configuration
//! - [`providers`] - Local and web evidence providers
//! - [`pipeline`] - Aggregation, reasoning and the routing orchestrator
//! - [`stores`] - Vector index implementations (MemoryIndex)
//! - [`security`] - Credential handling
//! - [`settings`] - Environment-backed settings for binaries
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod providers;
pub mod security;
pub mod settings;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{ConfigError, ProviderError, ReasonerError, VerifyError};
pub use traits::{
    index::{Embedder, IndexHit, VectorIndex},
    model::{LanguageModel, PromptPayload},
    provider::EvidenceProvider,
    searcher::{TavilyWebSearcher, WebHit, WebSearcher},
};
pub use types::{
    claim::{Claim, Verdict, VerificationResult},
    config::{RequestOverrides, RoutingMode, VerifyConfig},
    evidence::{EvidenceItem, EvidenceSet, SourceType},
};

// Re-export pipeline components
pub use pipeline::{
    merge, Degradation, Orchestrator, VerdictReasoner, VerificationOutcome, VerificationState,
};

pub use providers::{LocalEvidenceProvider, WebEvidenceProvider};
pub use security::SecretString;
pub use settings::Settings;
pub use stores::MemoryIndex;
