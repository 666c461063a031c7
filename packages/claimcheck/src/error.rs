//! Typed errors for claim verification.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the exact failure and decide whether a run is recoverable.

use std::time::Duration;
use thiserror::Error;

/// Failure of an external collaborator (vector index, embedder, web search,
/// language model).
///
/// Timeouts and rate limits are kept distinct from plain unavailability so
/// the orchestrator can degrade instead of aborting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Backing service unreachable or returned a hard failure
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Call did not complete in time
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },

    /// Service (or local quota) refused the call
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Caller passed arguments the provider cannot serve
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Shorthand for an `Unavailable` error from any displayable cause.
    pub fn unavailable(cause: impl std::fmt::Display) -> Self {
        Self::Unavailable(cause.to_string())
    }

    /// Timeouts and rate limits are worth degrading around.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RateLimited { .. })
    }
}

/// Errors raised by the verdict reasoner.
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// Model output could not be parsed into a verdict, even after the retry
    #[error("could not parse verdict after {attempts} attempts: {reason}")]
    Unparseable { attempts: usize, reason: String },

    /// The language model itself failed
    #[error("language model error: {0}")]
    Model(#[source] ProviderError),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A field is outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A required value was not supplied
    #[error("missing required value: {0}")]
    Missing(&'static str),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Terminal failures of a verification request.
///
/// Transient web failures never show up here: they are absorbed as a
/// degradation and annotated in the result's reasoning.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A provider whose absence changes the verification contract is down
    #[error("{provider} provider unavailable: {message}")]
    ProviderUnavailable {
        provider: &'static str,
        message: String,
    },

    /// A provider timed out and no degradation path applied
    #[error("{provider} provider timed out after {after:?}")]
    ProviderTimeout {
        provider: &'static str,
        after: Duration,
    },

    /// A provider was rate limited and no degradation path applied
    #[error("{provider} provider rate limited")]
    ProviderRateLimited { provider: &'static str },

    /// Verdict could not be produced
    #[error("reasoner error: {0}")]
    Reasoner(#[from] ReasonerError),

    /// The caller's deadline passed
    #[error("request timed out after {after:?}")]
    RequestTimeout { after: Duration },

    /// Configuration or request parameters are invalid
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,
}

impl VerifyError {
    /// Attribute a provider failure to the named provider.
    pub fn from_provider(provider: &'static str, err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(message) => Self::ProviderUnavailable { provider, message },
            ProviderError::Timeout { after } => Self::ProviderTimeout { provider, after },
            ProviderError::RateLimited { .. } => Self::ProviderRateLimited { provider },
            ProviderError::InvalidRequest(reason) => {
                Self::Configuration(ConfigError::Invalid {
                    field: "request",
                    reason: format!("{provider}: {reason}"),
                })
            }
        }
    }
}

/// Result type alias for collaborator calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Result type alias for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
