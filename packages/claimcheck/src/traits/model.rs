//! Language reasoning collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;

/// Everything the model needs for one completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPayload {
    /// System instructions
    pub system: String,

    /// User message (claim plus evidence)
    pub user: String,

    /// JSON schema of the expected reply, for models with structured output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

impl PromptPayload {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            response_schema: None,
        }
    }

    /// Attach a reply schema.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Text completion service.
///
/// The core builds the payload and parses the returned text; the model is
/// confined to text generation over fixed evidence.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, payload: &PromptPayload) -> ProviderResult<String>;
}
