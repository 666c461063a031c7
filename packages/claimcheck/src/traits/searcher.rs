//! Web search collaborator.
//!
//! Abstracts over search providers (Tavily, SerpAPI, etc.). Hits carry the
//! snippet text and source URL; the web evidence provider turns them into
//! ranked evidence.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::security::SecretString;

/// A snippet discovered by web search.
#[derive(Debug, Clone, PartialEq)]
pub struct WebHit {
    /// Stable id for citation (usually the URL)
    pub id: String,

    /// Snippet or extracted page content
    pub text: String,

    /// Page URL
    pub url: Url,

    /// Relevance score (0.0-1.0, if provided by search API)
    pub score: Option<f32>,
}

impl WebHit {
    /// Create a hit whose id is its URL.
    pub fn new(url: Url, text: impl Into<String>) -> Self {
        Self {
            id: url.to_string(),
            text: text.into(),
            url,
            score: None,
        }
    }

    /// Create from a URL string.
    pub fn from_url(url: &str, text: impl Into<String>) -> Option<Self> {
        Url::parse(url).ok().map(|u| Self::new(u, text))
    }

    /// Use a custom id instead of the URL.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a relevance score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// Web search trait for open-world evidence.
///
/// Implementations classify failures: `Timeout` and `RateLimited` are
/// recoverable by the orchestrator, `Unavailable` is not.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web and return up to `top_k` hits, best first.
    async fn search(&self, query: &str, top_k: usize) -> ProviderResult<Vec<WebHit>>;
}

/// Tavily-backed web searcher.
pub struct TavilyWebSearcher {
    api_key: SecretString,
    client: reqwest::Client,
    base_url: String,
    search_depth: String,
}

impl TavilyWebSearcher {
    /// Create a new Tavily web searcher.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            base_url: "https://api.tavily.com".to_string(),
            search_depth: "basic".to_string(),
        }
    }

    /// Set a custom base URL (for proxies and tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Use "advanced" search depth (slower, more content per hit).
    pub fn advanced(mut self) -> Self {
        self.search_depth = "advanced".to_string();
        self
    }
}

/// Map an HTTP status to the provider error taxonomy.
fn classify_status(status: StatusCode, retry_after: Option<Duration>) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout {
            after: Duration::ZERO,
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::InvalidRequest(format!("Tavily API rejected request: {}", status))
        }
        _ => ProviderError::Unavailable(format!("Tavily API error: {}", status)),
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            after: Duration::ZERO,
        }
    } else {
        ProviderError::unavailable(err)
    }
}

#[async_trait]
impl WebSearcher for TavilyWebSearcher {
    async fn search(&self, query: &str, top_k: usize) -> ProviderResult<Vec<WebHit>> {
        #[derive(serde::Serialize)]
        struct Request<'a> {
            query: &'a str,
            search_depth: &'a str,
            max_results: usize,
        }

        #[derive(serde::Deserialize)]
        struct Response {
            results: Vec<TavilyResult>,
        }

        #[derive(serde::Deserialize)]
        struct TavilyResult {
            url: String,
            content: Option<String>,
            title: Option<String>,
            score: Option<f32>,
        }

        let request = Request {
            query,
            search_depth: &self.search_depth,
            max_results: top_k,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(classify_status(response.status(), retry_after));
        }

        let tavily_response: Response = response.json().await.map_err(classify_transport)?;

        let hits = tavily_response
            .results
            .into_iter()
            .filter_map(|r| {
                let text = r.content.or(r.title)?;
                let mut hit = WebHit::from_url(&r.url, text)?;
                if let Some(score) = r.score {
                    hit = hit.with_score(score);
                }
                Some(hit)
            })
            .take(top_k)
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_hit_id_defaults_to_url() {
        let hit = WebHit::from_url("https://example.com/gdp", "GDP figures").unwrap();
        assert_eq!(hit.id, "https://example.com/gdp");
        assert_eq!(hit.with_id("custom").id, "custom");
        assert!(WebHit::from_url("not a url", "x").is_none());
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(3))),
            ProviderError::RateLimited {
                retry_after: Some(_)
            }
        ));
        assert!(classify_status(StatusCode::GATEWAY_TIMEOUT, None).is_transient());
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, None),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, None),
            ProviderError::InvalidRequest(_)
        ));
    }
}
