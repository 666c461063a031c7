//! Web evidence with a hard timeout and an optional client-side quota.

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::traits::{provider::EvidenceProvider, searcher::WebSearcher};
use crate::types::evidence::{EvidenceItem, EvidenceSet, SourceType};

type DefaultRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// Default timeout for a single search call.
pub const DEFAULT_WEB_TIMEOUT: Duration = Duration::from_secs(10);

/// Evidence provider backed by a web searcher.
///
/// Never blocks past its timeout. When a quota is configured and exhausted
/// the call fails fast with `RateLimited` instead of waiting for a permit.
pub struct WebEvidenceProvider<W: WebSearcher> {
    searcher: W,
    timeout: Duration,
    limiter: Option<Arc<DefaultRateLimiter>>,
}

impl<W: WebSearcher> WebEvidenceProvider<W> {
    /// Create a provider with the default 10s timeout and no quota.
    pub fn new(searcher: W) -> Self {
        Self {
            searcher,
            timeout: DEFAULT_WEB_TIMEOUT,
            limiter: None,
        }
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow at most `per_minute` searches per minute. Zero disables the quota.
    pub fn with_rate_per_minute(mut self, per_minute: u32) -> Self {
        self.limiter = NonZeroU32::new(per_minute)
            .map(|n| Arc::new(RateLimiter::direct(Quota::per_minute(n))));
        self
    }

    /// Use a custom quota.
    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.limiter = Some(Arc::new(RateLimiter::direct(quota)));
        self
    }

    /// The underlying searcher.
    pub fn searcher(&self) -> &W {
        &self.searcher
    }

    fn check_quota(&self) -> ProviderResult<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        limiter.check().map_err(|not_until| ProviderError::RateLimited {
            retry_after: Some(not_until.wait_time_from(DefaultClock::default().now())),
        })
    }
}

/// Score for the hit at `rank` out of `n` when the service gives none.
///
/// Earlier hits rank higher; no synthetic score reaches 1.0.
pub fn rank_score(rank: usize, n: usize) -> f32 {
    if rank >= n {
        return 0.0;
    }
    (n - rank) as f32 / (n + 1) as f32
}

#[async_trait]
impl<W: WebSearcher> EvidenceProvider for WebEvidenceProvider<W> {
    fn name(&self) -> &'static str {
        "web"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Web
    }

    async fn search(&self, query: &str, top_k: usize) -> ProviderResult<EvidenceSet> {
        if top_k == 0 {
            return Err(ProviderError::InvalidRequest("top_k must be > 0".into()));
        }

        if let Err(e) = self.check_quota() {
            warn!(error = %e, "Web search quota exhausted");
            return Err(e);
        }

        let hits = match tokio::time::timeout(self.timeout, self.searcher.search(query, top_k)).await
        {
            Ok(Ok(hits)) => hits,
            Ok(Err(ProviderError::Timeout { .. })) | Err(_) => {
                return Err(ProviderError::Timeout {
                    after: self.timeout,
                })
            }
            Ok(Err(e)) => return Err(e),
        };

        let n = hits.len();
        let evidence = EvidenceSet::from_items(hits.into_iter().enumerate().map(|(rank, hit)| {
            let score = hit.score.unwrap_or_else(|| rank_score(rank, n));
            EvidenceItem::web(hit.id, hit.text, score).with_url(hit.url.to_string())
        }))
        .truncated(top_k);

        debug!(returned = n, kept = evidence.len(), "Web search complete");

        Ok(evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWebSearcher;
    use crate::traits::searcher::WebHit;

    #[test]
    fn test_rank_score_decreasing_below_one() {
        assert_eq!(rank_score(0, 1), 0.5);
        assert!(rank_score(0, 3) > rank_score(1, 3));
        assert!(rank_score(1, 3) > rank_score(2, 3));
        assert!(rank_score(0, 100) < 1.0);
        assert_eq!(rank_score(5, 3), 0.0);
    }

    #[tokio::test]
    async fn test_hits_become_web_evidence() {
        let searcher = MockWebSearcher::new().with_hits(
            "france gdp 2024",
            vec![
                WebHit::from_url("https://stats.example/gdp", "GDP grew 1.1%").unwrap(),
                WebHit::from_url("https://news.example/economy", "Economy report")
                    .unwrap()
                    .with_score(0.95),
            ],
        );
        let provider = WebEvidenceProvider::new(searcher);

        let evidence = provider.search("france gdp 2024", 5).await.unwrap();

        assert_eq!(evidence.len(), 2);
        // Service score beats the rank-derived one
        assert_eq!(evidence.as_slice()[0].source_id(), "https://news.example/economy");
        assert_eq!(evidence.as_slice()[0].source_type(), SourceType::Web);
        assert_eq!(
            evidence.as_slice()[1].url(),
            Some("https://stats.example/gdp")
        );
    }

    #[tokio::test]
    async fn test_slow_searcher_times_out() {
        let searcher = MockWebSearcher::new().with_delay(Duration::from_millis(200));
        let provider = WebEvidenceProvider::new(searcher).with_timeout(Duration::from_millis(20));

        let err = provider.search("anything", 3).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Timeout {
                after: Duration::from_millis(20)
            }
        );
    }

    #[tokio::test]
    async fn test_quota_fails_fast() {
        let provider = WebEvidenceProvider::new(MockWebSearcher::new()).with_rate_per_minute(1);

        assert!(provider.search("first", 3).await.is_ok());
        let err = provider.search("second", 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_searcher_errors_pass_through() {
        let provider = WebEvidenceProvider::new(
            MockWebSearcher::new().failing(ProviderError::RateLimited { retry_after: None }),
        );
        let err = provider.search("anything", 3).await.unwrap_err();
        assert!(err.is_transient());

        let provider = WebEvidenceProvider::new(
            MockWebSearcher::new().failing(ProviderError::Unavailable("down".into())),
        );
        let err = provider.search("anything", 3).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
