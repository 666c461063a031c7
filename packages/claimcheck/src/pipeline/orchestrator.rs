//! The Orchestrator - routes a claim through the evidence providers and the
//! reasoner.
//!
//! Routing is an explicit state machine:
//!
//! ```text
//! Start → LocalSearch ─(sufficient)──────────────→ Reason → Done
//!                     └(insufficient)→ WebSearch ─→ Reason → Done
//! any state ─(unrecoverable error)→ Failed
//! ```
//!
//! The only guard is [`is_sufficient`]; the model never picks tools.
//! Transient web failures degrade the run to local evidence instead of
//! failing it.

use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{ProviderError, Result, VerifyError};
use crate::pipeline::{aggregate, reasoner::VerdictReasoner};
use crate::traits::{model::LanguageModel, provider::EvidenceProvider};
use crate::types::{
    claim::{Claim, VerificationResult},
    config::{RequestOverrides, RoutingMode, VerifyConfig},
    evidence::EvidenceSet,
};

/// Named states of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Start,
    LocalSearch,
    WebSearch,
    Reason,
    Done,
    Failed,
}

/// Why a run proceeded without web evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// Web search exceeded its call timeout
    WebTimeout,
    /// Web search was rate limited (by the service or the local quota)
    WebRateLimited,
    /// Web search was unreachable and the config allows degrading
    WebUnavailable,
    /// Web search ran past its share of the request deadline
    WebBudgetExhausted,
}

impl Degradation {
    /// Annotation appended to the result's reasoning.
    pub fn note(&self) -> &'static str {
        match self {
            Self::WebTimeout => {
                "Degraded: web search timed out, so this verdict rests on local evidence only."
            }
            Self::WebRateLimited => {
                "Degraded: web search was rate limited, so this verdict rests on local evidence only."
            }
            Self::WebUnavailable => {
                "Degraded: web search was unavailable, so this verdict rests on local evidence only."
            }
            Self::WebBudgetExhausted => {
                "Degraded: web search did not finish within the request deadline, so this verdict rests on local evidence only."
            }
        }
    }
}

/// A finished run: the result plus how it was reached.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub request_id: Uuid,
    pub result: VerificationResult,
    /// Visited states, `Start` through `Done`
    pub path: Vec<VerificationState>,
    pub degradation: Option<Degradation>,
}

/// Local evidence is strong enough to skip web search.
///
/// True when the top score strictly exceeds the sufficiency threshold and at
/// least `min_evidence_count` items were returned.
pub fn is_sufficient(local: &EvidenceSet, config: &VerifyConfig) -> bool {
    local.len() >= config.min_evidence_count
        && local
            .top_score()
            .is_some_and(|top| top > config.sufficiency_threshold)
}

/// Whether web search should start alongside local search.
///
/// Local evidence can never be sufficient when fewer than
/// `min_evidence_count` passages are requested.
fn runs_in_parallel(config: &VerifyConfig) -> bool {
    config.routing == RoutingMode::Parallel || config.top_k_local < config.min_evidence_count
}

/// Web failure before classification.
enum WebFailure {
    Provider(ProviderError),
    BudgetExhausted,
}

/// Routes claims through providers and the reasoner.
///
/// Holds only immutable configuration; every request builds its own
/// evidence, so one orchestrator can serve concurrent requests behind an
/// `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = Orchestrator::new(local, web, model, VerifyConfig::default())?;
/// let result = orchestrator.verify("The Eiffel Tower is located in Paris").await?;
/// println!("{} ({:.2})", result.verdict(), result.confidence());
/// ```
pub struct Orchestrator<L: EvidenceProvider, W: EvidenceProvider, M: LanguageModel> {
    local: L,
    web: W,
    reasoner: VerdictReasoner<M>,
    config: VerifyConfig,
}

impl<L, W, M> Orchestrator<L, W, M>
where
    L: EvidenceProvider,
    W: EvidenceProvider,
    M: LanguageModel,
{
    /// Create an orchestrator. The config is validated up front.
    pub fn new(local: L, web: W, model: M, config: VerifyConfig) -> Result<Self> {
        config.validate()?;
        let reasoner =
            VerdictReasoner::new(model).with_contradiction_margin(config.contradiction_margin);
        Ok(Self {
            local,
            web,
            reasoner,
            config,
        })
    }

    /// Base configuration.
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn web(&self) -> &W {
        &self.web
    }

    /// The reasoner (and through it, the model).
    pub fn reasoner(&self) -> &VerdictReasoner<M> {
        &self.reasoner
    }

    /// Verify a claim with the base configuration.
    pub async fn verify(&self, claim: &str) -> Result<VerificationResult> {
        self.verify_with(claim, &RequestOverrides::default())
            .await
            .map(|outcome| outcome.result)
    }

    /// Verify a claim with per-request overrides.
    pub async fn verify_with(
        &self,
        claim: &str,
        overrides: &RequestOverrides,
    ) -> Result<VerificationOutcome> {
        self.verify_with_cancel(claim, overrides, CancellationToken::new())
            .await
    }

    /// Verify a claim; `cancel` aborts in-flight provider and model calls.
    pub async fn verify_with_cancel(
        &self,
        claim: &str,
        overrides: &RequestOverrides,
        cancel: CancellationToken,
    ) -> Result<VerificationOutcome> {
        let request_id = Uuid::now_v7();
        let span = info_span!("verify", request_id = %request_id);
        self.verify_traced(request_id, claim, overrides, cancel)
            .instrument(span)
            .await
    }

    async fn verify_traced(
        &self,
        request_id: Uuid,
        claim: &str,
        overrides: &RequestOverrides,
        cancel: CancellationToken,
    ) -> Result<VerificationOutcome> {
        let claim = Claim::new(claim)?;
        let config = self.config.with_overrides(overrides)?;
        info!(claim = %claim, "Verification started");

        let mut path = vec![VerificationState::Start];
        let outcome = tokio::select! {
            outcome = self.run(&claim, &config, &mut path) => outcome,
            _ = cancel.cancelled() => Err(VerifyError::Cancelled),
        };

        match outcome {
            Ok((result, degradation)) => {
                path.push(VerificationState::Done);
                info!(
                    verdict = %result.verdict(),
                    confidence = result.confidence(),
                    sources = result.sources().len(),
                    degraded = result.is_degraded(),
                    "Verification done"
                );
                Ok(VerificationOutcome {
                    request_id,
                    result,
                    path,
                    degradation,
                })
            }
            Err(e) => {
                path.push(VerificationState::Failed);
                warn!(error = %e, path = ?path, "Verification failed");
                Err(e)
            }
        }
    }

    /// Drive the state machine from `LocalSearch` to a reasoned result.
    async fn run(
        &self,
        claim: &Claim,
        config: &VerifyConfig,
        path: &mut Vec<VerificationState>,
    ) -> Result<(VerificationResult, Option<Degradation>)> {
        let started = Instant::now();
        let deadline = started + config.request_timeout;
        let web_deadline = started + config.web_budget();

        enter(path, VerificationState::LocalSearch);
        let (local, early_web) = if runs_in_parallel(config) {
            debug!("Issuing local and web searches concurrently");
            let (local, web) = tokio::try_join!(
                self.search_local(claim, config, deadline),
                async { Ok::<_, VerifyError>(self.search_web(claim, config, web_deadline).await) },
            )?;
            (local, Some(web))
        } else {
            (self.search_local(claim, config, deadline).await?, None)
        };

        let (evidence, degradation) = if is_sufficient(&local, config) {
            debug!(
                top_score = local.top_score(),
                count = local.len(),
                "Local evidence sufficient; skipping web search"
            );
            (local, None)
        } else {
            enter(path, VerificationState::WebSearch);
            let web = match early_web {
                Some(web) => web,
                None => self.search_web(claim, config, web_deadline).await,
            };

            match web {
                Ok(web) => (aggregate::merge([local, web]), None),
                Err(failure) => {
                    let degradation = self.classify_web_failure(failure, config)?;
                    warn!(degradation = ?degradation, "Proceeding with local evidence only");
                    (local, Some(degradation))
                }
            }
        };

        enter(path, VerificationState::Reason);
        let result = timeout_at(deadline, self.reasoner.evaluate(claim, &evidence))
            .await
            .map_err(|_| VerifyError::RequestTimeout {
                after: config.request_timeout,
            })??;

        let result = match degradation {
            Some(d) => result.into_degraded(d.note(), config.degraded_confidence_factor),
            None => result,
        };

        Ok((result, degradation))
    }

    async fn search_local(
        &self,
        claim: &Claim,
        config: &VerifyConfig,
        deadline: Instant,
    ) -> Result<EvidenceSet> {
        let local = timeout_at(
            deadline,
            self.local.search(claim.as_str(), config.top_k_local),
        )
        .await
        .map_err(|_| VerifyError::RequestTimeout {
            after: config.request_timeout,
        })?
        .map_err(|e| VerifyError::from_provider(self.local.name(), e))?;

        debug!(count = local.len(), top_score = local.top_score(), "Local evidence");
        Ok(local)
    }

    async fn search_web(
        &self,
        claim: &Claim,
        config: &VerifyConfig,
        web_deadline: Instant,
    ) -> std::result::Result<EvidenceSet, WebFailure> {
        let call_deadline = Instant::now() + config.web_timeout;
        let budget_bound = web_deadline <= call_deadline;

        match timeout_at(
            web_deadline.min(call_deadline),
            self.web.search(claim.as_str(), config.top_k_web),
        )
        .await
        {
            Ok(Ok(web)) => {
                debug!(count = web.len(), top_score = web.top_score(), "Web evidence");
                Ok(web)
            }
            Ok(Err(e)) => Err(WebFailure::Provider(e)),
            Err(_) if budget_bound => Err(WebFailure::BudgetExhausted),
            Err(_) => Err(WebFailure::Provider(ProviderError::Timeout {
                after: config.web_timeout,
            })),
        }
    }

    /// Decide whether a web failure degrades the run or ends it.
    fn classify_web_failure(
        &self,
        failure: WebFailure,
        config: &VerifyConfig,
    ) -> Result<Degradation> {
        match failure {
            WebFailure::BudgetExhausted => Ok(Degradation::WebBudgetExhausted),
            WebFailure::Provider(ProviderError::Timeout { .. }) => Ok(Degradation::WebTimeout),
            WebFailure::Provider(ProviderError::RateLimited { .. }) => {
                Ok(Degradation::WebRateLimited)
            }
            WebFailure::Provider(ProviderError::Unavailable(_))
                if config.degrade_on_web_unavailable =>
            {
                Ok(Degradation::WebUnavailable)
            }
            WebFailure::Provider(e) => Err(VerifyError::from_provider(self.web.name(), e)),
        }
    }
}

fn enter(path: &mut Vec<VerificationState>, state: VerificationState) {
    debug!(from = ?path.last(), to = ?state, "Transition");
    path.push(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEvidenceProvider, MockLanguageModel};
    use crate::types::{claim::Verdict, evidence::EvidenceItem, evidence::SourceType};
    use serde_json::json;

    fn local_set(items: &[(&str, f32)]) -> EvidenceSet {
        items
            .iter()
            .map(|(id, score)| EvidenceItem::local(*id, format!("text of {id}"), *score))
            .collect()
    }

    fn true_reply(ids: &[&str]) -> String {
        json!({"verdict": "TRUE", "reasoning": "Supported.", "confidence": 0.8, "citations": ids})
            .to_string()
    }

    #[test]
    fn test_sufficiency_guard() {
        let config = VerifyConfig::default();

        assert!(is_sufficient(&local_set(&[("a", 0.9), ("b", 0.3)]), &config));
        // Only one item
        assert!(!is_sufficient(&local_set(&[("a", 0.9)]), &config));
        // Top score must strictly exceed the threshold
        assert!(!is_sufficient(&local_set(&[("a", 0.75), ("b", 0.7)]), &config));
        assert!(!is_sufficient(&EvidenceSet::empty(), &config));
    }

    #[test]
    fn test_parallel_when_local_cannot_suffice() {
        let config = VerifyConfig::default();
        assert!(!runs_in_parallel(&config));
        assert!(runs_in_parallel(&config.clone().with_routing(RoutingMode::Parallel)));

        let narrow = VerifyConfig {
            top_k_local: 1,
            ..VerifyConfig::default()
        };
        assert!(runs_in_parallel(&narrow));
    }

    #[tokio::test]
    async fn test_sufficient_local_skips_web() {
        let local = MockEvidenceProvider::local(local_set(&[("a", 0.95), ("b", 0.8)]));
        let web = MockEvidenceProvider::web(EvidenceSet::empty());
        let model = MockLanguageModel::new().with_reply(true_reply(&["a"]));
        let orchestrator = Orchestrator::new(local, web, model, VerifyConfig::default()).unwrap();

        let outcome = orchestrator
            .verify_with("claim", &RequestOverrides::default())
            .await
            .unwrap();

        assert_eq!(
            outcome.path,
            vec![
                VerificationState::Start,
                VerificationState::LocalSearch,
                VerificationState::Reason,
                VerificationState::Done
            ]
        );
        assert_eq!(outcome.result.verdict(), Verdict::True);
        assert!(outcome.degradation.is_none());
    }

    #[tokio::test]
    async fn test_insufficient_local_merges_web() {
        let local = MockEvidenceProvider::local(local_set(&[("a", 0.5)]));
        let web = MockEvidenceProvider::web(
            [EvidenceItem::web("https://w.example", "web text", 0.7)]
                .into_iter()
                .collect(),
        );
        let model = MockLanguageModel::new().with_reply(true_reply(&["https://w.example", "a"]));
        let orchestrator = Orchestrator::new(local, web, model, VerifyConfig::default()).unwrap();

        let outcome = orchestrator
            .verify_with("claim", &RequestOverrides::default())
            .await
            .unwrap();

        assert!(outcome.path.contains(&VerificationState::WebSearch));
        // Evidence rank order: web (0.7) before local (0.5)
        assert_eq!(
            outcome.result.sources(),
            &["https://w.example".to_string(), "a".to_string()]
        );
        let prompt = &orchestrator.reasoner().model().calls()[0].user;
        assert!(prompt.contains("[https://w.example]"));
    }

    #[tokio::test]
    async fn test_web_rate_limit_degrades() {
        let local = MockEvidenceProvider::local(local_set(&[("a", 0.4)]));
        let web = MockEvidenceProvider::failing(
            SourceType::Web,
            ProviderError::RateLimited { retry_after: None },
        );
        let model = MockLanguageModel::new().with_reply(true_reply(&["a"]));
        let orchestrator = Orchestrator::new(local, web, model, VerifyConfig::default()).unwrap();

        let outcome = orchestrator
            .verify_with("claim", &RequestOverrides::default())
            .await
            .unwrap();

        assert_eq!(outcome.degradation, Some(Degradation::WebRateLimited));
        assert!(outcome.result.is_degraded());
        assert!(outcome.result.reasoning().contains("rate limited"));
        assert!((outcome.result.confidence() - 0.4).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_web_unavailable_is_fatal_unless_configured() {
        let make = |config: VerifyConfig| {
            Orchestrator::new(
                MockEvidenceProvider::local(EvidenceSet::empty()),
                MockEvidenceProvider::failing(
                    SourceType::Web,
                    ProviderError::Unavailable("dns".into()),
                ),
                MockLanguageModel::new(),
                config,
            )
            .unwrap()
        };

        let err = make(VerifyConfig::default())
            .verify("claim")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerifyError::ProviderUnavailable { provider: "web", .. }
        ));

        let result = make(VerifyConfig::default().degrading_on_web_unavailable())
            .verify("claim")
            .await
            .unwrap();
        assert_eq!(result.verdict(), Verdict::Insufficient);
        assert!(result.is_degraded());
    }

    #[tokio::test]
    async fn test_invalid_override_is_configuration_error() {
        let orchestrator = Orchestrator::new(
            MockEvidenceProvider::local(EvidenceSet::empty()),
            MockEvidenceProvider::web(EvidenceSet::empty()),
            MockLanguageModel::new(),
            VerifyConfig::default(),
        )
        .unwrap();

        let err = orchestrator
            .verify_with("claim", &RequestOverrides::new().with_top_k_local(0))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Configuration(_)));

        let err = orchestrator.verify("   ").await.unwrap_err();
        assert!(matches!(err, VerifyError::Configuration(_)));
    }

    #[test]
    fn test_invalid_base_config_rejected() {
        let result = Orchestrator::new(
            MockEvidenceProvider::local(EvidenceSet::empty()),
            MockEvidenceProvider::web(EvidenceSet::empty()),
            MockLanguageModel::new(),
            VerifyConfig::default().with_sufficiency_threshold(2.0),
        );
        assert!(matches!(result, Err(VerifyError::Configuration(_))));
    }
}
