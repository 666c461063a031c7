//! Configuration for verification requests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// How the orchestrator schedules the two providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Local first; web only when local evidence is insufficient.
    #[default]
    Sequential,

    /// Issue local and web searches together and join them.
    ///
    /// The sufficiency rule still decides whether web evidence is used.
    Parallel,
}

/// Configuration for the verification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Passages requested from the local index. Default: 5.
    pub top_k_local: usize,

    /// Snippets requested from web search. Default: 5.
    pub top_k_web: usize,

    /// Top local score must exceed this to skip web search. Default: 0.75.
    pub sufficiency_threshold: f32,

    /// Local items required to skip web search. Default: 2.
    pub min_evidence_count: usize,

    /// Score lead one side of a contradiction needs to win. Default: 0.2.
    pub contradiction_margin: f32,

    /// Timeout for a single web search call. Default: 10s.
    #[serde(with = "duration_ms")]
    pub web_timeout: Duration,

    /// Whole-request deadline. Default: 30s.
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,

    /// Share of the request deadline held back for reasoning.
    ///
    /// The web stage must finish within the remaining share or the run
    /// degrades to local evidence. Default: 0.4.
    pub reasoning_share: f32,

    /// Confidence multiplier for degraded runs. Default: 0.5.
    pub degraded_confidence_factor: f32,

    /// Provider scheduling. Default: sequential.
    pub routing: RoutingMode,

    /// Treat an unavailable web provider as a degradation rather than a
    /// failure. Default: false.
    pub degrade_on_web_unavailable: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            top_k_local: 5,
            top_k_web: 5,
            sufficiency_threshold: 0.75,
            min_evidence_count: 2,
            contradiction_margin: 0.2,
            web_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            reasoning_share: 0.4,
            degraded_confidence_factor: 0.5,
            routing: RoutingMode::Sequential,
            degrade_on_web_unavailable: false,
        }
    }
}

impl VerifyConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sufficiency threshold.
    pub fn with_sufficiency_threshold(mut self, threshold: f32) -> Self {
        self.sufficiency_threshold = threshold;
        self
    }

    /// Set the minimum local evidence count.
    pub fn with_min_evidence_count(mut self, count: usize) -> Self {
        self.min_evidence_count = count;
        self
    }

    /// Set the contradiction margin.
    pub fn with_contradiction_margin(mut self, margin: f32) -> Self {
        self.contradiction_margin = margin;
        self
    }

    /// Set the request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the web call timeout.
    pub fn with_web_timeout(mut self, timeout: Duration) -> Self {
        self.web_timeout = timeout;
        self
    }

    /// Set the routing mode.
    pub fn with_routing(mut self, routing: RoutingMode) -> Self {
        self.routing = routing;
        self
    }

    /// Degrade instead of failing when web search is unavailable.
    pub fn degrading_on_web_unavailable(mut self) -> Self {
        self.degrade_on_web_unavailable = true;
        self
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k_local == 0 {
            return Err(ConfigError::invalid("top_k_local", "must be > 0"));
        }
        if self.top_k_web == 0 {
            return Err(ConfigError::invalid("top_k_web", "must be > 0"));
        }
        if self.min_evidence_count == 0 {
            return Err(ConfigError::invalid("min_evidence_count", "must be > 0"));
        }
        unit("sufficiency_threshold", self.sufficiency_threshold)?;
        unit("contradiction_margin", self.contradiction_margin)?;
        unit("degraded_confidence_factor", self.degraded_confidence_factor)?;
        if !(0.0..1.0).contains(&self.reasoning_share) {
            return Err(ConfigError::invalid("reasoning_share", "must be in [0, 1)"));
        }
        if self.web_timeout.is_zero() {
            return Err(ConfigError::invalid("web_timeout", "must be > 0"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be > 0"));
        }
        Ok(())
    }

    /// Apply per-request overrides and validate the result.
    pub fn with_overrides(&self, overrides: &RequestOverrides) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        if let Some(k) = overrides.top_k_local {
            config.top_k_local = k;
        }
        if let Some(k) = overrides.top_k_web {
            config.top_k_web = k;
        }
        if let Some(threshold) = overrides.sufficiency_threshold {
            config.sufficiency_threshold = threshold;
        }
        if let Some(ms) = overrides.timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }

    /// Time the web stage may use out of the request deadline.
    pub fn web_budget(&self) -> Duration {
        self.request_timeout
            .mul_f32(1.0 - self.reasoning_share.clamp(0.0, 1.0))
    }
}

fn unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")))
    }
}

/// Optional per-request configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOverrides {
    pub top_k_local: Option<usize>,
    pub top_k_web: Option<usize>,
    pub sufficiency_threshold: Option<f32>,
    pub timeout_ms: Option<u64>,
}

impl RequestOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_k_local(mut self, k: usize) -> Self {
        self.top_k_local = Some(k);
        self
    }

    pub fn with_top_k_web(mut self, k: usize) -> Self {
        self.top_k_web = Some(k);
        self
    }

    pub fn with_sufficiency_threshold(mut self, threshold: f32) -> Self {
        self.sufficiency_threshold = Some(threshold);
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VerifyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sufficiency_threshold, 0.75);
        assert_eq!(config.min_evidence_count, 2);
        assert_eq!(config.web_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let base = VerifyConfig::default();

        let config = base
            .with_overrides(
                &RequestOverrides::new()
                    .with_top_k_local(3)
                    .with_timeout_ms(1500),
            )
            .unwrap();
        assert_eq!(config.top_k_local, 3);
        assert_eq!(config.request_timeout, Duration::from_millis(1500));

        let err = base
            .with_overrides(&RequestOverrides::new().with_sufficiency_threshold(1.5))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "sufficiency_threshold",
                ..
            }
        ));

        assert!(base
            .with_overrides(&RequestOverrides::new().with_top_k_web(0))
            .is_err());
    }

    #[test]
    fn test_overrides_accept_camel_case() {
        let overrides: RequestOverrides =
            serde_json::from_str(r#"{"topKLocal": 4, "timeoutMs": 2000}"#).unwrap();
        assert_eq!(overrides.top_k_local, Some(4));
        assert_eq!(overrides.timeout_ms, Some(2000));
        assert_eq!(overrides.top_k_web, None);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: VerifyConfig =
            serde_json::from_str(r#"{"sufficiency_threshold": 0.6, "web_timeout": 2500}"#).unwrap();
        assert_eq!(config.sufficiency_threshold, 0.6);
        assert_eq!(config.web_timeout, Duration::from_millis(2500));
        assert_eq!(config.top_k_local, 5);
    }

    #[test]
    fn test_web_budget() {
        let config = VerifyConfig::default().with_request_timeout(Duration::from_secs(10));
        let budget = config.web_budget();
        assert!(budget >= Duration::from_millis(5990) && budget <= Duration::from_millis(6010));
    }
}
