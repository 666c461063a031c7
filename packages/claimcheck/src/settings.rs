//! Environment-backed settings for binaries.
//!
//! The library never reads the process environment; binaries build a
//! `Settings` once at startup and hand explicit values to the orchestrator.

use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::security::SecretString;
use crate::types::config::VerifyConfig;

type Result<T> = std::result::Result<T, ConfigError>;

/// Application settings loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: SecretString,
    pub tavily_api_key: Option<SecretString>,
    pub openai_model: Option<String>,
    pub openai_embedding_model: Option<String>,
    /// Web searches allowed per minute (0 disables the quota)
    pub web_rate_per_minute: u32,
    pub verify: VerifyConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut verify = VerifyConfig::default();

        if let Some(threshold) = parsed(&lookup, "CLAIMCHECK_SUFFICIENCY_THRESHOLD")? {
            verify.sufficiency_threshold = threshold;
        }

        if let Some(ms) = parsed::<u64>(&lookup, "CLAIMCHECK_REQUEST_TIMEOUT_MS")? {
            verify.request_timeout = Duration::from_millis(ms);
        }

        verify.validate()?;

        Ok(Self {
            openai_api_key: secret(&lookup, "OPENAI_API_KEY")
                .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            tavily_api_key: secret(&lookup, "TAVILY_API_KEY"),
            openai_model: lookup("OPENAI_MODEL"),
            openai_embedding_model: lookup("OPENAI_EMBEDDING_MODEL"),
            web_rate_per_minute: parsed(&lookup, "CLAIMCHECK_WEB_RATE_PER_MINUTE")?.unwrap_or(0),
            verify,
        })
    }

    /// The Tavily key, required when web search is enabled.
    pub fn require_tavily_key(&self) -> Result<&SecretString> {
        self.tavily_api_key
            .as_ref()
            .ok_or(ConfigError::Missing("TAVILY_API_KEY"))
    }
}

fn secret(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Option<SecretString> {
    lookup(key).filter(|k| !k.is_empty()).map(SecretString::from)
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| ConfigError::invalid(key, format!("{raw:?}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_openai_key() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(settings.openai_api_key.expose(), "sk-test");
        assert!(settings.tavily_api_key.is_none());
        assert!(settings.require_tavily_key().is_err());
        assert_eq!(settings.web_rate_per_minute, 0);
        assert_eq!(settings.verify, VerifyConfig::default());
    }

    #[test]
    fn test_missing_openai_key_fails() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENAI_API_KEY"));

        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(
            settings.require_tavily_key().unwrap_err(),
            ConfigError::Missing("TAVILY_API_KEY")
        );
    }

    #[test]
    fn test_unparseable_value_names_the_key() {
        let err = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CLAIMCHECK_WEB_RATE_PER_MINUTE", "lots"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "CLAIMCHECK_WEB_RATE_PER_MINUTE",
                ..
            }
        ));
    }

    #[test]
    fn test_overrides_are_validated() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CLAIMCHECK_SUFFICIENCY_THRESHOLD", "0.6"),
            ("CLAIMCHECK_REQUEST_TIMEOUT_MS", "5000"),
            ("CLAIMCHECK_WEB_RATE_PER_MINUTE", "30"),
        ]))
        .unwrap();
        assert_eq!(settings.verify.sufficiency_threshold, 0.6);
        assert_eq!(settings.verify.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.web_rate_per_minute, 30);

        let err = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CLAIMCHECK_SUFFICIENCY_THRESHOLD", "1.5"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "sufficiency_threshold",
                ..
            }
        ));
    }

    #[test]
    fn test_keys_are_redacted_in_debug() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        assert!(!format!("{:?}", settings).contains("sk-secret"));
    }
}
