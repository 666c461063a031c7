//! Claims, verdicts and verification results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A factual statement submitted for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Claim(String);

impl Claim {
    /// Create a claim. Blank statements are rejected.
    pub fn new(text: impl Into<String>) -> Result<Self, ConfigError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Missing("claim"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The claim text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Claim {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Claim> for String {
    fn from(claim: Claim) -> Self {
        claim.0
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tri-state verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    True,
    False,
    Insufficient,
}

impl Verdict {
    /// Wire name ("TRUE", "FALSE", "INSUFFICIENT").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Insufficient => "INSUFFICIENT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVerdict(pub String);

impl fmt::Display for UnknownVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown verdict: {:?}", self.0)
    }
}

impl std::error::Error for UnknownVerdict {}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_ascii_uppercase();

        match normalized.as_str() {
            "TRUE" => Ok(Self::True),
            "FALSE" => Ok(Self::False),
            "INSUFFICIENT" => Ok(Self::Insufficient),
            _ => Err(UnknownVerdict(s.to_string())),
        }
    }
}

/// Final, immutable answer for one verification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    claim: Claim,
    verdict: Verdict,
    reasoning: String,
    sources: Vec<String>,
    confidence: f32,
    #[serde(default)]
    degraded: bool,
}

impl VerificationResult {
    pub(crate) fn new(
        claim: Claim,
        verdict: Verdict,
        reasoning: impl Into<String>,
        sources: Vec<String>,
        confidence: f32,
    ) -> Self {
        Self {
            claim,
            verdict,
            reasoning: reasoning.into(),
            sources,
            confidence: clamp_unit(confidence),
            degraded: false,
        }
    }

    /// Result for a claim with no evidence at all.
    pub(crate) fn insufficient(claim: Claim, reasoning: impl Into<String>) -> Self {
        Self::new(claim, Verdict::Insufficient, reasoning, Vec::new(), 0.0)
    }

    /// Mark the run as degraded: append the note and scale confidence.
    pub(crate) fn into_degraded(mut self, note: &str, confidence_factor: f32) -> Self {
        if self.reasoning.is_empty() {
            self.reasoning = note.to_string();
        } else {
            self.reasoning = format!("{}\n\n{}", self.reasoning, note);
        }
        self.confidence = clamp_unit(self.confidence * confidence_factor);
        self.degraded = true;
        self
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Cited source ids, in evidence rank order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Whether evidence gathering was incomplete for this result.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Clamp into [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_rejects_blank() {
        assert_eq!(Claim::new("   "), Err(ConfigError::Missing("claim")));
        assert_eq!(Claim::new(" Paris ").unwrap().as_str(), "Paris");
    }

    #[test]
    fn test_verdict_parsing_is_lenient() {
        assert_eq!("true".parse::<Verdict>().unwrap(), Verdict::True);
        assert_eq!(" FALSE. ".parse::<Verdict>().unwrap(), Verdict::False);
        assert_eq!("\"Insufficient\"".parse::<Verdict>().unwrap(), Verdict::Insufficient);
        assert!("probably".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_result_serializes_wire_shape() {
        let claim = Claim::new("The Eiffel Tower is located in Paris").unwrap();
        let result = VerificationResult::new(
            claim,
            Verdict::True,
            "Confirmed by [doc-1].",
            vec!["doc-1".to_string()],
            1.4,
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["verdict"], "TRUE");
        assert_eq!(json["sources"][0], "doc-1");
        assert_eq!(json["confidence"], 1.0);
        assert_eq!(json["degraded"], false);
    }

    #[test]
    fn test_into_degraded_annotates_and_scales() {
        let claim = Claim::new("x").unwrap();
        let result = VerificationResult::new(claim, Verdict::True, "Reason.", vec![], 0.8)
            .into_degraded("Web search skipped.", 0.5);

        assert!(result.is_degraded());
        assert!(result.reasoning().ends_with("Web search skipped."));
        assert!((result.confidence() - 0.4).abs() < 1e-6);
    }
}
