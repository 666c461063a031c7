//! Verdict reasoner.
//!
//! Turns a claim plus fixed evidence into a grounded [`VerificationResult`].
//! The model writes the reasoning; everything that decides what reaches the
//! caller (empty-evidence short circuit, retry, citation validation,
//! contradiction policy) is deterministic code here.

use indexmap::IndexSet;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::ReasonerError;
use crate::pipeline::prompts::{format_retry_prompt, format_verify_prompt, VERIFY_SYSTEM_PROMPT};
use crate::traits::model::{LanguageModel, PromptPayload};
use crate::types::{
    claim::{Claim, Verdict, VerificationResult},
    evidence::EvidenceSet,
};

/// Reasoning text for a claim with no evidence.
pub const NO_EVIDENCE_REASONING: &str =
    "No evidence was retrieved for this claim, so it can be neither confirmed nor refuted.";

/// Default lead one side of a contradiction needs to win.
pub const DEFAULT_CONTRADICTION_MARGIN: f32 = 0.2;

/// Confidence assumed when the model omits one.
const DEFAULT_MODEL_CONFIDENCE: f32 = 0.5;

/// Tolerance for float noise in the margin comparison.
const MARGIN_EPSILON: f32 = 1e-6;

lazy_static! {
    // A bracketed source id plus the spacing before it, e.g. " [doc-1]"
    static ref INLINE_CITATION: Regex = Regex::new(r"[ \t]*\[([^\[\]\s]+)\]").unwrap();
}

/// How an evidence item bears on the claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Supports,
    Refutes,
    Neutral,
}

/// One evidence item's stance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StanceEntry {
    pub source_id: String,
    pub stance: Stance,
}

/// Raw model reply. The verdict stays a string until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReasonerReply {
    /// "TRUE", "FALSE" or "INSUFFICIENT"
    pub verdict: String,

    pub reasoning: String,

    #[serde(default)]
    pub confidence: Option<f32>,

    #[serde(default)]
    pub citations: Vec<String>,

    #[serde(default)]
    pub stances: Vec<StanceEntry>,
}

/// A reply whose verdict parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub verdict: Verdict,
    pub reply: ReasonerReply,
}

/// JSON schema of [`ReasonerReply`], sent along with the prompt.
pub fn reply_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(ReasonerReply)).unwrap_or_default()
}

/// Parse model output into a verdict reply.
///
/// Accepts surrounding prose or markdown fences around the first JSON object.
pub fn parse_reply(raw: &str) -> Result<ParsedReply, String> {
    let start = raw.find('{').ok_or("reply contains no JSON object")?;
    let end = raw.rfind('}').ok_or("reply contains no JSON object")?;
    if end < start {
        return Err("reply contains no JSON object".to_string());
    }

    let reply: ReasonerReply =
        serde_json::from_str(&raw[start..=end]).map_err(|e| format!("invalid JSON: {}", e))?;
    let verdict: Verdict = reply.verdict.parse().map_err(|e| format!("{}", e))?;

    Ok(ParsedReply { verdict, reply })
}

/// Produces verdicts from a claim and its evidence.
pub struct VerdictReasoner<M: LanguageModel> {
    model: M,
    contradiction_margin: f32,
}

impl<M: LanguageModel> VerdictReasoner<M> {
    /// Create a reasoner with the default contradiction margin.
    pub fn new(model: M) -> Self {
        Self {
            model,
            contradiction_margin: DEFAULT_CONTRADICTION_MARGIN,
        }
    }

    /// Set the score lead a side of a contradiction needs to win.
    pub fn with_contradiction_margin(mut self, margin: f32) -> Self {
        self.contradiction_margin = margin;
        self
    }

    /// The underlying model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Judge `claim` against `evidence`.
    ///
    /// Empty evidence yields Insufficient without calling the model. An
    /// unparseable reply is retried exactly once with a stricter instruction.
    pub async fn evaluate(
        &self,
        claim: &Claim,
        evidence: &EvidenceSet,
    ) -> Result<VerificationResult, ReasonerError> {
        if evidence.is_empty() {
            debug!("No evidence; returning Insufficient without model call");
            return Ok(VerificationResult::insufficient(
                claim.clone(),
                NO_EVIDENCE_REASONING,
            ));
        }

        let payload = PromptPayload::new(VERIFY_SYSTEM_PROMPT, format_verify_prompt(claim, evidence))
            .with_schema(reply_schema());
        let raw = self.model.complete(&payload).await.map_err(ReasonerError::Model)?;

        let parsed = match parse_reply(&raw) {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!(reason = %reason, "Unparseable verdict; retrying with strict format");
                let retry = PromptPayload::new(
                    VERIFY_SYSTEM_PROMPT,
                    format_retry_prompt(claim, evidence, &reason),
                )
                .with_schema(reply_schema());
                let raw = self.model.complete(&retry).await.map_err(ReasonerError::Model)?;
                parse_reply(&raw)
                    .map_err(|reason| ReasonerError::Unparseable { attempts: 2, reason })?
            }
        };

        Ok(self.ground(claim, evidence, parsed))
    }

    /// Validate a parsed reply against the evidence that was supplied.
    fn ground(&self, claim: &Claim, evidence: &EvidenceSet, parsed: ParsedReply) -> VerificationResult {
        let ParsedReply { mut verdict, reply } = parsed;
        let mut confidence = reply.confidence.unwrap_or(DEFAULT_MODEL_CONFIDENCE);

        let (mut reasoning, inline) = strip_unknown_citations(reply.reasoning.trim(), evidence);

        let fabricated: IndexSet<&str> = reply
            .citations
            .iter()
            .chain(reply.stances.iter().map(|s| &s.source_id))
            .filter(|id| !evidence.contains(id))
            .map(String::as_str)
            .chain(inline.iter().map(String::as_str))
            .collect();
        if !fabricated.is_empty() {
            warn!(ids = ?fabricated, "Dropping citations not present in evidence");
        }
        if !inline.is_empty() {
            let ids: Vec<&str> = inline.iter().map(String::as_str).collect();
            reasoning = join_paragraphs(
                &reasoning,
                &format!(
                    "Removed citations not found in the evidence: {}.",
                    ids.join(", ")
                ),
            );
        }

        let stances: Vec<&StanceEntry> = reply
            .stances
            .iter()
            .filter(|s| evidence.contains(&s.source_id))
            .collect();

        let mut cited: HashSet<&str> = reply
            .citations
            .iter()
            .map(String::as_str)
            .filter(|id| evidence.contains(id))
            .collect();

        // Fall back to stances aligned with the verdict when no citation survived
        if cited.is_empty() {
            let aligned = match verdict {
                Verdict::True => Some(Stance::Supports),
                Verdict::False => Some(Stance::Refutes),
                Verdict::Insufficient => None,
            };
            cited.extend(
                stances
                    .iter()
                    .filter(|s| Some(s.stance) == aligned)
                    .map(|s| s.source_id.as_str()),
            );
        }

        if let (Some((top_support, supporters)), Some((top_refute, refuters))) = (
            side(evidence, &stances, Stance::Supports),
            side(evidence, &stances, Stance::Refutes),
        ) {
            let margin = self.contradiction_margin - MARGIN_EPSILON;
            let lead = (top_support - top_refute).abs();
            let resolved = if top_support - top_refute >= margin {
                Verdict::True
            } else if top_refute - top_support >= margin {
                Verdict::False
            } else {
                Verdict::Insufficient
            };

            // The model's confidence belonged to a verdict the policy overrode
            if resolved != verdict {
                confidence = match resolved {
                    Verdict::Insufficient => 0.0,
                    _ => confidence.min(lead),
                };
            }

            let mut note = format!(
                "Conflicting evidence: {} support the claim while {} refute it.",
                bracketed(&supporters),
                bracketed(&refuters)
            );
            if resolved != verdict {
                note.push_str(&format!(
                    " Verdict changed from {} to {}: the strongest side must lead by at least {:.2} (supporting {:.2}, refuting {:.2}).",
                    verdict, resolved, self.contradiction_margin, top_support, top_refute
                ));
            }
            warn!(supporters = ?supporters, refuters = ?refuters, resolved = %resolved, "Contradictory evidence");

            verdict = resolved;
            reasoning = join_paragraphs(&reasoning, &note);
            cited.extend(supporters.iter().chain(refuters.iter()).copied());
        }

        let sources: Vec<String> = evidence
            .iter()
            .filter(|item| cited.contains(item.source_id()))
            .map(|item| item.source_id().to_string())
            .collect();

        if verdict != Verdict::Insufficient && sources.is_empty() {
            warn!(verdict = %verdict, "Verdict has no valid citation; downgrading");
            reasoning = join_paragraphs(
                &reasoning,
                &format!(
                    "The {} verdict cited no retrieved evidence, so it was downgraded to INSUFFICIENT.",
                    verdict
                ),
            );
            verdict = Verdict::Insufficient;
            confidence = 0.0;
        }

        VerificationResult::new(claim.clone(), verdict, reasoning, sources, confidence)
    }
}

/// Ids taking `stance`, in evidence rank order, with the best score among them.
fn side<'a>(
    evidence: &'a EvidenceSet,
    stances: &[&StanceEntry],
    stance: Stance,
) -> Option<(f32, Vec<&'a str>)> {
    let ids: Vec<&'a str> = evidence
        .iter()
        .filter(|item| {
            stances
                .iter()
                .any(|s| s.stance == stance && s.source_id == item.source_id())
        })
        .map(|item| item.source_id())
        .collect();
    let top = evidence.get(ids.first()?)?.score();
    Some((top, ids))
}

/// Remove inline `[id]` tags naming sources outside `evidence`.
///
/// Returns the cleaned text and the removed ids, first occurrence first.
fn strip_unknown_citations(text: &str, evidence: &EvidenceSet) -> (String, IndexSet<String>) {
    let mut removed = IndexSet::new();
    let cleaned = INLINE_CITATION.replace_all(text, |caps: &Captures| {
        if evidence.contains(&caps[1]) {
            caps[0].to_string()
        } else {
            removed.insert(caps[1].to_string());
            String::new()
        }
    });
    (cleaned.into_owned(), removed)
}

fn bracketed(ids: &[&str]) -> String {
    ids.iter()
        .map(|id| format!("[{}]", id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_paragraphs(head: &str, tail: &str) -> String {
    if head.is_empty() {
        tail.to_string()
    } else {
        format!("{}\n\n{}", head, tail)
    }
}
