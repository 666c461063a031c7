//! Prompts for the verdict reasoner.
//!
//! The model only reads the claim and the fixed evidence blocks below. It
//! never chooses tools.

use crate::types::{claim::Claim, evidence::EvidenceSet};

/// System instructions for verdict generation.
pub const VERIFY_SYSTEM_PROMPT: &str = r#"You are a strict claim verification engine.

Judge the CLAIM using ONLY the numbered EVIDENCE blocks. Do not use outside knowledge.

Rules:
1. Every factual statement in your reasoning must cite at least one evidence id in square brackets, e.g. [doc-12].
2. Cite only ids that appear in the EVIDENCE list.
3. For every evidence block, record whether it supports, refutes, or is neutral toward the claim.
4. If evidence blocks contradict each other, say so explicitly in the reasoning. Do not silently pick a side.
5. Answer INSUFFICIENT when the evidence neither confirms nor refutes the claim.

Output JSON:
{
    "verdict": "TRUE" | "FALSE" | "INSUFFICIENT",
    "reasoning": "short explanation citing evidence ids",
    "confidence": 0.0 to 1.0,
    "citations": ["evidence ids the verdict relies on"],
    "stances": [
        {"source_id": "evidence id", "stance": "supports" | "refutes" | "neutral"}
    ]
}"#;

/// Appended on the retry after an unparseable reply.
pub const STRICT_FORMAT_INSTRUCTION: &str = r#"Your previous reply could not be parsed.
Reply with ONE JSON object and nothing else: no prose, no markdown fences.
"verdict" must be exactly one of "TRUE", "FALSE", "INSUFFICIENT"."#;

/// Longest evidence text passed to the model, in characters.
pub const MAX_EVIDENCE_CHARS: usize = 1200;

/// Format the user message: the claim followed by numbered evidence blocks.
pub fn format_verify_prompt(claim: &Claim, evidence: &EvidenceSet) -> String {
    let blocks: Vec<String> = evidence
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let text: String = item.text().chars().take(MAX_EVIDENCE_CHARS).collect();
            let origin = match item.url() {
                Some(url) => format!("{}, {}", item.source_type().as_str(), url),
                None => item.source_type().as_str().to_string(),
            };
            format!(
                "{}. [{}] (score {:.2}, {})\n{}",
                i + 1,
                item.source_id(),
                item.score(),
                origin,
                text
            )
        })
        .collect();

    format!("CLAIM:\n{}\n\nEVIDENCE:\n{}", claim, blocks.join("\n\n"))
}

/// Format the retry message: the original prompt plus the strict instruction.
pub fn format_retry_prompt(claim: &Claim, evidence: &EvidenceSet, parse_error: &str) -> String {
    format!(
        "{}\n\n{}\nParse error: {}",
        format_verify_prompt(claim, evidence),
        STRICT_FORMAT_INSTRUCTION,
        parse_error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::evidence::EvidenceItem;

    #[test]
    fn test_prompt_lists_evidence_with_ids() {
        let claim = Claim::new("The Eiffel Tower is located in Paris").unwrap();
        let evidence = EvidenceSet::from_items(vec![
            EvidenceItem::local("doc-1", "The Eiffel Tower stands in Paris.", 0.9),
            EvidenceItem::web("https://a.example", "Paris landmark", 0.4)
                .with_url("https://a.example"),
        ]);

        let prompt = format_verify_prompt(&claim, &evidence);

        assert!(prompt.starts_with("CLAIM:\nThe Eiffel Tower is located in Paris"));
        assert!(prompt.contains("1. [doc-1] (score 0.90, local)"));
        assert!(prompt.contains("2. [https://a.example] (score 0.40, web, https://a.example)"));
    }

    #[test]
    fn test_long_evidence_is_truncated() {
        let claim = Claim::new("x").unwrap();
        let evidence =
            EvidenceSet::from_items(vec![EvidenceItem::local("big", "a".repeat(5000), 0.5)]);

        let prompt = format_verify_prompt(&claim, &evidence);
        assert!(prompt.len() < 5000);
    }

    #[test]
    fn test_retry_prompt_is_stricter() {
        let claim = Claim::new("x").unwrap();
        let prompt = format_retry_prompt(&claim, &EvidenceSet::empty(), "missing field `verdict`");
        assert!(prompt.contains(STRICT_FORMAT_INSTRUCTION));
        assert!(prompt.contains("missing field `verdict`"));
    }
}
