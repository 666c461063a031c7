//! Evidence types - retrieved passages and ranked evidence sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::aggregate::normalize;
use crate::types::claim::clamp_unit;

/// Which provider produced an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Local,
    Web,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Web => "web",
        }
    }
}

/// A retrieved passage with provenance and relevance score.
///
/// Fields are private: an item is never mutated after a provider creates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EvidenceRecord")]
pub struct EvidenceItem {
    text: String,
    source_id: String,
    source_type: SourceType,
    score: f32,
    retrieved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl EvidenceItem {
    /// Create an item retrieved now. The score is clamped into [0, 1].
    pub fn new(
        source_id: impl Into<String>,
        text: impl Into<String>,
        source_type: SourceType,
        score: f32,
    ) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            source_type,
            score: clamp_unit(score),
            retrieved_at: Utc::now(),
            url: None,
        }
    }

    /// Local passage.
    pub fn local(source_id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self::new(source_id, text, SourceType::Local, score)
    }

    /// Web snippet.
    pub fn web(source_id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self::new(source_id, text, SourceType::Web, score)
    }

    /// Attach the page URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the retrieval timestamp.
    pub fn with_retrieved_at(mut self, retrieved_at: DateTime<Utc>) -> Self {
        self.retrieved_at = retrieved_at;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn retrieved_at(&self) -> DateTime<Utc> {
        self.retrieved_at
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// Wire form of [`EvidenceItem`]; deserialized scores are clamped like
/// constructed ones.
#[derive(Deserialize)]
struct EvidenceRecord {
    text: String,
    source_id: String,
    source_type: SourceType,
    score: f32,
    retrieved_at: DateTime<Utc>,
    #[serde(default)]
    url: Option<String>,
}

impl From<EvidenceRecord> for EvidenceItem {
    fn from(record: EvidenceRecord) -> Self {
        Self {
            text: record.text,
            source_id: record.source_id,
            source_type: record.source_type,
            score: clamp_unit(record.score),
            retrieved_at: record.retrieved_at,
            url: record.url,
        }
    }
}

/// Ranked evidence, unique by `source_id`, scores non-increasing.
///
/// Every constructor normalizes, so any value of this type upholds both
/// invariants.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvidenceSet {
    items: Vec<EvidenceItem>,
}

impl EvidenceSet {
    /// An empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from items in arrival order.
    pub fn from_items(items: impl IntoIterator<Item = EvidenceItem>) -> Self {
        Self {
            items: normalize(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Highest score in the set, if any.
    pub fn top_score(&self) -> Option<f32> {
        self.items.first().map(|item| item.score)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvidenceItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[EvidenceItem] {
        &self.items
    }

    /// Look up an item by source id.
    pub fn get(&self, source_id: &str) -> Option<&EvidenceItem> {
        self.items.iter().find(|item| item.source_id == source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.get(source_id).is_some()
    }

    /// Keep only the `n` best-ranked items.
    pub fn truncated(mut self, n: usize) -> Self {
        self.items.truncate(n);
        self
    }

    /// Drop items scoring below `min_score`.
    pub fn above(self, min_score: f32) -> Self {
        Self {
            items: self
                .items
                .into_iter()
                .filter(|item| item.score >= min_score)
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for EvidenceSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<EvidenceItem>::deserialize(deserializer)?;
        Ok(Self::from_items(items))
    }
}

impl FromIterator<EvidenceItem> for EvidenceSet {
    fn from_iter<I: IntoIterator<Item = EvidenceItem>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl IntoIterator for EvidenceSet {
    type Item = EvidenceItem;
    type IntoIter = std::vec::IntoIter<EvidenceItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a EvidenceSet {
    type Item = &'a EvidenceItem;
    type IntoIter = std::slice::Iter<'a, EvidenceItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_score_is_clamped() {
        assert_eq!(EvidenceItem::local("a", "t", -0.3).score(), 0.0);
        assert_eq!(EvidenceItem::local("a", "t", 1.7).score(), 1.0);
        assert_eq!(EvidenceItem::local("a", "t", f32::NAN).score(), 0.0);
    }

    #[test]
    fn test_set_is_ranked_on_construction() {
        let set = EvidenceSet::from_items(vec![
            EvidenceItem::local("low", "t", 0.2),
            EvidenceItem::local("high", "t", 0.9),
        ]);

        assert_eq!(set.top_score(), Some(0.9));
        assert_eq!(set.as_slice()[0].source_id(), "high");
    }

    #[test]
    fn test_above_and_truncated() {
        let set = EvidenceSet::from_items(vec![
            EvidenceItem::local("a", "t", 0.9),
            EvidenceItem::local("b", "t", 0.5),
            EvidenceItem::local("c", "t", 0.1),
        ]);

        let filtered = set.clone().above(0.5);
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.contains("c"));

        assert_eq!(set.truncated(1).len(), 1);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let json = r#"[
            {"text": "a", "source_id": "x", "source_type": "local", "score": 0.1, "retrieved_at": "2024-01-01T00:00:00Z"},
            {"text": "b", "source_id": "x", "source_type": "web", "score": 0.6, "retrieved_at": "2024-01-01T00:00:00Z"}
        ]"#;

        let set: EvidenceSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.top_score(), Some(0.6));
    }

    #[test]
    fn test_deserialized_score_is_clamped() {
        let json = r#"{"text": "a", "source_id": "x", "source_type": "web", "score": 1.7, "retrieved_at": "2024-01-01T00:00:00Z", "url": "https://x.example"}"#;
        let item: EvidenceItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.score(), 1.0);
        assert_eq!(item.url(), Some("https://x.example"));

        let json = r#"{"text": "a", "source_id": "y", "source_type": "local", "score": -0.4, "retrieved_at": "2024-01-01T00:00:00Z"}"#;
        let item: EvidenceItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.score(), 0.0);
        assert_eq!(item.url(), None);
    }
}
