//! Evidence aggregation.
//!
//! Merges per-provider evidence into one ranked context. Pure: no I/O, no
//! shared state.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::types::evidence::{EvidenceItem, EvidenceSet};

/// Merge evidence sets into a single ranked set.
///
/// Sets are consumed in provider-arrival order. Each `source_id` appears once:
/// its first occurrence fixes its arrival position, and a later duplicate
/// with a strictly higher score replaces it. The result is sorted by
/// descending score; equal scores keep arrival order.
pub fn merge(sets: impl IntoIterator<Item = EvidenceSet>) -> EvidenceSet {
    EvidenceSet::from_items(sets.into_iter().flatten())
}

/// Deduplicate by `source_id` and stable-sort by descending score.
pub(crate) fn normalize(items: impl IntoIterator<Item = EvidenceItem>) -> Vec<EvidenceItem> {
    let mut by_id: IndexMap<String, EvidenceItem> = IndexMap::new();

    for item in items {
        match by_id.entry(item.source_id().to_string()) {
            Entry::Occupied(mut existing) => {
                if item.score() > existing.get().score() {
                    existing.insert(item);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }

    let mut ranked: Vec<EvidenceItem> = by_id.into_values().collect();
    // Scores are clamped on construction, so total_cmp never sees NaN
    ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::evidence::SourceType;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn ids(set: &EvidenceSet) -> Vec<&str> {
        set.iter().map(|i| i.source_id()).collect()
    }

    #[test]
    fn test_merge_dedupes_keeping_higher_score() {
        let local = EvidenceSet::from_items(vec![
            EvidenceItem::local("shared", "local copy", 0.4),
            EvidenceItem::local("only-local", "x", 0.6),
        ]);
        let web = EvidenceSet::from_items(vec![
            EvidenceItem::web("shared", "web copy", 0.8),
            EvidenceItem::web("only-web", "y", 0.1),
        ]);

        let merged = merge(vec![local, web]);

        assert_eq!(ids(&merged), vec!["shared", "only-local", "only-web"]);
        let shared = merged.get("shared").unwrap();
        assert_eq!(shared.score(), 0.8);
        assert_eq!(shared.source_type(), SourceType::Web);
    }

    #[test]
    fn test_merge_first_occurrence_wins_on_equal_score() {
        let merged = merge(vec![
            EvidenceSet::from_items(vec![EvidenceItem::local("dup", "first", 0.5)]),
            EvidenceSet::from_items(vec![EvidenceItem::web("dup", "second", 0.5)]),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("dup").unwrap().text(), "first");
    }

    #[test]
    fn test_merge_ties_keep_arrival_order() {
        let merged = merge(vec![
            EvidenceSet::from_items(vec![
                EvidenceItem::local("l1", "a", 0.5),
                EvidenceItem::local("l2", "b", 0.5),
            ]),
            EvidenceSet::from_items(vec![EvidenceItem::web("w1", "c", 0.5)]),
        ]);

        assert_eq!(ids(&merged), vec!["l1", "l2", "w1"]);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge(Vec::<EvidenceSet>::new()).is_empty());
        assert!(merge(vec![EvidenceSet::empty(), EvidenceSet::empty()]).is_empty());
    }

    fn arb_item() -> impl Strategy<Value = EvidenceItem> {
        ("[a-e]", 0.0f32..=1.0, any::<bool>()).prop_map(|(id, score, web)| {
            if web {
                EvidenceItem::web(id, "w", score)
            } else {
                EvidenceItem::local(id, "l", score)
            }
        })
    }

    fn arb_set() -> impl Strategy<Value = EvidenceSet> {
        prop::collection::vec(arb_item(), 0..8).prop_map(EvidenceSet::from_items)
    }

    proptest! {
        #[test]
        fn prop_each_source_id_once(sets in prop::collection::vec(arb_set(), 0..4)) {
            let merged = merge(sets);
            let unique: HashSet<_> = merged.iter().map(|i| i.source_id()).collect();
            prop_assert_eq!(unique.len(), merged.len());
        }

        #[test]
        fn prop_scores_non_increasing(sets in prop::collection::vec(arb_set(), 0..4)) {
            let merged = merge(sets);
            for pair in merged.as_slice().windows(2) {
                prop_assert!(pair[0].score() >= pair[1].score());
            }
        }

        #[test]
        fn prop_merge_is_idempotent(sets in prop::collection::vec(arb_set(), 0..4)) {
            let once = merge(sets);
            let twice = merge(vec![once.clone(), once.clone()]);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_keeps_max_score_per_id(sets in prop::collection::vec(arb_set(), 1..4)) {
            let merged = merge(sets.clone());
            for item in sets.iter().flat_map(|s| s.iter()) {
                let kept = merged.get(item.source_id()).unwrap();
                prop_assert!(kept.score() >= item.score());
            }
        }
    }
}
