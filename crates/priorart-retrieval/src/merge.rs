//! Result-list merging: interleaving single references with reference
//! pairs, and folding federated remote results into a local list.

use serde_json::Value;

use priorart_core::types::SearchResult;

/// One entry of a merged single/pair list.
#[derive(Debug, Clone)]
pub enum Merged {
    Single(SearchResult),
    Pair(Box<(SearchResult, SearchResult)>),
}

impl Merged {
    pub fn score(&self) -> f32 {
        match self {
            Merged::Single(r) => r.score,
            Merged::Pair(p) => pair_score(&p.0, &p.1),
        }
    }
}

/// A pair is only as strong as its weaker member.
fn pair_score(a: &SearchResult, b: &SearchResult) -> f32 {
    a.score.min(b.score)
}

/// Two-pointer merge of a score-descending single list and a
/// best-first pair list. At each step the head with the higher
/// similarity wins; a tie goes to the single reference, which is the
/// simpler citation.
pub fn merge_single_paired(
    singles: Vec<SearchResult>,
    pairs: Vec<(SearchResult, SearchResult)>,
) -> Vec<Merged> {
    let mut merged = Vec::with_capacity(singles.len() + pairs.len());
    let mut singles = singles.into_iter().peekable();
    let mut pairs = pairs.into_iter().peekable();
    loop {
        let take_single = match (singles.peek(), pairs.peek()) {
            (Some(s), Some(p)) => s.score >= pair_score(&p.0, &p.1),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_single {
            if let Some(s) = singles.next() {
                merged.push(Merged::Single(s));
            }
        } else if let Some(p) = pairs.next() {
            merged.push(Merged::Pair(Box::new(p)));
        }
    }
    merged
}

/// One serialized result taking part in a federated merge: the local
/// engine's own results and every remote extension's results are
/// reduced to this shape before merging.
#[derive(Debug, Clone)]
pub struct FederatedEntry {
    pub score: f32,
    pub abstract_text: String,
    /// Response-ready payload, passed through untouched.
    pub payload: Value,
}

/// Flatten federated result lists into one score-descending list,
/// collapsing adjacent entries with identical abstracts (the same
/// document is often indexed by several participating hosts).
pub fn merge_federated(lists: Vec<Vec<FederatedEntry>>) -> Vec<FederatedEntry> {
    let mut entries: Vec<FederatedEntry> = lists.into_iter().flatten().collect();
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut merged: Vec<FederatedEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if merged
            .last()
            .is_some_and(|last| last.abstract_text == entry.abstract_text)
        {
            continue;
        }
        merged.push(entry);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_core::fakes::patent;
    use serde_json::json;

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult::new(patent(id, "t", "a"), "H04W.patent".to_string(), score)
    }

    #[test]
    fn interleaves_by_score_with_pair_as_weakest_member() {
        let singles = vec![result("US1A", 0.9), result("US2A", 0.5)];
        // Pair score is min(0.8, 0.7) = 0.7, so it lands between.
        let pairs = vec![(result("US3A", 0.8), result("US4A", 0.7))];
        let merged = merge_single_paired(singles, pairs);
        assert_eq!(merged.len(), 3);
        assert!(matches!(&merged[0], Merged::Single(r) if r.doc.id == "US1A"));
        assert!(matches!(&merged[1], Merged::Pair(_)));
        assert!(matches!(&merged[2], Merged::Single(r) if r.doc.id == "US2A"));
        for w in merged.windows(2) {
            assert!(w[0].score() >= w[1].score());
        }
    }

    #[test]
    fn tie_prefers_the_single_reference() {
        let singles = vec![result("US1A", 0.7)];
        let pairs = vec![(result("US2A", 0.7), result("US3A", 0.9))];
        let merged = merge_single_paired(singles, pairs);
        assert!(matches!(&merged[0], Merged::Single(_)));
        assert!(matches!(&merged[1], Merged::Pair(_)));
    }

    fn entry(score: f32, abstract_text: &str) -> FederatedEntry {
        FederatedEntry {
            score,
            abstract_text: abstract_text.to_string(),
            payload: json!({ "abstract": abstract_text, "score": score }),
        }
    }

    #[test]
    fn federated_merge_sorts_and_collapses_shared_abstracts() {
        let local = vec![entry(0.9, "an antenna array"), entry(0.6, "a modem")];
        let remote = vec![entry(0.8, "an antenna array"), entry(0.7, "a codec")];
        let merged = merge_federated(vec![local, remote]);
        let scores: Vec<f32> = merged.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.6]);
        assert_eq!(
            merged
                .iter()
                .filter(|e| e.abstract_text == "an antenna array")
                .count(),
            1
        );
    }
}
