//! Result deduplication.
//!
//! The same invention is frequently indexed several times: once per
//! jurisdiction of a patent family, and once per section of a long
//! document. Family members embed to near-identical vectors, so hits
//! whose scores agree to within a small epsilon are treated as
//! duplicates and collapsed to the preferred jurisdiction.

use std::collections::HashSet;

use priorart_core::types::{RelevanceFeedback, ScoredHit, SearchResult};

/// Scores closer than this are considered the same document.
const SCORE_EPSILON: f32 = 1e-6;

/// Jurisdictions in order of preference when collapsing a family.
const JURISDICTION_PREFERENCE: [&str; 8] = ["US", "EP", "GB", "CA", "AU", "WO", "SG", "IN"];

fn jurisdiction_rank(code: &str) -> usize {
    JURISDICTION_PREFERENCE
        .iter()
        .position(|&c| c == code)
        .unwrap_or(JURISDICTION_PREFERENCE.len())
}

fn jurisdiction_of(doc_id: &str) -> &str {
    doc_id.get(..2).unwrap_or("")
}

/// Collapse score-adjacent duplicates in a score-descending hit list.
///
/// Comparison is pairwise against the last kept hit only, so a chain
/// of near-equal scores collapses to a single survivor. Within a
/// collapsed group the hit from the most preferred jurisdiction wins;
/// between two equally ranked jurisdictions the earlier hit wins.
pub fn dedupe_by_score(hits: Vec<ScoredHit>) -> Vec<ScoredHit> {
    let mut kept: Vec<ScoredHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(last) = kept.last_mut() else {
            kept.push(hit);
            continue;
        };
        if (last.score - hit.score).abs() >= SCORE_EPSILON {
            kept.push(hit);
            continue;
        }
        let last_cc = jurisdiction_of(&last.doc_id);
        let this_cc = jurisdiction_of(&hit.doc_id);
        if last_cc == this_cc {
            continue;
        }
        if jurisdiction_rank(this_cc) < jurisdiction_rank(last_cc) {
            *last = hit;
        }
    }
    kept
}

/// Final result-level dedup: drop documents the user already judged as
/// feedback, drop untitled records, and keep only the first result per
/// case-insensitive title.
pub fn dedupe_results(results: Vec<SearchResult>, feedback: &RelevanceFeedback) -> Vec<SearchResult> {
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(results.len());
    for result in results {
        if feedback.contains(&result.doc.id) {
            continue;
        }
        let Some(title) = result.doc.title.as_deref() else {
            continue;
        };
        if seen_titles.insert(title.to_lowercase()) {
            kept.push(result);
        }
    }
    kept
}
