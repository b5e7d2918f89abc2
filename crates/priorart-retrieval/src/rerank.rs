//! Secondary ranking pass over a small result window.

use tracing::warn;

use priorart_core::traits::Reranker;
use priorart_core::types::SearchResult;

/// Reorder `results` by the reranker's verdict on their abstracts.
///
/// The reranker must return a permutation of `0..results.len()`;
/// anything else (including an error) leaves the vector-score order in
/// place with a warning. Ranking is advisory, never fatal.
pub fn rerank_results(
    reranker: &dyn Reranker,
    query: &str,
    results: Vec<SearchResult>,
) -> Vec<SearchResult> {
    if results.len() < 2 {
        return results;
    }
    let abstracts: Vec<String> = results
        .iter()
        .map(|r| r.doc.abstract_text.clone())
        .collect();
    let ranks = match reranker.rank(query, &abstracts) {
        Ok(ranks) => ranks,
        Err(e) => {
            warn!(error = %e, "reranker failed, keeping vector order");
            return results;
        }
    };
    if !is_permutation(&ranks, results.len()) {
        warn!(len = results.len(), "reranker output is not a permutation, keeping vector order");
        return results;
    }
    apply_permutation(results, &ranks)
}

fn is_permutation(ranks: &[usize], n: usize) -> bool {
    if ranks.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &r in ranks {
        if r >= n || seen[r] {
            return false;
        }
        seen[r] = true;
    }
    true
}

/// `ranks[k]` is the source index of the item that belongs at
/// position `k`. Caller guarantees a valid permutation.
fn apply_permutation(items: Vec<SearchResult>, ranks: &[usize]) -> Vec<SearchResult> {
    let mut slots: Vec<Option<SearchResult>> = items.into_iter().map(Some).collect();
    ranks
        .iter()
        .filter_map(|&source| slots[source].take())
        .collect()
}
