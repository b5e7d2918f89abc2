//! The expanding retrieval loop.
//!
//! Filters and deduplication eat into the raw neighbor pool, so asking
//! the indexes for exactly `n` hits usually yields fewer than `n`
//! survivors. The loop over-fetches and doubles the request size until
//! the survivor list fills up or growing further cannot help.

use std::sync::Arc;

use tracing::debug;

use priorart_core::traits::DocumentStore;
use priorart_core::types::SearchResult;
use priorart_index::Partition;

use crate::dedup::dedupe_by_score;
use crate::fanout::FanoutSearcher;
use crate::filters::FilterChain;

/// Smallest pool ever requested from the indexes.
const MIN_POOL: usize = 25;

pub struct ExpandingRetriever<'a> {
    fanout: &'a FanoutSearcher,
    store: &'a dyn DocumentStore,
    min_similarity: f32,
    max_result_limit: usize,
}

impl<'a> ExpandingRetriever<'a> {
    pub fn new(
        fanout: &'a FanoutSearcher,
        store: &'a dyn DocumentStore,
        min_similarity: f32,
        max_result_limit: usize,
    ) -> Self {
        Self {
            fanout,
            store,
            min_similarity,
            max_result_limit,
        }
    }

    /// Retrieve at least `n` filtered survivors if the indexes can
    /// supply them. The returned list is score-descending, deduped by
    /// score and filtered, and may exceed `n`; the caller slices after
    /// its own final ranking stages.
    pub async fn retrieve(
        &self,
        query_vector: &[f32],
        partitions: &[Arc<Partition>],
        n: usize,
        filters: &FilterChain,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let n = n.min(self.max_result_limit).max(1);
        let mut m = MIN_POOL.max(n);
        loop {
            let hits = self.fanout.search(query_vector, partitions, m).await;
            let hits = dedupe_by_score(hits);
            let survivors = filters.apply(&hits, self.store, m)?;
            debug!(requested = m, survivors = survivors.len(), "retrieval round");

            if self.enough(&survivors, n)
                || self.pool_exhausted(&survivors)
                || self.tail_too_weak(&survivors)
                || self.at_pool_ceiling(m)
            {
                return Ok(survivors);
            }
            m *= 2;
        }
    }

    fn enough(&self, survivors: &[SearchResult], n: usize) -> bool {
        survivors.len() >= n
    }

    /// Nothing survived; a larger pool would only add weaker hits.
    fn pool_exhausted(&self, survivors: &[SearchResult]) -> bool {
        survivors.is_empty()
    }

    /// The weakest survivor is already near the similarity floor, so
    /// deeper hits would be dropped anyway.
    fn tail_too_weak(&self, survivors: &[SearchResult]) -> bool {
        survivors
            .last()
            .is_some_and(|r| r.score <= self.min_similarity + 0.01)
    }

    fn at_pool_ceiling(&self, m: usize) -> bool {
        m * 2 > 2 * self.max_result_limit
    }
}
