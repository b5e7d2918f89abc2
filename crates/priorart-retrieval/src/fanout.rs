//! Concurrent fan-out of one query vector across index partitions.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::warn;

use priorart_core::types::ScoredHit;
use priorart_index::Partition;

pub struct FanoutSearcher {
    concurrency: usize,
    min_similarity: f32,
}

impl FanoutSearcher {
    pub fn new(concurrency: usize, min_similarity: f32) -> Self {
        Self {
            concurrency: concurrency.max(1),
            min_similarity,
        }
    }

    /// Search every partition for the top `k` neighbors of `vector`
    /// and pool the hits into one score-descending list.
    ///
    /// Partition searches run on the blocking pool, at most
    /// `concurrency` at a time. A partition that fails is logged and
    /// skipped; partial results beat no results. Hits at or below the
    /// similarity floor are dropped here, before any ranking stage
    /// sees them. The output order is deterministic regardless of
    /// completion order.
    pub async fn search(
        &self,
        vector: &[f32],
        partitions: &[Arc<Partition>],
        k: usize,
    ) -> Vec<ScoredHit> {
        let tasks = partitions.iter().map(|partition| {
            let partition = Arc::clone(partition);
            let vector = vector.to_vec();
            async move {
                let id = partition.id().to_string();
                let joined =
                    tokio::task::spawn_blocking(move || partition.search(&vector, k)).await;
                match joined {
                    Ok(Ok(hits)) => hits,
                    Ok(Err(e)) => {
                        warn!(partition = %id, error = %e, "partition search failed, skipping");
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(partition = %id, error = %e, "partition search panicked, skipping");
                        Vec::new()
                    }
                }
            }
        });

        let pooled: Vec<Vec<ScoredHit>> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut hits: Vec<ScoredHit> = pooled
            .into_iter()
            .flatten()
            .filter(|h| h.score > self.min_similarity)
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
                .then_with(|| a.partition_id.cmp(&b.partition_id))
        });
        hits
    }
}
