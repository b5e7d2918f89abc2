//! Rocchio-style query vector adjustment from explicit relevance
//! feedback: pull the query toward the centroid of documents the user
//! marked relevant and away from the centroid of irrelevant ones.

use tracing::warn;

use priorart_core::traits::{DocumentStore, TextEmbedder};
use priorart_core::types::{normalize, RelevanceFeedback};

pub struct FeedbackAdjuster<'a> {
    embedder: &'a dyn TextEmbedder,
    store: &'a dyn DocumentStore,
    alpha: f32,
    beta: f32,
    gamma: f32,
}

impl<'a> FeedbackAdjuster<'a> {
    pub fn new(
        embedder: &'a dyn TextEmbedder,
        store: &'a dyn DocumentStore,
        alpha: f32,
        beta: f32,
        gamma: f32,
    ) -> Self {
        Self {
            embedder,
            store,
            alpha,
            beta,
            gamma,
        }
    }

    /// `normalize(alpha*q + beta*mean(relevant) - gamma*mean(irrelevant))`.
    /// A feedback set whose documents cannot be fetched or embedded
    /// simply contributes nothing.
    pub fn adjust(&self, query_vector: &[f32], feedback: &RelevanceFeedback) -> Vec<f32> {
        let mut adjusted: Vec<f32> = query_vector.iter().map(|x| x * self.alpha).collect();
        if let Some(centroid) = self.centroid(&feedback.relevant) {
            for (slot, x) in adjusted.iter_mut().zip(&centroid) {
                *slot += self.beta * x;
            }
        }
        if let Some(centroid) = self.centroid(&feedback.irrelevant) {
            for (slot, x) in adjusted.iter_mut().zip(&centroid) {
                *slot -= self.gamma * x;
            }
        }
        normalize(&mut adjusted);
        adjusted
    }

    /// Mean abstract embedding over the ids that resolve and embed.
    fn centroid(&self, ids: &[String]) -> Option<Vec<f32>> {
        let mut sum = vec![0f32; self.embedder.dim()];
        let mut n = 0usize;
        for id in ids {
            let doc = match self.store.get(id) {
                Ok(Some(doc)) => doc,
                Ok(None) => {
                    warn!(doc = %id, "feedback document not found, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(doc = %id, error = %e, "feedback document fetch failed, skipping");
                    continue;
                }
            };
            match self.embedder.embed(&doc.abstract_text) {
                Ok(vector) => {
                    for (slot, x) in sum.iter_mut().zip(&vector) {
                        *slot += x;
                    }
                    n += 1;
                }
                Err(e) => {
                    warn!(doc = %id, error = %e, "feedback document embed failed, skipping");
                }
            }
        }
        if n == 0 {
            return None;
        }
        for x in &mut sum {
            *x /= n as f32;
        }
        Some(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_core::fakes::{patent, HashingEmbedder, StaticDocumentStore};
    use priorart_core::types::dot;

    #[test]
    fn relevant_feedback_pulls_query_toward_marked_document() {
        let embedder = HashingEmbedder::new(32);
        let store = StaticDocumentStore::from_records(vec![patent(
            "US1A",
            "t",
            "adaptive antenna beamforming array",
        )]);
        let adjuster = FeedbackAdjuster::new(&embedder, &store, 1.0, 1.0, 1.0);

        let query = embedder.embed("wireless transmission").expect("embed");
        let target = embedder
            .embed("adaptive antenna beamforming array")
            .expect("embed");
        let fb = RelevanceFeedback::from_blob(r#"{"relevant":["US1A"]}"#);

        let adjusted = adjuster.adjust(&query, &fb);
        assert!(dot(&adjusted, &target) > dot(&query, &target));
        assert!((dot(&adjusted, &adjusted) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unresolvable_feedback_leaves_query_unchanged() {
        let embedder = HashingEmbedder::new(32);
        let store = StaticDocumentStore::default();
        let adjuster = FeedbackAdjuster::new(&embedder, &store, 1.0, 1.0, 1.0);

        let query = embedder.embed("wireless transmission").expect("embed");
        let fb = RelevanceFeedback::from_blob(r#"{"relevant":["US404A"]}"#);
        let adjusted = adjuster.adjust(&query, &fb);
        // Embeddings are already unit length, so only direction matters.
        assert!(dot(&adjusted, &query) > 0.999);
    }
}
