//! Pair combination for obviousness-style (two-reference) searches.
//!
//! A single document rarely covers every element of a claim. The
//! combiner scores document pairs by how well they jointly cover the
//! query's features: for each feature take the better (smaller)
//! distance of the two documents, then judge the pair by its
//! worst-covered feature. Small maximin distance means no feature is
//! left uncovered.

use priorart_core::traits::FeatureExtractor;
use priorart_core::types::cosine_distance;

/// Distance assigned to a feature no text of the document covers.
const UNCOVERED: f32 = 2.0;

/// One ranked document pair; indexes point into the candidate list the
/// combiner was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct PairCandidate {
    pub first: usize,
    pub second: usize,
    pub distance: f32,
}

/// Feature-coverage matrix over a candidate document list.
pub struct Combiner {
    /// `matrix[d][f]` = distance from document `d` to query feature `f`.
    matrix: Vec<Vec<f32>>,
}

impl Combiner {
    /// Extract features from the query and from each candidate
    /// abstract. A document's distance to a query feature is the best
    /// match among the document's own features, so a document carrying
    /// a feature verbatim scores it as fully covered no matter what
    /// else its abstract says.
    pub fn new(
        extractor: &dyn FeatureExtractor,
        query: &str,
        abstracts: &[String],
    ) -> anyhow::Result<Self> {
        let features = extractor.extract(query)?;
        anyhow::ensure!(!features.is_empty(), "no features extracted from query");
        let mut matrix = Vec::with_capacity(abstracts.len());
        for abstract_text in abstracts {
            let doc_features = extractor.extract(abstract_text)?;
            let row = features
                .iter()
                .map(|f| {
                    doc_features
                        .iter()
                        .map(|df| {
                            let d = cosine_distance(df, f);
                            if d.is_finite() {
                                d
                            } else {
                                UNCOVERED
                            }
                        })
                        .fold(UNCOVERED, f32::min)
                })
                .collect();
            matrix.push(row);
        }
        Ok(Self { matrix })
    }

    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    /// Joint coverage distance of documents `i` and `j`: the worst
    /// feature after each feature takes its better-covering member.
    pub fn pair_distance(&self, i: usize, j: usize) -> f32 {
        self.matrix[i]
            .iter()
            .zip(&self.matrix[j])
            .map(|(a, b)| a.min(*b))
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Up to `n` best pairs, best first, with no document appearing in
    /// more than one pair. Exclusivity keeps the list diverse instead
    /// of pairing one strong document with everything.
    pub fn best_pairs(&self, n: usize) -> Vec<PairCandidate> {
        let docs = self.matrix.len();
        let mut candidates = Vec::with_capacity(docs.saturating_mul(docs.saturating_sub(1)) / 2);
        for i in 0..docs {
            for j in (i + 1)..docs {
                candidates.push(PairCandidate {
                    first: i,
                    second: j,
                    distance: self.pair_distance(i, j),
                });
            }
        }
        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.first.cmp(&b.first))
                .then(a.second.cmp(&b.second))
        });

        let mut used = vec![false; docs];
        let mut picked = Vec::with_capacity(n);
        for c in candidates {
            if picked.len() == n {
                break;
            }
            if used[c.first] || used[c.second] {
                continue;
            }
            used[c.first] = true;
            used[c.second] = true;
            picked.push(c);
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_core::fakes::WordFeatureExtractor;

    fn combiner(query: &str, abstracts: &[&str]) -> Combiner {
        let extractor = WordFeatureExtractor::new(64);
        let abstracts: Vec<String> = abstracts.iter().map(|s| (*s).to_string()).collect();
        Combiner::new(&extractor, query, &abstracts).expect("combiner")
    }

    #[test]
    fn verbatim_coverage_survives_surrounding_noise() {
        // Each abstract contains one query word verbatim among
        // unrelated words; jointly they cover both features exactly.
        let c = combiner(
            "solar battery",
            &[
                "solar mounting bracket hardware",
                "battery thermal housing unit",
            ],
        );
        assert!(c.pair_distance(0, 1).abs() < 1e-6);
    }

    #[test]
    fn complementary_documents_beat_redundant_ones() {
        // Documents 0 and 1 each cover one half of the query;
        // documents 2 and 3 both cover the same half.
        let c = combiner(
            "solar panel battery storage",
            &[
                "solar panel mounting",
                "battery storage system",
                "solar panel coating",
                "solar panel tracker",
            ],
        );
        let complementary = c.pair_distance(0, 1);
        let redundant = c.pair_distance(2, 3);
        assert!(complementary < redundant);
    }

    #[test]
    fn best_pairs_are_exclusive() {
        let c = combiner(
            "solar panel battery storage",
            &[
                "solar panel mounting",
                "battery storage system",
                "solar panel coating",
                "battery charging circuit",
            ],
        );
        let pairs = c.best_pairs(10);
        let mut seen = std::collections::HashSet::new();
        for p in &pairs {
            assert!(seen.insert(p.first), "document reused across pairs");
            assert!(seen.insert(p.second), "document reused across pairs");
        }
        // 4 documents allow at most 2 exclusive pairs.
        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].distance <= pairs[1].distance);
    }

    #[test]
    fn empty_query_features_is_an_error() {
        let extractor = WordFeatureExtractor::new(64);
        assert!(Combiner::new(&extractor, "???", &["a".to_string()]).is_err());
    }
}
