//! Deterministic stand-ins for the external collaborators.
//!
//! These are real implementations of the collaborator traits, not
//! mocks: the hashing embedder produces stable normalized vectors from
//! token hashes, so searches against indexes built with it behave like
//! a (weak) semantic search. Used by the test suites and the demo CLI;
//! a deployment swaps in model-backed implementations.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use crate::traits::{
    CategoryClassifier, DocumentStore, FeatureExtractor, Reranker, TextEmbedder,
};
use crate::types::{normalize, DocType, DocumentRecord};

/// Token-hash bag embedder: each token bumps one bucket selected by
/// its xxhash, then the vector is L2-normalized. Texts sharing tokens
/// land near each other; disjoint texts are near-orthogonal.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl TextEmbedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val;
        }
        normalize(&mut v);
        Ok(v)
    }
}

/// One hash-embedded vector per unique word, in order of first
/// occurrence. Gives the pair combiner a feature set whose coverage is
/// exactly word overlap.
pub struct WordFeatureExtractor {
    embedder: HashingEmbedder,
}

impl WordFeatureExtractor {
    pub fn new(dim: usize) -> Self {
        Self {
            embedder: HashingEmbedder::new(dim),
        }
    }
}

impl FeatureExtractor for WordFeatureExtractor {
    fn extract(&self, text: &str) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut seen = Vec::new();
        let mut features = Vec::new();
        for word in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() || seen.iter().any(|w| w == word) {
                continue;
            }
            features.push(self.embedder.embed(word)?);
            seen.push(word.to_string());
        }
        Ok(features)
    }
}

/// Returns a fixed category list regardless of input.
pub struct FixedClassifier {
    categories: Vec<String>,
}

impl FixedClassifier {
    pub fn new(categories: Vec<String>) -> Self {
        Self { categories }
    }
}

impl CategoryClassifier for FixedClassifier {
    fn classify(&self, _text: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.categories.clone())
    }
}

/// A classifier that always fails; exercises the exhaustive fallback.
pub struct FailingClassifier;

impl CategoryClassifier for FailingClassifier {
    fn classify(&self, _text: &str) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("classifier unavailable")
    }
}

/// In-memory document store keyed by document id.
#[derive(Default)]
pub struct StaticDocumentStore {
    docs: HashMap<String, DocumentRecord>,
}

impl StaticDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<DocumentRecord>) -> Self {
        let mut store = Self::new();
        for r in records {
            store.insert(r);
        }
        store
    }

    pub fn insert(&mut self, record: DocumentRecord) {
        self.docs.insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl DocumentStore for StaticDocumentStore {
    fn get(&self, id: &str) -> anyhow::Result<Option<DocumentRecord>> {
        Ok(self.docs.get(id).cloned())
    }
}

/// Word-overlap reranker: scores each document by the fraction of
/// query words it contains, stable on ties.
pub struct LexicalReranker;

impl Reranker for LexicalReranker {
    fn rank(&self, query: &str, documents: &[String]) -> anyhow::Result<Vec<usize>> {
        let query_lower = query.to_lowercase();
        let query_words: Vec<&str> = query_lower.split_whitespace().collect();
        let mut scored: Vec<(usize, f32)> = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let doc_lower = doc.to_lowercase();
                let mut overlap = 0.0f32;
                for word in &query_words {
                    if doc_lower.contains(word) {
                        overlap += 1.0;
                    }
                }
                let score = if query_words.is_empty() {
                    0.0
                } else {
                    overlap / query_words.len() as f32
                };
                (i, score)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        Ok(scored.into_iter().map(|(i, _)| i).collect())
    }
}

/// Shorthand for building a patent record in tests and demos.
pub fn patent(id: &str, title: &str, abstract_text: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: Some(title.to_string()),
        abstract_text: abstract_text.to_string(),
        doc_type: DocType::Patent,
        publication_date: None,
        filing_date: None,
        priority_date: None,
        full_text: None,
        first_claim: None,
        www_link: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(32);
        let a = embedder.embed("wireless base station").unwrap();
        let b = embedder.embed("wireless base station").unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn similar_texts_score_higher_than_disjoint() {
        let embedder = HashingEmbedder::new(64);
        let q = embedder.embed("solar panel efficiency").unwrap();
        let close = embedder.embed("improving solar panel efficiency").unwrap();
        let far = embedder.embed("quantum cryptography protocol").unwrap();
        let sim_close = crate::types::dot(&q, &close);
        let sim_far = crate::types::dot(&q, &far);
        assert!(sim_close > sim_far);
    }

    #[test]
    fn lexical_reranker_orders_by_overlap() {
        let docs = vec![
            "nothing in common".to_string(),
            "carbon capture and emissions".to_string(),
            "reducing carbon emissions entirely".to_string(),
        ];
        let ranks = LexicalReranker
            .rank("reducing carbon emissions", &docs)
            .unwrap();
        assert_eq!(ranks[0], 2);
        assert_eq!(ranks[2], 0);
    }
}
