//! Seams to external collaborators: embedding models, classifiers,
//! the document database and the snippet service. The retrieval core
//! only ever talks to these traits.

use crate::types::{DocumentRecord, MappingEntry};

pub trait TextEmbedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Concept/entity extraction plus vectorization, used by the pair
/// combiner to derive query features.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, text: &str) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Predicts technology categories for a query text, most confident
/// first. Used to route searches to a subset of partitions.
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, text: &str) -> anyhow::Result<Vec<String>>;
}

pub trait DocumentStore: Send + Sync {
    fn get(&self, id: &str) -> anyhow::Result<Option<DocumentRecord>>;

    /// Missing documents come back as `None` in the matching slot.
    fn get_many(&self, ids: &[String]) -> anyhow::Result<Vec<Option<DocumentRecord>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }
}

/// Presentation-only snippet/mapping generation. Failures are degraded
/// to a null field by the assembler, never fatal.
pub trait SnippetProvider: Send + Sync {
    fn extract(&self, query: &str, full_text: &str) -> anyhow::Result<String>;
    fn map(&self, query: &str, full_text: &str) -> anyhow::Result<Vec<MappingEntry>>;
}

/// Secondary scoring pass over a small top-K window. Any total order
/// over (query, document) pairs qualifies; only the permutation
/// contract belongs to the core.
pub trait Reranker: Send + Sync {
    /// Returns indexes into `documents`, most relevant first.
    fn rank(&self, query: &str, documents: &[String]) -> anyhow::Result<Vec<usize>>;
}
