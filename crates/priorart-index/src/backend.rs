//! The seam between the catalog and concrete ANN structures.

use std::path::Path;

/// One approximate-nearest-neighbor structure.
///
/// Scores are cosine similarity, higher is better — the single
/// convention used throughout the pipeline. Backends store
/// L2-normalized vectors so inner product equals cosine; whatever the
/// underlying structure reports natively is converted here and nowhere
/// else.
pub trait AnnBackend: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dim(&self) -> usize;

    /// Top-k dense item ids with similarity, descending. Ties broken
    /// by ascending item id so results are deterministic.
    fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<(usize, f32)>>;
}

/// Enabled backend file formats. A deployment may carry both side by
/// side in one index directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Flat,
    Ivf,
}

impl BackendKind {
    pub fn extension(self) -> &'static str {
        match self {
            BackendKind::Flat => "flat",
            BackendKind::Ivf => "ivf",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("flat") => Some(BackendKind::Flat),
            Some("ivf") => Some(BackendKind::Ivf),
            _ => None,
        }
    }
}

/// Select the `k` highest-scoring `(id, score)` pairs, ordered by
/// score descending then id ascending. Shared by both backends.
pub(crate) fn top_k(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}
