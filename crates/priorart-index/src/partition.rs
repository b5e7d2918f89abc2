//! A loaded partition: one ANN backend plus its item resolver.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use priorart_core::types::ScoredHit;

use crate::backend::{AnnBackend, BackendKind};
use crate::flat::FlatIndex;
use crate::ivf::IvfIndex;

pub struct Partition {
    id: String,
    backend: Box<dyn AnnBackend>,
    /// Dense item id -> external document id.
    items: Vec<String>,
}

impl Partition {
    /// Load a partition file and its sibling `<id>.items.json`
    /// resolver. The resolver length must match the index length.
    pub fn load(id: &str, kind: BackendKind, index_file: &Path) -> anyhow::Result<Self> {
        let backend: Box<dyn AnnBackend> = match kind {
            BackendKind::Flat => Box::new(FlatIndex::load(index_file)?),
            BackendKind::Ivf => Box::new(IvfIndex::load(index_file)?),
        };
        let items = load_items(&items_path(index_file))?;
        anyhow::ensure!(
            items.len() == backend.len(),
            "partition {}: {} items for {} indexed vectors",
            id,
            items.len(),
            backend.len()
        );
        Ok(Self {
            id: id.to_string(),
            backend,
            items,
        })
    }

    pub fn from_parts(id: &str, backend: Box<dyn AnnBackend>, items: Vec<String>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            items.len() == backend.len(),
            "partition {}: {} items for {} indexed vectors",
            id,
            items.len(),
            backend.len()
        );
        Ok(Self {
            id: id.to_string(),
            backend,
            items,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.backend.dim()
    }

    /// Search and resolve item ids to document ids, collapsing
    /// adjacent hits that resolve to the same document (an index may
    /// carry one vector per section of the same document).
    pub fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<ScoredHit>> {
        let raw = self.backend.search(vector, k)?;
        let mut hits: Vec<ScoredHit> = Vec::with_capacity(raw.len());
        for (item, score) in raw {
            let doc_id = &self.items[item];
            if hits.last().is_some_and(|last| &last.doc_id == doc_id) {
                continue;
            }
            hits.push(ScoredHit {
                doc_id: doc_id.clone(),
                partition_id: self.id.clone(),
                score,
            });
        }
        Ok(hits)
    }
}

/// Path of the item resolver file next to an index file:
/// `H04W.flat` -> `H04W.items.json`.
pub fn items_path(index_file: &Path) -> std::path::PathBuf {
    index_file.with_extension("items.json")
}

pub fn load_items(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("cannot open items file {}: {}", path.display(), e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write the item resolver file for a partition.
pub fn write_items(path: &Path, items: &[String]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), items)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_and_collapses_adjacent_duplicates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let index_file = tmp.path().join("H04W.flat");
        // Items 0 and 1 belong to the same document and are nearly
        // identical vectors, so they rank adjacently.
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.999, 0.001],
            vec![0.0, 1.0],
        ];
        FlatIndex::write(&index_file, 2, &vectors).expect("write");
        let items = vec![
            "US1A".to_string(),
            "US1A".to_string(),
            "US2A".to_string(),
        ];
        write_items(&items_path(&index_file), &items).expect("items");

        let partition =
            Partition::load("H04W", BackendKind::Flat, &index_file).expect("load");
        let hits = partition.search(&[1.0, 0.0], 3).expect("search");
        let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["US1A", "US2A"]);
        assert!(hits.iter().all(|h| h.partition_id == "H04W"));
    }

    #[test]
    fn rejects_items_length_mismatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let index_file = tmp.path().join("G06T.flat");
        FlatIndex::write(&index_file, 2, &[vec![1.0, 0.0], vec![0.0, 1.0]]).expect("write");
        write_items(&items_path(&index_file), &["US1A".to_string()]).expect("items");
        assert!(Partition::load("G06T", BackendKind::Flat, &index_file).is_err());
    }
}
