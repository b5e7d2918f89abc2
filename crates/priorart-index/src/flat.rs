//! Exact inner-product backend: a brute-force scan over normalized
//! vectors. The baseline partition format; exact, and fast enough for
//! partitions up to a few hundred thousand items.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use priorart_core::types::{dot, normalize};

use crate::backend::{top_k, AnnBackend};

#[derive(Serialize, Deserialize)]
struct FlatFile {
    dim: u32,
    /// Row-major, L2-normalized at build time.
    vectors: Vec<f32>,
}

pub struct FlatIndex {
    dim: usize,
    count: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let data: FlatFile = bincode::deserialize_from(BufReader::new(file))?;
        let dim = data.dim as usize;
        anyhow::ensure!(dim > 0, "flat index {} has zero dimension", path.display());
        anyhow::ensure!(
            data.vectors.len() % dim == 0,
            "flat index {} is truncated",
            path.display()
        );
        Ok(Self {
            dim,
            count: data.vectors.len() / dim,
            vectors: data.vectors,
        })
    }

    /// Write a partition file. Vectors are normalized on the way out
    /// so searches can use a plain dot product.
    pub fn write(path: &Path, dim: usize, vectors: &[Vec<f32>]) -> anyhow::Result<()> {
        let mut flat = Vec::with_capacity(vectors.len() * dim);
        for v in vectors {
            anyhow::ensure!(v.len() == dim, "vector dimension mismatch: {}", v.len());
            let mut row = v.clone();
            normalize(&mut row);
            flat.extend_from_slice(&row);
        }
        let file = File::create(path)?;
        bincode::serialize_into(
            BufWriter::new(file),
            &FlatFile {
                dim: dim as u32,
                vectors: flat,
            },
        )?;
        Ok(())
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dim..(i + 1) * self.dim]
    }
}

impl AnnBackend for FlatIndex {
    fn len(&self) -> usize {
        self.count
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<(usize, f32)>> {
        anyhow::ensure!(
            vector.len() == self.dim,
            "query dimension {} does not match index dimension {}",
            vector.len(),
            self.dim
        );
        let mut query = vector.to_vec();
        normalize(&mut query);
        let scored: Vec<(usize, f32)> = (0..self.count)
            .map(|i| (i, dot(&query, self.row(i))))
            .collect();
        Ok(top_k(scored, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_exact_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("T01.flat");
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.9, 0.1, 0.0],
        ];
        FlatIndex::write(&path, 3, &vectors).expect("write");
        let index = FlatIndex::load(&path).expect("load");
        assert_eq!(index.len(), 3);

        let hits = index.search(&[1.0, 0.0, 0.0], 2).expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 2);
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("T02.flat");
        FlatIndex::write(&path, 2, &[vec![1.0, 0.0]]).expect("write");
        let index = FlatIndex::load(&path).expect("load");
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }
}
