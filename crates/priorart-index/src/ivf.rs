//! Inverted-file ANN backend: vectors are bucketed under k-means
//! coarse centroids at build time, and a search only scans the
//! `nprobe` lists whose centroids are nearest the query. Trades a
//! little recall for a large scan reduction on big partitions.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use priorart_core::types::{dot, normalize};

use crate::backend::{top_k, AnnBackend};

const KMEANS_ITERATIONS: usize = 10;

#[derive(Serialize, Deserialize)]
pub struct IvfIndex {
    dim: usize,
    count: usize,
    nprobe: usize,
    /// Row-major centroid matrix, nlists x dim.
    centroids: Vec<f32>,
    /// Dense item ids bucketed per centroid.
    lists: Vec<Vec<u32>>,
    /// Row-major normalized vectors, indexed by dense item id.
    vectors: Vec<f32>,
}

impl IvfIndex {
    /// Cluster `vectors` under `nlists` centroids with a fixed-seed
    /// k-means so identical inputs always produce identical indexes.
    pub fn build(vectors: &[Vec<f32>], dim: usize, nlists: usize, nprobe: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(dim > 0, "zero dimension");
        anyhow::ensure!(!vectors.is_empty(), "cannot build an empty IVF index");
        let mut flat = Vec::with_capacity(vectors.len() * dim);
        for v in vectors {
            anyhow::ensure!(v.len() == dim, "vector dimension mismatch: {}", v.len());
            let mut row = v.clone();
            normalize(&mut row);
            flat.extend_from_slice(&row);
        }
        let count = vectors.len();
        let nlists = nlists.clamp(1, count);
        let nprobe = nprobe.clamp(1, nlists);

        // Seeded initialization: distinct sample of input rows.
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let picks = sample(&mut rng, count, nlists);
        let mut centroids = Vec::with_capacity(nlists * dim);
        for i in picks.iter() {
            centroids.extend_from_slice(&flat[i * dim..(i + 1) * dim]);
        }

        let mut assignment = vec![0usize; count];
        for _ in 0..KMEANS_ITERATIONS {
            for (i, slot) in assignment.iter_mut().enumerate() {
                *slot = nearest_centroid(&flat[i * dim..(i + 1) * dim], &centroids, dim);
            }
            let mut sums = vec![0f32; nlists * dim];
            let mut sizes = vec![0usize; nlists];
            for (i, &c) in assignment.iter().enumerate() {
                sizes[c] += 1;
                for d in 0..dim {
                    sums[c * dim + d] += flat[i * dim + d];
                }
            }
            for c in 0..nlists {
                // Empty clusters keep their previous centroid.
                if sizes[c] == 0 {
                    continue;
                }
                let slice = &mut sums[c * dim..(c + 1) * dim];
                for x in slice.iter_mut() {
                    *x /= sizes[c] as f32;
                }
                normalize(slice);
                centroids[c * dim..(c + 1) * dim].copy_from_slice(slice);
            }
        }

        let mut lists: Vec<Vec<u32>> = vec![Vec::new(); nlists];
        for (i, &c) in assignment.iter().enumerate() {
            lists[c].push(i as u32);
        }

        Ok(Self {
            dim,
            count,
            nprobe,
            centroids,
            lists,
            vectors: flat,
        })
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let index: IvfIndex = bincode::deserialize_from(BufReader::new(file))?;
        anyhow::ensure!(
            index.dim > 0 && index.vectors.len() == index.count * index.dim,
            "ivf index {} is corrupt",
            path.display()
        );
        Ok(index)
    }
}

fn nearest_centroid(row: &[f32], centroids: &[f32], dim: usize) -> usize {
    let nlists = centroids.len() / dim;
    let mut best = 0usize;
    let mut best_sim = f32::NEG_INFINITY;
    for c in 0..nlists {
        let sim = dot(row, &centroids[c * dim..(c + 1) * dim]);
        if sim > best_sim {
            best_sim = sim;
            best = c;
        }
    }
    best
}

impl AnnBackend for IvfIndex {
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

        let nlists = self.lists.len();
        let by_centroid: Vec<(usize, f32)> = (0..nlists)
            .map(|c| (c, dot(&query, &self.centroids[c * self.dim..(c + 1) * self.dim])))
            .collect();
        let probes = top_k(by_centroid, self.nprobe);

        let mut scored = Vec::new();
        for (c, _) in probes {
            for &i in &self.lists[c] {
                let i = i as usize;
                let row = &self.vectors[i * self.dim..(i + 1) * self.dim];
                scored.push((i, dot(&query, row)));
            }
        }
        Ok(top_k(scored, k))
    }
}
