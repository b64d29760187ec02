//! Exact nearest-neighbour search over a small set of vectors.
//!
//! Candidate sets are tens to a few hundred rows, so every query is a full
//! scan by squared Euclidean distance. Nothing here is approximate.

use crate::error::{Result, SvarError};

/// One search hit: squared Euclidean distance and insertion index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub index: usize,
}

/// Flat (brute-force) index.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build an index; every vector must have the same length.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);

        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return Err(SvarError::Query(format!(
                "Embedding dimension mismatch: vector {} has {} dimensions, expected {}",
                i,
                v.len(),
                dimensions
            )));
        }

        Ok(Self { dimensions, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The `k` nearest vectors, nearest first.
    ///
    /// Equal distances keep insertion order. `k` is clamped to the index size.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(SvarError::Query(format!(
                "Query embedding has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, v)| Neighbor {
                distance: squared_l2(query, v),
                index,
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.index.cmp(&b.index))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
