//! Exact nearest-neighbor search over a fixed set of vectors.
//!
//! The index is built once per question and dropped afterwards, so it is a flat
//! row-major buffer with a linear scan rather than an approximate structure.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A search hit: the position of the vector at build time and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Neighbor {
    fn cmp_by_distance(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Build an index over `vectors`. An empty slice yields an empty index of dimension 0.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if the vectors do not all share the
    /// dimension of the first one.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        let dimension = vectors.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(dimension * vectors.len());
        for v in vectors {
            if v.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: v.len(),
                });
            }
            data.extend_from_slice(v);
        }
        Ok(Self { dimension, data })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the `min(k, len)` nearest vectors to `query`, nearest first.
    /// Equal distances are ordered by ascending position.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if the index is non-empty and
    /// `query` has a different dimension.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query),
            })
            .collect();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, Neighbor::cmp_by_distance);
            hits.truncate(k);
        }
        hits.sort_unstable_by(Neighbor::cmp_by_distance);
        Ok(hits)
    }
}

impl std::fmt::Debug for FlatL2Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatL2Index")
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
