/// Flat (brute force) nearest-neighbour index over squared Euclidean distance
use super::base::{DomainError, DomainResult};
use super::value_objects::EmbeddingVector;
use std::cmp::Ordering;

/// A search hit: position of the stored vector and its squared L2 distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Compares the query against every stored vector. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<EmbeddingVector>,
}

impl FlatL2Index {
    /// Build an index over vectors that must all share one width.
    /// An empty input yields an empty index of dimension 0.
    pub fn build(vectors: Vec<EmbeddingVector>) -> DomainResult<Self> {
        let dimension = vectors.first().map(|v| v.dimension_count()).unwrap_or(0);

        if let Some(bad) = vectors.iter().find(|v| v.dimension_count() != dimension) {
            return Err(DomainError::DimensionMismatch {
                expected: dimension,
                actual: bad.dimension_count(),
            });
        }

        Ok(FlatL2Index { dimension, vectors })
    }

    /// Return up to `k` nearest vectors, ascending by distance, ties by insertion order
    pub fn search(&self, query: &EmbeddingVector, k: usize) -> DomainResult<Vec<Neighbor>> {
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        if query.dimension_count() != self.dimension {
            return Err(DomainError::DimensionMismatch {
                expected: self.dimension,
                actual: query.dimension_count(),
            });
        }

        let mut neighbors = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| {
                vector
                    .squared_l2_distance(query)
                    .map(|distance| Neighbor { position, distance })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        neighbors.sort_by(|a, b| match a.distance.total_cmp(&b.distance) {
            Ordering::Equal => a.position.cmp(&b.position),
            other => other,
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[EmbeddingVector] {
        &self.vectors
    }
}
