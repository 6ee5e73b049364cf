/// Aggregates for the domain layer
use super::base::{DomainError, DomainResult};
use super::similarity_index::{FlatL2Index, Neighbor};
use super::value_objects::{EmbeddingVector, Passage};

/// The knowledge-base snapshot: passages and their index, paired by position.
///
/// Invariant: `index.len() == passages.len()` and vector `i` belongs to passage `i`.
/// A snapshot is never mutated; rebuilding produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct KbSnapshot {
    passages: Vec<Passage>,
    index: FlatL2Index,
}

impl KbSnapshot {
    pub fn new(passages: Vec<Passage>, vectors: Vec<EmbeddingVector>) -> DomainResult<Self> {
        if passages.len() != vectors.len() {
            return Err(DomainError::BusinessRuleViolation(format!(
                "Snapshot has {} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }

        let index = FlatL2Index::build(vectors)?;
        Ok(KbSnapshot { passages, index })
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Nearest passages to the query, paired with their distances
    pub fn nearest(
        &self,
        query: &EmbeddingVector,
        k: usize,
    ) -> DomainResult<Vec<(&Passage, f32)>> {
        let neighbors = self.index.search(query, k)?;
        Ok(neighbors
            .into_iter()
            .map(|Neighbor { position, distance }| (&self.passages[position], distance))
            .collect())
    }
}
