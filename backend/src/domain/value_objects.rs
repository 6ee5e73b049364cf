/// Value objects for the domain layer
use super::base::{DomainError, DomainResult, ValueObject};
use std::fmt;

/// One chunk of guideline text: whitespace tokens re-joined by single spaces
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Passage(String);

impl Passage {
    pub fn new(text: impl Into<String>) -> DomainResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::InvalidValue("Passage cannot be empty".to_string()));
        }
        Ok(Passage(text))
    }

    /// Build a passage from already-split tokens
    pub fn from_tokens(tokens: &[&str]) -> DomainResult<Self> {
        Self::new(tokens.join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn token_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl ValueObject for Passage {}

impl fmt::Display for Passage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sentence-embedding models the service knows how to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmbeddingModel {
    #[default]
    AllMiniLML6V2,
}

impl EmbeddingModel {
    /// Output width of the model
    pub fn dimension_count(&self) -> usize {
        match self {
            EmbeddingModel::AllMiniLML6V2 => 384,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingModel::AllMiniLML6V2 => "all-MiniLM-L6-v2",
        }
    }
}

impl ValueObject for EmbeddingModel {}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A dense 32-bit embedding
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector {
    dimensions: Vec<f32>,
}

impl EmbeddingVector {
    pub fn new(dimensions: Vec<f32>) -> DomainResult<Self> {
        if dimensions.is_empty() {
            return Err(DomainError::InvalidValue(
                "Embedding vector cannot be empty".to_string(),
            ));
        }
        if let Some(position) = dimensions.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::InvalidValue(format!(
                "Embedding vector has a non-finite value at position {}",
                position
            )));
        }
        Ok(EmbeddingVector { dimensions })
    }

    pub fn dimensions(&self) -> &[f32] {
        &self.dimensions
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.dimensions
    }

    /// Squared Euclidean distance
    pub fn squared_l2_distance(&self, other: &EmbeddingVector) -> DomainResult<f32> {
        self.check_dimensions(other)?;
        Ok(self
            .dimensions
            .iter()
            .zip(other.dimensions.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum())
    }

    fn check_dimensions(&self, other: &EmbeddingVector) -> DomainResult<()> {
        if self.dimension_count() != other.dimension_count() {
            return Err(DomainError::DimensionMismatch {
                expected: self.dimension_count(),
                actual: other.dimension_count(),
            });
        }
        Ok(())
    }
}

impl ValueObject for EmbeddingVector {}

/// Word-window chunking parameters, validated so the window always advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub const DEFAULT_CHUNK_SIZE: usize = 300;
    pub const DEFAULT_OVERLAP: usize = 50;

    pub fn new(chunk_size: usize, overlap: usize) -> DomainResult<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(DomainError::InvalidChunking {
                chunk_size,
                overlap,
            });
        }
        Ok(ChunkingConfig {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive window starts, always > 0
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            overlap: Self::DEFAULT_OVERLAP,
        }
    }
}

impl ValueObject for ChunkingConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passage_creation() {
        let passage = Passage::new("fever and headache").unwrap();
        assert_eq!(passage.as_str(), "fever and headache");
        assert_eq!(passage.token_count(), 3);

        assert!(Passage::new("").is_err());
        assert!(Passage::new("   \n ").is_err());
    }

    #[test]
    fn test_passage_from_tokens() {
        let passage = Passage::from_tokens(&["a", "b", "c"]).unwrap();
        assert_eq!(passage.as_str(), "a b c");
        assert!(Passage::from_tokens(&[]).is_err());
    }

    #[test]
    fn test_embedding_model_defaults() {
        let model = EmbeddingModel::default();
        assert_eq!(model, EmbeddingModel::AllMiniLML6V2);
        assert_eq!(model.dimension_count(), 384);
        assert_eq!(model.to_string(), "all-MiniLM-L6-v2");
    }

    #[test]
    fn test_embedding_vector_validation() {
        assert!(EmbeddingVector::new(vec![]).is_err());
        assert!(EmbeddingVector::new(vec![0.1, f32::NAN]).is_err());
        assert!(EmbeddingVector::new(vec![0.1, f32::INFINITY]).is_err());

        let vector = EmbeddingVector::new(vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(vector.dimension_count(), 3);
    }

    #[test]
    fn test_squared_l2_distance() {
        let a = EmbeddingVector::new(vec![0.0, 0.0]).unwrap();
        let b = EmbeddingVector::new(vec![3.0, 4.0]).unwrap();
        assert_eq!(a.squared_l2_distance(&b).unwrap(), 25.0);
        assert_eq!(b.squared_l2_distance(&b).unwrap(), 0.0);

        let c = EmbeddingVector::new(vec![1.0]).unwrap();
        assert_eq!(
            a.squared_l2_distance(&c),
            Err(DomainError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_chunking_config() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size(), 300);
        assert_eq!(config.overlap(), 50);
        assert_eq!(config.stride(), 250);

        assert!(ChunkingConfig::new(10, 9).is_ok());
        assert_eq!(
            ChunkingConfig::new(10, 10),
            Err(DomainError::InvalidChunking {
                chunk_size: 10,
                overlap: 10
            })
        );
        assert!(ChunkingConfig::new(10, 20).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
    }
}
