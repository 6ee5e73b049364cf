/// Base abstractions for the domain layer
use std::fmt::Debug;

/// Trait for value objects - immutable objects defined by their attributes
/// Value objects are equal if all their attributes are equal
pub trait ValueObject: Clone + PartialEq + Debug {}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid value provided
    InvalidValue(String),
    /// Chunk windows would never advance
    InvalidChunking { chunk_size: usize, overlap: usize },
    /// Two vectors that must share a width do not
    DimensionMismatch { expected: usize, actual: usize },
    /// Business rule violation
    BusinessRuleViolation(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            DomainError::InvalidChunking { chunk_size, overlap } => write!(
                f,
                "Invalid chunking: overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            ),
            DomainError::DimensionMismatch { expected, actual } => write!(
                f,
                "Dimension mismatch: expected {} dimensions, got {}",
                expected, actual
            ),
            DomainError::BusinessRuleViolation(msg) => write!(f, "Business rule violation: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
