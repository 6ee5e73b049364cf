use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::KbSnapshot;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A snapshot as read back from storage, with the model that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub model_name: String,
    pub snapshot: KbSnapshot,
}

/// Repository trait for the single persisted knowledge-base snapshot.
///
/// Implementations hold exactly one artifact; saving replaces it as a whole.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Whether an artifact is present. Cheap; does not validate the contents.
    async fn exists(&self) -> bool;

    /// Reads the artifact.
    ///
    /// Returns `NotFound` when nothing is stored and `Malformed` when the
    /// contents cannot be turned back into a valid snapshot.
    async fn load(&self) -> PersistenceResult<StoredSnapshot>;

    /// Replaces the stored artifact.
    async fn save(&self, snapshot: &KbSnapshot, model_name: &str) -> PersistenceResult<()>;
}
