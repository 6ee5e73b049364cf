/// Lazily loaded knowledge base and guideline lookup
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::index_builder::IndexBuilder;
use crate::application::dto::GuidelineHit;
use crate::application::ports::Embedder;
use crate::application::repositories::{PersistenceError, SnapshotRepository};
use crate::domain::aggregates::KbSnapshot;
use crate::domain::base::DomainError;
use crate::domain::value_objects::ChunkingConfig;
use crate::infrastructure::documents::ExtractionError;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Guideline source not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Dimension mismatch: index has {expected} dimensions, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Snapshot was built with model {stored}, current model is {current}")]
    ModelMismatch { stored: String, current: String },

    #[error("Invalid chunking: overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("Extraction error: {0}")]
    Extraction(ExtractionError),

    #[error("Persistence error: {0}")]
    Persistence(PersistenceError),

    #[error("Domain error: {0}")]
    Domain(DomainError),
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

impl From<ExtractionError> for RetrievalError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::NotFound(path) => RetrievalError::SourceMissing(path),
            other => RetrievalError::Extraction(other),
        }
    }
}

impl From<PersistenceError> for RetrievalError {
    fn from(error: PersistenceError) -> Self {
        match error {
            PersistenceError::Malformed(msg) => RetrievalError::MalformedSnapshot(msg),
            other => RetrievalError::Persistence(other),
        }
    }
}

impl From<DomainError> for RetrievalError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::DimensionMismatch { expected, actual } => {
                RetrievalError::DimensionMismatch { expected, actual }
            }
            DomainError::InvalidChunking {
                chunk_size,
                overlap,
            } => RetrievalError::InvalidChunking {
                chunk_size,
                overlap,
            },
            other => RetrievalError::Domain(other),
        }
    }
}

/// Where the knowledge base comes from and how it is queried
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub source_path: PathBuf,
    pub index_path: PathBuf,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("standard-treatment-guidelines.pdf"),
            index_path: PathBuf::from("kb_index.json"),
            chunking: ChunkingConfig::default(),
            top_k: 4,
        }
    }
}

/// Owns the knowledge-base snapshot for its lifetime.
///
/// The first `ensure_index` call loads the stored artifact or builds one from
/// the source document. Concurrent first callers wait on the same
/// initialisation, and every caller afterwards gets the cached result, including
/// a cached absence when no knowledge base could be produced.
pub struct RetrievalService {
    config: RetrievalConfig,
    embedder: Arc<dyn Embedder>,
    repository: Arc<dyn SnapshotRepository>,
    builder: IndexBuilder,
    snapshot: OnceCell<Option<Arc<KbSnapshot>>>,
}

impl RetrievalService {
    pub fn new(
        config: RetrievalConfig,
        embedder: Arc<dyn Embedder>,
        repository: Arc<dyn SnapshotRepository>,
    ) -> Self {
        let builder = IndexBuilder::new(embedder.clone(), repository.clone(), config.chunking);
        RetrievalService {
            config,
            embedder,
            repository,
            builder,
            snapshot: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Whether the first `ensure_index` call has finished
    pub fn is_initialized(&self) -> bool {
        self.snapshot.initialized()
    }

    /// The knowledge base, or `None` when retrieval is disabled
    pub async fn ensure_index(&self) -> Option<Arc<KbSnapshot>> {
        self.snapshot
            .get_or_init(|| self.load_or_build())
            .await
            .clone()
    }

    async fn load_or_build(&self) -> Option<Arc<KbSnapshot>> {
        if self.repository.exists().await {
            match self.load_compatible().await {
                Ok(snapshot) => return Some(Arc::new(snapshot)),
                Err(e) => warn!("Discarding stored KB index: {}", e),
            }
        }

        let source = &self.config.source_path;
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            warn!(
                "Guideline source {} not found and no usable index; retrieval disabled",
                source.display()
            );
            return None;
        }

        match self.builder.build_index(source).await {
            Ok(snapshot) => Some(Arc::new(snapshot)),
            Err(e) => {
                error!("Failed to build KB index: {}", e);
                None
            }
        }
    }

    async fn load_compatible(&self) -> RetrievalResult<KbSnapshot> {
        let stored = self.repository.load().await?;

        if stored.model_name != self.embedder.model_name() {
            return Err(RetrievalError::ModelMismatch {
                stored: stored.model_name,
                current: self.embedder.model_name().to_string(),
            });
        }

        let snapshot = stored.snapshot;
        if !snapshot.is_empty() && snapshot.dimension() != self.embedder.dimension_count() {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.embedder.dimension_count(),
                actual: snapshot.dimension(),
            });
        }

        info!("Using stored KB index with {} passages", snapshot.len());
        Ok(snapshot)
    }

    /// Nearest guideline passages, surfacing every failure
    pub async fn try_lookup(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<GuidelineHit>> {
        let Some(snapshot) = self.ensure_index().await else {
            debug!("KB lookup skipped: no index");
            return Ok(Vec::new());
        };

        if top_k == 0 || snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed_one(query)
            .await
            .map_err(|e| RetrievalError::EmbeddingUnavailable(format!("{:#}", e)))?;

        let hits: Vec<GuidelineHit> = snapshot
            .nearest(&query_vector, top_k)?
            .into_iter()
            .map(|(passage, distance)| GuidelineHit::new(passage.as_str(), distance))
            .collect();

        debug!("KB lookup returned {} of {} requested hits", hits.len(), top_k);
        Ok(hits)
    }

    /// Nearest guideline passages; any failure is logged and yields no hits
    pub async fn lookup(&self, query: &str, top_k: usize) -> Vec<GuidelineHit> {
        match self.try_lookup(query, top_k).await {
            Ok(hits) => hits,
            Err(e @ RetrievalError::DimensionMismatch { .. }) => {
                error!("KB lookup failed: {}", e);
                Vec::new()
            }
            Err(e) => {
                warn!("KB lookup failed: {}", e);
                Vec::new()
            }
        }
    }
}
