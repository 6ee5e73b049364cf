/// JSON file implementation of the snapshot repository
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::application::repositories::{
    PersistenceError, PersistenceResult, SnapshotRepository, StoredSnapshot,
};
use crate::domain::aggregates::KbSnapshot;
use crate::domain::value_objects::{EmbeddingVector, Passage};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedSnapshot {
    version: u32,
    model: String,
    dimension: usize,
    passages: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

/// Stores the snapshot as one JSON document, replaced atomically on save
pub struct JsonSnapshotRepository {
    path: PathBuf,
}

impl JsonSnapshotRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSnapshotRepository { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    fn decode(data: &str) -> PersistenceResult<StoredSnapshot> {
        let persisted: PersistedSnapshot = serde_json::from_str(data)
            .map_err(|e| PersistenceError::Malformed(e.to_string()))?;

        if persisted.version != FORMAT_VERSION {
            return Err(PersistenceError::Malformed(format!(
                "Unsupported snapshot version {} (expected {})",
                persisted.version, FORMAT_VERSION
            )));
        }

        if let Some(bad) = persisted
            .vectors
            .iter()
            .position(|v| v.len() != persisted.dimension)
        {
            return Err(PersistenceError::Malformed(format!(
                "Vector {} has {} dimensions, header says {}",
                bad,
                persisted.vectors[bad].len(),
                persisted.dimension
            )));
        }

        let passages = persisted
            .passages
            .into_iter()
            .map(Passage::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PersistenceError::Malformed(e.to_string()))?;

        let vectors = persisted
            .vectors
            .into_iter()
            .map(EmbeddingVector::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PersistenceError::Malformed(e.to_string()))?;

        let snapshot = KbSnapshot::new(passages, vectors)
            .map_err(|e| PersistenceError::Malformed(e.to_string()))?;

        Ok(StoredSnapshot {
            model_name: persisted.model,
            snapshot,
        })
    }
}

#[async_trait]
impl SnapshotRepository for JsonSnapshotRepository {
    async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    async fn load(&self) -> PersistenceResult<StoredSnapshot> {
        if !self.exists().await {
            return Err(PersistenceError::NotFound(self.path.display().to_string()));
        }

        debug!("Loading snapshot from {}", self.path.display());
        let data = tokio::fs::read_to_string(&self.path).await?;
        let stored = Self::decode(&data)?;

        info!(
            "Loaded KB snapshot with {} passages from {}",
            stored.snapshot.len(),
            self.path.display()
        );
        Ok(stored)
    }

    async fn save(&self, snapshot: &KbSnapshot, model_name: &str) -> PersistenceResult<()> {
        let persisted = PersistedSnapshot {
            version: FORMAT_VERSION,
            model: model_name.to_string(),
            dimension: snapshot.dimension(),
            passages: snapshot
                .passages()
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            vectors: snapshot
                .index()
                .vectors()
                .iter()
                .map(|v| v.dimensions().to_vec())
                .collect(),
        };

        let data = serde_json::to_string(&persisted)
            .map_err(|e| PersistenceError::Malformed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Unique per save so concurrent writers never share a temp file
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, data).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        info!(
            "Saved KB snapshot with {} passages to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}
