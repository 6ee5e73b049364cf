/// Builds the knowledge-base snapshot from the guideline document
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::retrieval_service::{RetrievalError, RetrievalResult};
use crate::application::ports::Embedder;
use crate::application::repositories::SnapshotRepository;
use crate::domain::aggregates::KbSnapshot;
use crate::domain::value_objects::ChunkingConfig;
use crate::infrastructure::documents::DocumentExtractor;
use crate::infrastructure::embeddings::TextPreprocessor;

pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    repository: Arc<dyn SnapshotRepository>,
    chunking: ChunkingConfig,
}

impl IndexBuilder {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        repository: Arc<dyn SnapshotRepository>,
        chunking: ChunkingConfig,
    ) -> Self {
        IndexBuilder {
            embedder,
            repository,
            chunking,
        }
    }

    /// Extract, chunk, embed and persist the source document.
    ///
    /// Replaces whatever artifact the repository held before.
    pub async fn build_index(&self, source: &Path) -> RetrievalResult<KbSnapshot> {
        let start_time = Instant::now();
        info!("Building KB index from {}", source.display());

        let text = DocumentExtractor::extract_text(source).await?;

        let preprocessor = TextPreprocessor::instance();
        let normalized = preprocessor.normalize(&text);
        let passages = preprocessor.chunk_text(&normalized, &self.chunking);
        debug!(
            "Chunked {} characters into {} passages ({} words, {} overlap)",
            normalized.len(),
            passages.len(),
            self.chunking.chunk_size(),
            self.chunking.overlap()
        );

        let texts: Vec<String> = passages.iter().map(|p| p.as_str().to_string()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| RetrievalError::EmbeddingUnavailable(format!("{:#}", e)))?;

        if vectors.len() != passages.len() {
            return Err(RetrievalError::EmbeddingUnavailable(format!(
                "Embedder returned {} vectors for {} passages",
                vectors.len(),
                passages.len()
            )));
        }

        let snapshot = KbSnapshot::new(passages, vectors)?;
        self.repository
            .save(&snapshot, self.embedder.model_name())
            .await?;

        info!(
            "Built KB index with {} passages ({} dimensions) in {}ms",
            snapshot.len(),
            snapshot.dimension(),
            start_time.elapsed().as_millis()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repositories::{PersistenceResult, StoredSnapshot};
    use crate::domain::value_objects::EmbeddingVector;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Two-dimensional embedder: word count and character count
    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }

        fn dimension_count(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<EmbeddingVector>> {
            texts
                .iter()
                .map(|t| {
                    EmbeddingVector::new(vec![t.split_whitespace().count() as f32, t.len() as f32])
                        .map_err(|e| anyhow::anyhow!(e.to_string()))
                })
                .collect()
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        fn model_name(&self) -> &str {
            "broken"
        }

        fn dimension_count(&self) -> usize {
            2
        }

        async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<EmbeddingVector>> {
            anyhow::bail!("model weights missing")
        }
    }

    #[derive(Default)]
    struct RecordingRepository {
        saved: Mutex<Option<(KbSnapshot, String)>>,
    }

    #[async_trait]
    impl SnapshotRepository for RecordingRepository {
        async fn exists(&self) -> bool {
            self.saved.lock().unwrap().is_some()
        }

        async fn load(&self) -> PersistenceResult<StoredSnapshot> {
            unreachable!("builder never loads")
        }

        async fn save(&self, snapshot: &KbSnapshot, model_name: &str) -> PersistenceResult<()> {
            *self.saved.lock().unwrap() = Some((snapshot.clone(), model_name.to_string()));
            Ok(())
        }
    }

    fn write_source(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("guidelines.txt");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_build_index_chunks_embeds_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_source(&temp_dir, "a b c d\n\n\n\ne f g h i j");
        let repository = Arc::new(RecordingRepository::default());
        let builder = IndexBuilder::new(
            Arc::new(LengthEmbedder),
            repository.clone(),
            ChunkingConfig::new(4, 1).unwrap(),
        );

        let snapshot = builder.build_index(&source).await.unwrap();

        let passages: Vec<&str> = snapshot.passages().iter().map(|p| p.as_str()).collect();
        assert_eq!(passages, vec!["a b c d", "d e f g", "g h i j", "j"]);
        assert_eq!(snapshot.dimension(), 2);

        let saved = repository.saved.lock().unwrap();
        let (stored, model) = saved.as_ref().unwrap();
        assert_eq!(stored, &snapshot);
        assert_eq!(model, "length");
    }

    #[tokio::test]
    async fn test_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let builder = IndexBuilder::new(
            Arc::new(LengthEmbedder),
            Arc::new(RecordingRepository::default()),
            ChunkingConfig::default(),
        );

        let result = builder.build_index(&temp_dir.path().join("absent.pdf")).await;
        assert!(matches!(result, Err(RetrievalError::SourceMissing(_))));
    }

    #[tokio::test]
    async fn test_embedding_failure_saves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_source(&temp_dir, "fever headache nausea");
        let repository = Arc::new(RecordingRepository::default());
        let builder = IndexBuilder::new(
            Arc::new(BrokenEmbedder),
            repository.clone(),
            ChunkingConfig::default(),
        );

        let result = builder.build_index(&source).await;
        assert!(matches!(result, Err(RetrievalError::EmbeddingUnavailable(_))));
        assert!(!repository.exists().await);
    }

    #[tokio::test]
    async fn test_empty_source_builds_empty_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_source(&temp_dir, "\n\n  \n");
        let builder = IndexBuilder::new(
            Arc::new(LengthEmbedder),
            Arc::new(RecordingRepository::default()),
            ChunkingConfig::default(),
        );

        let snapshot = builder.build_index(&source).await.unwrap();
        assert!(snapshot.is_empty());
    }
}
