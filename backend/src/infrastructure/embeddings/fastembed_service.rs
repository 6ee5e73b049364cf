/// FastEmbed service for local embedding generation
use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::ports::Embedder;
use crate::domain::value_objects::{EmbeddingModel, EmbeddingVector};

/// Service for generating embeddings using fastembed
pub struct FastEmbedService {
    model: Arc<Mutex<TextEmbedding>>,
    model_type: EmbeddingModel,
}

impl FastEmbedService {
    /// Create a new FastEmbed service with the specified model
    pub async fn new(model_type: EmbeddingModel) -> Result<Self> {
        info!("Initializing FastEmbed service with model: {}", model_type);

        let fastembed_model = match model_type {
            EmbeddingModel::AllMiniLML6V2 => FastEmbedModel::AllMiniLML6V2,
        };

        let model = TextEmbedding::try_new(
            InitOptions::new(fastembed_model).with_show_download_progress(true),
        )
        .context("Failed to initialize FastEmbed model")?;

        info!("FastEmbed model initialized successfully");

        Ok(FastEmbedService {
            model: Arc::new(Mutex::new(model)),
            model_type,
        })
    }

    /// Create a new FastEmbed service with the default model
    pub async fn new_default() -> Result<Self> {
        Self::new(EmbeddingModel::default()).await
    }

    /// Get the model type being used
    pub fn model_type(&self) -> EmbeddingModel {
        self.model_type
    }
}

#[async_trait]
impl Embedder for FastEmbedService {
    fn model_name(&self) -> &str {
        self.model_type.name()
    }

    fn dimension_count(&self) -> usize {
        self.model_type.dimension_count()
    }

    /// Generate embeddings for multiple texts in a batch
    /// Returns embeddings in the same order as input texts
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        debug!("Generating embeddings for batch of {} texts", texts.len());

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut model = self.model.lock().await;
        let embeddings = model
            .embed(inputs, None)
            .context("Failed to generate batch embeddings")?;

        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Model returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            );
        }

        let mut result = Vec::with_capacity(embeddings.len());
        for embedding_vec in embeddings {
            let embedding = EmbeddingVector::new(embedding_vec)
                .map_err(|e| anyhow::anyhow!("Invalid embedding vector: {}", e))?;
            if embedding.dimension_count() != self.dimension_count() {
                anyhow::bail!(
                    "Model returned {} dimensions, expected {}",
                    embedding.dimension_count(),
                    self.dimension_count()
                );
            }
            result.push(embedding);
        }

        debug!("Generated {} embeddings successfully", result.len());
        Ok(result)
    }
}
