/// Text extraction for uploaded and guideline documents
mod image;
mod pdf;
mod plain_text;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported file type: {0}")]
    Unsupported(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Formats the extractor understands, keyed by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Image,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" | "md" => Some(DocumentKind::PlainText),
            "pdf" => Some(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" | "webp" => Some(DocumentKind::Image),
            _ => None,
        }
    }
}

/// What a document turns into before it reaches a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedDocument {
    Text(String),
    /// `data:image/<type>;base64,...` for multimodal models
    Image { data_url: String },
}

/// Dispatches to the per-format extractors
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Extract a document of any supported kind
    pub async fn extract(path: &Path) -> ExtractionResult<ExtractedDocument> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ExtractionError::NotFound(path.to_path_buf()));
        }

        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| ExtractionError::Unsupported(path.to_path_buf()))?;
        debug!("Extracting {:?} document {}", kind, path.display());

        match kind {
            DocumentKind::PlainText => plain_text::read_text(path).await.map(ExtractedDocument::Text),
            DocumentKind::Pdf => pdf::extract_pdf_text(path).await.map(ExtractedDocument::Text),
            DocumentKind::Image => image::encode_data_url(path)
                .await
                .map(|data_url| ExtractedDocument::Image { data_url }),
        }
    }

    /// Extract plain text; images are rejected because they carry no text layer
    pub async fn extract_text(path: &Path) -> ExtractionResult<String> {
        match Self::extract(path).await? {
            ExtractedDocument::Text(text) => Ok(text),
            ExtractedDocument::Image { .. } => Err(ExtractionError::Unsupported(path.to_path_buf())),
        }
    }
}
