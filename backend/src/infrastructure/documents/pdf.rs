use std::path::Path;
use tracing::{debug, warn};

use super::{ExtractionError, ExtractionResult};

/// Extract the text layer of a PDF on a blocking thread
pub(super) async fn extract_pdf_text(path: &Path) -> ExtractionResult<String> {
    let bytes = tokio::fs::read(path).await?;

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ExtractionError::Pdf(format!("Task join error: {}", e)))?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    if text.trim().is_empty() {
        warn!("PDF {} has no extractable text layer", path.display());
    }

    debug!("Extracted {} characters from {}", text.len(), path.display());
    Ok(text)
}
