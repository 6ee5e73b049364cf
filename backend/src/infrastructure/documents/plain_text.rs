use std::path::Path;

use super::ExtractionResult;

/// Read a UTF-8 text file, replacing invalid sequences
pub(super) async fn read_text(path: &Path) -> ExtractionResult<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
