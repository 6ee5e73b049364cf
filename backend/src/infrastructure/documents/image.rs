use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

use super::ExtractionResult;

fn mime_subtype(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" => "jpeg".to_string(),
        _ => extension,
    }
}

/// Encode an image as a base64 data URL
pub(super) async fn encode_data_url(path: &Path) -> ExtractionResult<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!(
        "data:image/{};base64,{}",
        mime_subtype(path),
        STANDARD.encode(bytes)
    ))
}
