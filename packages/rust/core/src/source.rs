//! Resolving source documents from disk.

use std::path::Path;

use apidoc_shared::{ApiDocError, Result, SourceDocument};
use tracing::{debug, instrument};

/// Read a markup document. Any failure is a resolution failure for that
/// document.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn read_source(path: impl AsRef<Path>) -> Result<SourceDocument> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApiDocError::resolve(path.display().to_string(), e.to_string()))?;

    debug!(bytes = text.len(), "read source document");
    Ok(SourceDocument::new(path, text))
}
