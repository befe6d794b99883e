// Export action: persist the current result so it can be downloaded.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write `text` verbatim as UTF-8 to `path`, replacing any previous export.
///
/// Returns `Ok(None)` without touching the disk when `text` is blank.
pub async fn export_result(text: &str, path: &Path) -> Result<Option<PathBuf>, ExportError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ExportError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, text.as_bytes())
        .await
        .map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), bytes = text.len(), "exported analysis result");
    Ok(Some(path.to_path_buf()))
}
