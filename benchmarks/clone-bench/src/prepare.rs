//! Clone destination preparation

use std::io::ErrorKind;
use std::path::Path;

use crate::error::PrepareError;

/// Remove `path` if it exists so the clone starts from an empty destination
///
/// Directories are removed recursively, anything else is unlinked. Returns
/// `true` when something was removed and `false` when the path was absent.
pub async fn prepare(path: &Path) -> Result<bool, PrepareError> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Destination absent, nothing to delete");
            return Ok(false);
        }
        Err(source) => {
            return Err(PrepareError::Inspect {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    tracing::info!(path = %path.display(), "Deleting directory");

    let removal = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    removal.map_err(|source| PrepareError::Remove {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(true)
}
