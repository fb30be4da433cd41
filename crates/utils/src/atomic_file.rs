//! Atomic file writes so readers never observe a half-written blob

use arraymemo_core::{Error, Result};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Write `content` to `path` through a temporary sibling file and a rename.
///
/// Missing parent directories are created.
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::configuration("Invalid file path: no parent directory"))?;

    fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::file_system(parent, "create parent directory", e))?;

    // Same directory as the target, so the rename stays on one filesystem
    let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));

    if let Err(e) = write_temp(&temp_path, content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(Error::file_system(path, "atomic rename", e));
    }

    Ok(())
}

async fn write_temp(temp_path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|e| Error::file_system(temp_path, "create temporary file", e))?;
    file.write_all(content)
        .await
        .map_err(|e| Error::file_system(temp_path, "write to temporary file", e))?;
    file.sync_all()
        .await
        .map_err(|e| Error::file_system(temp_path, "sync temporary file", e))
}
