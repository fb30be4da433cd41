//! Filesystem-backed [`RawStore`]

use crate::atomic_file::write_atomic;
use arraymemo_core::{DataReference, Error, RawStore, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Stores each blob as a file at `<root>/<reference>`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a reference onto the filesystem; references may not escape the root
    fn resolve(&self, reference: &DataReference) -> Result<PathBuf> {
        let relative = Path::new(reference.as_str().trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(Error::storage(
                reference.as_str(),
                "resolve",
                "reference is not a relative path inside the store",
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl RawStore for FileStore {
    async fn head(&self, reference: &DataReference) -> Result<bool> {
        let path = self.resolve(reference)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::file_system(path, "stat", e)),
        }
    }

    async fn read_raw(&self, reference: &DataReference) -> Result<Vec<u8>> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::storage(reference.as_str(), "read", "not found"))
            }
            Err(e) => Err(Error::file_system(path, "read", e)),
        }
    }

    async fn write_raw(&self, reference: &DataReference, data: &[u8]) -> Result<()> {
        let path = self.resolve(reference)?;
        tracing::trace!(path = %path.display(), bytes = data.len(), "Writing blob");
        write_atomic(&path, data).await
    }
}
