//! Durable key-value storage used for sub-task inputs, outputs and side artifacts

use crate::errors::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::sync::Arc;

/// Location of a blob in a [`DataStore`], written as `segment/segment/...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataReference(String);

impl DataReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DataReference {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for DataReference {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Byte-level storage backend
#[async_trait]
pub trait RawStore: Send + Sync {
    /// Whether a blob exists at `reference`
    async fn head(&self, reference: &DataReference) -> Result<bool>;

    /// Read the blob at `reference`; a missing blob is an error
    async fn read_raw(&self, reference: &DataReference) -> Result<Vec<u8>>;

    /// Create or replace the blob at `reference`
    async fn write_raw(&self, reference: &DataReference, data: &[u8]) -> Result<()>;
}

/// Typed access to a [`RawStore`]
#[derive(Clone)]
pub struct DataStore {
    raw: Arc<dyn RawStore>,
}

impl DataStore {
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        Self { raw }
    }

    /// A data store backed by a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Append `child` to `base`
    pub fn construct_reference(&self, base: &DataReference, child: &str) -> Result<DataReference> {
        let child = child.trim_matches('/');
        if child.is_empty() {
            return Err(Error::storage(
                base.as_str(),
                "construct reference",
                "empty path segment",
            ));
        }

        let base = base.as_str().trim_end_matches('/');
        if base.is_empty() {
            Ok(DataReference::new(child))
        } else {
            Ok(DataReference::new(format!("{base}/{child}")))
        }
    }

    pub async fn head(&self, reference: &DataReference) -> Result<bool> {
        self.raw.head(reference).await
    }

    pub async fn read_raw(&self, reference: &DataReference) -> Result<Vec<u8>> {
        self.raw.read_raw(reference).await
    }

    pub async fn write_raw(&self, reference: &DataReference, data: &[u8]) -> Result<()> {
        self.raw.write_raw(reference, data).await
    }

    pub async fn read_json<T: DeserializeOwned>(&self, reference: &DataReference) -> Result<T> {
        let bytes = self.raw.read_raw(reference).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::storage(reference.as_str(), "decode", e.to_string())
        })
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        reference: &DataReference,
        value: &T,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.raw.write_raw(reference, &bytes).await
    }
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore").finish_non_exhaustive()
    }
}

/// Process-local [`RawStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<DataReference, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl RawStore for MemoryStore {
    async fn head(&self, reference: &DataReference) -> Result<bool> {
        Ok(self.blobs.contains_key(reference))
    }

    async fn read_raw(&self, reference: &DataReference) -> Result<Vec<u8>> {
        self.blobs
            .get(reference)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| Error::storage(reference.as_str(), "read", "not found"))
    }

    async fn write_raw(&self, reference: &DataReference, data: &[u8]) -> Result<()> {
        self.blobs.insert(reference.clone(), data.to_vec());
        Ok(())
    }
}
