//! Asynchronous catalog client contract

use crate::errors::Result;
use crate::future::{DownloadFuture, UploadFuture};
use crate::requests::{DownloadRequest, UploadRequest};
use async_trait::async_trait;

/// Non-blocking access to the catalog.
///
/// Both operations submit a whole batch and return immediately with a future.
/// Responses correspond to requests by position. Submitting a batch identical
/// to one still in flight must return a handle to the same batch, because
/// callers re-submit on every reconciliation pass until the batch is ready.
#[async_trait]
pub trait AsyncClient: Send + Sync {
    async fn download(&self, requests: Vec<DownloadRequest>) -> Result<DownloadFuture>;

    async fn upload(&self, requests: Vec<UploadRequest>) -> Result<UploadFuture>;
}
