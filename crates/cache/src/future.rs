//! Handles to in-flight catalog batches
//!
//! A [`CatalogFuture`] starts `Pending` and becomes `Ready` exactly once, when its
//! [`FutureCompleter`] resolves it. Callers never block on it: they poll
//! [`CatalogFuture::status`] and, while pending, register an [`OwnerSignal`] that
//! enqueues a wake-up for the owning task once the batch is done.

use crate::errors::{CacheError, Result};
use arraymemo_core::{BitSet, TaskExecutionIdentifier};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Readiness of a catalog batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Pending,
    Ready,
}

/// Wake-up for the owner of a task execution.
///
/// Signalling only enqueues the owner's identifier; the receiver decides when
/// to re-drive the task. Safe to fire from any thread.
#[derive(Debug, Clone)]
pub struct OwnerSignal {
    owner: TaskExecutionIdentifier,
    sender: mpsc::UnboundedSender<TaskExecutionIdentifier>,
}

impl OwnerSignal {
    pub fn new(
        owner: TaskExecutionIdentifier,
        sender: mpsc::UnboundedSender<TaskExecutionIdentifier>,
    ) -> Self {
        Self { owner, sender }
    }

    pub fn owner(&self) -> &TaskExecutionIdentifier {
        &self.owner
    }

    pub fn signal(&self) {
        if self.sender.send(self.owner.clone()).is_err() {
            tracing::debug!(owner = %self.owner, "Owner is no longer listening for wake-ups");
        }
    }
}

/// Lookup result for a download batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    cached_results: BitSet,
    cached_count: usize,
}

impl DownloadResponse {
    /// Build a response from the per-index hit set, one bit per request in order
    pub fn new(cached_results: BitSet) -> Self {
        let cached_count = cached_results.count_ones();
        Self {
            cached_results,
            cached_count,
        }
    }

    /// A response in which none of `size` requests hit
    pub fn all_missed(size: usize) -> Self {
        Self::new(BitSet::new(size))
    }

    pub fn cached_results(&self) -> &BitSet {
        &self.cached_results
    }

    pub fn cached_count(&self) -> usize {
        self.cached_count
    }

    pub fn results_size(&self) -> usize {
        self.cached_results.len()
    }
}

/// Acknowledgement of an upload batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadResponse {
    /// Artifacts actually persisted
    pub written_count: usize,
}

struct Shared<T> {
    outcome: Option<std::result::Result<T, String>>,
    completed_at: Option<Instant>,
    waiter: Option<OwnerSignal>,
}

/// Handle to a catalog batch
pub struct CatalogFuture<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

pub type DownloadFuture = CatalogFuture<DownloadResponse>;
pub type UploadFuture = CatalogFuture<UploadResponse>;

impl<T> Clone for CatalogFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for CatalogFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogFuture")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl<T> CatalogFuture<T> {
    pub fn status(&self) -> ResponseStatus {
        if self.shared.lock().outcome.is_some() {
            ResponseStatus::Ready
        } else {
            ResponseStatus::Pending
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ResponseStatus::Ready
    }

    /// When the batch became ready; `None` while pending
    pub fn completed_at(&self) -> Option<Instant> {
        self.shared.lock().completed_at
    }

    /// A pending future and the handle that resolves it
    pub fn pending() -> (Self, FutureCompleter<T>) {
        let shared = Arc::new(Mutex::new(Shared {
            outcome: None,
            completed_at: None,
            waiter: None,
        }));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            FutureCompleter { shared },
        )
    }

    /// A future that is already resolved with `value`
    pub fn ready(value: T) -> Self {
        Self::resolved(Ok(value))
    }

    /// A future that is already resolved with an error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::resolved(Err(message.into()))
    }

    fn resolved(outcome: std::result::Result<T, String>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                outcome: Some(outcome),
                completed_at: Some(Instant::now()),
                waiter: None,
            })),
        }
    }

    /// Fire `signal` when this future becomes ready.
    ///
    /// If it is already ready the signal fires immediately. A later
    /// registration replaces an earlier one that has not fired yet.
    pub fn on_ready(&self, signal: OwnerSignal) {
        let mut shared = self.shared.lock();
        if shared.outcome.is_some() {
            drop(shared);
            signal.signal();
        } else {
            shared.waiter = Some(signal);
        }
    }
}

impl<T: Clone> CatalogFuture<T> {
    /// The batch result; only meaningful once ready
    pub fn response(&self) -> Result<T> {
        match &self.shared.lock().outcome {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(CacheError::BatchFailed {
                message: message.clone(),
            }),
            None => Err(CacheError::NotReady),
        }
    }
}

/// Producer side of a [`CatalogFuture`]
pub struct FutureCompleter<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> FutureCompleter<T> {
    pub fn complete(self, value: T) {
        self.resolve(Ok(value));
    }

    pub fn fail(self, message: impl Into<String>) {
        self.resolve(Err(message.into()));
    }

    fn resolve(&self, outcome: std::result::Result<T, String>) {
        let waiter = {
            let mut shared = self.shared.lock();
            if shared.outcome.is_some() {
                return;
            }
            shared.outcome = Some(outcome);
            shared.completed_at = Some(Instant::now());
            shared.waiter.take()
        };

        if let Some(waiter) = waiter {
            waiter.signal();
        }
    }
}

impl<T> Drop for FutureCompleter<T> {
    fn drop(&mut self) {
        // A batch whose producer went away must not stay pending forever.
        self.resolve(Err("catalog batch abandoned before completion".to_string()));
    }
}
