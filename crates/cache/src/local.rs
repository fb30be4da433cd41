//! Catalog client backed by a [`DataStore`]
//!
//! Batches are queued to a fixed pool of Tokio workers and resolved in the
//! background, so `download` and `upload` always return before any catalog I/O
//! happens. Entries live under `<root>/<key digest>/`.

use crate::client::AsyncClient;
use crate::errors::{CacheError, Result};
use crate::future::{
    CatalogFuture, DownloadFuture, DownloadResponse, FutureCompleter, UploadFuture,
    UploadResponse,
};
use crate::keys::{sha256_hex, CacheKey};
use crate::requests::{DownloadRequest, UploadRequest};
use arraymemo_config::{CacheMode, CatalogConfig};
use arraymemo_core::{BitSet, DataReference, DataStore, LiteralMap, OUTPUTS_FILENAME};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

const METADATA_FILENAME: &str = "metadata.json";

enum Job {
    Download {
        requests: Vec<DownloadRequest>,
        completer: FutureCompleter<DownloadResponse>,
    },
    Upload {
        requests: Vec<UploadRequest>,
        completer: FutureCompleter<UploadResponse>,
    },
}

/// Catalog client that stores entries in a [`DataStore`]
pub struct LocalCatalog {
    mode: CacheMode,
    queue_capacity: usize,
    retention: Duration,
    jobs: mpsc::Sender<Job>,
    downloads: DashMap<String, DownloadFuture>,
    uploads: DashMap<String, UploadFuture>,
}

impl LocalCatalog {
    /// Start the worker pool. Must be called from within a Tokio runtime.
    pub fn new(store: DataStore, root: DataReference, config: &CatalogConfig) -> Self {
        let (jobs, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let worker = Worker { store, root };

        for worker_id in 0..config.worker_count {
            tokio::spawn(worker.clone().run(worker_id, Arc::clone(&receiver)));
        }

        tracing::debug!(
            workers = config.worker_count,
            mode = %config.effective_mode(),
            "Started local catalog"
        );

        Self {
            mode: config.effective_mode(),
            queue_capacity: config.queue_capacity,
            retention: config.ready_retention(),
            jobs,
            downloads: DashMap::new(),
            uploads: DashMap::new(),
        }
    }

    /// Batches submitted but not yet handed back as ready
    pub fn in_flight(&self) -> usize {
        self.downloads.len() + self.uploads.len()
    }

    /// Return the tracked future for `batch_id`, or queue a new batch.
    ///
    /// A ready future is handed back once and then forgotten, so a later
    /// submission of the same batch is evaluated afresh. Other batches that
    /// have been ready for longer than the retention are dropped first.
    fn submit<T: Clone>(
        &self,
        in_flight: &DashMap<String, CatalogFuture<T>>,
        batch_id: String,
        make_job: impl FnOnce(FutureCompleter<T>) -> Job,
    ) -> Result<CatalogFuture<T>> {
        self.evict_abandoned(in_flight, &batch_id);

        match in_flight.entry(batch_id) {
            Entry::Occupied(entry) if entry.get().is_ready() => Ok(entry.remove()),
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (future, completer) = CatalogFuture::pending();
                match self.jobs.try_send(make_job(completer)) {
                    Ok(()) => {
                        tracing::trace!(batch = %entry.key(), "Queued catalog batch");
                        entry.insert(future.clone());
                        Ok(future)
                    }
                    Err(TrySendError::Full(_)) => Err(CacheError::QueueFull {
                        capacity: self.queue_capacity,
                    }),
                    Err(TrySendError::Closed(_)) => Err(CacheError::QueueClosed),
                }
            }
        }
    }

    fn evict_abandoned<T>(&self, in_flight: &DashMap<String, CatalogFuture<T>>, keep: &str) {
        let before = in_flight.len();
        in_flight.retain(|batch, future| {
            batch == keep
                || future
                    .completed_at()
                    .map_or(true, |at| at.elapsed() < self.retention)
        });

        let evicted = before.saturating_sub(in_flight.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Dropped catalog batches nobody came back for");
        }
    }
}

#[async_trait]
impl AsyncClient for LocalCatalog {
    async fn download(&self, requests: Vec<DownloadRequest>) -> Result<DownloadFuture> {
        if requests.is_empty() || !self.mode.is_readable() {
            return Ok(CatalogFuture::ready(DownloadResponse::all_missed(
                requests.len(),
            )));
        }

        let batch_id = batch_id(
            "download",
            requests.iter().map(|r| (&r.key, r.target.prefix())),
        )?;
        self.submit(&self.downloads, batch_id, |completer| Job::Download {
            requests,
            completer,
        })
    }

    async fn upload(&self, requests: Vec<UploadRequest>) -> Result<UploadFuture> {
        if requests.is_empty() || !self.mode.is_writable() {
            return Ok(CatalogFuture::ready(UploadResponse::default()));
        }

        let batch_id = batch_id(
            "upload",
            requests.iter().map(|r| (&r.key, r.artifact_data.prefix())),
        )?;
        self.submit(&self.uploads, batch_id, |completer| Job::Upload {
            requests,
            completer,
        })
    }
}

fn batch_id<'a>(
    kind: &str,
    parts: impl Iterator<Item = (&'a CacheKey, &'a DataReference)>,
) -> Result<String> {
    let mut material = String::from(kind);
    for (key, location) in parts {
        let digest = key
            .location_digest()
            .map_err(|e| CacheError::entry(key.input_reader.prefix().as_str(), "hash", e))?;
        material.push('\n');
        material.push_str(&digest);
        material.push(':');
        material.push_str(location.as_str());
    }
    Ok(sha256_hex(material.as_bytes()))
}

#[derive(Clone)]
struct Worker {
    store: DataStore,
    root: DataReference,
}

impl Worker {
    async fn run(self, worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
        loop {
            let job = receiver.lock().await.recv().await;
            let Some(job) = job else {
                tracing::trace!(worker_id, "Catalog worker shutting down");
                break;
            };

            match job {
                Job::Download {
                    requests,
                    completer,
                } => match self.download_batch(&requests).await {
                    Ok(response) => {
                        tracing::debug!(
                            worker_id,
                            cached = response.cached_count(),
                            total = response.results_size(),
                            "Catalog lookup finished"
                        );
                        completer.complete(response);
                    }
                    Err(e) => {
                        tracing::warn!(
                            worker_id,
                            error = %e,
                            hint = ?e.recovery_hint(),
                            "Catalog lookup failed"
                        );
                        completer.fail(e.to_string());
                    }
                },
                Job::Upload {
                    requests,
                    completer,
                } => match self.upload_batch(&requests).await {
                    Ok(response) => {
                        tracing::debug!(
                            worker_id,
                            written = response.written_count,
                            "Catalog upload finished"
                        );
                        completer.complete(response);
                    }
                    Err(e) => {
                        tracing::warn!(
                            worker_id,
                            error = %e,
                            hint = ?e.recovery_hint(),
                            "Catalog upload failed"
                        );
                        completer.fail(e.to_string());
                    }
                },
            }
        }
    }

    fn entry_path(&self, digest: &str, file: &str) -> Result<DataReference> {
        self.store
            .construct_reference(&self.root, digest)
            .and_then(|entry| self.store.construct_reference(&entry, file))
            .map_err(|e| CacheError::entry(digest, "locate", e))
    }

    async fn download_batch(&self, requests: &[DownloadRequest]) -> Result<DownloadResponse> {
        let mut hits = BitSet::new(requests.len());

        for (idx, request) in requests.iter().enumerate() {
            let digest = request.key.digest().await.map_err(|e| {
                CacheError::entry(request.key.input_reader.prefix().as_str(), "hash", e)
            })?;
            let artifact = self.entry_path(&digest, OUTPUTS_FILENAME)?;

            let found = self
                .store
                .head(&artifact)
                .await
                .map_err(|e| CacheError::entry(&digest, "look up", e))?;
            if !found {
                continue;
            }

            let outputs: LiteralMap = self
                .store
                .read_json(&artifact)
                .await
                .map_err(|e| CacheError::entry(&digest, "read", e))?;
            request
                .target
                .put(&outputs)
                .await
                .map_err(|e| CacheError::entry(&digest, "materialize", e))?;
            hits.set(idx);
        }

        Ok(DownloadResponse::new(hits))
    }

    async fn upload_batch(&self, requests: &[UploadRequest]) -> Result<UploadResponse> {
        let mut response = UploadResponse::default();

        for request in requests {
            let source = request.artifact_data.prefix().as_str();
            let produced = request
                .artifact_data
                .exists()
                .await
                .map_err(|e| CacheError::entry(source, "look up", e))?;
            if !produced {
                tracing::debug!(source, "Sub-task produced no outputs, not caching");
                continue;
            }

            let failure = request
                .artifact_data
                .read_error()
                .await
                .map_err(|e| CacheError::entry(source, "look up", e))?;
            if let Some(failure) = failure {
                tracing::debug!(source, error = %failure.message, "Sub-task failed, not caching");
                continue;
            }

            let outputs = request
                .artifact_data
                .read()
                .await
                .map_err(|e| CacheError::entry(source, "read", e))?;
            let digest = request
                .key
                .digest()
                .await
                .map_err(|e| CacheError::entry(source, "hash", e))?;

            self.store
                .write_json(&self.entry_path(&digest, OUTPUTS_FILENAME)?, &outputs)
                .await
                .map_err(|e| CacheError::entry(&digest, "write", e))?;
            self.store
                .write_json(
                    &self.entry_path(&digest, METADATA_FILENAME)?,
                    &request.artifact_metadata,
                )
                .await
                .map_err(|e| CacheError::entry(&digest, "write", e))?;
            response.written_count += 1;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::ResponseStatus;
    use crate::requests::Metadata;
    use arraymemo_core::{
        Identifier, InputReader, OutputReader, OutputWriter, TypedInterface,
    };
    use serde_json::json;
    use std::time::Duration;

    async fn wait_ready<T: Clone>(future: &CatalogFuture<T>) {
        for _ in 0..200 {
            if future.status() == ResponseStatus::Ready {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("catalog batch never became ready");
    }

    fn key(store: &DataStore, input_prefix: &str) -> CacheKey {
        CacheKey::new(
            Identifier::new("p", "d", "t", "v"),
            TypedInterface::default(),
            "1",
            InputReader::new(store.clone(), DataReference::new(input_prefix)),
        )
    }

    async fn seed_inputs(store: &DataStore, prefix: &str, x: i64) {
        let reader = InputReader::new(store.clone(), DataReference::new(prefix));
        store
            .write_json(&reader.input_path().unwrap(), &json!({"x": x}))
            .await
            .unwrap();
    }

    fn catalog(store: &DataStore, mode: CacheMode) -> LocalCatalog {
        let config = CatalogConfig {
            mode,
            worker_count: 2,
            ..CatalogConfig::default()
        };
        LocalCatalog::new(store.clone(), DataReference::new("catalog"), &config)
    }

    #[tokio::test]
    async fn test_upload_then_download_hits() {
        let store = DataStore::in_memory();
        let catalog = catalog(&store, CacheMode::ReadWrite);
        seed_inputs(&store, "in/0", 1).await;
        seed_inputs(&store, "in/1", 2).await;

        let produced = OutputWriter::new(store.clone(), DataReference::new("first/0"));
        produced
            .put(&LiteralMap::from([("y".to_string(), json!(1))]))
            .await
            .unwrap();

        let upload = catalog
            .upload(vec![UploadRequest {
                key: key(&store, "in/0"),
                artifact_data: OutputReader::new(store.clone(), DataReference::new("first/0")),
                artifact_metadata: Metadata::default(),
            }])
            .await
            .unwrap();
        wait_ready(&upload).await;
        assert_eq!(upload.response().unwrap().written_count, 1);

        let download = catalog
            .download(
                (0..2)
                    .map(|i| DownloadRequest {
                        key: key(&store, &format!("in/{i}")),
                        target: OutputWriter::new(
                            store.clone(),
                            DataReference::new(format!("second/{i}")),
                        ),
                    })
                    .collect(),
            )
            .await
            .unwrap();
        wait_ready(&download).await;

        let response = download.response().unwrap();
        assert_eq!(response.cached_count(), 1);
        assert!(response.cached_results().is_set(0));
        assert!(!response.cached_results().is_set(1));

        let materialized = OutputReader::new(store.clone(), DataReference::new("second/0"));
        assert_eq!(materialized.read().await.unwrap()["y"], json!(1));
    }

    #[tokio::test]
    async fn test_resubmission_returns_same_batch() {
        let store = DataStore::in_memory();
        let catalog = catalog(&store, CacheMode::ReadWrite);
        let requests = || {
            vec![DownloadRequest {
                key: key(&store, "in/0"),
                target: OutputWriter::new(store.clone(), DataReference::new("out/0")),
            }]
        };

        let first = catalog.download(requests()).await.unwrap();
        wait_ready(&first).await;
        assert_eq!(catalog.in_flight(), 1);

        // The ready batch is handed back once and then forgotten.
        let second = catalog.download(requests()).await.unwrap();
        assert!(second.is_ready());
        assert_eq!(catalog.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_modes_short_circuit() {
        let store = DataStore::in_memory();
        let write_only = catalog(&store, CacheMode::Write);
        let download = write_only
            .download(vec![DownloadRequest {
                key: key(&store, "in/0"),
                target: OutputWriter::new(store.clone(), DataReference::new("out/0")),
            }])
            .await
            .unwrap();
        assert!(download.is_ready());
        assert_eq!(download.response().unwrap().cached_count(), 0);

        let read_only = catalog(&store, CacheMode::Read);
        let upload = read_only
            .upload(vec![UploadRequest {
                key: key(&store, "in/0"),
                artifact_data: OutputReader::new(store.clone(), DataReference::new("out/0")),
                artifact_metadata: Metadata::default(),
            }])
            .await
            .unwrap();
        assert!(upload.is_ready());
        assert_eq!(upload.response().unwrap().written_count, 0);
        assert_eq!(read_only.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_missing_outputs_are_not_uploaded() {
        let store = DataStore::in_memory();
        let catalog = catalog(&store, CacheMode::ReadWrite);

        let upload = catalog
            .upload(vec![UploadRequest {
                key: key(&store, "in/0"),
                artifact_data: OutputReader::new(store.clone(), DataReference::new("never/0")),
                artifact_metadata: Metadata::default(),
            }])
            .await
            .unwrap();
        wait_ready(&upload).await;
        assert_eq!(upload.response().unwrap().written_count, 0);
    }

    #[tokio::test]
    async fn test_failed_sub_task_is_not_uploaded() {
        let store = DataStore::in_memory();
        let catalog = catalog(&store, CacheMode::ReadWrite);
        seed_inputs(&store, "in/0", 1).await;

        let produced = OutputWriter::new(store.clone(), DataReference::new("first/0"));
        produced
            .put(&LiteralMap::from([("y".to_string(), json!(1))]))
            .await
            .unwrap();
        produced.put_error("exit code 137").await.unwrap();

        let upload = catalog
            .upload(vec![UploadRequest {
                key: key(&store, "in/0"),
                artifact_data: OutputReader::new(store.clone(), DataReference::new("first/0")),
                artifact_metadata: Metadata::default(),
            }])
            .await
            .unwrap();
        wait_ready(&upload).await;
        assert_eq!(upload.response().unwrap().written_count, 0);

        let download = catalog
            .download(vec![DownloadRequest {
                key: key(&store, "in/0"),
                target: OutputWriter::new(store.clone(), DataReference::new("second/0")),
            }])
            .await
            .unwrap();
        wait_ready(&download).await;
        assert_eq!(download.response().unwrap().cached_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_ready_batches_are_evicted() {
        let store = DataStore::in_memory();
        let config = CatalogConfig {
            worker_count: 1,
            ready_retention_ms: 0,
            ..CatalogConfig::default()
        };
        let catalog = LocalCatalog::new(store.clone(), DataReference::new("catalog"), &config);
        let request = |i: usize| {
            vec![DownloadRequest {
                key: key(&store, &format!("in/{i}")),
                target: OutputWriter::new(store.clone(), DataReference::new(format!("out/{i}"))),
            }]
        };

        // Submitted and never collected.
        let abandoned = catalog.download(request(0)).await.unwrap();
        wait_ready(&abandoned).await;
        assert_eq!(catalog.in_flight(), 1);

        let other = catalog.download(request(1)).await.unwrap();
        assert_eq!(catalog.in_flight(), 1);
        wait_ready(&other).await;

        // Collecting the surviving batch leaves nothing tracked.
        let collected = catalog.download(request(1)).await.unwrap();
        assert!(collected.is_ready());
        assert_eq!(catalog.in_flight(), 0);
    }
}
