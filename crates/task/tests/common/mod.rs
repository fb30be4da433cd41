//! Shared fixtures for array memoization tests

#![allow(dead_code)]

use arraymemo_cache::{
    AsyncClient, CacheError, CatalogFuture, DownloadFuture, DownloadRequest, DownloadResponse,
    FutureCompleter, UploadFuture, UploadRequest, UploadResponse,
};
use arraymemo_core::{
    ArrayJob, BitSet, DataReference, DataStore, Identifier, InputReader, MemoryStore, RawStore,
    TaskExecutionIdentifier, TaskMetadata, TaskTemplate, TypedInterface, Variable,
};
use arraymemo_task::ArrayTaskContext;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const INPUT_PREFIX: &str = "runs/in";
pub const OUTPUT_PREFIX: &str = "runs/out";

pub fn exec_id() -> TaskExecutionIdentifier {
    TaskExecutionIdentifier::new(
        Identifier::new("demo", "development", "square", "v1"),
        "n0",
        0,
    )
}

pub fn interface() -> TypedInterface {
    TypedInterface::default()
        .with_input("x", Variable::new("integer"))
        .with_output("x", Variable::new("integer"))
}

pub fn discoverable_template(size: usize) -> TaskTemplate {
    TaskTemplate {
        id: exec_id().task_id,
        task_type: "container_array".to_string(),
        metadata: Some(TaskMetadata {
            discoverable: true,
            discovery_version: "1.0".to_string(),
        }),
        interface: Some(interface()),
        custom: Some(ArrayJob::new(size).to_custom()),
    }
}

pub fn plain_template(size: usize) -> TaskTemplate {
    TaskTemplate {
        metadata: None,
        ..discoverable_template(size)
    }
}

/// Write `{"x": i}` as the inputs of every sub-task
pub async fn seed_inputs(store: &DataStore, size: usize) {
    for idx in 0..size {
        let reader = InputReader::new(
            store.clone(),
            DataReference::new(format!("{INPUT_PREFIX}/{idx}")),
        );
        store
            .write_json(&reader.input_path().unwrap(), &json!({ "x": idx }))
            .await
            .unwrap();
    }
}

pub fn context(
    template: Option<TaskTemplate>,
    store: DataStore,
    catalog: Arc<dyn AsyncClient>,
) -> (ArrayTaskContext, mpsc::UnboundedReceiver<TaskExecutionIdentifier>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let ctx = ArrayTaskContext::builder()
        .template(template)
        .data_store(store)
        .input_prefix(INPUT_PREFIX)
        .output_prefix(OUTPUT_PREFIX)
        .catalog(catalog)
        .task_execution_id(exec_id())
        .wakeups(tx)
        .build()
        .unwrap();
    (ctx, rx)
}

/// How [`ScriptedCatalog`] answers downloads
pub enum DownloadScript {
    /// Resolve inline with this hit set
    Hits(BitSet),
    /// Resolve inline with a response of the wrong size
    WrongSize(usize),
    /// Stay pending until the test completes the batch
    Pending,
    /// Refuse the submission
    QueueFull,
    /// Resolve inline with a failed batch
    Failed(&'static str),
}

/// How [`ScriptedCatalog`] answers uploads
pub enum UploadScript {
    /// Resolve inline, acknowledging every request
    Written,
    /// Stay pending until the test completes the batch
    Pending,
    /// Resolve inline with a failed batch
    Failed(&'static str),
}

/// Catalog double that answers inline and records what it was asked
pub struct ScriptedCatalog {
    script: DownloadScript,
    upload_script: UploadScript,
    pub download_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub uploaded: Mutex<Vec<UploadRequest>>,
    pending: Mutex<Option<DownloadFuture>>,
    completer: Mutex<Option<FutureCompleter<DownloadResponse>>>,
    pending_upload: Mutex<Option<UploadFuture>>,
    upload_completer: Mutex<Option<FutureCompleter<UploadResponse>>>,
}

impl ScriptedCatalog {
    pub fn new(script: DownloadScript) -> Arc<Self> {
        Self::with_uploads(script, UploadScript::Written)
    }

    pub fn with_uploads(script: DownloadScript, upload_script: UploadScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            upload_script,
            download_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            uploaded: Mutex::new(Vec::new()),
            pending: Mutex::new(None),
            completer: Mutex::new(None),
            pending_upload: Mutex::new(None),
            upload_completer: Mutex::new(None),
        })
    }

    pub fn misses() -> Arc<Self> {
        Self::new(DownloadScript::Hits(BitSet::new(0)))
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Resolve the pending download batch
    pub fn complete_pending(&self, response: DownloadResponse) {
        let completer = self.completer.lock().unwrap().take();
        completer
            .expect("no pending download batch")
            .complete(response);
    }

    /// Resolve the pending upload batch
    pub fn complete_pending_upload(&self, response: UploadResponse) {
        let completer = self.upload_completer.lock().unwrap().take();
        completer
            .expect("no pending upload batch")
            .complete(response);
    }
}

#[async_trait]
impl AsyncClient for ScriptedCatalog {
    async fn download(
        &self,
        requests: Vec<DownloadRequest>,
    ) -> arraymemo_cache::Result<DownloadFuture> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            DownloadScript::Hits(hits) if hits.len() == requests.len() => {
                Ok(CatalogFuture::ready(DownloadResponse::new(hits.clone())))
            }
            DownloadScript::Hits(_) => Ok(CatalogFuture::ready(DownloadResponse::all_missed(
                requests.len(),
            ))),
            DownloadScript::WrongSize(size) => {
                Ok(CatalogFuture::ready(DownloadResponse::all_missed(*size)))
            }
            DownloadScript::Pending => {
                let mut pending = self.pending.lock().unwrap();
                let future = pending.get_or_insert_with(|| {
                    let (future, completer) = CatalogFuture::pending();
                    *self.completer.lock().unwrap() = Some(completer);
                    future
                });
                Ok(future.clone())
            }
            DownloadScript::QueueFull => Err(CacheError::QueueFull { capacity: 0 }),
            DownloadScript::Failed(message) => Ok(CatalogFuture::failed(*message)),
        }
    }

    async fn upload(&self, requests: Vec<UploadRequest>) -> arraymemo_cache::Result<UploadFuture> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let written_count = requests.len();
        self.uploaded.lock().unwrap().extend(requests);
        match &self.upload_script {
            UploadScript::Written => Ok(CatalogFuture::ready(UploadResponse { written_count })),
            UploadScript::Pending => {
                let mut pending = self.pending_upload.lock().unwrap();
                let future = pending.get_or_insert_with(|| {
                    let (future, completer) = CatalogFuture::pending();
                    *self.upload_completer.lock().unwrap() = Some(completer);
                    future
                });
                Ok(future.clone())
            }
            UploadScript::Failed(message) => Ok(CatalogFuture::failed(*message)),
        }
    }
}

/// In-memory store whose writes fail for references ending in `fail_suffix`
pub struct FailingStore {
    inner: MemoryStore,
    fail_suffix: &'static str,
}

impl FailingStore {
    pub fn data_store(fail_suffix: &'static str) -> DataStore {
        DataStore::new(Arc::new(Self {
            inner: MemoryStore::new(),
            fail_suffix,
        }))
    }
}

#[async_trait]
impl RawStore for FailingStore {
    async fn head(&self, reference: &DataReference) -> arraymemo_core::Result<bool> {
        self.inner.head(reference).await
    }

    async fn read_raw(&self, reference: &DataReference) -> arraymemo_core::Result<Vec<u8>> {
        self.inner.read_raw(reference).await
    }

    async fn write_raw(&self, reference: &DataReference, data: &[u8]) -> arraymemo_core::Result<()> {
        if reference.as_str().ends_with(self.fail_suffix) {
            return Err(arraymemo_core::Error::storage(
                reference.as_str(),
                "write",
                "injected failure",
            ));
        }
        self.inner.write_raw(reference, data).await
    }
}
