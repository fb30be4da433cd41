//! What a resolver can see of the task execution it is working on

use arraymemo_cache::{AsyncClient, OwnerSignal};
use arraymemo_core::{
    DataReference, DataStore, Error, Result, TaskExecutionIdentifier, TaskTemplate,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Source of the task template
#[async_trait]
pub trait TaskReader: Send + Sync {
    /// Read the template; `None` means the task has no template at all
    async fn read(&self) -> Result<Option<TaskTemplate>>;
}

/// Task reader over a template that is already in memory
#[derive(Debug, Clone)]
pub struct StaticTaskReader {
    template: Option<TaskTemplate>,
}

impl StaticTaskReader {
    pub fn new(template: Option<TaskTemplate>) -> Self {
        Self { template }
    }
}

#[async_trait]
impl TaskReader for StaticTaskReader {
    async fn read(&self) -> Result<Option<TaskTemplate>> {
        Ok(self.template.clone())
    }
}

/// Collaborators of one task execution
pub trait TaskExecutionContext: Send + Sync {
    fn task_reader(&self) -> &dyn TaskReader;

    fn data_store(&self) -> &DataStore;

    /// Prefix under which sub-task `i` finds its inputs at `<prefix>/<i>`
    fn input_prefix(&self) -> &DataReference;

    /// Prefix under which sub-task `i` writes its outputs at `<prefix>/<i>`
    fn output_prefix(&self) -> &DataReference;

    fn catalog(&self) -> &dyn AsyncClient;

    fn task_execution_id(&self) -> &TaskExecutionIdentifier;

    /// Wake-up that asks the owner to re-drive this task execution
    fn enqueue_owner(&self) -> OwnerSignal;
}

/// Ready-made [`TaskExecutionContext`] for an array task
pub struct ArrayTaskContext {
    task_reader: Box<dyn TaskReader>,
    data_store: DataStore,
    input_prefix: DataReference,
    output_prefix: DataReference,
    catalog: Arc<dyn AsyncClient>,
    task_execution_id: TaskExecutionIdentifier,
    wakeups: mpsc::UnboundedSender<TaskExecutionIdentifier>,
}

impl ArrayTaskContext {
    pub fn builder() -> ArrayTaskContextBuilder {
        ArrayTaskContextBuilder::default()
    }
}

impl TaskExecutionContext for ArrayTaskContext {
    fn task_reader(&self) -> &dyn TaskReader {
        self.task_reader.as_ref()
    }

    fn data_store(&self) -> &DataStore {
        &self.data_store
    }

    fn input_prefix(&self) -> &DataReference {
        &self.input_prefix
    }

    fn output_prefix(&self) -> &DataReference {
        &self.output_prefix
    }

    fn catalog(&self) -> &dyn AsyncClient {
        self.catalog.as_ref()
    }

    fn task_execution_id(&self) -> &TaskExecutionIdentifier {
        &self.task_execution_id
    }

    fn enqueue_owner(&self) -> OwnerSignal {
        OwnerSignal::new(self.task_execution_id.clone(), self.wakeups.clone())
    }
}

/// Builder for [`ArrayTaskContext`]; every collaborator is required
#[derive(Default)]
pub struct ArrayTaskContextBuilder {
    task_reader: Option<Box<dyn TaskReader>>,
    data_store: Option<DataStore>,
    input_prefix: Option<DataReference>,
    output_prefix: Option<DataReference>,
    catalog: Option<Arc<dyn AsyncClient>>,
    task_execution_id: Option<TaskExecutionIdentifier>,
    wakeups: Option<mpsc::UnboundedSender<TaskExecutionIdentifier>>,
}

impl ArrayTaskContextBuilder {
    /// Serve `template` from memory
    pub fn template(self, template: Option<TaskTemplate>) -> Self {
        self.task_reader(StaticTaskReader::new(template))
    }

    pub fn task_reader(mut self, reader: impl TaskReader + 'static) -> Self {
        self.task_reader = Some(Box::new(reader));
        self
    }

    pub fn data_store(mut self, store: DataStore) -> Self {
        self.data_store = Some(store);
        self
    }

    pub fn input_prefix(mut self, prefix: impl Into<DataReference>) -> Self {
        self.input_prefix = Some(prefix.into());
        self
    }

    pub fn output_prefix(mut self, prefix: impl Into<DataReference>) -> Self {
        self.output_prefix = Some(prefix.into());
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn AsyncClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn task_execution_id(mut self, id: TaskExecutionIdentifier) -> Self {
        self.task_execution_id = Some(id);
        self
    }

    pub fn wakeups(mut self, sender: mpsc::UnboundedSender<TaskExecutionIdentifier>) -> Self {
        self.wakeups = Some(sender);
        self
    }

    pub fn build(self) -> Result<ArrayTaskContext> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T> {
            value.ok_or_else(|| {
                Error::configuration(format!("task execution context is missing {field}"))
            })
        }

        Ok(ArrayTaskContext {
            task_reader: required(self.task_reader, "a task reader")?,
            data_store: required(self.data_store, "a data store")?,
            input_prefix: required(self.input_prefix, "an input prefix")?,
            output_prefix: required(self.output_prefix, "an output prefix")?,
            catalog: required(self.catalog, "a catalog client")?,
            task_execution_id: required(self.task_execution_id, "a task execution id")?,
            wakeups: required(self.wakeups, "a wake-up channel")?,
        })
    }
}
