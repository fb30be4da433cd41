use arraymemo_cache::LocalCatalog;
use arraymemo_config::ArrayMemoConfig;
use arraymemo_core::{
    DataReference, DataStore, Error, ExecutionState, TaskExecutionIdentifier, TaskTemplate,
};
use arraymemo_task::{ArrayTaskContext, IdentityExecutor, Reconciler};
use eyre::WrapErr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

const CATALOG_ROOT: &str = "catalog";

pub async fn execute(
    config: &ArrayMemoConfig,
    store: DataStore,
    template_path: &Path,
    inputs: String,
    outputs: String,
    node_id: String,
) -> eyre::Result<()> {
    let state = run_task(config, store, template_path, inputs, outputs, node_id).await?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// Drive the array task described by `template_path` to completion
pub async fn run_task(
    config: &ArrayMemoConfig,
    store: DataStore,
    template_path: &Path,
    inputs: String,
    outputs: String,
    node_id: String,
) -> eyre::Result<ExecutionState> {
    let template = read_template(template_path)?;
    let task_execution_id = TaskExecutionIdentifier::new(template.id.clone(), node_id, 0);

    let catalog = LocalCatalog::new(
        store.clone(),
        DataReference::new(CATALOG_ROOT),
        &config.catalog,
    );
    let (wakeups, mut wakeup_rx) = mpsc::unbounded_channel();
    let ctx = ArrayTaskContext::builder()
        .template(Some(template))
        .data_store(store)
        .input_prefix(inputs)
        .output_prefix(outputs)
        .catalog(Arc::new(catalog))
        .task_execution_id(task_execution_id)
        .wakeups(wakeups)
        .build()?;

    let reconciler = Reconciler::new(IdentityExecutor::new(), config.reconcile.clone());
    let state = reconciler
        .drive(&ctx, ExecutionState::new(), &mut wakeup_rx)
        .await?;

    tracing::info!(
        array_size = state.original_array_size,
        launched = state.actual_array_size,
        "Array task finished"
    );
    Ok(state)
}

fn read_template(path: &Path) -> eyre::Result<TaskTemplate> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_system(path, "read task template", e))?;
    serde_json::from_str(&content)
        .wrap_err_with(|| format!("invalid task template '{}'", path.display()))
}
