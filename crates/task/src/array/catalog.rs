//! Catalog lookup and write-back for array tasks.
//!
//! Before launching, every sub-task of the array is looked up in the catalog.
//! Only the misses are launched, as a smaller, dense array job. Dense slot `j`
//! finds its original index at position `j` of the index lookup artifact. After
//! the launched sub-tasks finish, their results are written back to the catalog.
//!
//! Neither resolver waits for the catalog. A batch that is still pending leaves
//! the state untouched and registers a wake-up; the next pass re-submits the
//! identical batch and picks up the result.

use crate::context::TaskExecutionContext;
use arraymemo_cache::{
    CacheKey, DownloadRequest, Metadata, ResponseStatus, UploadRequest,
};
use arraymemo_core::{
    construct_input_readers, construct_output_readers, construct_output_writers,
    index_lookup_path, ArrayJob, BitSet, Error, ExecutionState, Identifier, InputReader,
    OutputReader, OutputWriter, Phase, Result, TaskExecutionIdentifier, TaskTemplate,
    TypedInterface,
};

/// Resolve which sub-tasks still need to run.
///
/// Returns the next state; on error the caller keeps `state` and retries the
/// same pass later.
pub async fn determine_discoverability(
    ctx: &dyn TaskExecutionContext,
    state: &ExecutionState,
) -> Result<ExecutionState> {
    let (template, array_job) = read_array_task(ctx).await?;
    let size = array_job.size;

    let mut state = state.clone();
    state.set_original_array_size(size);
    state.set_original_min_successes(array_job.min_successes());

    if !template.is_discoverable() {
        tracing::info!(
            task = %ctx.task_execution_id(),
            "Task is not discoverable, moving to launch phase"
        );
        // Nothing is cached, and nothing will be written back either.
        state.set_indexes_to_cache(BitSet::new(size));
        state.set_actual_array_size(size);
        state.set_phase(Phase::Launch);
        return Ok(state);
    }

    let interface = cache_interface(&template)?;
    let store = ctx.data_store();
    let input_readers = construct_input_readers(store, ctx.input_prefix(), size)?;
    let output_writers = construct_output_writers(store, ctx.output_prefix(), size)?;
    let requests = build_download_requests(
        &template.id,
        template.discovery_version(),
        &interface,
        input_readers,
        output_writers,
    )?;

    let future = ctx
        .catalog()
        .download(requests)
        .await
        .map_err(|e| Error::work_queue("Error enqueuing catalog lookups", e))?;

    if future.status() == ResponseStatus::Pending {
        tracing::debug!(
            task = %ctx.task_execution_id(),
            "Catalog lookup pending, waiting for wake-up"
        );
        future.on_ready(ctx.enqueue_owner());
        return Ok(state);
    }

    let response = future.response()?;
    if response.results_size() != size {
        return Err(Error::internal_mismatch(
            "catalog lookup result size differs from array size",
            size,
            response.results_size(),
        ));
    }

    let cached_count = response.cached_count();
    let indexes_to_cache = response.cached_results().invert();

    if cached_count == size {
        tracing::info!(
            task = %ctx.task_execution_id(),
            cached_count,
            "All sub-tasks found in catalog, skipping execution"
        );
        state.set_indexes_to_cache(indexes_to_cache);
        state.set_actual_array_size(0);
        state.set_phase(Phase::Success);
        return Ok(state);
    }

    let index_lookup = catalog_bitset_to_index_lookup(response.cached_results());
    let lookup_path = index_lookup_path(store, ctx.output_prefix())?;
    tracing::info!(
        task = %ctx.task_execution_id(),
        path = %lookup_path,
        cached_count,
        array_size = size,
        "Writing index lookup"
    );
    store.write_json(&lookup_path, &index_lookup).await?;

    state.set_indexes_to_cache(indexes_to_cache);
    state.set_actual_array_size(size - cached_count);
    state.set_phase(Phase::Launch);
    Ok(state)
}

/// Write results of the launched sub-tasks to the catalog.
///
/// Succeeds once every upload is acknowledged; an upload batch is all or nothing.
pub async fn write_to_discovery(
    ctx: &dyn TaskExecutionContext,
    state: &ExecutionState,
) -> Result<ExecutionState> {
    let (template, array_job) = read_array_task(ctx).await?;
    let size = array_job.size;
    let interface = cache_interface(&template)?;

    let store = ctx.data_store();
    let input_readers = construct_input_readers(store, ctx.input_prefix(), size)?;
    let output_readers = construct_output_readers(store, ctx.output_prefix(), size)?;
    let requests = build_upload_requests(
        &template.id,
        ctx.task_execution_id(),
        template.discovery_version(),
        &interface,
        &state.indexes_to_cache,
        input_readers,
        output_readers,
    )?;

    let mut state = state.clone();
    if requests.is_empty() {
        tracing::debug!(task = %ctx.task_execution_id(), "Nothing to write to catalog");
        state.set_phase(Phase::Success);
        return Ok(state);
    }

    let request_count = requests.len();
    let future = ctx
        .catalog()
        .upload(requests)
        .await
        .map_err(|e| Error::work_queue("Error enqueuing catalog uploads", e))?;

    if future.status() == ResponseStatus::Pending {
        tracing::debug!(
            task = %ctx.task_execution_id(),
            request_count,
            "Catalog upload pending, waiting for wake-up"
        );
        future.on_ready(ctx.enqueue_owner());
        return Ok(state);
    }

    let response = future.response()?;
    tracing::info!(
        task = %ctx.task_execution_id(),
        written = response.written_count,
        requested = request_count,
        "Wrote sub-task results to catalog"
    );
    state.set_phase(Phase::Success);
    Ok(state)
}

/// One lookup per sub-task of the full array
pub fn build_download_requests(
    task_id: &Identifier,
    cache_version: &str,
    interface: &TypedInterface,
    input_readers: Vec<InputReader>,
    output_writers: Vec<OutputWriter>,
) -> Result<Vec<DownloadRequest>> {
    if input_readers.len() != output_writers.len() {
        return Err(Error::internal_mismatch(
            "length different building catalog reader items",
            input_readers.len(),
            output_writers.len(),
        ));
    }

    Ok(input_readers
        .into_iter()
        .zip(output_writers)
        .map(|(input_reader, target)| DownloadRequest {
            key: CacheKey::new(
                task_id.clone(),
                interface.clone(),
                cache_version,
                input_reader,
            ),
            target,
        })
        .collect())
}

/// One upload per sub-task whose bit is set in `indexes_to_cache`
pub fn build_upload_requests(
    task_id: &Identifier,
    task_execution_id: &TaskExecutionIdentifier,
    cache_version: &str,
    interface: &TypedInterface,
    indexes_to_cache: &BitSet,
    input_readers: Vec<InputReader>,
    output_readers: Vec<OutputReader>,
) -> Result<Vec<UploadRequest>> {
    if input_readers.len() != output_readers.len() {
        return Err(Error::internal_mismatch(
            "length different building catalog writer items",
            input_readers.len(),
            output_readers.len(),
        ));
    }
    if indexes_to_cache.len() != input_readers.len() {
        return Err(Error::internal_mismatch(
            "indexes to cache do not cover the array",
            input_readers.len(),
            indexes_to_cache.len(),
        ));
    }

    Ok(input_readers
        .into_iter()
        .zip(output_readers)
        .enumerate()
        .filter(|(idx, _)| indexes_to_cache.is_set(*idx))
        .map(|(_, (input_reader, artifact_data))| UploadRequest {
            key: CacheKey::new(
                task_id.clone(),
                interface.clone(),
                cache_version,
                input_reader,
            ),
            artifact_data,
            artifact_metadata: Metadata {
                task_execution_id: Some(task_execution_id.clone()),
            },
        })
        .collect())
}

/// Original indices of the sub-tasks that were not cached, ascending
pub fn catalog_bitset_to_index_lookup(cached_results: &BitSet) -> Vec<usize> {
    cached_results.iter_zeros().collect()
}

async fn read_array_task(ctx: &dyn TaskExecutionContext) -> Result<(TaskTemplate, ArrayJob)> {
    let template = ctx.task_reader().read().await?.ok_or_else(|| {
        Error::bad_task_specification("Required value not set, taskTemplate is nil")
    })?;
    let array_job = template.array_job()?;
    Ok((template, array_job))
}

/// Interface used for cache keys; both resolvers must derive it the same way
fn cache_interface(template: &TaskTemplate) -> Result<TypedInterface> {
    if template.is_discoverable() {
        template.require_interface().cloned()
    } else {
        Ok(template.interface.clone().unwrap_or_default())
    }
}
