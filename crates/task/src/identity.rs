//! In-process executor whose sub-tasks echo their inputs as outputs

use crate::context::TaskExecutionContext;
use crate::reconciler::{LaunchStatus, SubTaskExecutor};
use arraymemo_core::{
    index_lookup_path, read_index_lookup, DataStore, Error, ExecutionState, InputReader,
    OutputWriter, Result,
};
use async_trait::async_trait;

/// Runs every launched sub-task inline, copying `<inputs>/<i>` to `<outputs>/<i>`.
///
/// Dense slot `j` runs original index `lookup[j]`. Without an index lookup the
/// array was launched whole and slot `j` is index `j`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityExecutor;

impl IdentityExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn original_indices(
        store: &DataStore,
        ctx: &dyn TaskExecutionContext,
        state: &ExecutionState,
    ) -> Result<Vec<usize>> {
        if !store.head(&index_lookup_path(store, ctx.output_prefix())?).await? {
            return Ok((0..state.actual_array_size).collect());
        }

        let lookup = read_index_lookup(store, ctx.output_prefix()).await?;
        if lookup.len() != state.actual_array_size {
            return Err(Error::internal_mismatch(
                "index lookup length differs from launched array size",
                state.actual_array_size,
                lookup.len(),
            ));
        }
        Ok(lookup)
    }
}

#[async_trait]
impl SubTaskExecutor for IdentityExecutor {
    async fn launch(
        &self,
        ctx: &dyn TaskExecutionContext,
        state: &ExecutionState,
    ) -> Result<LaunchStatus> {
        let store = ctx.data_store();
        let indices = Self::original_indices(store, ctx, state).await?;

        for (slot, original) in indices.into_iter().enumerate() {
            let child = original.to_string();
            let inputs = InputReader::new(
                store.clone(),
                store.construct_reference(ctx.input_prefix(), &child)?,
            )
            .get()
            .await?;
            OutputWriter::new(
                store.clone(),
                store.construct_reference(ctx.output_prefix(), &child)?,
            )
            .put(&inputs)
            .await?;
            tracing::debug!(slot, original, "Sub-task finished");
        }

        Ok(LaunchStatus::Complete)
    }
}
