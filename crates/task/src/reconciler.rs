//! Drives an array task through its phases
//!
//! A pass looks at the current phase and does the work for it. Passes never
//! wait on the catalog; the driver waits between passes for an owner wake-up
//! or the reconcile interval, whichever comes first.

use crate::array::{determine_discoverability, write_to_discovery};
use crate::context::TaskExecutionContext;
use arraymemo_config::ReconcileConfig;
use arraymemo_core::{Error, ExecutionState, Phase, Result, TaskExecutionIdentifier};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Progress of the launched sub-tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    Running,
    Complete,
}

/// Runs the `actual_array_size` sub-tasks that were not found in the catalog
#[async_trait]
pub trait SubTaskExecutor: Send + Sync {
    /// Start or check on the sub-tasks. Called once per pass while in `Launch`.
    async fn launch(
        &self,
        ctx: &dyn TaskExecutionContext,
        state: &ExecutionState,
    ) -> Result<LaunchStatus>;
}

/// Phase driver for one array task execution
pub struct Reconciler<E> {
    executor: E,
    config: ReconcileConfig,
}

impl<E: SubTaskExecutor> Reconciler<E> {
    pub fn new(executor: E, config: ReconcileConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Perform exactly one pass. On error `state` is still the last good state.
    pub async fn reconcile(
        &self,
        ctx: &dyn TaskExecutionContext,
        state: &ExecutionState,
    ) -> Result<ExecutionState> {
        match state.phase() {
            Phase::Discovering => {
                determine_discoverability(ctx, state)
                    .instrument(arraymemo_utils::tracing::resolver_span(
                        "determine_discoverability",
                        ctx.task_execution_id(),
                    ))
                    .await
            }
            Phase::Launch => {
                let mut next = state.clone();
                if self.executor.launch(ctx, state).await? == LaunchStatus::Complete {
                    next.set_phase(Phase::WritingBack);
                }
                Ok(next)
            }
            Phase::WritingBack => {
                write_to_discovery(ctx, state)
                    .instrument(arraymemo_utils::tracing::resolver_span(
                        "write_to_discovery",
                        ctx.task_execution_id(),
                    ))
                    .await
            }
            Phase::Success => Ok(state.clone()),
        }
    }

    /// Run passes until the task reaches `Success`.
    ///
    /// A pass that moves the phase forward is followed by another pass right
    /// away. Otherwise the driver waits for a wake-up on `wakeups` or for the
    /// reconcile interval. Retryable errors are tolerated up to
    /// `max_attempts` in a row; any other error ends the run.
    pub async fn drive(
        &self,
        ctx: &dyn TaskExecutionContext,
        state: ExecutionState,
        wakeups: &mut mpsc::UnboundedReceiver<TaskExecutionIdentifier>,
    ) -> Result<ExecutionState> {
        let span = arraymemo_utils::tracing::task_span(ctx.task_execution_id());
        self.drive_inner(ctx, state, wakeups).instrument(span).await
    }

    async fn drive_inner(
        &self,
        ctx: &dyn TaskExecutionContext,
        mut state: ExecutionState,
        wakeups: &mut mpsc::UnboundedReceiver<TaskExecutionIdentifier>,
    ) -> Result<ExecutionState> {
        let mut failures = 0u32;

        while !state.phase().is_terminal() {
            let before = state.phase();
            match self.reconcile(ctx, &state).await {
                Ok(next) => {
                    failures = 0;
                    state = next;
                }
                Err(e) if e.is_retryable() => {
                    failures += 1;
                    tracing::warn!(
                        phase = %before,
                        attempt = failures,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Reconcile pass failed"
                    );
                    if failures >= self.config.max_attempts {
                        return Err(e);
                    }
                }
                Err(e) => {
                    tracing::error!(phase = %before, error = %e, "Reconcile pass failed permanently");
                    return Err(e);
                }
            }

            if state.phase() != before {
                tracing::info!(from = %before, to = %state.phase(), "Phase transition");
                continue;
            }
            if state.phase().is_terminal() {
                break;
            }

            tokio::select! {
                woken = wakeups.recv() => {
                    if woken.is_none() {
                        return Err(Error::work_queue(
                            "wake-up channel closed before the task finished",
                            format!("task {}", ctx.task_execution_id()),
                        ));
                    }
                    tracing::trace!("Woken by catalog");
                }
                _ = tokio::time::sleep(self.config.interval()) => {
                    tracing::trace!("Reconcile interval elapsed");
                }
            }
        }

        Ok(state)
    }
}
