//! Error types for catalog operations

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Re-export CacheError as Error for symmetry with the core crate
pub use CacheError as Error;

/// Failures raised by a catalog client
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Too many batches are waiting for a worker
    #[error("catalog queue is full ({capacity} batches waiting)")]
    QueueFull { capacity: usize },

    /// Catalog workers have shut down
    #[error("catalog workers are no longer accepting batches")]
    QueueClosed,

    /// Reading or writing one catalog entry failed
    #[error("failed to {operation} catalog entry '{key}': {source}")]
    Entry {
        key: String,
        operation: &'static str,
        #[source]
        source: arraymemo_core::Error,
    },

    /// A batch finished with an error; carried by a ready future
    #[error("catalog batch failed: {message}")]
    BatchFailed { message: String },

    /// The response of a pending future was requested
    #[error("catalog response requested before the batch was ready")]
    NotReady,
}

/// Recovery strategy suggested for a catalog error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Submit the same batch again on the next pass
    Retry,
    /// Back off before submitting again
    RetryWithBackoff { initial_delay_ms: u64, max_retries: u32 },
    /// Retrying will not help without outside intervention
    Manual,
}

impl CacheError {
    pub fn entry(key: impl Into<String>, operation: &'static str, source: arraymemo_core::Error) -> Self {
        Self::Entry {
            key: key.into(),
            operation,
            source,
        }
    }

    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::QueueFull { .. } => RecoveryHint::RetryWithBackoff {
                initial_delay_ms: 100,
                max_retries: 5,
            },
            Self::QueueClosed => RecoveryHint::Manual,
            Self::Entry { source, .. } if !source.is_retryable() => RecoveryHint::Manual,
            Self::Entry { .. } | Self::BatchFailed { .. } | Self::NotReady => RecoveryHint::Retry,
        }
    }

    /// Whether the batch could not be handed to the catalog at all
    #[must_use]
    pub const fn is_submission_failure(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::QueueClosed)
    }
}

impl From<CacheError> for arraymemo_core::Error {
    fn from(error: CacheError) -> Self {
        if error.is_submission_failure() {
            arraymemo_core::Error::work_queue("Error enqueuing work items", error)
        } else {
            arraymemo_core::Error::catalog(error.to_string())
        }
    }
}
