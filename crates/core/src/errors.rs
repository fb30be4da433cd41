use std::path::PathBuf;

/// Result type alias for arraymemo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for array task memoization
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The task template or its custom payload is missing or malformed
    #[error("bad task specification: {message}")]
    BadTaskSpecification { message: String },

    /// Two collections that must line up index for index did not
    #[error("internal mismatch: {message} (expected {expected}, found {actual})")]
    InternalMismatch {
        message: String,
        expected: usize,
        actual: usize,
    },

    /// The catalog client refused or could not enqueue a batch
    #[error("error enqueuing work items: {message}")]
    WorkQueue {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reference construction, read or write against the data store failed
    #[error("storage {operation} failed for '{reference}': {message}")]
    Storage {
        reference: String,
        operation: String,
        message: String,
    },

    /// The catalog answered, but with an error
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl Error {
    /// Create a bad task specification error
    #[must_use]
    pub fn bad_task_specification(message: impl Into<String>) -> Self {
        Error::BadTaskSpecification {
            message: message.into(),
        }
    }

    /// Create an internal mismatch error
    #[must_use]
    pub fn internal_mismatch(message: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::InternalMismatch {
            message: message.into(),
            expected,
            actual,
        }
    }

    /// Create a work queue error wrapping the submission failure
    #[must_use]
    pub fn work_queue(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::WorkQueue {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a storage error
    #[must_use]
    pub fn storage(
        reference: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Storage {
            reference: reference.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a catalog error
    #[must_use]
    pub fn catalog(message: impl Into<String>) -> Self {
        Error::Catalog {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Whether the orchestrator may retry the failed pass verbatim.
    ///
    /// Specification, builder and configuration errors fail again on every
    /// pass, so they are permanent. Queue, storage and catalog failures are
    /// transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::BadTaskSpecification { .. }
                | Error::InternalMismatch { .. }
                | Error::Configuration { .. }
        )
    }
}
