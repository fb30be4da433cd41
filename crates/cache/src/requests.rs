//! Requests exchanged with the catalog

use crate::keys::CacheKey;
use arraymemo_core::{OutputReader, OutputWriter, TaskExecutionIdentifier};
use serde::{Deserialize, Serialize};

/// Look up one key; on a hit the artifact is materialized into `target`
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub key: CacheKey,
    pub target: OutputWriter,
}

/// Provenance stored alongside an uploaded artifact
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_execution_id: Option<TaskExecutionIdentifier>,
}

/// Persist the artifact read from `artifact_data` under `key`
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: CacheKey,
    pub artifact_data: OutputReader,
    pub artifact_metadata: Metadata,
}
