//! Task template and the array job payload it carries

use super::identifiers::Identifier;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single named input or output of a task interface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Literal type name, e.g. `integer` or `blob`
    #[serde(rename = "type")]
    pub literal_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Variable {
    pub fn new(literal_type: impl Into<String>) -> Self {
        Self {
            literal_type: literal_type.into(),
            description: None,
        }
    }
}

/// Input/output schema of a task.
///
/// Variables are kept in ordered maps so the serialized form is stable, which
/// matters because the interface participates in cache key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TypedInterface {
    #[serde(default)]
    pub inputs: BTreeMap<String, Variable>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Variable>,
}

impl TypedInterface {
    pub fn with_input(mut self, name: impl Into<String>, var: Variable) -> Self {
        self.inputs.insert(name.into(), var);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, var: Variable) -> Self {
        self.outputs.insert(name.into(), var);
        self
    }
}

/// Task-level metadata relevant to memoization
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Whether results of this task may be looked up in and written to the catalog
    #[serde(default)]
    pub discoverable: bool,
    /// User-declared cache version; bumping it invalidates earlier results
    #[serde(default)]
    pub discovery_version: String,
}

/// Registered definition of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: Identifier,
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TaskMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<TypedInterface>,
    /// Plugin-specific payload; for array tasks this holds an [`ArrayJob`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Value>,
}

impl TaskTemplate {
    /// Whether the template opts into catalog lookups
    pub fn is_discoverable(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.discoverable)
    }

    /// Cache version, empty when metadata is absent
    pub fn discovery_version(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|m| m.discovery_version.as_str())
            .unwrap_or_default()
    }

    /// Interface of a discoverable task; absence is a specification error
    pub fn require_interface(&self) -> Result<&TypedInterface> {
        self.interface.as_ref().ok_or_else(|| {
            Error::bad_task_specification(format!(
                "task [{}] is discoverable but has no interface",
                self.id
            ))
        })
    }

    /// Extract the array job from the custom payload
    pub fn array_job(&self) -> Result<ArrayJob> {
        ArrayJob::from_custom(self.custom.as_ref())
    }
}

/// Fan-out parameters of an array task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayJob {
    /// Number of sub-tasks
    pub size: usize,
    /// Sub-tasks that must succeed for the whole task to succeed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_successes: Option<usize>,
}

impl ArrayJob {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            min_successes: None,
        }
    }

    pub fn from_custom(custom: Option<&serde_json::Value>) -> Result<Self> {
        let custom = custom
            .filter(|v| !v.is_null())
            .ok_or_else(|| Error::bad_task_specification("Could not extract custom array job"))?;

        serde_json::from_value(custom.clone()).map_err(|e| {
            Error::bad_task_specification(format!("invalid array job payload: {e}"))
        })
    }

    /// Minimum successes, defaulting to the full array size
    pub fn min_successes(&self) -> usize {
        self.min_successes.unwrap_or(self.size)
    }

    pub fn to_custom(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}
