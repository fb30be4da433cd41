//! Task and execution identities

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Identity of a registered task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    pub project: String,
    pub domain: String,
    pub name: String,
    pub version: String,
}

impl Identifier {
    pub fn new(
        project: impl Into<String>,
        domain: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            domain: domain.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.project, self.domain, self.name, self.version
        )
    }
}

/// Identity of one attempt at executing a task inside a workflow node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskExecutionIdentifier {
    pub task_id: Identifier,
    pub node_execution_id: String,
    pub retry_attempt: u32,
}

impl TaskExecutionIdentifier {
    pub fn new(task_id: Identifier, node_execution_id: impl Into<String>, retry_attempt: u32) -> Self {
        Self {
            task_id,
            node_execution_id: node_execution_id.into(),
            retry_attempt,
        }
    }
}

impl Display for TaskExecutionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}#{}",
            self.task_id, self.node_execution_id, self.retry_attempt
        )
    }
}
