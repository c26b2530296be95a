//! Error types for the engine crate.

use std::fmt;
use std::time::Duration;
use switchyard_core::{ExecutionId, WorkflowId};
use switchyard_nodes::ConfigIssue;
use switchyard_workflow::error::PlanError;

/// Errors from running a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The node's type name is not registered.
    UnknownNodeType { node_type: String },
    /// The node's configuration failed validation.
    InvalidConfig { issues: Vec<ConfigIssue> },
    /// The node ran and reported a failure.
    ExecutionFailed {
        kind: &'static str,
        message: String,
    },
    /// The node exceeded its execution timeout.
    TimedOut { timeout: Duration },
    /// The node returned something other than a JSON object.
    MalformedOutput { got: String },
    /// The runtime failed to run the node at all (e.g. a panicked
    /// task).
    Dispatch { message: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { node_type } => {
                write!(f, "unknown node type '{node_type}'")
            }
            Self::InvalidConfig { issues } => {
                write!(f, "invalid config: ")?;
                for (i, issue) in issues.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{issue}")?;
                }
                Ok(())
            }
            Self::ExecutionFailed { kind, message } => {
                write!(f, "node failed ({kind}): {message}")
            }
            Self::TimedOut { timeout } => {
                write!(f, "node timed out after {}ms", timeout.as_millis())
            }
            Self::MalformedOutput { got } => {
                write!(f, "node output must be a JSON object, got {got}")
            }
            Self::Dispatch { message } => write!(f, "dispatch failed: {message}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors from a store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.message)
    }
}

impl std::error::Error for StoreError {}

/// Errors from orchestrating a workflow execution.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    /// No workflow is registered under the given id.
    WorkflowNotFound { workflow_id: WorkflowId },
    /// No execution record exists under the given id.
    ExecutionNotFound { execution_id: ExecutionId },
    /// The definition could not be planned.
    InvalidWorkflow(PlanError),
    /// A store backend failed.
    Store(StoreError),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowNotFound { workflow_id } => {
                write!(f, "workflow {workflow_id} not found")
            }
            Self::ExecutionNotFound { execution_id } => {
                write!(f, "execution {execution_id} not found")
            }
            Self::InvalidWorkflow(e) => write!(f, "invalid workflow: {e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidWorkflow(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PlanError> for OrchestratorError {
    fn from(e: PlanError) -> Self {
        Self::InvalidWorkflow(e)
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_lists_every_issue() {
        let err = EngineError::InvalidConfig {
            issues: vec![
                ConfigIssue::new("formula", "is required"),
                ConfigIssue::new("precision", "expected number"),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("formula: is required"));
        assert!(text.contains("precision: expected number"));
    }

    #[test]
    fn plan_error_converts() {
        let err: OrchestratorError = PlanError::EmptyDefinition.into();
        assert!(matches!(err, OrchestratorError::InvalidWorkflow(_)));
    }
}
