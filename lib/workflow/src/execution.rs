//! Execution state machines.
//!
//! Tracks one run of a workflow definition (`WorkflowExecution`) and
//! the per-node records created for it (`NodeExecution`). Statuses are
//! monotonic: once a record reaches a terminal status it never changes
//! again.

use crate::context::ExecutionContext;
use crate::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use switchyard_core::{ExecutionId, NodeExecutionId, WorkflowId};

/// The overall status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created, waiting to start.
    Pending,
    /// Actively executing.
    Running,
    /// Every node completed or was skipped.
    Completed,
    /// At least one node failure aborted the run.
    Failed,
    /// Cancelled by user or system.
    Cancelled,
}

impl ExecutionStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The status of a single node execution within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRunStatus {
    /// Waiting to be dispatched.
    Pending,
    /// Currently executing.
    Running,
    /// Completed successfully.
    Completed,
    /// Failed.
    Failed,
    /// Skipped (e.g. the run aborted before this node's batch).
    Skipped,
}

impl NodeRunStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// A record of one run of a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Unique identifier for this execution.
    pub id: ExecutionId,
    /// The workflow being executed.
    pub workflow_id: WorkflowId,
    /// Current status.
    pub status: ExecutionStatus,
    /// The kind of trigger that initiated this run.
    pub trigger_type: String,
    /// The payload the trigger supplied.
    pub trigger_payload: JsonValue,
    /// Accumulated context at the latest merge point.
    pub context: ExecutionContext,
    /// When the execution was created.
    pub created_at: DateTime<Utc>,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Human-readable error if failed.
    pub error: Option<String>,
}

impl WorkflowExecution {
    /// Creates a new pending execution.
    #[must_use]
    pub fn new(
        workflow_id: WorkflowId,
        trigger_type: impl Into<String>,
        trigger_payload: JsonValue,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            workflow_id,
            status: ExecutionStatus::Pending,
            trigger_type: trigger_type.into(),
            context: ExecutionContext::from_value(trigger_payload.clone()),
            trigger_payload,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Marks the execution as running.
    ///
    /// Ignored when the execution already reached a terminal status.
    pub fn start(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Marks the execution as completed with its final context.
    pub fn complete(&mut self, context: ExecutionContext) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Completed;
        self.context = context;
        self.completed_at = Some(Utc::now());
    }

    /// Marks the execution as failed with a human-readable message.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Marks the execution as cancelled.
    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }

    /// Returns the duration of the run, if it has started.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some(end - start)
    }
}

/// Execution record for a single node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecution {
    /// Unique identifier for this node execution.
    pub id: NodeExecutionId,
    /// The run this record belongs to.
    pub execution_id: ExecutionId,
    /// The node being executed.
    pub node_id: NodeId,
    /// The node's type name.
    pub node_type: String,
    /// Current status.
    pub status: NodeRunStatus,
    /// Snapshot of the input the node received.
    pub input: Option<JsonValue>,
    /// Snapshot of the output the node produced.
    pub output: Option<JsonValue>,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of retries performed.
    pub retry_count: u32,
    /// Error message if failed.
    pub error: Option<String>,
}

impl NodeExecution {
    /// Creates a new pending node execution.
    #[must_use]
    pub fn new(execution_id: ExecutionId, node_id: NodeId, node_type: impl Into<String>) -> Self {
        Self {
            id: NodeExecutionId::new(),
            execution_id,
            node_id,
            node_type: node_type.into(),
            status: NodeRunStatus::Pending,
            input: None,
            output: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            error: None,
        }
    }

    /// Marks the node as running with its input snapshot.
    pub fn start(&mut self, input: JsonValue) {
        if self.status.is_terminal() {
            return;
        }
        self.status = NodeRunStatus::Running;
        self.started_at = Some(Utc::now());
        self.input = Some(input);
    }

    /// Marks the node as completed with its output snapshot.
    pub fn complete(&mut self, output: JsonValue) {
        if self.status.is_terminal() {
            return;
        }
        self.status = NodeRunStatus::Completed;
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
    }

    /// Marks the node as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = NodeRunStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Marks the node as skipped.
    pub fn skip(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = NodeRunStatus::Skipped;
        self.completed_at = Some(Utc::now());
    }
}
