//! Workflow data model and execution planning for switchyard.
//!
//! This crate provides:
//!
//! - **Node Instances**: typed, independently configurable workflow steps
//! - **Definitions**: named graphs of node instances and directed edges
//! - **Graph Model**: petgraph-backed structure with cycle detection
//! - **Execution Plans**: dependency-aware level batching (Kahn's algorithm)
//! - **Run State**: state machines for executions and per-node records
//! - **Context**: accumulated key-value data merged across batches

pub mod context;
pub mod definition;
pub mod edge;
pub mod error;
pub mod execution;
pub mod graph;
pub mod node;
pub mod plan;

pub use context::ExecutionContext;
pub use definition::{WorkflowDefinition, WorkflowMetadata};
pub use edge::EdgeDef;
pub use error::{DefinitionError, PlanError};
pub use execution::{ExecutionStatus, NodeExecution, NodeRunStatus, WorkflowExecution};
pub use graph::DefinitionGraph;
pub use node::{NodeId, NodeInstance};
pub use plan::ExecutionPlan;
