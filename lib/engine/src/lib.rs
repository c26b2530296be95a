//! Node execution engine and workflow orchestrator for switchyard.
//!
//! This crate provides:
//!
//! - **Node Runner**: validate-then-execute with a hard timeout and an
//!   object-shaped output check on every node invocation
//! - **Orchestrator**: batch-by-batch execution of planned workflows
//!   with context snapshots and last-write-wins merging
//! - **Dispatch**: the seam between a planned batch and the runtime
//!   that executes it, in-process by default
//! - **Stores**: collaborator traits for workflow definitions and
//!   execution records, with in-memory implementations
//! - **History**: a bounded, newest-first record of node executions
//! - **Catalog**: discovery surfaces over the node registry

pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod runner;
pub mod store;

pub use catalog::NodeCatalog;
pub use dispatch::{InProcessDispatcher, NodeTask, TaskDispatcher};
pub use error::{EngineError, OrchestratorError, StoreError};
pub use history::{ExecutionHistory, HistoryStats};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use runner::NodeRunner;
pub use store::{
    ExecutionStore, InMemoryExecutionStore, InMemoryWorkflowStore, WorkflowStore,
};
