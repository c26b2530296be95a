//! Core domain types for the switchyard workflow engine.
//!
//! This crate provides the strongly-typed identifiers shared by every
//! other crate in the workspace.

pub mod id;

pub use id::{ExecutionId, NodeExecutionId, ParseIdError, ScheduleId, WorkflowId};
