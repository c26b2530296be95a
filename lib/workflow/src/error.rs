//! Error types for the workflow crate.
//!
//! - `DefinitionError`: structural problems in a workflow definition
//! - `PlanError`: problems turning a definition into an execution plan

use crate::node::NodeId;
use std::fmt;

/// Structural errors in a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// Two node instances share the same id.
    DuplicateNodeId { node_id: NodeId },
    /// An edge references a node id that does not exist.
    UnknownEdgeEndpoint { node_id: NodeId },
    /// An edge connects a node to itself.
    SelfEdge { node_id: NodeId },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeId { node_id } => {
                write!(f, "duplicate node id: {node_id}")
            }
            Self::UnknownEdgeEndpoint { node_id } => {
                write!(f, "edge references unknown node: {node_id}")
            }
            Self::SelfEdge { node_id } => {
                write!(f, "node {node_id} has an edge to itself")
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

/// Errors computing an execution plan from a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The definition failed structural validation.
    InvalidDefinition(DefinitionError),
    /// The graph contains a cycle, so no batch ordering exists.
    CycleDetected,
    /// The definition has no nodes to execute.
    EmptyDefinition,
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDefinition(e) => write!(f, "invalid definition: {e}"),
            Self::CycleDetected => write!(f, "workflow graph contains a cycle"),
            Self::EmptyDefinition => write!(f, "workflow has no nodes"),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<DefinitionError> for PlanError {
    fn from(e: DefinitionError) -> Self {
        Self::InvalidDefinition(e)
    }
}
