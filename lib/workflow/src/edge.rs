//! Edges between workflow nodes.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// A directed edge from one node to another.
///
/// Both endpoints must reference node ids that exist in the same
/// workflow definition; `WorkflowDefinition::validate` enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeDef {
    /// The upstream node.
    pub source: NodeId,
    /// The downstream node.
    pub target: NodeId,
}

impl EdgeDef {
    /// Creates a new edge.
    #[must_use]
    pub const fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_serde_roundtrip() {
        let edge = EdgeDef::new(NodeId::new(), NodeId::new());
        let json = serde_json::to_string(&edge).expect("serialize");
        let parsed: EdgeDef = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(edge, parsed);
    }
}
