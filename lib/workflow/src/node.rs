//! Workflow node instances.
//!
//! A node instance is one configured step inside a workflow definition:
//! a unique id, a node type name resolved through the registry at plan
//! time, and a free-form configuration map interpreted by the node
//! implementation.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use ulid::Ulid;

/// A unique identifier for a node within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Ulid);

impl NodeId {
    /// Creates a new random node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates a node ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// A configured node inside a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// The node type name, resolved through the registry.
    pub node_type: String,
    /// Human-readable name for this node.
    pub name: String,
    /// Type-specific configuration.
    pub config: JsonMap<String, JsonValue>,
}

impl NodeInstance {
    /// Creates a new node instance with a fresh ID.
    #[must_use]
    pub fn new(
        node_type: impl Into<String>,
        name: impl Into<String>,
        config: JsonMap<String, JsonValue>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.into(),
            name: name.into(),
            config,
        }
    }

    /// Creates a node instance with a specific ID.
    #[must_use]
    pub fn with_id(
        id: NodeId,
        node_type: impl Into<String>,
        name: impl Into<String>,
        config: JsonMap<String, JsonValue>,
    ) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            name: name.into(),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        let id = NodeId::new();
        assert!(id.to_string().starts_with("node_"));
    }

    #[test]
    fn node_instance_serde_roundtrip() {
        let mut config = JsonMap::new();
        config.insert("formula".to_string(), serde_json::json!("a + b"));
        let node = NodeInstance::new("calculator", "Total", config);

        let json = serde_json::to_string(&node).expect("serialize");
        let parsed: NodeInstance = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(node, parsed);
    }
}
