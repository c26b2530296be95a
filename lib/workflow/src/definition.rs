//! Workflow definition types.
//!
//! A workflow definition is the source of truth for an automation:
//! metadata, a set of node instances, and the directed edges between
//! them.

use crate::edge::EdgeDef;
use crate::error::DefinitionError;
use crate::node::{NodeId, NodeInstance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use switchyard_core::WorkflowId;

/// Metadata for a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Human-readable name for this workflow.
    pub name: String,
    /// Description of what this workflow does.
    pub description: Option<String>,
    /// Whether this workflow is enabled.
    pub enabled: bool,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowMetadata {
    /// Creates new metadata with default values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Workflow metadata.
    pub metadata: WorkflowMetadata,
    /// The node instances making up this workflow.
    pub nodes: Vec<NodeInstance>,
    /// Directed edges between node instances.
    pub edges: Vec<EdgeDef>,
}

impl WorkflowDefinition {
    /// Creates a new empty workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(),
            metadata: WorkflowMetadata::new(name),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a node instance and returns its id.
    pub fn add_node(&mut self, node: NodeInstance) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Adds an edge between two nodes.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId) {
        self.edges.push(EdgeDef::new(source, target));
    }

    /// Returns the node instance with the given id, if any.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns all node instances of the given type.
    pub fn nodes_of_type<'a>(
        &'a self,
        node_type: &'a str,
    ) -> impl Iterator<Item = &'a NodeInstance> {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    /// Validates structural invariants of the definition.
    ///
    /// Checks:
    /// - Node ids are unique within the workflow
    /// - Every edge endpoint references an existing node
    /// - No node is connected to itself
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(DefinitionError::DuplicateNodeId { node_id: node.id });
            }
        }

        for edge in &self.edges {
            if edge.source == edge.target {
                return Err(DefinitionError::SelfEdge {
                    node_id: edge.source,
                });
            }
            for endpoint in [edge.source, edge.target] {
                if !seen.contains(&endpoint) {
                    return Err(DefinitionError::UnknownEdgeEndpoint { node_id: endpoint });
                }
            }
        }

        Ok(())
    }
}
