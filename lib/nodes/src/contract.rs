//! The node contract.
//!
//! Every node type implements [`NodeBehavior`] and registers a
//! constructor plus a [`NodeDefinition`] with the registry. Dispatch is
//! sealed and explicit: the set of node types is fixed at registry
//! construction, with no runtime attribute lookup.

use crate::error::{ConfigIssue, NodeError};
use crate::schema::ConfigSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// The category of a node type.
///
/// Category only affects discovery (catalog listings, planning entry
/// points), never execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Entry points that initiate workflow execution.
    Trigger,
    /// Data manipulation steps.
    Transform,
    /// Control-flow steps (conditional, loop, wait).
    Logic,
    /// Terminal actions.
    Output,
}

/// Immutable description of a node type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDefinition {
    /// The type name used in workflow definitions.
    pub type_name: &'static str,
    /// The node's category.
    pub category: NodeCategory,
    /// Display label.
    pub label: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// The config schema for this node type.
    pub schema: ConfigSchema,
}

/// A configured, executable node instance.
///
/// Construction is infallible: a constructor accepts whatever config
/// map it is given and defers all complaints to `validate_config`,
/// which the execution engine always runs before `execute`.
#[async_trait]
pub trait NodeBehavior: Send + Sync {
    /// Checks the node's configuration.
    ///
    /// An empty result means the node is ready to execute.
    fn validate_config(&self) -> Vec<ConfigIssue>;

    /// Executes the node against one input payload.
    ///
    /// The input is the execution context as of the node's batch
    /// start. The output must be a JSON object; the engine rejects
    /// anything else as malformed.
    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError>;
}

/// Constructor for a node type: raw config map in, behavior out.
pub type NodeConstructor = fn(&JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior>;
