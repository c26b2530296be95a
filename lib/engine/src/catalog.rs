//! Node catalog.
//!
//! Read-only discovery surfaces over the registry and history: what
//! node types exist, what their configs look like, and how recent
//! invocations went. This is the layer an API or UI would sit on.

use crate::history::{ExecutionHistory, HistoryStats};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;
use switchyard_nodes::{ConfigIssue, NodeCategory, NodeDefinition, NodeRegistry};
use switchyard_workflow::{NodeExecution, NodeRunStatus};

/// Discovery facade over the node registry.
pub struct NodeCatalog {
    registry: Arc<NodeRegistry>,
    history: Arc<ExecutionHistory>,
}

impl NodeCatalog {
    #[must_use]
    pub fn new(registry: Arc<NodeRegistry>, history: Arc<ExecutionHistory>) -> Self {
        Self { registry, history }
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn node_types(&self) -> Vec<&'static str> {
        self.registry.type_names()
    }

    /// Every registered definition, sorted by type name.
    #[must_use]
    pub fn definitions(&self) -> Vec<&NodeDefinition> {
        self.registry.definitions()
    }

    /// Definitions in one category.
    #[must_use]
    pub fn by_category(&self, category: NodeCategory) -> Vec<&NodeDefinition> {
        self.registry.by_category(category)
    }

    /// The config schema of one node type, as JSON. `None` for an
    /// unregistered type.
    #[must_use]
    pub fn node_schema(&self, node_type: &str) -> Option<JsonValue> {
        let definition = self.registry.definition(node_type)?;
        serde_json::to_value(definition).ok()
    }

    /// Validates a config against a node type without executing.
    /// `None` for an unregistered type.
    #[must_use]
    pub fn validate_config(
        &self,
        node_type: &str,
        config: &JsonMap<String, JsonValue>,
    ) -> Option<Vec<ConfigIssue>> {
        let node = self.registry.construct(node_type, config)?;
        Some(node.validate_config())
    }

    /// The most recent node executions, newest first, optionally
    /// filtered to one status.
    #[must_use]
    pub fn history(&self, limit: usize, status: Option<NodeRunStatus>) -> Vec<NodeExecution> {
        self.history.recent(limit, status)
    }

    /// Aggregate counts over the retained history.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        self.history.stats()
    }
}
