//! Node type registry.
//!
//! Maps node type names to their definitions and constructors. The
//! engine looks types up here when it dispatches a node; catalog
//! surfaces list what is registered.

use crate::contract::{NodeBehavior, NodeCategory, NodeConstructor, NodeDefinition};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;

struct RegistryEntry {
    definition: NodeDefinition,
    constructor: NodeConstructor,
}

/// A string-keyed registry of node types.
pub struct NodeRegistry {
    entries: HashMap<&'static str, RegistryEntry>,
}

impl NodeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A registry preloaded with every built-in node type.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (definition, constructor) in crate::builtin::all() {
            registry.register(definition, constructor);
        }
        registry
    }

    /// Registers a node type. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(&mut self, definition: NodeDefinition, constructor: NodeConstructor) {
        self.entries.insert(
            definition.type_name,
            RegistryEntry {
                definition,
                constructor,
            },
        );
    }

    /// Builds a behavior instance for the named type, or `None` if the
    /// type is not registered.
    #[must_use]
    pub fn construct(
        &self,
        type_name: &str,
        config: &JsonMap<String, JsonValue>,
    ) -> Option<Box<dyn NodeBehavior>> {
        self.entries
            .get(type_name)
            .map(|entry| (entry.constructor)(config))
    }

    #[must_use]
    pub fn definition(&self, type_name: &str) -> Option<&NodeDefinition> {
        self.entries.get(type_name).map(|entry| &entry.definition)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Every registered definition, sorted by type name.
    #[must_use]
    pub fn definitions(&self) -> Vec<&NodeDefinition> {
        let mut all: Vec<&NodeDefinition> =
            self.entries.values().map(|e| &e.definition).collect();
        all.sort_by_key(|d| d.type_name);
        all
    }

    /// Registered definitions in one category, sorted by type name.
    #[must_use]
    pub fn by_category(&self, category: NodeCategory) -> Vec<&NodeDefinition> {
        let mut matching: Vec<&NodeDefinition> = self
            .entries
            .values()
            .map(|e| &e.definition)
            .filter(|d| d.category == category)
            .collect();
        matching.sort_by_key(|d| d.type_name);
        matching
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
