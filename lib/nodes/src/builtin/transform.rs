//! Field transform node.
//!
//! Applies an ordered list of operations to the input object: `set` a
//! field (dotted paths create intermediate objects), `rename` a field,
//! `drop` a field. Renaming or dropping a path that does not resolve
//! is a no-op, not an error.

use crate::builtin::input_object;
use crate::contract::{NodeBehavior, NodeCategory, NodeDefinition};
use crate::error::{ConfigIssue, NodeError};
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

#[must_use]
pub fn definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "field_transform",
        category: NodeCategory::Transform,
        label: "Field transform",
        description: "Sets, renames, and drops fields of the payload.",
        schema: ConfigSchema::new(vec![FieldSpec::required(
            "operations",
            FieldKind::Array,
            "Ordered list of set/rename/drop operations",
        )]),
    }
}

pub fn construct(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(FieldTransformNode {
        config: config.clone(),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Operation {
    Set { field: String, value: JsonValue },
    Rename { from: String, to: String },
    Drop { field: String },
}

struct FieldTransformNode {
    config: JsonMap<String, JsonValue>,
}

impl FieldTransformNode {
    fn operations(&self) -> Result<Vec<Operation>, String> {
        let raw = self
            .config
            .get("operations")
            .cloned()
            .unwrap_or(JsonValue::Array(Vec::new()));
        serde_json::from_value(raw).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl NodeBehavior for FieldTransformNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        let mut issues = definition().schema.validate(&self.config);
        if let Err(message) = self.operations() {
            issues.push(ConfigIssue::new("operations", message));
        }
        issues
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        let operations = self.operations().map_err(|reason| NodeError::InvalidValue {
            reason: format!("operations: {reason}"),
        })?;

        let mut output = JsonValue::Object(input_object(input));
        for operation in operations {
            match operation {
                Operation::Set { field, value } => set_path(&mut output, &field, value),
                Operation::Rename { from, to } => {
                    if let Some(value) = remove_path(&mut output, &from) {
                        set_path(&mut output, &to, value);
                    }
                }
                Operation::Drop { field } => {
                    remove_path(&mut output, &field);
                }
            }
        }
        Ok(output)
    }
}

/// Writes a value at a dotted path, creating intermediate objects.
/// Non-object intermediates are replaced.
fn set_path(target: &mut JsonValue, path: &str, value: JsonValue) {
    let mut current = target;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = JsonValue::Object(JsonMap::new());
        }
        let map = current
            .as_object_mut()
            .unwrap_or_else(|| unreachable!("just made an object"));
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
    }
}

/// Removes and returns the value at a dotted path, if it resolves.
fn remove_path(target: &mut JsonValue, path: &str) -> Option<JsonValue> {
    let (parent_path, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    };

    let parent = match parent_path {
        Some(parent_path) => {
            let mut current = target;
            for segment in parent_path.split('.') {
                current = current.as_object_mut()?.get_mut(segment)?;
            }
            current
        }
        None => target,
    };

    parent.as_object_mut()?.remove(leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(operations: JsonValue) -> Box<dyn NodeBehavior> {
        let config = json!({"operations": operations})
            .as_object()
            .cloned()
            .unwrap_or_default();
        construct(&config)
    }

    #[tokio::test]
    async fn set_rename_drop_in_order() {
        let node = node(json!([
            {"op": "set", "field": "status", "value": "processed"},
            {"op": "rename", "from": "qty", "to": "quantity"},
            {"op": "drop", "field": "internal"},
        ]));
        assert!(node.validate_config().is_empty());

        let input = json!({"qty": 3, "internal": "secret"});
        let output = node.execute(&input).await.unwrap();
        assert_eq!(
            output,
            json!({"status": "processed", "quantity": 3})
        );
    }

    #[tokio::test]
    async fn set_creates_nested_objects() {
        let node = node(json!([
            {"op": "set", "field": "meta.source.kind", "value": "import"},
        ]));
        let output = node.execute(&json!({})).await.unwrap();
        assert_eq!(output, json!({"meta": {"source": {"kind": "import"}}}));
    }

    #[tokio::test]
    async fn rename_of_missing_field_is_a_noop() {
        let node = node(json!([{"op": "rename", "from": "ghost", "to": "real"}]));
        let output = node.execute(&json!({"a": 1})).await.unwrap();
        assert_eq!(output, json!({"a": 1}));
    }

    #[test]
    fn malformed_operation_is_a_config_issue() {
        let node = node(json!([{"op": "explode"}]));
        let issues = node.validate_config();
        assert!(issues.iter().any(|i| i.field == "operations"));
    }

    #[tokio::test]
    async fn nested_rename_moves_the_value() {
        let node = node(json!([
            {"op": "rename", "from": "user.name", "to": "profile.display_name"},
        ]));
        let output = node
            .execute(&json!({"user": {"name": "ada", "id": 1}}))
            .await
            .unwrap();
        assert_eq!(
            output,
            json!({"user": {"id": 1}, "profile": {"display_name": "ada"}})
        );
    }
}
