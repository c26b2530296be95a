//! Loop node.
//!
//! Expands a source field into items and runs a body operation once
//! per item. Arrays iterate element by element, objects iterate as
//! `{key, value}` entries, and a scalar becomes a single-item loop.
//! Each iteration sees its own scope (`index`, `item`, `total_items`,
//! `is_first`, `is_last`) and failures are isolated: one bad item
//! records an error in its slot without stopping the rest.
//!
//! `mode` selects sequential or parallel execution. Result order
//! matches item order either way.

use crate::contract::{NodeBehavior, NodeCategory, NodeDefinition};
use crate::error::{ConfigIssue, NodeError};
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use crate::value::{coerce_number, display_string, lookup_path};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tracing::warn;

const DEFAULT_MAX_ITERATIONS: usize = 1000;

#[must_use]
pub fn definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "loop",
        category: NodeCategory::Logic,
        label: "Loop",
        description: "Runs a body operation over each item of a field.",
        schema: ConfigSchema::new(vec![
            FieldSpec::required("items", FieldKind::String, "Path to the field to iterate"),
            FieldSpec::optional(
                "max_iterations",
                FieldKind::Number,
                "Iteration cap; excess items are dropped with a warning",
            ),
            FieldSpec::optional("mode", FieldKind::String, "Execution mode")
                .with_allowed_values(vec![json!("sequential"), json!("parallel")]),
            FieldSpec::optional("operation", FieldKind::Object, "Body operation per item"),
        ]),
    }
}

pub fn construct(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(LoopNode {
        config: config.clone(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Operation {
    #[default]
    Passthrough,
    Multiply {
        factor: f64,
    },
    Append {
        value: JsonValue,
    },
}

struct LoopNode {
    config: JsonMap<String, JsonValue>,
}

impl LoopNode {
    fn items_path(&self) -> Option<&str> {
        self.config.get("items").and_then(JsonValue::as_str)
    }

    fn max_iterations(&self) -> usize {
        self.config
            .get("max_iterations")
            .and_then(JsonValue::as_u64)
            .map_or(DEFAULT_MAX_ITERATIONS, |n| n as usize)
    }

    fn mode(&self) -> Result<Mode, String> {
        match self.config.get("mode") {
            None => Ok(Mode::default()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| e.to_string()),
        }
    }

    fn operation(&self) -> Result<Operation, String> {
        match self.config.get("operation") {
            None => Ok(Operation::default()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| e.to_string()),
        }
    }
}

/// Renders the source value as a list of loop items.
fn collect_items(source: &JsonValue) -> Vec<JsonValue> {
    match source {
        JsonValue::Array(items) => items.clone(),
        JsonValue::Object(map) => map
            .iter()
            .map(|(key, value)| json!({"key": key, "value": value}))
            .collect(),
        scalar => vec![scalar.clone()],
    }
}

fn apply_operation(operation: &Operation, item: &JsonValue) -> Result<JsonValue, NodeError> {
    match operation {
        Operation::Passthrough => Ok(item.clone()),
        Operation::Multiply { factor } => {
            let number = coerce_number(item).ok_or_else(|| NodeError::InvalidValue {
                reason: format!("cannot multiply non-numeric item {item}"),
            })?;
            Ok(json!(number * factor))
        }
        Operation::Append { value } => match item {
            JsonValue::Array(existing) => {
                let mut extended = existing.clone();
                extended.push(value.clone());
                Ok(JsonValue::Array(extended))
            }
            JsonValue::String(s) => Ok(json!(format!("{s}{}", display_string(value)))),
            other => Err(NodeError::InvalidValue {
                reason: format!("cannot append to item {other}"),
            }),
        },
    }
}

fn run_iteration(
    operation: &Operation,
    item: &JsonValue,
    index: usize,
    total: usize,
) -> JsonValue {
    let mut entry = JsonMap::new();
    entry.insert("index".to_string(), json!(index));
    entry.insert("item".to_string(), item.clone());
    entry.insert("total_items".to_string(), json!(total));
    entry.insert("is_first".to_string(), json!(index == 0));
    entry.insert("is_last".to_string(), json!(index + 1 == total));

    match apply_operation(operation, item) {
        Ok(result) => {
            entry.insert("result".to_string(), result);
        }
        Err(e) => {
            entry.insert("error".to_string(), json!(e.to_string()));
        }
    }
    JsonValue::Object(entry)
}

#[async_trait]
impl NodeBehavior for LoopNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        let mut issues = definition().schema.validate(&self.config);
        if let Err(message) = self.mode() {
            issues.push(ConfigIssue::new("mode", message));
        }
        if let Err(message) = self.operation() {
            issues.push(ConfigIssue::new("operation", message));
        }
        issues
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        let path = self.items_path().ok_or_else(|| NodeError::InvalidValue {
            reason: "items is required".to_string(),
        })?;
        let operation = self.operation().map_err(|reason| NodeError::InvalidValue {
            reason: format!("operation: {reason}"),
        })?;
        let mode = self.mode().map_err(|reason| NodeError::InvalidValue {
            reason: format!("mode: {reason}"),
        })?;

        let source = lookup_path(input, path).ok_or_else(|| NodeError::PathNotFound {
            path: path.to_string(),
        })?;

        let mut items = collect_items(source);
        let source_count = items.len();
        let cap = self.max_iterations();
        let truncated = items.len() > cap;
        items.truncate(cap);
        let total = items.len();
        if truncated {
            warn!(path, source_count, cap, "loop items truncated");
        }

        let results: Vec<JsonValue> = match mode {
            Mode::Sequential => items
                .iter()
                .enumerate()
                .map(|(index, item)| run_iteration(&operation, item, index, total))
                .collect(),
            Mode::Parallel => {
                let tasks = items.iter().enumerate().map(|(index, item)| {
                    let operation = operation.clone();
                    let item = item.clone();
                    async move { run_iteration(&operation, &item, index, total) }
                });
                futures::future::join_all(tasks).await
            }
        };

        let failed = results
            .iter()
            .filter(|entry| entry.get("error").is_some())
            .count();

        let mut output = JsonMap::new();
        output.insert("results".to_string(), JsonValue::Array(results));
        output.insert("total_iterations".to_string(), json!(total));
        output.insert("successful_iterations".to_string(), json!(total - failed));
        output.insert("failed_iterations".to_string(), json!(failed));
        if truncated {
            output.insert(
                "warnings".to_string(),
                json!([format!(
                    "{source_count} items exceeded the cap of {cap}; extra items were skipped"
                )]),
            );
        }
        Ok(JsonValue::Object(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(config: JsonValue) -> Box<dyn NodeBehavior> {
        construct(&config.as_object().cloned().unwrap_or_default())
    }

    #[tokio::test]
    async fn array_items_iterate_in_order() {
        let node = node(json!({"items": "values"}));
        assert!(node.validate_config().is_empty());

        let output = node.execute(&json!({"values": [10, 20, 30]})).await.unwrap();
        assert_eq!(output["total_iterations"], json!(3));
        let results = output["results"].as_array().unwrap();
        assert_eq!(results[0]["index"], json!(0));
        assert_eq!(results[0]["is_first"], json!(true));
        assert_eq!(results[0]["result"], json!(10));
        assert_eq!(results[2]["is_last"], json!(true));
        assert_eq!(results[2]["total_items"], json!(3));
    }

    #[tokio::test]
    async fn object_iterates_as_key_value_entries() {
        let node = node(json!({"items": "settings"}));
        let output = node
            .execute(&json!({"settings": {"a": 1, "b": 2}}))
            .await
            .unwrap();
        let results = output["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["item"], json!({"key": "a", "value": 1}));
    }

    #[tokio::test]
    async fn scalar_becomes_a_single_iteration() {
        let node = node(json!({"items": "only"}));
        let output = node.execute(&json!({"only": 42})).await.unwrap();
        assert_eq!(output["total_iterations"], json!(1));
        assert_eq!(output["results"][0]["item"], json!(42));
    }

    #[tokio::test]
    async fn multiply_operation_transforms_each_item() {
        let node = node(json!({
            "items": "prices",
            "operation": {"type": "multiply", "factor": 2.0},
        }));
        let output = node
            .execute(&json!({"prices": [1.5, "2.5"]}))
            .await
            .unwrap();
        let results = output["results"].as_array().unwrap();
        assert_eq!(results[0]["result"], json!(3.0));
        assert_eq!(results[1]["result"], json!(5.0));
    }

    #[tokio::test]
    async fn bad_item_records_error_without_stopping_the_loop() {
        let node = node(json!({
            "items": "values",
            "operation": {"type": "multiply", "factor": 2.0},
        }));
        let output = node
            .execute(&json!({"values": [1, {"nested": true}, 3]}))
            .await
            .unwrap();
        let results = output["results"].as_array().unwrap();
        assert_eq!(results[0]["result"], json!(2.0));
        assert!(results[1]["error"].is_string());
        assert_eq!(results[2]["result"], json!(6.0));
        assert_eq!(output["successful_iterations"], json!(2));
        assert_eq!(output["failed_iterations"], json!(1));
    }

    #[tokio::test]
    async fn passthrough_over_orders_counts_every_iteration_as_successful() {
        let node = node(json!({"items": "orders", "mode": "sequential"}));
        let output = node
            .execute(&json!({
                "orders": [{"amount": 10}, {"amount": 20}, {"amount": 5}],
            }))
            .await
            .unwrap();
        assert_eq!(output["total_iterations"], json!(3));
        assert_eq!(output["successful_iterations"], json!(3));
        assert_eq!(output["failed_iterations"], json!(0));
        assert_eq!(output["results"][1]["result"], json!({"amount": 20}));
    }

    #[tokio::test]
    async fn max_iterations_truncates_with_warning() {
        let node = node(json!({"items": "values", "max_iterations": 2}));
        let output = node
            .execute(&json!({"values": [1, 2, 3, 4, 5]}))
            .await
            .unwrap();
        assert_eq!(output["total_iterations"], json!(2));
        assert_eq!(output["results"].as_array().unwrap().len(), 2);
        assert!(output["warnings"][0].as_str().unwrap().contains("cap of 2"));
    }

    #[tokio::test]
    async fn parallel_mode_preserves_result_order() {
        let node = node(json!({
            "items": "values",
            "mode": "parallel",
            "operation": {"type": "multiply", "factor": 10.0},
        }));
        let output = node.execute(&json!({"values": [1, 2, 3]})).await.unwrap();
        let results = output["results"].as_array().unwrap();
        let ordered: Vec<f64> = results
            .iter()
            .map(|r| r["result"].as_f64().unwrap())
            .collect();
        assert_eq!(ordered, vec![10.0, 20.0, 30.0]);
    }

    #[tokio::test]
    async fn missing_items_path_is_an_error() {
        let node = node(json!({"items": "ghost"}));
        let err = node.execute(&json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "path_not_found");
    }
}
