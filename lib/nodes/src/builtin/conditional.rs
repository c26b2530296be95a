//! Conditional node.
//!
//! Evaluates a list of conditions against the input and reports the
//! verdict. The node itself always succeeds: a false verdict is data
//! (`condition_result`, `branch_taken`), not a failure. Downstream
//! routing reads `branch_taken` off the context.

use crate::builtin::input_object;
use crate::condition::{evaluate_all, Combinator, ConditionSpec};
use crate::contract::{NodeBehavior, NodeCategory, NodeDefinition};
use crate::error::{ConfigIssue, NodeError};
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde_json::{json, Map as JsonMap, Value as JsonValue};

#[must_use]
pub fn definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "conditional",
        category: NodeCategory::Logic,
        label: "Conditional",
        description: "Evaluates conditions and records which branch to take.",
        schema: ConfigSchema::new(vec![
            FieldSpec::required("conditions", FieldKind::Array, "Conditions to evaluate"),
            FieldSpec::optional("combinator", FieldKind::String, "How verdicts combine")
                .with_allowed_values(vec![json!("and"), json!("or")]),
        ]),
    }
}

pub fn construct(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(ConditionalNode {
        config: config.clone(),
    })
}

struct ConditionalNode {
    config: JsonMap<String, JsonValue>,
}

impl ConditionalNode {
    fn conditions(&self) -> Result<Vec<ConditionSpec>, String> {
        let raw = self
            .config
            .get("conditions")
            .cloned()
            .unwrap_or(JsonValue::Array(Vec::new()));
        serde_json::from_value(raw).map_err(|e| e.to_string())
    }

    fn combinator(&self) -> Result<Combinator, String> {
        match self.config.get("combinator") {
            None => Ok(Combinator::default()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| e.to_string()),
        }
    }
}

#[async_trait]
impl NodeBehavior for ConditionalNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        let mut issues = definition().schema.validate(&self.config);
        match self.conditions() {
            Ok(conditions) if conditions.is_empty() => {
                issues.push(ConfigIssue::new("conditions", "at least one condition is required"));
            }
            Ok(_) => {}
            Err(message) => issues.push(ConfigIssue::new("conditions", message)),
        }
        if let Err(message) = self.combinator() {
            issues.push(ConfigIssue::new("combinator", message));
        }
        issues
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        let conditions = self.conditions().map_err(|reason| NodeError::InvalidValue {
            reason: format!("conditions: {reason}"),
        })?;
        let combinator = self.combinator().map_err(|reason| NodeError::InvalidValue {
            reason: format!("combinator: {reason}"),
        })?;

        let (verdict, outcomes) = evaluate_all(&conditions, combinator, input);

        let mut output = input_object(input);
        output.insert("condition_result".to_string(), json!(verdict));
        output.insert(
            "branch_taken".to_string(),
            json!(if verdict { "true" } else { "false" }),
        );
        output.insert("conditions".to_string(), json!(outcomes));
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
    async fn verdict_and_branch_are_recorded() {
        let node = node(json!({
            "conditions": [
                {"type": "comparison", "field": "score", "operator": "greater_than", "value": 80},
            ],
        }));
        assert!(node.validate_config().is_empty());

        let output = node.execute(&json!({"score": 95})).await.unwrap();
        assert_eq!(output["condition_result"], json!(true));
        assert_eq!(output["branch_taken"], json!("true"));
        assert_eq!(output["conditions"][0]["passed"], json!(true));
        assert_eq!(output["score"], json!(95));

        let output = node.execute(&json!({"score": 40})).await.unwrap();
        assert_eq!(output["condition_result"], json!(false));
        assert_eq!(output["branch_taken"], json!("false"));
    }

    #[tokio::test]
    async fn or_combinator_passes_on_any() {
        let node = node(json!({
            "combinator": "or",
            "conditions": [
                {"type": "comparison", "field": "a", "operator": "equals", "value": 1},
                {"type": "comparison", "field": "a", "operator": "equals", "value": 2},
            ],
        }));
        let output = node.execute(&json!({"a": 2})).await.unwrap();
        assert_eq!(output["condition_result"], json!(true));
    }

    #[tokio::test]
    async fn erroring_condition_counts_false_not_failed() {
        let node = node(json!({
            "conditions": [
                {"type": "comparison", "field": "missing", "operator": "equals", "value": 1},
            ],
        }));
        let output = node.execute(&json!({})).await.unwrap();
        assert_eq!(output["condition_result"], json!(false));
        assert_eq!(output["branch_taken"], json!("false"));
        assert!(output["conditions"][0]["error"].is_string());
    }

    #[test]
    fn empty_conditions_list_is_a_config_issue() {
        let node = node(json!({"conditions": []}));
        let issues = node.validate_config();
        assert!(issues.iter().any(|i| i.field == "conditions"));
    }
}
