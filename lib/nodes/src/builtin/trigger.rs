//! Trigger node types.
//!
//! Triggers are workflow entry points. At execution time they are
//! passthroughs: the trigger payload arrives as the node's input and
//! flows out unchanged. Their configuration matters to the layers that
//! start executions, most of all the scheduler, which reads the cron
//! settings off `schedule_trigger` instances.

use crate::builtin::input_object;
use crate::contract::{NodeBehavior, NodeCategory, NodeDefinition};
use crate::error::{ConfigIssue, NodeError};
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde_json::{json, Map as JsonMap, Value as JsonValue};

/// Type name of the schedule trigger, shared with the scheduler.
pub const SCHEDULE_TRIGGER: &str = "schedule_trigger";

#[must_use]
pub fn manual_definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "manual_trigger",
        category: NodeCategory::Trigger,
        label: "Manual trigger",
        description: "Starts the workflow on explicit request.",
        schema: ConfigSchema::empty(),
    }
}

#[must_use]
pub fn webhook_definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "webhook_trigger",
        category: NodeCategory::Trigger,
        label: "Webhook trigger",
        description: "Starts the workflow from an inbound HTTP request.",
        schema: ConfigSchema::new(vec![
            FieldSpec::optional("path", FieldKind::String, "URL path the webhook listens on"),
            FieldSpec::optional("method", FieldKind::String, "Accepted HTTP method")
                .with_allowed_values(vec![
                    json!("GET"),
                    json!("POST"),
                    json!("PUT"),
                    json!("PATCH"),
                    json!("DELETE"),
                ]),
        ]),
    }
}

#[must_use]
pub fn schedule_definition() -> NodeDefinition {
    NodeDefinition {
        type_name: SCHEDULE_TRIGGER,
        category: NodeCategory::Trigger,
        label: "Schedule trigger",
        description: "Starts the workflow on a cron schedule.",
        schema: ConfigSchema::new(vec![
            FieldSpec::required("cron", FieldKind::String, "Cron expression, 5 or 6 fields"),
            FieldSpec::optional("timezone", FieldKind::String, "IANA timezone name"),
        ]),
    }
}

pub fn construct_manual(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(TriggerNode {
        definition: manual_definition(),
        config: config.clone(),
    })
}

pub fn construct_webhook(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(TriggerNode {
        definition: webhook_definition(),
        config: config.clone(),
    })
}

pub fn construct_schedule(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(TriggerNode {
        definition: schedule_definition(),
        config: config.clone(),
    })
}

struct TriggerNode {
    definition: NodeDefinition,
    config: JsonMap<String, JsonValue>,
}

#[async_trait]
impl NodeBehavior for TriggerNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        let mut issues = self.definition.schema.validate(&self.config);

        if self.definition.type_name == SCHEDULE_TRIGGER {
            if let Some(JsonValue::String(cron)) = self.config.get("cron") {
                let fields = cron.split_whitespace().count();
                if !(5..=6).contains(&fields) {
                    issues.push(ConfigIssue::new(
                        "cron",
                        format!("expected 5 or 6 fields, got {fields}"),
                    ));
                }
            }
        }

        issues
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        Ok(JsonValue::Object(input_object(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: JsonValue) -> JsonMap<String, JsonValue> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn manual_trigger_passes_payload_through() {
        let node = construct_manual(&JsonMap::new());
        assert!(node.validate_config().is_empty());
        let output = node.execute(&json!({"order_id": 7})).await.unwrap();
        assert_eq!(output, json!({"order_id": 7}));
    }

    #[tokio::test]
    async fn non_object_payload_is_wrapped() {
        let node = construct_manual(&JsonMap::new());
        let output = node.execute(&json!([1, 2])).await.unwrap();
        assert_eq!(output, json!({"payload": [1, 2]}));
    }

    #[test]
    fn schedule_trigger_requires_cron() {
        let node = construct_schedule(&JsonMap::new());
        let issues = node.validate_config();
        assert!(issues.iter().any(|i| i.field == "cron"));
    }

    #[test]
    fn schedule_trigger_rejects_wrong_field_count() {
        let node = construct_schedule(&config(json!({"cron": "* * *"})));
        let issues = node.validate_config();
        assert!(issues.iter().any(|i| i.message.contains("got 3")));

        let node = construct_schedule(&config(json!({"cron": "*/5 * * * *"})));
        assert!(node.validate_config().is_empty());
    }

    #[test]
    fn webhook_method_allow_list() {
        let node = construct_webhook(&config(json!({"method": "TRACE"})));
        assert!(!node.validate_config().is_empty());

        let node = construct_webhook(&config(json!({"method": "POST", "path": "/hooks/in"})));
        assert!(node.validate_config().is_empty());
    }
}
