//! Output node types.

use crate::builtin::input_object;
use crate::contract::{NodeBehavior, NodeCategory, NodeDefinition};
use crate::error::{ConfigIssue, NodeError};
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tracing::{debug, error, info, warn};

#[must_use]
pub fn log_definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "log_output",
        category: NodeCategory::Output,
        label: "Log output",
        description: "Writes the payload to the structured log.",
        schema: ConfigSchema::new(vec![
            FieldSpec::optional("level", FieldKind::String, "Log level, default info")
                .with_allowed_values(vec![
                    json!("debug"),
                    json!("info"),
                    json!("warn"),
                    json!("error"),
                ]),
            FieldSpec::optional("message", FieldKind::String, "Message to log with the payload"),
        ]),
    }
}

#[must_use]
pub fn echo_definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "echo",
        category: NodeCategory::Output,
        label: "Echo",
        description: "Returns the payload unchanged.",
        schema: ConfigSchema::empty(),
    }
}

pub fn construct_log(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(LogOutputNode {
        config: config.clone(),
    })
}

pub fn construct_echo(_config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(EchoNode)
}

struct LogOutputNode {
    config: JsonMap<String, JsonValue>,
}

#[async_trait]
impl NodeBehavior for LogOutputNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        log_definition().schema.validate(&self.config)
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        let level = self
            .config
            .get("level")
            .and_then(JsonValue::as_str)
            .unwrap_or("info");
        let message = self
            .config
            .get("message")
            .and_then(JsonValue::as_str)
            .unwrap_or("workflow output");

        match level {
            "debug" => debug!(payload = %input, "{message}"),
            "warn" => warn!(payload = %input, "{message}"),
            "error" => error!(payload = %input, "{message}"),
            _ => info!(payload = %input, "{message}"),
        }

        Ok(JsonValue::Object(input_object(input)))
    }
}

struct EchoNode;

#[async_trait]
impl NodeBehavior for EchoNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        Vec::new()
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        Ok(JsonValue::Object(input_object(input)))
    }
}
