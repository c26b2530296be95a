//! Single-node execution.
//!
//! The runner owns the validate-then-execute sequence for one node
//! invocation: construct from the registry, reject invalid config
//! before running, bound execution with a hard timeout, and insist on
//! an object-shaped output. Every finished invocation lands in the
//! execution history, success or not.

use crate::error::EngineError;
use crate::history::ExecutionHistory;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use switchyard_nodes::NodeRegistry;
use switchyard_workflow::NodeExecution;
use tracing::{debug, warn};

/// Runs individual nodes and records the outcomes.
pub struct NodeRunner {
    registry: Arc<NodeRegistry>,
    history: Arc<ExecutionHistory>,
}

impl NodeRunner {
    #[must_use]
    pub fn new(registry: Arc<NodeRegistry>, history: Arc<ExecutionHistory>) -> Self {
        Self { registry, history }
    }

    #[must_use]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Checks a node type and config without executing anything.
    ///
    /// # Errors
    ///
    /// Returns an error for an unregistered type or a config that
    /// fails validation.
    pub fn validate(
        &self,
        node_type: &str,
        config: &JsonMap<String, JsonValue>,
    ) -> Result<(), EngineError> {
        let node = self
            .registry
            .construct(node_type, config)
            .ok_or_else(|| EngineError::UnknownNodeType {
                node_type: node_type.to_string(),
            })?;
        let issues = node.validate_config();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidConfig { issues })
        }
    }

    /// Runs one node invocation to completion.
    ///
    /// The record is updated through its lifecycle and pushed to the
    /// history in its final state; it is returned alongside the
    /// outcome so callers can fold it into their own bookkeeping.
    pub async fn run(
        &self,
        mut record: NodeExecution,
        config: &JsonMap<String, JsonValue>,
        input: JsonValue,
        timeout: Duration,
    ) -> (NodeExecution, Result<JsonValue, EngineError>) {
        let outcome = self.run_inner(&mut record, config, input, timeout).await;

        match &outcome {
            Ok(_) => debug!(
                node_type = %record.node_type,
                node_id = %record.node_id,
                "node completed"
            ),
            Err(e) => warn!(
                node_type = %record.node_type,
                node_id = %record.node_id,
                error = %e,
                "node failed"
            ),
        }

        self.history.push(record.clone());
        (record, outcome)
    }

    async fn run_inner(
        &self,
        record: &mut NodeExecution,
        config: &JsonMap<String, JsonValue>,
        input: JsonValue,
        timeout: Duration,
    ) -> Result<JsonValue, EngineError> {
        let node = match self.registry.construct(&record.node_type, config) {
            Some(node) => node,
            None => {
                let e = EngineError::UnknownNodeType {
                    node_type: record.node_type.clone(),
                };
                record.fail(e.to_string());
                return Err(e);
            }
        };

        let issues = node.validate_config();
        if !issues.is_empty() {
            let e = EngineError::InvalidConfig { issues };
            record.fail(e.to_string());
            return Err(e);
        }

        record.start(input.clone());

        let result = tokio::time::timeout(timeout, node.execute(&input)).await;
        let output = match result {
            Err(_) => {
                let e = EngineError::TimedOut { timeout };
                record.fail(e.to_string());
                return Err(e);
            }
            Ok(Err(node_error)) => {
                let e = EngineError::ExecutionFailed {
                    kind: node_error.kind(),
                    message: node_error.to_string(),
                };
                record.fail(e.to_string());
                return Err(e);
            }
            Ok(Ok(output)) => output,
        };

        if !output.is_object() {
            let e = EngineError::MalformedOutput {
                got: json_type_name(&output).to_string(),
            };
            record.fail(e.to_string());
            return Err(e);
        }

        record.complete(output.clone());
        Ok(output)
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
