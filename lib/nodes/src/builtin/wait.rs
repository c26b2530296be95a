//! Wait node.
//!
//! Pauses the workflow either for a fixed duration or until a
//! condition passes, polled at a fixed interval up to a ceiling. The
//! output records why the wait ended (`wait_reason`), how long it
//! lasted, and in condition mode how many checks ran.

use crate::builtin::input_object;
use crate::condition::{evaluate_condition, ConditionSpec};
use crate::contract::{NodeBehavior, NodeCategory, NodeDefinition};
use crate::error::{ConfigIssue, NodeError};
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::time::Duration;

const DEFAULT_CHECK_INTERVAL_SECS: f64 = 5.0;
const DEFAULT_MAX_WAIT_SECS: f64 = 3600.0;

/// Upper bound on any configured wait, one year in seconds. Values
/// past this would overflow `Duration`; validation rejects them and
/// `execute` clamps as a second line.
const MAX_SUPPORTED_SECS: f64 = 31_536_000.0;

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_SUPPORTED_SECS)).unwrap_or_default()
}

#[must_use]
pub fn definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "wait",
        category: NodeCategory::Logic,
        label: "Wait",
        description: "Pauses for a duration or until a condition passes.",
        schema: ConfigSchema::new(vec![
            FieldSpec::optional("duration_secs", FieldKind::Number, "Fixed wait in seconds"),
            FieldSpec::optional("condition", FieldKind::Object, "Condition to wait for"),
            FieldSpec::optional(
                "check_interval_secs",
                FieldKind::Number,
                "Seconds between condition checks, default 5",
            ),
            FieldSpec::optional(
                "max_wait_secs",
                FieldKind::Number,
                "Ceiling on any wait, default 3600",
            ),
        ]),
    }
}

pub fn construct(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(WaitNode {
        config: config.clone(),
    })
}

struct WaitNode {
    config: JsonMap<String, JsonValue>,
}

impl WaitNode {
    fn duration_secs(&self) -> Option<f64> {
        self.config.get("duration_secs").and_then(JsonValue::as_f64)
    }

    fn condition(&self) -> Result<Option<ConditionSpec>, String> {
        match self.config.get("condition") {
            None => Ok(None),
            Some(raw) => serde_json::from_value(raw.clone())
                .map(Some)
                .map_err(|e| e.to_string()),
        }
    }

    fn check_interval_secs(&self) -> f64 {
        self.config
            .get("check_interval_secs")
            .and_then(JsonValue::as_f64)
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS)
    }

    fn max_wait_secs(&self) -> f64 {
        self.config
            .get("max_wait_secs")
            .and_then(JsonValue::as_f64)
            .unwrap_or(DEFAULT_MAX_WAIT_SECS)
    }
}

#[async_trait]
impl NodeBehavior for WaitNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        let mut issues = definition().schema.validate(&self.config);

        let has_duration = self.duration_secs().is_some();
        let condition = self.condition();
        let has_condition = matches!(condition, Ok(Some(_)));

        match (has_duration, has_condition) {
            (false, false) => issues.push(ConfigIssue::new(
                "duration_secs",
                "either duration_secs or condition is required",
            )),
            (true, true) => issues.push(ConfigIssue::new(
                "condition",
                "duration_secs and condition are mutually exclusive",
            )),
            _ => {}
        }
        if let Err(message) = condition {
            issues.push(ConfigIssue::new("condition", message));
        }
        if let Some(secs) = self.duration_secs() {
            if secs < 0.0 {
                issues.push(ConfigIssue::new("duration_secs", "must not be negative"));
            } else if secs > MAX_SUPPORTED_SECS {
                issues.push(ConfigIssue::new("duration_secs", "must be at most one year"));
            }
        }
        let interval = self.check_interval_secs();
        if interval <= 0.0 {
            issues.push(ConfigIssue::new("check_interval_secs", "must be positive"));
        } else if interval > MAX_SUPPORTED_SECS {
            issues.push(ConfigIssue::new(
                "check_interval_secs",
                "must be at most one year",
            ));
        }
        if self.max_wait_secs() > MAX_SUPPORTED_SECS {
            issues.push(ConfigIssue::new("max_wait_secs", "must be at most one year"));
        }

        issues
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        let mut output = input_object(input);

        if let Some(secs) = self.duration_secs() {
            let requested = secs.max(0.0);
            let actual = requested.min(self.max_wait_secs()).min(MAX_SUPPORTED_SECS);
            tokio::time::sleep(secs_to_duration(actual)).await;
            let reason = if actual < requested {
                "max_wait_reached"
            } else {
                "duration_elapsed"
            };
            output.insert("wait_reason".to_string(), json!(reason));
            output.insert("waited_secs".to_string(), json!(actual));
            return Ok(JsonValue::Object(output));
        }

        let condition = self
            .condition()
            .map_err(|reason| NodeError::InvalidValue {
                reason: format!("condition: {reason}"),
            })?
            .ok_or_else(|| NodeError::InvalidValue {
                reason: "either duration_secs or condition is required".to_string(),
            })?;

        let interval = self.check_interval_secs().min(MAX_SUPPORTED_SECS);
        let max_wait = self.max_wait_secs().min(MAX_SUPPORTED_SECS);
        let mut waited = 0.0;
        let mut checks: u64 = 0;

        let reason = loop {
            checks += 1;
            if evaluate_condition(&condition, input).passed {
                break "condition_met";
            }
            if waited + interval > max_wait {
                let remainder = max_wait - waited;
                if remainder > 0.0 {
                    tokio::time::sleep(secs_to_duration(remainder)).await;
                    waited = max_wait;
                }
                break "max_wait_reached";
            }
            tokio::time::sleep(secs_to_duration(interval)).await;
            waited += interval;
        };

        output.insert("wait_reason".to_string(), json!(reason));
        output.insert("waited_secs".to_string(), json!(waited));
        output.insert("condition_checks".to_string(), json!(checks));
        Ok(JsonValue::Object(output))
    }
}
