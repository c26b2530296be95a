//! Built-in node types.

pub mod calculator;
pub mod conditional;
pub mod iterate;
pub mod output;
pub mod transform;
pub mod trigger;
pub mod wait;

use crate::contract::{NodeConstructor, NodeDefinition};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Every built-in node type with its constructor, in registration
/// order.
#[must_use]
pub fn all() -> Vec<(NodeDefinition, NodeConstructor)> {
    vec![
        (trigger::manual_definition(), trigger::construct_manual),
        (trigger::webhook_definition(), trigger::construct_webhook),
        (trigger::schedule_definition(), trigger::construct_schedule),
        (transform::definition(), transform::construct),
        (calculator::definition(), calculator::construct),
        (conditional::definition(), conditional::construct),
        (iterate::definition(), iterate::construct),
        (wait::definition(), wait::construct),
        (output::log_definition(), output::construct_log),
        (output::echo_definition(), output::construct_echo),
    ]
}

/// Renders an input payload as a JSON object. Non-object inputs are
/// wrapped under a `payload` key so node outputs stay object-shaped.
#[must_use]
pub(crate) fn input_object(input: &JsonValue) -> JsonMap<String, JsonValue> {
    match input {
        JsonValue::Object(map) => map.clone(),
        other => {
            let mut map = JsonMap::new();
            map.insert("payload".to_string(), other.clone());
            map
        }
    }
}
