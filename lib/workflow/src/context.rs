//! Shared execution context.
//!
//! The context is the key-value data visible to nodes during a run.
//! It only grows: node outputs are merged in at batch boundaries with
//! last-write-wins semantics, and nothing is ever partially rolled
//! back.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Accumulated key-value data available to workflow nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext(JsonMap<String, JsonValue>);

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self(JsonMap::new())
    }

    /// Creates a context seeded from a JSON object.
    ///
    /// A non-object value is stored under the `"payload"` key so the
    /// trigger payload is never silently dropped.
    #[must_use]
    pub fn from_value(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self(map),
            JsonValue::Null => Self::new(),
            other => {
                let mut map = JsonMap::new();
                map.insert("payload".to_string(), other);
                Self(map)
            }
        }
    }

    /// Merges an output map into the context, last write wins.
    pub fn merge(&mut self, output: JsonMap<String, JsonValue>) {
        for (key, value) in output {
            self.0.insert(key, value);
        }
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns the context as a JSON object value.
    #[must_use]
    pub fn as_value(&self) -> JsonValue {
        JsonValue::Object(self.0.clone())
    }

    /// Returns the number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the context holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<JsonMap<String, JsonValue>> for ExecutionContext {
    fn from(map: JsonMap<String, JsonValue>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: JsonValue) -> JsonMap<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn merge_is_last_write_wins() {
        let mut ctx = ExecutionContext::from_value(json!({"score": 10, "name": "a"}));
        ctx.merge(map(json!({"score": 95, "extra": true})));

        assert_eq!(ctx.get("score"), Some(&json!(95)));
        assert_eq!(ctx.get("name"), Some(&json!("a")));
        assert_eq!(ctx.get("extra"), Some(&json!(true)));
    }

    #[test]
    fn non_object_seed_lands_under_payload() {
        let ctx = ExecutionContext::from_value(json!([1, 2, 3]));
        assert_eq!(ctx.get("payload"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn merge_never_removes_keys() {
        let mut ctx = ExecutionContext::from_value(json!({"kept": 1}));
        ctx.merge(map(json!({"added": 2})));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("kept"), Some(&json!(1)));
    }
}
