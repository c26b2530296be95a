//! Config schemas for node types.
//!
//! A schema is an ordered list of field specifications. It drives both
//! design-time validation (missing required fields, wrong kinds) and
//! the catalog's schema endpoint.

use crate::error::ConfigIssue;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// The expected JSON kind of a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Any JSON value is acceptable.
    Any,
}

impl FieldKind {
    /// Returns true if `value` matches this kind.
    #[must_use]
    pub fn matches(&self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    /// A lowercase name for error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

/// Specification of one config field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// The field name in the config map.
    pub name: String,
    /// The expected JSON kind.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
    /// Human-readable description.
    pub description: String,
    /// Allowed values, when the field is an enumeration.
    pub allowed_values: Option<Vec<JsonValue>>,
}

impl FieldSpec {
    /// Creates a required field spec.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
            allowed_values: None,
        }
    }

    /// Creates an optional field spec.
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
            allowed_values: None,
        }
    }

    /// Restricts the field to a fixed set of values.
    #[must_use]
    pub fn with_allowed_values(mut self, values: Vec<JsonValue>) -> Self {
        self.allowed_values = Some(values);
        self
    }
}

/// Ordered config schema for one node type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    /// The field specifications, in display order.
    pub fields: Vec<FieldSpec>,
}

impl ConfigSchema {
    /// Creates a schema from field specs.
    #[must_use]
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Creates an empty schema (node takes no configuration).
    #[must_use]
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Returns the spec for the named field, if declared.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the names of all required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Validates a config map against this schema.
    ///
    /// Checks presence of required fields, kind mismatches, and
    /// allowed-value violations. Unknown keys are tolerated so that
    /// configs written against a newer schema still validate.
    #[must_use]
    pub fn validate(&self, config: &JsonMap<String, JsonValue>) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for spec in &self.fields {
            let Some(value) = config.get(&spec.name) else {
                if spec.required {
                    issues.push(ConfigIssue::new(&spec.name, "required field is missing"));
                }
                continue;
            };

            if !spec.kind.matches(value) {
                issues.push(ConfigIssue::new(
                    &spec.name,
                    format!("expected {}, got {}", spec.kind.name(), kind_of(value)),
                ));
                continue;
            }

            if let Some(allowed) = &spec.allowed_values
                && !allowed.contains(value)
            {
                issues.push(ConfigIssue::new(
                    &spec.name,
                    format!("value {value} is not one of the allowed values"),
                ));
            }
        }

        issues
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ConfigSchema {
        ConfigSchema::new(vec![
            FieldSpec::required("formula", FieldKind::String, "The expression to evaluate"),
            FieldSpec::optional("precision", FieldKind::Number, "Decimal places"),
            FieldSpec::optional("mode", FieldKind::String, "Execution mode")
                .with_allowed_values(vec![json!("sequential"), json!("parallel")]),
        ])
    }

    fn config(value: JsonValue) -> JsonMap<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn missing_required_field_is_reported() {
        let issues = schema().validate(&config(json!({"precision": 2})));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "formula");
    }

    #[test]
    fn satisfying_required_fields_passes() {
        let issues = schema().validate(&config(json!({"formula": "a + b"})));
        assert!(issues.is_empty());
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let issues = schema().validate(&config(json!({"formula": 42})));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("expected string"));
    }

    #[test]
    fn allowed_values_are_enforced() {
        let issues = schema().validate(&config(json!({
            "formula": "a",
            "mode": "sideways"
        })));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "mode");
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let issues = schema().validate(&config(json!({
            "formula": "a",
            "future_knob": true
        })));
        assert!(issues.is_empty());
    }
}
