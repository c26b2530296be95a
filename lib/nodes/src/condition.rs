//! Declarative conditions evaluated against a node's input payload.
//!
//! A condition is one of four shapes:
//! - `comparison`: a field, an operator, and a literal to compare with,
//! - `exists`: presence of a field,
//! - `expression`: an expression string with `${path}` placeholders
//!   substituted from the input before evaluation,
//! - `validation`: a named rule (required, email, numeric, length
//!   bounds, regex pattern) applied to a field.
//!
//! Multiple conditions combine with `and` (default) or `or`. Every
//! condition is evaluated, never short-circuited, so each outcome is
//! reported. A condition that fails to evaluate counts as not passed
//! and carries the error text in its outcome.

use crate::expr::{self, ExprValue};
use crate::value::{coerce_number, display_string, is_empty, lookup_path};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Operators usable in a `comparison` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    In,
    NotIn,
}

/// Field-level validation rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationRule {
    Required,
    Email,
    Numeric,
    MinLength { length: usize },
    MaxLength { length: usize },
    Pattern { pattern: String },
}

/// One condition, in any of its shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSpec {
    Comparison {
        field: String,
        operator: ComparisonOp,
        #[serde(default)]
        value: JsonValue,
    },
    Exists {
        field: String,
    },
    Expression {
        expression: String,
    },
    Validation {
        field: String,
        #[serde(flatten)]
        rule: ValidationRule,
    },
}

/// How a list of conditions folds into one verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// The result of evaluating a single condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionOutcome {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConditionOutcome {
    fn passed(passed: bool) -> Self {
        Self {
            passed,
            error: None,
        }
    }

    fn errored(message: String) -> Self {
        Self {
            passed: false,
            error: Some(message),
        }
    }
}

/// Evaluates one condition against the input payload.
///
/// Never fails outright: evaluation errors produce a not-passed
/// outcome with the error attached.
#[must_use]
pub fn evaluate_condition(spec: &ConditionSpec, input: &JsonValue) -> ConditionOutcome {
    match try_evaluate(spec, input) {
        Ok(passed) => ConditionOutcome::passed(passed),
        Err(message) => ConditionOutcome::errored(message),
    }
}

/// Evaluates every condition and folds the verdicts with the
/// combinator. An empty list passes under `and` and fails under `or`.
#[must_use]
pub fn evaluate_all(
    specs: &[ConditionSpec],
    combinator: Combinator,
    input: &JsonValue,
) -> (bool, Vec<ConditionOutcome>) {
    let outcomes: Vec<ConditionOutcome> = specs
        .iter()
        .map(|spec| evaluate_condition(spec, input))
        .collect();
    let verdict = match combinator {
        Combinator::And => outcomes.iter().all(|o| o.passed),
        Combinator::Or => outcomes.iter().any(|o| o.passed),
    };
    (verdict, outcomes)
}

fn try_evaluate(spec: &ConditionSpec, input: &JsonValue) -> Result<bool, String> {
    match spec {
        ConditionSpec::Comparison {
            field,
            operator,
            value,
        } => compare(input, field, *operator, value),
        ConditionSpec::Exists { field } => Ok(lookup_path(input, field).is_some()),
        ConditionSpec::Expression { expression } => {
            let substituted = substitute_placeholders(expression, input)?;
            let result = expr::eval_str(&substituted, &HashMap::new())
                .map_err(|e| format!("expression '{expression}': {e}"))?;
            Ok(result.truthy())
        }
        ConditionSpec::Validation { field, rule } => validate_field(input, field, rule),
    }
}

fn compare(
    input: &JsonValue,
    field: &str,
    operator: ComparisonOp,
    value: &JsonValue,
) -> Result<bool, String> {
    let actual = lookup_path(input, field);

    // Emptiness checks treat a missing field as empty.
    match operator {
        ComparisonOp::IsEmpty => {
            return Ok(actual.is_none_or(is_empty));
        }
        ComparisonOp::IsNotEmpty => {
            return Ok(actual.is_some_and(|v| !is_empty(v)));
        }
        _ => {}
    }

    let actual = actual.ok_or_else(|| format!("field '{field}' not found in input"))?;

    match operator {
        ComparisonOp::Equals => Ok(loosely_equal(actual, value)),
        ComparisonOp::NotEquals => Ok(!loosely_equal(actual, value)),
        ComparisonOp::GreaterThan => ordering(actual, value, field).map(|o| o.is_gt()),
        ComparisonOp::GreaterThanOrEqual => ordering(actual, value, field).map(|o| o.is_ge()),
        ComparisonOp::LessThan => ordering(actual, value, field).map(|o| o.is_lt()),
        ComparisonOp::LessThanOrEqual => ordering(actual, value, field).map(|o| o.is_le()),
        ComparisonOp::Contains => membership(actual, value, field),
        ComparisonOp::NotContains => membership(actual, value, field).map(|m| !m),
        ComparisonOp::StartsWith => {
            let (haystack, needle) = both_strings(actual, value, field)?;
            Ok(haystack.starts_with(&needle))
        }
        ComparisonOp::EndsWith => {
            let (haystack, needle) = both_strings(actual, value, field)?;
            Ok(haystack.ends_with(&needle))
        }
        ComparisonOp::In => set_membership(actual, value, field),
        ComparisonOp::NotIn => set_membership(actual, value, field).map(|m| !m),
        ComparisonOp::IsEmpty | ComparisonOp::IsNotEmpty => {
            unreachable!("emptiness handled above")
        }
    }
}

// Numbers written as strings still compare as numbers.
fn loosely_equal(actual: &JsonValue, expected: &JsonValue) -> bool {
    if actual == expected {
        return true;
    }
    if let (Some(a), Some(b)) = (coerce_number(actual), coerce_number(expected)) {
        return a == b;
    }
    false
}

fn ordering(
    actual: &JsonValue,
    expected: &JsonValue,
    field: &str,
) -> Result<std::cmp::Ordering, String> {
    if let (Some(a), Some(b)) = (coerce_number(actual), coerce_number(expected)) {
        return a
            .partial_cmp(&b)
            .ok_or_else(|| format!("field '{field}' is not comparable"));
    }
    if let (JsonValue::String(a), JsonValue::String(b)) = (actual, expected) {
        return Ok(a.cmp(b));
    }
    Err(format!(
        "field '{field}' cannot be ordered against {expected}"
    ))
}

fn membership(actual: &JsonValue, needle: &JsonValue, field: &str) -> Result<bool, String> {
    match actual {
        JsonValue::String(haystack) => Ok(haystack.contains(&display_string(needle))),
        JsonValue::Array(items) => Ok(items.iter().any(|item| loosely_equal(item, needle))),
        JsonValue::Object(map) => match needle {
            JsonValue::String(key) => Ok(map.contains_key(key)),
            other => Err(format!("object field '{field}' needs a string key, got {other}")),
        },
        other => Err(format!(
            "field '{field}' is {other}, which supports no containment check"
        )),
    }
}

fn set_membership(actual: &JsonValue, collection: &JsonValue, field: &str) -> Result<bool, String> {
    match collection {
        JsonValue::Array(items) => Ok(items.iter().any(|item| loosely_equal(item, actual))),
        JsonValue::String(haystack) => Ok(haystack.contains(&display_string(actual))),
        other => Err(format!(
            "'in' for field '{field}' needs an array or string, got {other}"
        )),
    }
}

fn both_strings(
    actual: &JsonValue,
    expected: &JsonValue,
    field: &str,
) -> Result<(String, String), String> {
    match actual {
        JsonValue::String(s) => Ok((s.clone(), display_string(expected))),
        other => Err(format!("field '{field}' must be a string, got {other}")),
    }
}

fn validate_field(input: &JsonValue, field: &str, rule: &ValidationRule) -> Result<bool, String> {
    let actual = lookup_path(input, field);

    match rule {
        ValidationRule::Required => Ok(actual.is_some_and(|v| !is_empty(v))),
        ValidationRule::Email => Ok(actual
            .and_then(JsonValue::as_str)
            .is_some_and(|s| EMAIL.is_match(s))),
        ValidationRule::Numeric => Ok(actual.is_some_and(|v| coerce_number(v).is_some())),
        ValidationRule::MinLength { length } => Ok(text_length(actual)? >= *length),
        ValidationRule::MaxLength { length } => Ok(text_length(actual)? <= *length),
        ValidationRule::Pattern { pattern } => {
            let regex =
                Regex::new(pattern).map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
            Ok(actual
                .and_then(JsonValue::as_str)
                .is_some_and(|s| regex.is_match(s)))
        }
    }
}

fn text_length(actual: Option<&JsonValue>) -> Result<usize, String> {
    match actual {
        Some(JsonValue::String(s)) => Ok(s.chars().count()),
        Some(JsonValue::Array(items)) => Ok(items.len()),
        Some(other) => Err(format!("length check needs a string or array, got {other}")),
        None => Ok(0),
    }
}

/// Replaces every `${path}` placeholder with a literal rendered from
/// the input payload. Strings become quoted literals; numbers and
/// booleans render verbatim.
fn substitute_placeholders(template: &str, input: &JsonValue) -> Result<String, String> {
    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(template) {
        let whole = captures.get(0).ok_or("placeholder match missing")?;
        let path = captures
            .get(1)
            .ok_or("placeholder capture missing")?
            .as_str()
            .trim();

        let value = lookup_path(input, path)
            .ok_or_else(|| format!("placeholder '${{{path}}}' not found in input"))?;
        let literal = render_literal(value)
            .ok_or_else(|| format!("placeholder '${{{path}}}' is not a scalar"))?;

        result.push_str(&template[last..whole.start()]);
        result.push_str(&literal);
        last = whole.end();
    }

    result.push_str(&template[last..]);
    Ok(result)
}

fn render_literal(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::String(s) => Some(format!(
            "'{}'",
            s.replace('\\', "\\\\").replace('\'', "\\'")
        )),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Renders an already-substituted expression value; exported for the
/// wait node, which evaluates its continue-condition the same way.
pub fn expression_truthy(expression: &str, input: &JsonValue) -> Result<bool, String> {
    let substituted = substitute_placeholders(expression, input)?;
    expr::eval_str(&substituted, &HashMap::new())
        .map(|v: ExprValue| v.truthy())
        .map_err(|e| format!("expression '{expression}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comparison(field: &str, operator: ComparisonOp, value: JsonValue) -> ConditionSpec {
        ConditionSpec::Comparison {
            field: field.to_string(),
            operator,
            value,
        }
    }

    #[test]
    fn numeric_comparison_against_string_field() {
        let input = json!({"score": "95"});
        let spec = comparison("score", ComparisonOp::GreaterThan, json!(80));
        assert!(evaluate_condition(&spec, &input).passed);
    }

    #[test]
    fn nested_field_equals() {
        let input = json!({"user": {"status": "active"}});
        let spec = comparison("user.status", ComparisonOp::Equals, json!("active"));
        assert!(evaluate_condition(&spec, &input).passed);
    }

    #[test]
    fn missing_field_fails_with_error() {
        let input = json!({});
        let spec = comparison("absent", ComparisonOp::Equals, json!(1));
        let outcome = evaluate_condition(&spec, &input);
        assert!(!outcome.passed);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn is_empty_treats_missing_as_empty() {
        let input = json!({"present": "x"});
        assert!(
            evaluate_condition(
                &comparison("absent", ComparisonOp::IsEmpty, JsonValue::Null),
                &input
            )
            .passed
        );
        assert!(
            evaluate_condition(
                &comparison("present", ComparisonOp::IsNotEmpty, JsonValue::Null),
                &input
            )
            .passed
        );
    }

    #[test]
    fn contains_on_strings_and_arrays() {
        let input = json!({"tags": ["alpha", "beta"], "note": "hello world"});
        assert!(
            evaluate_condition(
                &comparison("tags", ComparisonOp::Contains, json!("beta")),
                &input
            )
            .passed
        );
        assert!(
            evaluate_condition(
                &comparison("note", ComparisonOp::Contains, json!("world")),
                &input
            )
            .passed
        );
        assert!(
            !evaluate_condition(
                &comparison("tags", ComparisonOp::Contains, json!("gamma")),
                &input
            )
            .passed
        );
    }

    #[test]
    fn in_operator_checks_collection_membership() {
        let input = json!({"status": "active"});
        let spec = comparison("status", ComparisonOp::In, json!(["active", "paused"]));
        assert!(evaluate_condition(&spec, &input).passed);
        let spec = comparison("status", ComparisonOp::NotIn, json!(["archived"]));
        assert!(evaluate_condition(&spec, &input).passed);
    }

    #[test]
    fn exists_condition() {
        let input = json!({"a": {"b": 1}});
        let spec = ConditionSpec::Exists {
            field: "a.b".to_string(),
        };
        assert!(evaluate_condition(&spec, &input).passed);
        let spec = ConditionSpec::Exists {
            field: "a.c".to_string(),
        };
        assert!(!evaluate_condition(&spec, &input).passed);
    }

    #[test]
    fn expression_with_placeholders() {
        let input = json!({"order": {"total": 120, "vip": true}});
        let spec = ConditionSpec::Expression {
            expression: "${order.total} > 100 || ${order.vip}".to_string(),
        };
        assert!(evaluate_condition(&spec, &input).passed);
    }

    #[test]
    fn expression_string_placeholder_is_quoted() {
        let input = json!({"name": "ada"});
        let spec = ConditionSpec::Expression {
            expression: "${name} == 'ada'".to_string(),
        };
        assert!(evaluate_condition(&spec, &input).passed);
    }

    #[test]
    fn expression_missing_placeholder_counts_false_with_error() {
        let input = json!({});
        let spec = ConditionSpec::Expression {
            expression: "${ghost} > 1".to_string(),
        };
        let outcome = evaluate_condition(&spec, &input);
        assert!(!outcome.passed);
        assert!(outcome.error.unwrap().contains("ghost"));
    }

    #[test]
    fn validation_rules() {
        let input = json!({
            "email": "ada@example.com",
            "bad_email": "nope",
            "count": "42",
            "name": "ab",
        });
        let rule = |field: &str, rule: ValidationRule| ConditionSpec::Validation {
            field: field.to_string(),
            rule,
        };

        assert!(evaluate_condition(&rule("email", ValidationRule::Email), &input).passed);
        assert!(!evaluate_condition(&rule("bad_email", ValidationRule::Email), &input).passed);
        assert!(evaluate_condition(&rule("count", ValidationRule::Numeric), &input).passed);
        assert!(evaluate_condition(&rule("name", ValidationRule::Required), &input).passed);
        assert!(!evaluate_condition(&rule("missing", ValidationRule::Required), &input).passed);
        assert!(
            evaluate_condition(
                &rule("name", ValidationRule::MinLength { length: 2 }),
                &input
            )
            .passed
        );
        assert!(
            !evaluate_condition(
                &rule("name", ValidationRule::MinLength { length: 3 }),
                &input
            )
            .passed
        );
        assert!(
            evaluate_condition(
                &rule(
                    "email",
                    ValidationRule::Pattern {
                        pattern: "^ada".to_string()
                    }
                ),
                &input
            )
            .passed
        );
    }

    #[test]
    fn combinators_fold_without_short_circuit() {
        let input = json!({"a": 1});
        let specs = vec![
            comparison("a", ComparisonOp::Equals, json!(1)),
            comparison("missing", ComparisonOp::Equals, json!(1)),
        ];

        let (verdict, outcomes) = evaluate_all(&specs, Combinator::And, &input);
        assert!(!verdict);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[1].error.is_some());

        let (verdict, _) = evaluate_all(&specs, Combinator::Or, &input);
        assert!(verdict);
    }

    #[test]
    fn condition_specs_deserialize_from_snake_case() {
        let spec: ConditionSpec = serde_json::from_value(json!({
            "type": "comparison",
            "field": "score",
            "operator": "greater_than_or_equal",
            "value": 10,
        }))
        .unwrap();
        assert!(matches!(
            spec,
            ConditionSpec::Comparison {
                operator: ComparisonOp::GreaterThanOrEqual,
                ..
            }
        ));

        let spec: ConditionSpec = serde_json::from_value(json!({
            "type": "validation",
            "field": "name",
            "rule": "min_length",
            "length": 3,
        }))
        .unwrap();
        assert!(matches!(
            spec,
            ConditionSpec::Validation {
                rule: ValidationRule::MinLength { length: 3 },
                ..
            }
        ));
    }
}
