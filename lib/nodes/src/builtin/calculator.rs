//! Calculator node.
//!
//! Evaluates a formula through the restricted expression evaluator.
//! Every identifier in the formula must resolve to a field of the
//! input; fields that exist but do not coerce to numbers count as 0
//! and a warning is recorded in the output. A missing field is an
//! error.

use crate::builtin::input_object;
use crate::contract::{NodeBehavior, NodeCategory, NodeDefinition};
use crate::error::{ConfigIssue, NodeError};
use crate::expr::{Expr, ExprValue};
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use crate::value::{coerce_number, lookup_path};
use async_trait::async_trait;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;

const DEFAULT_TARGET_FIELD: &str = "result";

#[must_use]
pub fn definition() -> NodeDefinition {
    NodeDefinition {
        type_name: "calculator",
        category: NodeCategory::Transform,
        label: "Calculator",
        description: "Evaluates an arithmetic formula over input fields.",
        schema: ConfigSchema::new(vec![
            FieldSpec::required("formula", FieldKind::String, "Formula to evaluate"),
            FieldSpec::optional(
                "target_field",
                FieldKind::String,
                "Output field for the result, default 'result'",
            ),
            FieldSpec::optional(
                "precision",
                FieldKind::Number,
                "Decimal places to round to; negative leaves the result unrounded",
            ),
        ]),
    }
}

pub fn construct(config: &JsonMap<String, JsonValue>) -> Box<dyn NodeBehavior> {
    Box::new(CalculatorNode {
        config: config.clone(),
    })
}

struct CalculatorNode {
    config: JsonMap<String, JsonValue>,
}

impl CalculatorNode {
    fn formula(&self) -> Option<&str> {
        self.config.get("formula").and_then(JsonValue::as_str)
    }

    fn target_field(&self) -> &str {
        self.config
            .get("target_field")
            .and_then(JsonValue::as_str)
            .unwrap_or(DEFAULT_TARGET_FIELD)
    }

    fn precision(&self) -> Option<i64> {
        self.config.get("precision").and_then(JsonValue::as_i64)
    }
}

#[async_trait]
impl NodeBehavior for CalculatorNode {
    fn validate_config(&self) -> Vec<ConfigIssue> {
        let mut issues = definition().schema.validate(&self.config);
        if let Some(formula) = self.formula() {
            if let Err(e) = Expr::parse(formula) {
                issues.push(ConfigIssue::new("formula", e.to_string()));
            }
        }
        issues
    }

    async fn execute(&self, input: &JsonValue) -> Result<JsonValue, NodeError> {
        let formula = self.formula().ok_or_else(|| NodeError::InvalidValue {
            reason: "formula is required".to_string(),
        })?;
        let expr = Expr::parse(formula)?;

        let mut scope = HashMap::new();
        let mut warnings = Vec::new();
        for name in expr.identifiers() {
            let value = lookup_path(input, &name)
                .ok_or_else(|| NodeError::MissingInput {
                    field: name.clone(),
                })?;
            let number = match coerce_number(value) {
                Some(n) => n,
                None => {
                    warnings.push(format!(
                        "field '{name}' is not numeric ({value}); using 0"
                    ));
                    0.0
                }
            };
            scope.insert(name, ExprValue::Number(number));
        }

        let result = match expr.eval(&scope)? {
            ExprValue::Number(n) => n,
            other => {
                return Err(NodeError::InvalidValue {
                    reason: format!("formula produced a non-numeric value: {other}"),
                });
            }
        };
        let result = match self.precision() {
            Some(digits) if digits >= 0 => {
                let factor = 10f64.powi(digits as i32);
                (result * factor).round() / factor
            }
            _ => result,
        };

        let mut output = input_object(input);
        output.insert(self.target_field().to_string(), json!(result));
        if !warnings.is_empty() {
            output.insert("warnings".to_string(), json!(warnings));
        }
        Ok(JsonValue::Object(output))
    }
}
