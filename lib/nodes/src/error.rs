//! Error types for the nodes crate.

use crate::expr::ExprError;
use std::fmt;

/// A single problem found while validating a node configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigIssue {
    /// The config field the issue applies to.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ConfigIssue {
    /// Creates a new config issue.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised by node implementations during execution.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeError {
    /// A required input field was absent from the execution context.
    MissingInput { field: String },
    /// A configured data path did not resolve.
    PathNotFound { path: String },
    /// The restricted expression evaluator rejected an expression.
    Expression(ExprError),
    /// A value had an unusable type for the requested operation.
    InvalidValue { reason: String },
    /// Anything else the node wants to report.
    Failed { reason: String },
}

impl NodeError {
    /// A short, stable name for the failure kind, preserved in
    /// execution records.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput { .. } => "missing_input",
            Self::PathNotFound { .. } => "path_not_found",
            Self::Expression(_) => "expression",
            Self::InvalidValue { .. } => "invalid_value",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput { field } => write!(f, "missing input field '{field}'"),
            Self::PathNotFound { path } => write!(f, "path '{path}' not found in input"),
            Self::Expression(e) => write!(f, "expression error: {e}"),
            Self::InvalidValue { reason } => write!(f, "invalid value: {reason}"),
            Self::Failed { reason } => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<ExprError> for NodeError {
    fn from(e: ExprError) -> Self {
        Self::Expression(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_issue_display() {
        let issue = ConfigIssue::new("formula", "is required");
        assert_eq!(issue.to_string(), "formula: is required");
    }

    #[test]
    fn node_error_kind_is_stable() {
        let err = NodeError::MissingInput {
            field: "price".to_string(),
        };
        assert_eq!(err.kind(), "missing_input");
        assert!(err.to_string().contains("price"));
    }
}
