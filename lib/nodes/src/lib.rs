//! Node contract, registry, and built-in node kinds for switchyard.
//!
//! This crate provides:
//!
//! - **Node Contract**: the capability every node type implements
//!   (config validation, schema description, execution)
//! - **Registry**: the process-wide catalogue mapping type name to
//!   constructor, populated explicitly at startup
//! - **Expression Evaluator**: a restricted lexer/parser/tree-walk
//!   interpreter with a fixed function allow-list
//! - **Conditions**: the shared condition machinery used by the
//!   conditional and wait nodes
//! - **Built-in Nodes**: triggers, field transform, calculator,
//!   conditional, loop, wait, and log output

pub mod builtin;
pub mod condition;
pub mod contract;
pub mod error;
pub mod expr;
pub mod registry;
pub mod schema;
pub mod value;

pub use condition::{Combinator, ConditionOutcome, ConditionSpec};
pub use contract::{NodeBehavior, NodeCategory, NodeConstructor, NodeDefinition};
pub use error::{ConfigIssue, NodeError};
pub use registry::NodeRegistry;
pub use schema::{ConfigSchema, FieldKind, FieldSpec};
