//! Formkit Rules
//!
//! Pure functions evaluated at render and submit time: conditional
//! visibility and schema-driven validation of answers. Neither ever
//! mutates a document.
//!
//! # Example
//!
//! ```rust
//! use formkit_rules::{is_visible, Answers, FieldValidator};
//! use formkit_schema::{Condition, ConditionOperator, LogicMode, NodeData, VisibilityRule, Widget};
//! use serde_json::json;
//!
//! let mut node = NodeData::new(Widget::ShortText);
//! node.required = true;
//! node.visibility = Some(
//!     VisibilityRule::new(LogicMode::All)
//!         .with_condition(Condition::new("age", ConditionOperator::GreaterThan, json!(18))),
//! );
//!
//! let mut answers = Answers::new();
//! answers.insert("age".into(), json!("21"));
//! assert!(is_visible(&node, &answers));
//!
//! let errors = FieldValidator::new().validate(&node, None, &answers);
//! assert_eq!(errors[0].message, "This field is required");
//! ```

#![warn(unreachable_pub)]

pub mod coerce;
pub mod validation;
pub mod visibility;

// Re-exports
pub use validation::{
    build_schema, check_constraints, EngineError, FieldError, FieldValidator, ValidationPolicy,
    ENGINE_FAILURE_MESSAGE,
};
pub use visibility::{evaluate_condition, is_visible, rule_holds, Answers};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
