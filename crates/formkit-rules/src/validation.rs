//! Schema-driven answer validation
//!
//! Each input node is compiled into a small JSON Schema (value type plus
//! declared constraints) and run against the answer with the `jsonschema`
//! engine. Every failed keyword becomes one human-readable message.
//!
//! # Flow
//! 1. skip non-input widgets, `x-hidden` nodes and nodes whose visibility
//!    rule fails
//! 2. required and empty: one "required" error, nothing else
//! 3. empty and optional: no errors
//! 4. engine run; engine failures follow the [`ValidationPolicy`]

use crate::coerce::is_empty_answer;
use crate::visibility::{is_visible, Answers};
use formkit_schema::{NodeData, NodeId, WidgetClass};
use indexmap::IndexMap;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// What to report when the validation engine itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Log the failure and report no errors for the field
    #[default]
    FailOpen,
    /// Log the failure and report one error for the field
    FailClosed,
}

/// One failed check on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Failed keyword (`required`, `minLength`, ...)
    pub keyword: String,
    /// Message for the person filling in the form
    pub message: String,
}

impl FieldError {
    /// Create field error
    #[inline]
    #[must_use]
    pub fn new(keyword: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure of the validation engine (not of the answer)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Field schema did not compile (bad regex, bad constraint value, ...)
    #[error("cannot compile field schema: {0}")]
    Compile(String),
}

/// Message reported under [`ValidationPolicy::FailClosed`]
pub const ENGINE_FAILURE_MESSAGE: &str = "Could not validate this field";

/// Validates answers against node constraints
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldValidator {
    policy: ValidationPolicy,
}

impl FieldValidator {
    /// Create validator with the fail-open policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With engine failure policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Engine failure policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Validate one answer; `None` is a missing answer
    #[must_use]
    pub fn validate(&self, node: &NodeData, value: Option<&Value>, answers: &Answers) -> Vec<FieldError> {
        if node.widget.class() != WidgetClass::Input || node.hidden || !is_visible(node, answers) {
            return Vec::new();
        }

        if is_empty_answer(value) {
            return if node.required {
                vec![FieldError::new("required", "This field is required")]
            } else {
                Vec::new()
            };
        }
        let Some(value) = value else {
            return Vec::new();
        };

        match check_constraints(node, value) {
            Ok(errors) => errors,
            Err(e) => {
                tracing::warn!(node = ?node.id, error = %e, "field validation engine failed");
                match self.policy {
                    ValidationPolicy::FailOpen => Vec::new(),
                    ValidationPolicy::FailClosed => vec![FieldError::new("engine", ENGINE_FAILURE_MESSAGE)],
                }
            }
        }
    }

    /// Validate every node against the answer stored under its id
    ///
    /// Returns only nodes with at least one error, in input order.
    #[must_use]
    pub fn validate_answers<'a>(
        &self,
        nodes: impl IntoIterator<Item = &'a NodeData>,
        answers: &Answers,
    ) -> IndexMap<NodeId, Vec<FieldError>> {
        nodes
            .into_iter()
            .filter_map(|node| {
                let id = node.id.as_ref()?;
                let errors = self.validate(node, answers.get(id.as_str()), answers);
                (!errors.is_empty()).then(|| (id.clone(), errors))
            })
            .collect()
    }
}

/// JSON Schema for one node's answer
///
/// Value type plus declared constraints. Options go to `items` for
/// collection widgets and to `enum` otherwise.
#[must_use]
pub fn build_schema(node: &NodeData) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), json!(node.effective_value_type().as_str()));

    if let Ok(Value::Object(constraints)) = serde_json::to_value(&node.constraints) {
        schema.extend(constraints);
    }

    match node.options() {
        Some(options) if node.widget.is_collection() => {
            schema.insert("items".into(), json!({"type": "string", "enum": options}));
        }
        Some(options) => {
            schema.insert("enum".into(), Value::Array(options.to_vec()));
        }
        None => {}
    }

    Value::Object(schema)
}

/// Run the engine and translate failures, one message per keyword
///
/// # Errors
/// [`EngineError::Compile`] if the node's schema is not valid.
pub fn check_constraints(node: &NodeData, value: &Value) -> Result<Vec<FieldError>, EngineError> {
    let schema = build_schema(node);
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .map_err(|e| EngineError::Compile(e.to_string()))?;

    let mut errors: Vec<FieldError> = Vec::new();
    if let Err(failures) = compiled.validate(value) {
        for failure in failures {
            let error = describe(&failure.kind, node);
            if !errors.iter().any(|seen| seen.keyword == error.keyword) {
                errors.push(error);
            }
        }
    }
    Ok(errors)
}

fn describe(kind: &ValidationErrorKind, node: &NodeData) -> FieldError {
    let c = &node.constraints;
    let number = |limit: Option<f64>| limit.map(|n| n.to_string()).unwrap_or_default();
    let count = |limit: Option<u64>| limit.map(|n| n.to_string()).unwrap_or_default();

    match kind {
        ValidationErrorKind::MinLength { .. } => FieldError::new(
            "minLength",
            format!("Minimum length is {} characters", count(c.min_length)),
        ),
        ValidationErrorKind::MaxLength { .. } => FieldError::new(
            "maxLength",
            format!("Maximum length is {} characters", count(c.max_length)),
        ),
        ValidationErrorKind::Minimum { .. } => {
            FieldError::new("minimum", format!("Minimum value is {}", number(c.minimum)))
        }
        ValidationErrorKind::Maximum { .. } => {
            FieldError::new("maximum", format!("Maximum value is {}", number(c.maximum)))
        }
        ValidationErrorKind::ExclusiveMinimum { .. } => FieldError::new(
            "exclusiveMinimum",
            format!("Value must be greater than {}", number(c.exclusive_minimum)),
        ),
        ValidationErrorKind::ExclusiveMaximum { .. } => FieldError::new(
            "exclusiveMaximum",
            format!("Value must be less than {}", number(c.exclusive_maximum)),
        ),
        ValidationErrorKind::MultipleOf { .. } => FieldError::new(
            "multipleOf",
            format!("Value must be a multiple of {}", number(c.multiple_of)),
        ),
        ValidationErrorKind::Pattern { .. } => FieldError::new(
            "pattern",
            node.pattern_error
                .clone()
                .unwrap_or_else(|| "Invalid format".to_string()),
        ),
        ValidationErrorKind::Format { .. } => {
            let message = match c.format.as_deref().unwrap_or_default() {
                "email" => "Invalid email address".to_string(),
                "uri" => "Invalid URL".to_string(),
                "date" => "Invalid date format".to_string(),
                other => format!("Invalid {other} format"),
            };
            FieldError::new("format", message)
        }
        ValidationErrorKind::Enum { .. } => FieldError::new("enum", "Please select a valid option"),
        ValidationErrorKind::MinItems { .. } => FieldError::new(
            "minItems",
            format!("Select at least {}", items(c.min_items)),
        ),
        ValidationErrorKind::MaxItems { .. } => FieldError::new(
            "maxItems",
            format!("Select at most {}", items(c.max_items)),
        ),
        ValidationErrorKind::Type { .. } => FieldError::new(
            "type",
            format!("Expected {}", node.effective_value_type()),
        ),
        _ => FieldError::new("invalid", "Invalid value"),
    }
}

fn items(limit: Option<u64>) -> String {
    match limit {
        Some(1) => "1 item".to_string(),
        Some(n) => format!("{n} items"),
        None => "items".to_string(),
    }
}
