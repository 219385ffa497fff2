//! Visibility rule data types (`x-show-if`)
//!
//! Only the shape lives here; evaluation is in `formkit-rules`.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How condition results combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicMode {
    /// Every condition holds (AND)
    #[default]
    All,
    /// At least one condition holds (OR)
    Any,
    /// No condition holds (NOR)
    None,
}

/// Comparison applied by one condition
///
/// Unknown operator names survive a load/save round trip through
/// [`ConditionOperator::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    /// Answer equals value
    Equals,
    /// Answer differs from value
    NotEquals,
    /// Array answer has value as member; text answer has value as substring
    Contains,
    /// Negation of `Contains`
    NotContains,
    /// Answer missing, null, empty text or empty array
    IsEmpty,
    /// Negation of `IsEmpty`
    IsNotEmpty,
    /// Numeric `>`
    GreaterThan,
    /// Numeric `<`
    LessThan,
    /// Numeric `>=`
    GreaterThanOrEqual,
    /// Numeric `<=`
    LessThanOrEqual,
    /// Answer is one of the values in an array value
    In,
    /// Answer is none of the values in an array value
    NotIn,
    /// Operator not known to this crate
    Other(String),
}

impl ConditionOperator {
    /// Name as written in documents
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ConditionOperator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "greater_than_or_equal" => Self::GreaterThanOrEqual,
            "less_than_or_equal" => Self::LessThanOrEqual,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            _ => Self::Other(name),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(operator: ConditionOperator) -> Self {
        match operator {
            ConditionOperator::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// One `{field, operator, value}` check against the answer set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Id of the node whose answer is inspected
    pub field: NodeId,
    /// Comparison
    pub operator: ConditionOperator,
    /// Comparison operand (ignored by emptiness checks)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl Condition {
    /// Create condition
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<NodeId>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Show/hide rule attached to a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisibilityRule {
    /// Combination mode
    #[serde(default)]
    pub logic: LogicMode,
    /// Conditions; an empty list means always visible
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl VisibilityRule {
    /// Create rule with logic mode and no conditions
    #[inline]
    #[must_use]
    pub fn new(logic: LogicMode) -> Self {
        Self {
            logic,
            conditions: Vec::new(),
        }
    }

    /// Add condition
    #[inline]
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether the rule constrains anything
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rule_deserializes_from_document_shape() {
        let rule: VisibilityRule = serde_json::from_value(json!({
            "logic": "any",
            "conditions": [
                {"field": "age", "operator": "greater_than", "value": 18},
                {"field": "notes", "operator": "is_empty"}
            ]
        }))
        .unwrap();

        assert_eq!(rule.logic, LogicMode::Any);
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.conditions[1].operator, ConditionOperator::IsEmpty);
        assert!(rule.conditions[1].value.is_null());
    }

    #[test]
    fn unknown_operator_round_trips() {
        let condition: Condition = serde_json::from_value(json!({
            "field": "age", "operator": "minimum", "value": 3
        }))
        .unwrap();
        assert_eq!(condition.operator, ConditionOperator::Other("minimum".into()));
        let back = serde_json::to_value(&condition).unwrap();
        assert_eq!(back["operator"], json!("minimum"));
    }

    #[test]
    fn logic_defaults_to_all() {
        let rule: VisibilityRule = serde_json::from_value(json!({"conditions": []})).unwrap();
        assert_eq!(rule.logic, LogicMode::All);
        assert!(rule.is_empty());
    }
}
