//! Conditional visibility
//!
//! Evaluates a node's `x-show-if` rule against the current answers. Pure:
//! callers re-evaluate on every answer change.

use crate::coerce::{is_empty_answer, is_falsy, js_number, js_string, values_eq};
use formkit_schema::{Condition, ConditionOperator, LogicMode, NodeData, VisibilityRule};
use serde_json::{Map, Value};

/// Answers keyed by node id
pub type Answers = Map<String, Value>;

/// Whether `node` is shown for `answers`
///
/// A node without a rule, or with an empty condition list, is visible.
/// The `x-hidden` flag is not consulted here.
#[must_use]
pub fn is_visible(node: &NodeData, answers: &Answers) -> bool {
    node.visibility
        .as_ref()
        .map_or(true, |rule| rule_holds(rule, answers))
}

/// Combine condition results per the rule's logic mode
#[must_use]
pub fn rule_holds(rule: &VisibilityRule, answers: &Answers) -> bool {
    if rule.is_empty() {
        return true;
    }
    let mut results = rule
        .conditions
        .iter()
        .map(|condition| evaluate_condition(condition, answers));
    match rule.logic {
        LogicMode::All => results.all(|held| held),
        LogicMode::Any => results.any(|held| held),
        LogicMode::None => !results.any(|held| held),
    }
}

/// Evaluate one condition against the answer for its field
#[must_use]
pub fn evaluate_condition(condition: &Condition, answers: &Answers) -> bool {
    let actual = answers.get(condition.field.as_str());
    let expected = &condition.value;

    match &condition.operator {
        ConditionOperator::Equals => equals(actual, expected),
        ConditionOperator::NotEquals => !equals(actual, expected),
        ConditionOperator::Contains => contains(actual, expected),
        ConditionOperator::NotContains => !contains(actual, expected),
        ConditionOperator::IsEmpty => is_empty_answer(actual),
        ConditionOperator::IsNotEmpty => !is_empty_answer(actual),
        ConditionOperator::GreaterThan => js_number(actual) > js_number(Some(expected)),
        ConditionOperator::LessThan => js_number(actual) < js_number(Some(expected)),
        ConditionOperator::GreaterThanOrEqual => js_number(actual) >= js_number(Some(expected)),
        ConditionOperator::LessThanOrEqual => js_number(actual) <= js_number(Some(expected)),
        ConditionOperator::In => one_of(actual, expected),
        ConditionOperator::NotIn => !one_of(actual, expected),
        ConditionOperator::Other(name) => {
            tracing::debug!(operator = %name, field = %condition.field, "unknown operator treated as satisfied");
            true
        }
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    actual.map_or(expected.is_null(), |value| values_eq(value, expected))
}

/// Array answers: membership. Anything else: substring of the text form.
fn contains(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) => items.iter().any(|item| values_eq(item, expected)),
        Some(value) if !is_falsy(value) => js_string(value).contains(&js_string(expected)),
        _ => js_string(expected).is_empty(),
    }
}

fn one_of(actual: Option<&Value>, expected: &Value) -> bool {
    let Value::Array(allowed) = expected else {
        return equals(actual, expected);
    };
    let listed = |value: &Value| allowed.iter().any(|option| values_eq(value, option));
    match actual {
        Some(Value::Array(items)) => items.iter().any(listed),
        Some(value) => listed(value),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_schema::Widget;
    use serde_json::json;

    fn answers(value: Value) -> Answers {
        match value {
            Value::Object(map) => map,
            _ => Answers::new(),
        }
    }

    fn check(operator: ConditionOperator, expected: Value, actual: Value) -> bool {
        let condition = Condition::new("f", operator, expected);
        evaluate_condition(&condition, &answers(json!({ "f": actual })))
    }

    fn node_with(rule: VisibilityRule) -> NodeData {
        let mut node = NodeData::new(Widget::ShortText);
        node.visibility = Some(rule);
        node
    }

    #[test]
    fn no_rule_is_visible() {
        let node = NodeData::new(Widget::ShortText);
        assert!(is_visible(&node, &Answers::new()));
        assert!(is_visible(&node_with(VisibilityRule::new(LogicMode::None)), &Answers::new()));
    }

    #[test]
    fn logic_truth_table() {
        let age = Condition::new("age", ConditionOperator::Equals, json!(30));
        let country = Condition::new("country", ConditionOperator::Equals, json!("US"));
        let cases = [
            (json!({"age": 30, "country": "US"}), [true, true, false]),
            (json!({"age": 30, "country": "CA"}), [false, true, false]),
            (json!({"age": 31, "country": "US"}), [false, true, false]),
            (json!({"age": 31, "country": "CA"}), [false, false, true]),
        ];

        for (values, [all, any, none]) in cases {
            let values = answers(values);
            for (logic, expected) in [
                (LogicMode::All, all),
                (LogicMode::Any, any),
                (LogicMode::None, none),
            ] {
                let rule = VisibilityRule::new(logic)
                    .with_condition(age.clone())
                    .with_condition(country.clone());
                assert_eq!(
                    is_visible(&node_with(rule), &values),
                    expected,
                    "{logic:?} with {values:?}"
                );
            }
        }
    }

    #[test]
    fn equality_is_numeric_for_numbers() {
        assert!(check(ConditionOperator::Equals, json!(30), json!(30.0)));
        assert!(!check(ConditionOperator::Equals, json!(30), json!("30")));
        assert!(check(ConditionOperator::NotEquals, json!("a"), json!("b")));
    }

    #[test]
    fn contains_uses_membership_or_substring() {
        assert!(check(ConditionOperator::Contains, json!("b"), json!(["a", "b"])));
        assert!(!check(ConditionOperator::Contains, json!("c"), json!(["a", "b"])));
        assert!(check(ConditionOperator::Contains, json!("ell"), json!("hello")));
        assert!(check(ConditionOperator::Contains, json!(4), json!(42)));
        assert!(check(ConditionOperator::NotContains, json!("z"), json!("hello")));
        assert!(!check(ConditionOperator::Contains, json!("x"), json!(null)));
    }

    #[test]
    fn emptiness_operators() {
        let empty = Condition::new("f", ConditionOperator::IsEmpty, Value::Null);
        assert!(evaluate_condition(&empty, &Answers::new()));
        assert!(check(ConditionOperator::IsEmpty, Value::Null, json!([])));
        assert!(check(ConditionOperator::IsEmpty, Value::Null, json!("")));
        assert!(check(ConditionOperator::IsNotEmpty, Value::Null, json!(["x"])));
        assert!(check(ConditionOperator::IsNotEmpty, Value::Null, json!(0)));
    }

    #[test]
    fn numeric_comparisons_coerce() {
        assert!(check(ConditionOperator::GreaterThan, json!(18), json!("21")));
        assert!(check(ConditionOperator::LessThan, json!("10"), json!(9)));
        assert!(check(ConditionOperator::GreaterThanOrEqual, json!(0), json!(null)));
        assert!(check(ConditionOperator::LessThanOrEqual, json!(1), json!(true)));
        assert!(!check(ConditionOperator::GreaterThan, json!(1), json!("abc")));
        assert!(!check(ConditionOperator::LessThanOrEqual, json!(1), json!("abc")));

        let missing = Condition::new("f", ConditionOperator::LessThan, json!(5));
        assert!(!evaluate_condition(&missing, &Answers::new()));
    }

    #[test]
    fn membership_operators() {
        assert!(check(ConditionOperator::In, json!(["a", "b"]), json!("a")));
        assert!(check(ConditionOperator::In, json!([1, 2]), json!(2.0)));
        assert!(check(ConditionOperator::In, json!(["a", "b"]), json!(["z", "b"])));
        assert!(check(ConditionOperator::NotIn, json!(["a", "b"]), json!("c")));
        assert!(check(ConditionOperator::In, json!("a"), json!("a")));
    }

    #[test]
    fn unknown_operator_holds() {
        assert!(check(ConditionOperator::Other("pattern".into()), json!("x"), json!(1)));
    }
}
