use formkit_rules::{coerce::js_number, evaluate_condition, is_visible, Answers, FieldValidator};
use formkit_schema::{Condition, ConditionOperator, LogicMode, NodeData, VisibilityRule, Widget};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_answer() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(|n| json!(n)),
        "[a-z0-9 ]{0,6}".prop_map(Value::String),
        prop::collection::vec("[a-c]", 0..3).prop_map(|v| json!(v)),
    ]
}

proptest! {
    #[test]
    fn prop_none_is_negation_of_any(a in arb_answer(), b in arb_answer(), x in arb_answer()) {
        let conditions = [
            Condition::new("a", ConditionOperator::Equals, x.clone()),
            Condition::new("b", ConditionOperator::Contains, x),
        ];
        let mut answers = Answers::new();
        answers.insert("a".into(), a);
        answers.insert("b".into(), b);

        let node = |logic| {
            let mut node = NodeData::new(Widget::ShortText);
            node.visibility = Some(VisibilityRule {
                logic,
                conditions: conditions.to_vec(),
            });
            node
        };
        let any = is_visible(&node(LogicMode::Any), &answers);
        let none = is_visible(&node(LogicMode::None), &answers);
        let all = is_visible(&node(LogicMode::All), &answers);
        prop_assert_eq!(none, !any);
        prop_assert!(!all || any);
    }

    #[test]
    fn prop_negated_operators_disagree(actual in arb_answer(), expected in arb_answer()) {
        let mut answers = Answers::new();
        answers.insert("f".into(), actual);
        for (op, neg) in [
            (ConditionOperator::Equals, ConditionOperator::NotEquals),
            (ConditionOperator::Contains, ConditionOperator::NotContains),
            (ConditionOperator::IsEmpty, ConditionOperator::IsNotEmpty),
            (ConditionOperator::In, ConditionOperator::NotIn),
        ] {
            let yes = evaluate_condition(&Condition::new("f", op, expected.clone()), &answers);
            let no = evaluate_condition(&Condition::new("f", neg, expected.clone()), &answers);
            prop_assert_ne!(yes, no);
        }
    }

    #[test]
    fn prop_nan_never_compares(expected in -100i64..100) {
        let mut answers = Answers::new();
        answers.insert("f".into(), json!("not a number"));
        prop_assert!(js_number(answers.get("f")).is_nan());
        for op in [
            ConditionOperator::GreaterThan,
            ConditionOperator::LessThan,
            ConditionOperator::GreaterThanOrEqual,
            ConditionOperator::LessThanOrEqual,
        ] {
            let condition = Condition::new("f", op, json!(expected));
            prop_assert!(!evaluate_condition(&condition, &answers));
        }
    }

    #[test]
    fn prop_required_empty_yields_single_error(
        min_length in 1u64..10,
        pattern in prop::option::of(Just("^x+$".to_string())),
        empty in prop_oneof![Just(Value::Null), Just(json!("")), Just(json!([]))],
    ) {
        let mut node = NodeData::new(Widget::ShortText);
        node.required = true;
        node.constraints.min_length = Some(min_length);
        node.constraints.pattern = pattern;

        let errors = FieldValidator::new().validate(&node, Some(&empty), &Answers::new());
        prop_assert_eq!(errors.len(), 1);
        prop_assert_eq!(errors[0].keyword.as_str(), "required");
    }
}
