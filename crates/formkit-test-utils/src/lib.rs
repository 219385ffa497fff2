//! Testing utilities for the formkit workspace
//!
//! Shared fixtures: the default template with deterministic ids, a survey
//! exercising visibility rules and constraints, and answer maps for it.

#![allow(missing_docs)]

use formkit_rules::Answers;
use formkit_schema::{
    Condition, ConditionOperator, LogicMode, NodeFactory, SchemaNode, SequentialIds,
    VisibilityRule, Widget,
};
use formkit_store::FormDocument;
use serde_json::{json, Value};
use std::sync::Arc;

/// Factory minting `prefix-1`, `prefix-2`, ...
pub fn sequential_factory(prefix: &str) -> NodeFactory {
    NodeFactory::with_id_source(Arc::new(SequentialIds::new(prefix)))
}

/// Document holding the default template, ids `n-1`, `n-2`, ...
pub fn template_document() -> FormDocument {
    let factory = sequential_factory("n");
    let template = factory.form_template(None);
    let mut doc = FormDocument::new().with_factory(factory);
    doc.replace_document(Some(template));
    doc
}

fn when(field: &str, operator: ConditionOperator, value: Value) -> VisibilityRule {
    VisibilityRule::new(LogicMode::All).with_condition(Condition::new(field, operator, value))
}

fn question(id: &str, widget: Widget, title: &str) -> SchemaNode {
    SchemaNode::widget(widget).with_id(id).with_title(title)
}

/// Survey with stable ids
///
/// - `about`: `age` (number, required, 0..=120), `country` (dropdown),
///   `has_pets` (yes-no), `pet_count` (shown when `has_pets` is true),
///   `email` (email format)
/// - `consent`: header `consent_title`, `agree` (checkbox, at least one,
///   shown when `age >= 18`)
pub fn survey_tree() -> SchemaNode {
    let mut age = question("age", Widget::Number, "Age").required();
    age.data.constraints.minimum = Some(0.0);
    age.data.constraints.maximum = Some(120.0);

    let mut country = question("country", Widget::Dropdown, "Country");
    country.data.set_options(vec![json!("US"), json!("CA"), json!("MX")]);

    let mut pet_count = question("pet_count", Widget::Number, "How many pets?").required();
    pet_count.data.visibility = Some(when("has_pets", ConditionOperator::Equals, json!(true)));

    let mut email = question("email", Widget::Email, "E-mail");
    email.data.constraints.format = Some("email".into());

    let mut agree = question("agree", Widget::Checkbox, "I agree to");
    agree.data.set_options(vec![json!("terms"), json!("privacy")]);
    agree.data.constraints.min_items = Some(1);
    agree.data.required = true;
    agree.data.visibility = Some(when(
        "age",
        ConditionOperator::GreaterThanOrEqual,
        json!(18),
    ));

    SchemaNode::widget(Widget::Root)
        .with_id("survey")
        .with_title("Household survey")
        .with_child(
            "about",
            SchemaNode::widget(Widget::Section)
                .with_id("about")
                .with_title("About you")
                .with_child("age", age)
                .with_child("country", country)
                .with_child("has_pets", question("has_pets", Widget::YesNo, "Any pets?"))
                .with_child("pet_count", pet_count)
                .with_child("email", email),
        )
        .with_child(
            "consent",
            SchemaNode::widget(Widget::Section)
                .with_id("consent")
                .with_title("Consent")
                .with_child(
                    "consent_title",
                    question("consent_title", Widget::Header, "Please read carefully"),
                )
                .with_child("agree", agree),
        )
}

/// Document holding [`survey_tree`]
pub fn survey_document() -> FormDocument {
    let mut doc = FormDocument::new().with_factory(sequential_factory("s"));
    doc.replace_document(Some(survey_tree()));
    doc
}

/// Answer map from a JSON object literal; other values give an empty map
pub fn answers(value: Value) -> Answers {
    match value {
        Value::Object(map) => map,
        _ => Answers::new(),
    }
}

/// Complete valid answers for an adult with pets
pub fn adult_answers() -> Answers {
    answers(json!({
        "age": 34,
        "country": "CA",
        "has_pets": true,
        "pet_count": 2,
        "email": "sam@example.org",
        "agree": ["terms"],
    }))
}

/// Answers for a minor without pets; consent questions stay hidden
pub fn minor_answers() -> Answers {
    answers(json!({
        "age": 15,
        "has_pets": false,
    }))
}
