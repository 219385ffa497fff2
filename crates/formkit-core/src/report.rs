//! Document check report
//!
//! Consistency, visibility and validation results for one document and
//! one answer set, as printed by `formkit check`.

use crate::session::validate_document;
use crate::view::project;
use formkit_rules::{Answers, FieldError, FieldValidator};
use formkit_schema::NodeId;
use formkit_store::FormDocument;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Result of checking a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    /// Root id
    pub root: Option<NodeId>,
    /// Number of indexed nodes
    pub nodes: usize,
    /// Consistency violation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inconsistency: Option<String>,
    /// Nodes not shown for the answers
    pub hidden: Vec<NodeId>,
    /// Validation errors by node
    pub errors: IndexMap<NodeId, Vec<FieldError>>,
}

impl CheckReport {
    /// Check `document` against `answers`
    #[must_use]
    pub fn build(document: &FormDocument, validator: &FieldValidator, answers: &Answers) -> Self {
        let hidden = project(document, answers)
            .map(|view| {
                view.flatten()
                    .into_iter()
                    .filter(|node| !node.is_visible())
                    .map(|node| node.id().clone())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            root: document.root_id().cloned(),
            nodes: document.len(),
            inconsistency: document.check_consistency().err().map(|e| e.to_string()),
            hidden,
            errors: validate_document(document, validator, answers),
        }
    }

    /// No inconsistency and no validation error
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.inconsistency.is_none() && self.errors.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => writeln!(f, "Form {root}: {} nodes", self.nodes)?,
            None => writeln!(f, "No document")?,
        }
        match &self.inconsistency {
            Some(reason) => writeln!(f, "  Consistency: FAILED ({reason})")?,
            None => writeln!(f, "  Consistency: ok")?,
        }
        writeln!(f, "  Hidden nodes: {}", self.hidden.len())?;
        if self.errors.is_empty() {
            writeln!(f, "  Validation: ok")?;
        } else {
            writeln!(f, "  Validation: {} field(s) with errors", self.errors.len())?;
            for (id, errors) in &self.errors {
                for error in errors {
                    writeln!(f, "    {id}: {error}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_schema::{SchemaNode, Widget};
    use serde_json::json;

    fn document() -> FormDocument {
        let mut age = SchemaNode::widget(Widget::Number).with_id("age").required();
        age.data.constraints.minimum = Some(18.0);
        FormDocument::from_tree(
            SchemaNode::widget(Widget::Root)
                .with_id("root")
                .with_child("s1", SchemaNode::widget(Widget::Section).with_id("s1").with_child("age", age)),
        )
    }

    #[test]
    fn reports_validation_errors() {
        let mut answers = Answers::new();
        answers.insert("age".into(), json!(12));
        let report = CheckReport::build(&document(), &FieldValidator::new(), &answers);

        assert!(!report.passed());
        assert!(report.inconsistency.is_none());
        assert_eq!(report.errors[&NodeId::new("age")][0].message, "Minimum value is 18");
        assert!(report.to_string().contains("age: Minimum value is 18"));
    }

    #[test]
    fn passes_with_valid_answers() {
        let mut answers = Answers::new();
        answers.insert("age".into(), json!(30));
        let report = CheckReport::build(&document(), &FieldValidator::new(), &answers);
        assert!(report.passed());
        assert_eq!(report.nodes, 3);
        assert!(report.hidden.is_empty());
    }
}
