//! Read-only presentation view
//!
//! Projects a document into the shape a renderer walks: one variant per
//! widget class, each node already resolved for visibility against the
//! current answers. A node is visible only if its ancestors are, it is not
//! `x-hidden`, and its own `x-show-if` rule holds.

use formkit_rules::{is_visible, Answers};
use formkit_schema::{Constraints, NodeId, NodeRecord, ValueType, Widget, WidgetClass};
use formkit_store::FormDocument;
use serde::Serialize;
use serde_json::Value;

/// Fields shared by every view node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewCommon {
    /// Node id
    pub id: NodeId,
    /// Widget kind
    pub widget: Widget,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared constraints
    #[serde(skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    /// Shown for the current answers
    pub visible: bool,
}

/// Root or section with its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    /// Shared fields
    #[serde(flatten)]
    pub common: ViewCommon,
    /// Child views in display order
    pub children: Vec<ViewNode>,
}

/// Input question; children are sub-questions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    /// Shared fields
    #[serde(flatten)]
    pub common: ViewCommon,
    /// Answer type
    pub value_type: ValueType,
    /// An answer must be given
    pub required: bool,
    /// Shown but not editable
    pub disabled: bool,
    /// Enumerated choices; item choices for checkboxes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
    /// Input placeholder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Help text under the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Sub-question views
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewNode>,
}

/// Static content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayView {
    /// Shared fields
    #[serde(flatten)]
    pub common: ViewCommon,
}

/// One node of the presentation view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewNode {
    /// Container widget
    Section(SectionView),
    /// Input widget
    Question(QuestionView),
    /// Display widget
    Display(DisplayView),
}

impl ViewNode {
    /// Shared fields
    #[must_use]
    pub fn common(&self) -> &ViewCommon {
        match self {
            Self::Section(section) => &section.common,
            Self::Question(question) => &question.common,
            Self::Display(display) => &display.common,
        }
    }

    /// Node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.common().id
    }

    /// Resolved visibility
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.common().visible
    }

    /// Child views in display order
    #[must_use]
    pub fn children(&self) -> &[ViewNode] {
        match self {
            Self::Section(section) => &section.children,
            Self::Question(question) => &question.children,
            Self::Display(_) => &[],
        }
    }

    /// This node and every descendant, pre-order
    #[must_use]
    pub fn flatten(&self) -> Vec<&ViewNode> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.flatten());
        }
        out
    }

    /// Ids of visible nodes, pre-order
    #[must_use]
    pub fn visible_ids(&self) -> Vec<&NodeId> {
        self.flatten()
            .into_iter()
            .filter(|node| node.is_visible())
            .map(ViewNode::id)
            .collect()
    }
}

/// Project the whole document; `None` without a root
#[must_use]
pub fn project(document: &FormDocument, answers: &Answers) -> Option<ViewNode> {
    let root = document.root()?;
    Some(project_node(document, root, answers, true))
}

fn project_node(
    document: &FormDocument,
    record: &NodeRecord,
    answers: &Answers,
    parent_visible: bool,
) -> ViewNode {
    let data = &record.data;
    let visible = parent_visible && !data.hidden && is_visible(data, answers);
    let common = ViewCommon {
        id: data.id.clone().unwrap_or_else(|| NodeId::new("")),
        widget: data.widget.clone(),
        title: data.title.clone(),
        description: data.description.clone(),
        constraints: data.constraints.clone(),
        visible,
    };
    let children = || {
        record
            .child_ids()
            .filter_map(|id| document.get(id))
            .map(|child| project_node(document, child, answers, visible))
            .collect()
    };

    match data.widget.class() {
        WidgetClass::Container => ViewNode::Section(SectionView {
            common,
            children: children(),
        }),
        WidgetClass::Display => ViewNode::Display(DisplayView { common }),
        WidgetClass::Input => ViewNode::Question(QuestionView {
            common,
            value_type: data.effective_value_type(),
            required: data.required,
            disabled: data.disabled,
            options: data.options().map(<[Value]>::to_vec).unwrap_or_default(),
            placeholder: data.placeholder.clone(),
            help_text: data.help_text.clone(),
            children: children(),
        }),
    }
}
