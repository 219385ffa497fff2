//! Node factory
//!
//! Provides [`NodeFactory`], which turns partial node descriptions into
//! fully identified nodes.
//!
//! # Contract
//! - bare boolean schemas are returned unchanged
//! - an existing `x-id` is never overwritten, so building an already-built
//!   node is a no-op
//! - every schema-bearing position is visited: `properties` children and
//!   all composition keywords
//! - never fails; shapes it does not understand are passed through

use crate::id::{IdSource, NodeId, UlidIds};
use crate::node::{NodeData, SchemaNode, SourceType, SubSchema};
use crate::widget::{ValueType, Widget};
use serde_json::Value;
use std::sync::Arc;

/// Default prefix for `$id` schema URIs
pub const DEFAULT_SCHEMA_URI_BASE: &str = "https://myapp.com/schemas/";

/// Builds schema nodes with stable unique identifiers
#[derive(Debug, Clone)]
pub struct NodeFactory {
    ids: Arc<dyn IdSource>,
    schema_uri_base: String,
}

impl NodeFactory {
    /// Create factory minting ULID ids
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_source(Arc::new(UlidIds))
    }

    /// Create factory with a custom id source
    #[inline]
    #[must_use]
    pub fn with_id_source(ids: Arc<dyn IdSource>) -> Self {
        Self {
            ids,
            schema_uri_base: DEFAULT_SCHEMA_URI_BASE.to_string(),
        }
    }

    /// With schema URI base
    #[inline]
    #[must_use]
    pub fn with_schema_uri_base(mut self, base: impl Into<String>) -> Self {
        self.schema_uri_base = base.into();
        self
    }

    /// Mint a fresh id
    #[inline]
    #[must_use]
    pub fn fresh_id(&self) -> NodeId {
        self.ids.next_id()
    }

    /// Schema URI for an id
    #[inline]
    #[must_use]
    pub fn schema_uri(&self, id: &NodeId) -> String {
        format!("{}{}", self.schema_uri_base, id)
    }

    /// Apply the factory to a schema position
    ///
    /// Booleans pass through; object schemas are built.
    #[must_use]
    pub fn create(&self, partial: SubSchema) -> SubSchema {
        match partial {
            SubSchema::Bool(flag) => SubSchema::Bool(flag),
            SubSchema::Node(node) => SubSchema::Node(Box::new(self.build(*node))),
        }
    }

    /// Build a node: assign missing ids through the whole subtree
    #[must_use]
    pub fn build(&self, mut node: SchemaNode) -> SchemaNode {
        self.assign(&mut node);
        node
    }

    fn assign(&self, node: &mut SchemaNode) {
        let id = node
            .data
            .id
            .get_or_insert_with(|| self.ids.next_id())
            .clone();
        if node.data.schema_uri.is_none() {
            node.data.schema_uri = Some(self.schema_uri(&id));
        }
        node.data
            .composition
            .for_each_schema_mut(|inner| self.assign(inner));
        for child in node.properties.values_mut() {
            self.assign(child);
        }
    }

    /// Give composition sub-schemas of `data` fresh ids
    ///
    /// Used when copying a node: the node's own id is left to the caller.
    pub fn reissue_nested_ids(&self, data: &mut NodeData) {
        data.composition.for_each_schema_mut(|inner| {
            inner.clear_ids();
            self.assign(inner);
        });
    }

    /// New section node
    #[must_use]
    pub fn section(&self, title: impl Into<String>) -> SchemaNode {
        self.build(SchemaNode::widget(Widget::Section).with_title(title))
    }

    /// New question node with the widget's default value type
    ///
    /// Collection widgets get an `items` schema ready for options.
    #[must_use]
    pub fn question(&self, widget: Widget, title: impl Into<String>) -> SchemaNode {
        let mut node = SchemaNode::widget(widget).with_title(title);
        if node.data.widget.is_collection() {
            node.data.set_options(Vec::new());
        }
        self.build(node)
    }

    /// Default document for a new form
    ///
    /// Keys of `overrides` replace template keys (shallow merge, so
    /// override `properties` replace the template sections).
    #[must_use]
    pub fn form_template(&self, overrides: Option<SchemaNode>) -> SchemaNode {
        let template = default_template();
        let Some(overrides) = overrides else {
            return self.build(template);
        };

        let merged = match (serde_json::to_value(&template), serde_json::to_value(&overrides)) {
            (Ok(Value::Object(mut base)), Ok(Value::Object(extra))) => {
                base.extend(extra);
                serde_json::from_value::<SchemaNode>(Value::Object(base))
            }
            _ => Ok(template.clone()),
        };

        match merged {
            Ok(node) => self.build(node),
            Err(e) => {
                tracing::warn!("form template overrides ignored: {}", e);
                self.build(template)
            }
        }
    }
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn default_template() -> SchemaNode {
    let mut root = SchemaNode::widget(Widget::Root).with_title("Observation Tool Title");
    root.data.source_type = Some(SourceType::Local);

    let mut sample = SchemaNode::widget(Widget::Header)
        .with_title("Sample Question 1")
        .with_description("This is a sample question in Section 1");
    sample.data.value_type = Some(ValueType::String);
    sample.data.placeholder = Some("Enter your answer here...".to_string());

    let first = SchemaNode::widget(Widget::Section)
        .with_title("Section 1")
        .with_description("Section 1 Description")
        .with_child("sampleQuestion1", sample);
    let second = SchemaNode::widget(Widget::Section)
        .with_title("Section 2")
        .with_description("Section 2 Description");

    root.with_child("section0", first).with_child("section1", second)
}
