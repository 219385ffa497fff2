//! Schema node model
//!
//! A form element is an extended JSON Schema object. The model has three
//! layers:
//!
//! - [`NodeData`]: every attribute of one node except its `properties`
//!   children (id, widget, text, flags, constraints, visibility rule,
//!   styles, composition keywords, unknown extensions)
//! - [`SchemaNode`]: the nested document form, `NodeData` plus ordered
//!   `properties` children
//! - [`NodeRecord`]: the flat form held by the entity table and persisted
//!   as a record list, `NodeData` plus an in-memory child-id list that is
//!   never serialized

use crate::id::NodeId;
use crate::rule::VisibilityRule;
use crate::widget::{ValueType, Widget};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON keys owned by the mutation engine that cannot be set as properties
///
/// `x-priority` mirrors the child order and is renumbered on every move.
pub const STRUCTURAL_KEYS: &[&str] = &["x-id", "$id", "x-parent-id", "x-priority", "properties"];

fn is_false(value: &bool) -> bool {
    !*value
}

/// A schema position that holds either a sub-schema or a bare boolean
///
/// Composition keywords use `true`/`false` to mean "any schema"/"no
/// schema"; those pass through the factory untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubSchema {
    /// Boolean schema
    Bool(bool),
    /// Object schema
    Node(Box<SchemaNode>),
}

impl SubSchema {
    /// Borrow node if this is an object schema
    #[inline]
    #[must_use]
    pub fn as_node(&self) -> Option<&SchemaNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Bool(_) => None,
        }
    }
}

impl From<SchemaNode> for SubSchema {
    fn from(node: SchemaNode) -> Self {
        Self::Node(Box::new(node))
    }
}

/// Validation constraints appropriate to the node's value type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    /// Minimum text length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Maximum text length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Inclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Exclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    /// Exclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    /// Numeric step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    /// Regular expression the text must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Named format (`date`, `email`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Minimum collection size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    /// Maximum collection size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    /// Collection members must be distinct
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
}

impl Constraints {
    /// Whether no constraint is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Cosmetic style overlays (opaque to the core)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOverlay {
    /// Whole-field style
    #[serde(rename = "x-style", skip_serializing_if = "Option::is_none")]
    pub field: Option<Value>,
    /// Label style
    #[serde(rename = "x-label-style", skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
    /// Input style
    #[serde(rename = "x-input-style", skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

/// Where a node came from (`x-source-type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Authored in this document
    Local,
    /// Imported from another document
    External,
    /// Reference to a shared node
    Reference,
    /// Copy of another node
    Duplicated,
}

/// Schema-bearing composition keywords
///
/// Sub-schemas here receive ids from the factory but are not tree
/// children: the flat index only follows `properties`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct Composition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_items: Option<Vec<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unevaluated_items: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<IndexMap<String, SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unevaluated_properties: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_schemas: Option<IndexMap<String, SubSchema>>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub then: Option<Box<SubSchema>>,
    #[serde(rename = "else", skip_serializing_if = "Option::is_none")]
    pub else_: Option<Box<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SubSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SubSchema>>,
}

impl Composition {
    /// Visit every object sub-schema; boolean schemas are skipped
    pub fn for_each_schema_mut(&mut self, mut f: impl FnMut(&mut SchemaNode)) {
        let mut visit = |schema: &mut SubSchema| {
            if let SubSchema::Node(node) = schema {
                f(node);
            }
        };

        for slot in [
            &mut self.items,
            &mut self.contains,
            &mut self.unevaluated_items,
            &mut self.additional_properties,
            &mut self.unevaluated_properties,
            &mut self.property_names,
            &mut self.if_,
            &mut self.then,
            &mut self.else_,
            &mut self.not,
        ] {
            if let Some(schema) = slot.as_deref_mut() {
                visit(schema);
            }
        }
        for list in [
            &mut self.prefix_items,
            &mut self.all_of,
            &mut self.any_of,
            &mut self.one_of,
        ] {
            if let Some(schemas) = list {
                schemas.iter_mut().for_each(&mut visit);
            }
        }
        for map in [&mut self.pattern_properties, &mut self.dependent_schemas] {
            if let Some(schemas) = map {
                schemas.values_mut().for_each(&mut visit);
            }
        }
    }
}

/// Attributes of one node, excluding its `properties` children
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeData {
    /// Stable identifier
    #[serde(rename = "x-id", skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Schema URI derived from the id
    #[serde(rename = "$id", skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    /// Weak back-reference to the containing node
    #[serde(rename = "x-parent-id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    /// Widget kind
    #[serde(rename = "x-widget")]
    pub widget: Widget,
    /// Declared value type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Answer must be present
    #[serde(rename = "x-required", skip_serializing_if = "is_false")]
    pub required: bool,
    /// Never shown
    #[serde(rename = "x-hidden", skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Shown but not editable
    #[serde(rename = "x-disabled", skip_serializing_if = "is_false")]
    pub disabled: bool,
    /// Read-only annotation
    #[serde(rename = "readOnly", skip_serializing_if = "is_false")]
    pub read_only: bool,
    /// Deprecated annotation
    #[serde(skip_serializing_if = "is_false")]
    pub deprecated: bool,
    /// Enumerated choices for scalar choice widgets
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    /// Validation constraints
    #[serde(flatten)]
    pub constraints: Constraints,
    /// Initial answer
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Single allowed answer
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    /// Conditional visibility
    #[serde(rename = "x-show-if", alias = "x-visibility", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityRule>,
    /// Style overlays
    #[serde(flatten)]
    pub style: StyleOverlay,
    /// Input placeholder
    #[serde(rename = "x-placeholder", skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Help text under the field
    #[serde(rename = "x-help-text", skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Message shown when `pattern` fails
    #[serde(rename = "x-pattern-error", skip_serializing_if = "Option::is_none")]
    pub pattern_error: Option<String>,
    /// Grid column span
    #[serde(rename = "x-col-span", skip_serializing_if = "Option::is_none")]
    pub col_span: Option<u32>,
    /// Origin of the node
    #[serde(rename = "x-source-type", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    /// Id of the node this one was derived from
    #[serde(rename = "x-source-ref", skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// Advisory ordering hint among siblings
    #[serde(rename = "x-priority", skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Creation timestamp (RFC 3339)
    #[serde(rename = "x-created-at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp (RFC 3339)
    #[serde(rename = "x-updated-at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Composition keywords
    #[serde(flatten)]
    pub composition: Composition,
    /// Keys not modelled above, kept verbatim
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl NodeData {
    /// Create node data for a widget with its default value type
    #[must_use]
    pub fn new(widget: Widget) -> Self {
        Self {
            value_type: Some(widget.default_value_type()),
            widget,
            ..Self::default()
        }
    }

    /// Declared value type, falling back to the widget default
    #[inline]
    #[must_use]
    pub fn effective_value_type(&self) -> ValueType {
        self.value_type
            .unwrap_or_else(|| self.widget.default_value_type())
    }

    /// Enumerated choices, read from `items` for collection widgets
    #[must_use]
    pub fn options(&self) -> Option<&[Value]> {
        if self.widget.is_collection() {
            self.composition
                .items
                .as_deref()
                .and_then(SubSchema::as_node)
                .and_then(|items| items.data.options.as_deref())
        } else {
            self.options.as_deref()
        }
    }

    /// Replace enumerated choices, writing to `items` for collection widgets
    pub fn set_options(&mut self, options: Vec<Value>) {
        if self.widget.is_collection() {
            match self.composition.items.as_deref_mut() {
                Some(SubSchema::Node(items)) => items.data.options = Some(options),
                _ => {
                    let mut items = SchemaNode::new(NodeData {
                        value_type: Some(ValueType::String),
                        ..NodeData::default()
                    });
                    items.data.options = Some(options);
                    self.composition.items = Some(Box::new(items.into()));
                }
            }
        } else {
            self.options = Some(options);
        }
    }

    /// Read one property by its JSON key
    #[must_use]
    pub fn get_property(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }

    /// Set one property by its JSON key
    ///
    /// A `null` value removes the property. Keys that are not modelled are
    /// stored as extensions.
    ///
    /// On collection widgets `enum` goes to the item schema, as with
    /// [`NodeData::set_options`].
    ///
    /// # Errors
    /// - [`PropertyError::Structural`] for id/parent/priority/children keys
    /// - [`PropertyError::InvalidValue`] if the value has the wrong shape
    pub fn set_property(&mut self, key: &str, value: Value) -> Result<(), PropertyError> {
        if STRUCTURAL_KEYS.contains(&key) {
            return Err(PropertyError::Structural(key.to_string()));
        }
        if key == "enum" && self.widget.is_collection() {
            let options: Option<Vec<Value>> =
                serde_json::from_value(value).map_err(|source| PropertyError::InvalidValue {
                    key: key.to_string(),
                    source,
                })?;
            match options {
                Some(options) => self.set_options(options),
                None => {
                    if let Some(SubSchema::Node(items)) = self.composition.items.as_deref_mut() {
                        items.data.options = None;
                    }
                }
            }
            return Ok(());
        }

        let mut map = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(source) => {
                return Err(PropertyError::InvalidValue {
                    key: key.to_string(),
                    source,
                })
            }
        };
        if value.is_null() {
            map.remove(key);
        } else {
            map.insert(key.to_string(), value);
        }

        let updated: NodeData =
            serde_json::from_value(Value::Object(map)).map_err(|source| {
                PropertyError::InvalidValue {
                    key: key.to_string(),
                    source,
                }
            })?;
        *self = updated;
        Ok(())
    }
}

/// Errors from property access by key
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    /// Key describes structure and is owned by the mutation engine
    #[error("property '{0}' is structural and cannot be set directly")]
    Structural(String),

    /// Value does not fit the property
    #[error("invalid value for property '{key}': {source}")]
    InvalidValue {
        /// Property key
        key: String,
        /// Deserialization failure
        #[source]
        source: serde_json::Error,
    },
}

/// Nested document node: attributes plus ordered children
///
/// Children keys are arbitrary stable strings, distinct from child ids;
/// look children up by iterating values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Node attributes
    #[serde(flatten)]
    pub data: NodeData,
    /// Ordered children (`properties`)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
}

impl SchemaNode {
    /// Create leaf node from data
    #[inline]
    #[must_use]
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            properties: IndexMap::new(),
        }
    }

    /// Create leaf node for a widget
    #[inline]
    #[must_use]
    pub fn widget(widget: Widget) -> Self {
        Self::new(NodeData::new(widget))
    }

    /// Set title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.data.title = Some(title.into());
        self
    }

    /// Set description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.data.description = Some(description.into());
        self
    }

    /// Set id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.data.id = Some(id.into());
        self
    }

    /// Mark required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.data.required = true;
        self
    }

    /// Append child under key
    #[inline]
    #[must_use]
    pub fn with_child(mut self, key: impl Into<String>, child: SchemaNode) -> Self {
        self.properties.insert(key.into(), child);
        self
    }

    /// Node id, if assigned
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&NodeId> {
        self.data.id.as_ref()
    }

    /// Number of nodes in this subtree reachable through `properties`
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self
            .properties
            .values()
            .map(SchemaNode::subtree_len)
            .sum::<usize>()
    }

    /// Drop ids and schema URIs through the whole subtree, composition
    /// sub-schemas included
    pub fn clear_ids(&mut self) {
        self.data.id = None;
        self.data.schema_uri = None;
        self.data
            .composition
            .for_each_schema_mut(SchemaNode::clear_ids);
        self.properties.values_mut().for_each(SchemaNode::clear_ids);
    }

    /// Depth-first search by id through `properties`
    #[must_use]
    pub fn find(&self, id: &NodeId) -> Option<&SchemaNode> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.properties.values().find_map(|child| child.find(id))
    }
}

/// Flat node form used by the entity table and the persisted record list
///
/// `children` is in-memory only: persisted structure is carried by
/// `parent_id` alone and rebuilt on load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "NodeData")]
pub struct NodeRecord {
    /// Node attributes
    #[serde(flatten)]
    pub data: NodeData,
    /// Ordered children: child key to child id
    #[serde(skip)]
    pub children: IndexMap<String, NodeId>,
}

impl NodeRecord {
    /// Record id, if assigned
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&NodeId> {
        self.data.id.as_ref()
    }

    /// Parent id, if any
    #[inline]
    #[must_use]
    pub fn parent_id(&self) -> Option<&NodeId> {
        self.data.parent_id.as_ref()
    }

    /// Child ids in display order
    pub fn child_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.children.values()
    }

    /// Key under which `child` is held, if it is a child
    #[must_use]
    pub fn key_of(&self, child: &NodeId) -> Option<&str> {
        self.children
            .iter()
            .find(|(_, id)| *id == child)
            .map(|(key, _)| key.as_str())
    }
}

impl From<NodeData> for NodeRecord {
    fn from(mut data: NodeData) -> Self {
        // Records saved by older editors still carry nested children.
        data.extensions.remove("properties");
        Self {
            data,
            children: IndexMap::new(),
        }
    }
}
