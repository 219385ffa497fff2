//! Widget kinds and value types
//!
//! [`Widget`] is the `x-widget` tag selecting UI/semantic behavior of a node.
//! [`WidgetClass`] groups widgets by structural role and decides which
//! parent/child edges are legal.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Structural data type produced by a widget (`type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Text value
    String,
    /// Numeric value
    Number,
    /// True/false value
    Boolean,
    /// Keyed container
    Object,
    /// Collection value
    Array,
}

impl ValueType {
    /// JSON Schema type name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural role of a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetClass {
    /// Document root or section; holds other nodes
    Container,
    /// Static content (headers); produces no value
    Display,
    /// Question producing a value; may hold sub-questions
    Input,
}

/// Widget kind (`x-widget`)
///
/// Unknown tags survive a load/save round trip through [`Widget::Other`]
/// and are treated as inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Widget {
    /// Document root
    Root,
    /// Top-level section (tab)
    Section,
    /// Static heading
    Header,
    /// Single-line text
    #[default]
    ShortText,
    /// Multi-line text
    LongText,
    /// E-mail address
    Email,
    /// Single choice from radio options
    MultipleChoice,
    /// Single choice from a drop-down
    Dropdown,
    /// Boolean toggle
    YesNo,
    /// Multiple choice producing a collection
    Checkbox,
    /// Numeric input
    Number,
    /// Calendar date
    Date,
    /// Agreement scale
    OpinionScale,
    /// Star rating
    Rating,
    /// Tag not known to this crate
    Other(String),
}

impl Widget {
    /// Tag as written in documents
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Root => "root",
            Self::Section => "section",
            Self::Header => "header",
            Self::ShortText => "short-text",
            Self::LongText => "long-text",
            Self::Email => "email",
            Self::MultipleChoice => "multiple-choice",
            Self::Dropdown => "dropdown",
            Self::YesNo => "yes-no",
            Self::Checkbox => "checkbox",
            Self::Number => "number",
            Self::Date => "date",
            Self::OpinionScale => "opinion-scale",
            Self::Rating => "rating",
            Self::Other(tag) => tag,
        }
    }

    /// Structural class
    #[must_use]
    pub fn class(&self) -> WidgetClass {
        match self {
            Self::Root | Self::Section => WidgetClass::Container,
            Self::Header => WidgetClass::Display,
            _ => WidgetClass::Input,
        }
    }

    /// Value type the widget produces when none is declared
    #[must_use]
    pub fn default_value_type(&self) -> ValueType {
        match self {
            Self::Root | Self::Section => ValueType::Object,
            Self::Number | Self::OpinionScale | Self::Rating => ValueType::Number,
            Self::YesNo => ValueType::Boolean,
            Self::Checkbox => ValueType::Array,
            _ => ValueType::String,
        }
    }

    /// Whether the produced value is a collection (options live on `items`)
    #[inline]
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Checkbox)
    }

    /// Whether the widget offers enumerated choices
    #[inline]
    #[must_use]
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            Self::MultipleChoice | Self::Dropdown | Self::Checkbox
        )
    }

    /// Whether a node of this widget may directly contain `child`
    ///
    /// - root holds sections only
    /// - sections hold headers and questions
    /// - questions hold sub-questions
    /// - headers hold nothing
    #[must_use]
    pub fn accepts_child(&self, child: &Widget) -> bool {
        match (self, child.class()) {
            (Self::Root, _) => matches!(child, Self::Section),
            (Self::Section, WidgetClass::Display | WidgetClass::Input) => true,
            (parent, WidgetClass::Input) => parent.class() == WidgetClass::Input,
            _ => false,
        }
    }
}

impl Display for Widget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Widget {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "root" => Self::Root,
            "section" => Self::Section,
            "header" => Self::Header,
            "short-text" => Self::ShortText,
            "long-text" => Self::LongText,
            "email" => Self::Email,
            "multiple-choice" => Self::MultipleChoice,
            "dropdown" => Self::Dropdown,
            "yes-no" => Self::YesNo,
            "checkbox" => Self::Checkbox,
            "number" => Self::Number,
            "date" => Self::Date,
            "opinion-scale" => Self::OpinionScale,
            "rating" => Self::Rating,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for Widget {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<Widget> for String {
    fn from(widget: Widget) -> Self {
        match widget {
            Widget::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_tags_round_trip() {
        for tag in ["root", "section", "checkbox", "opinion-scale", "yes-no"] {
            let widget = Widget::from(tag);
            assert_eq!(String::from(widget), tag);
        }
    }

    #[test]
    fn unknown_tag_is_kept() {
        let widget: Widget = serde_json::from_str("\"signature\"").unwrap();
        assert_eq!(widget, Widget::Other("signature".to_string()));
        assert_eq!(widget.class(), WidgetClass::Input);
        assert_eq!(serde_json::to_string(&widget).unwrap(), "\"signature\"");
    }

    #[test]
    fn containment_rules() {
        assert!(Widget::Root.accepts_child(&Widget::Section));
        assert!(!Widget::Root.accepts_child(&Widget::ShortText));
        assert!(Widget::Section.accepts_child(&Widget::Header));
        assert!(Widget::Section.accepts_child(&Widget::Checkbox));
        assert!(!Widget::Section.accepts_child(&Widget::Section));
        assert!(Widget::YesNo.accepts_child(&Widget::ShortText));
        assert!(!Widget::YesNo.accepts_child(&Widget::Header));
        assert!(!Widget::Header.accepts_child(&Widget::ShortText));
    }

    #[test]
    fn default_value_types() {
        assert_eq!(Widget::Checkbox.default_value_type(), ValueType::Array);
        assert_eq!(Widget::Rating.default_value_type(), ValueType::Number);
        assert_eq!(Widget::YesNo.default_value_type(), ValueType::Boolean);
        assert_eq!(Widget::Section.default_value_type(), ValueType::Object);
        assert_eq!(Widget::Date.default_value_type(), ValueType::String);
    }
}
