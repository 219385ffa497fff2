//! Catalog records persisted next to node records
//!
//! Field names follow the stored JSON (`rootNodeId`, `bpmnXml`, ...), so
//! files written by earlier editors load unchanged.

use chrono::{DateTime, Utc};
use formkit_schema::{NodeId, SchemaNode};
use serde::{Deserialize, Serialize};

/// Entry in the form catalog pointing at a stored root node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormReference {
    /// Form id (the root node id)
    pub id: String,
    /// Display name
    pub name: String,
    /// Display description
    #[serde(default)]
    pub description: String,
    /// Root of the stored node records
    pub root_node_id: NodeId,
    /// First save
    pub created_at: DateTime<Utc>,
    /// Last save
    pub updated_at: DateTime<Utc>,
}

impl FormReference {
    /// Create a reference stamped with the current time
    pub fn new(id: impl Into<String>, name: impl Into<String>, root_node_id: NodeId) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            root_node_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reference for a document root
    ///
    /// Returns `None` when the root has no id yet. A missing title becomes
    /// "Untitled Form".
    #[must_use]
    pub fn for_root(root: &SchemaNode) -> Option<Self> {
        let id = root.id()?.clone();
        let name = root
            .data
            .title
            .clone()
            .unwrap_or_else(|| "Untitled Form".to_string());
        let mut reference = Self::new(id.to_string(), name, id);
        reference.description = root.data.description.clone().unwrap_or_default();
        Some(reference)
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Merge over an existing entry: `created_at` kept, `updated_at` = `now`
    pub(crate) fn upsert_over(mut self, existing: Option<&Self>, now: DateTime<Utc>) -> Self {
        self.created_at = existing.map_or(now, |previous| previous.created_at);
        self.updated_at = now;
        self
    }
}

/// Stored workflow definition; the BPMN XML is opaque
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    /// Workflow id
    pub id: String,
    /// Display name
    pub name: String,
    /// Display description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Diagram source
    pub bpmn_xml: String,
    /// Starts at 1, bumped on every update
    pub version: u32,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Caller-editable workflow fields
///
/// Without an id, saving creates a workflow; with one, it updates the
/// existing workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDraft {
    /// Existing workflow to update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Display description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Diagram source
    pub bpmn_xml: String,
}

impl WorkflowDraft {
    /// Draft for a new workflow
    pub fn new(name: impl Into<String>, bpmn_xml: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            bpmn_xml: bpmn_xml.into(),
        }
    }

    /// Target an existing workflow
    #[must_use]
    pub fn for_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Turn the draft into a stored record
    ///
    /// `existing` is the stored record with the draft's id, if any.
    pub(crate) fn into_record(self, existing: Option<&WorkflowRecord>, now: DateTime<Utc>) -> WorkflowRecord {
        match existing {
            Some(previous) => WorkflowRecord {
                id: previous.id.clone(),
                name: self.name,
                description: self.description,
                bpmn_xml: self.bpmn_xml,
                version: previous.version.saturating_add(1),
                created_at: previous.created_at,
                updated_at: now,
            },
            None => WorkflowRecord {
                id: self.id.unwrap_or_else(|| ulid::Ulid::new().to_string()),
                name: self.name,
                description: self.description,
                bpmn_xml: self.bpmn_xml,
                version: 1,
                created_at: now,
                updated_at: now,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use formkit_schema::{Widget, SchemaNode};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn reference_upsert_keeps_creation_time() {
        let first = Utc::now();
        let later = first + Duration::seconds(5);
        let stored = FormReference::new("f1", "Form", NodeId::new("f1")).upsert_over(None, first);
        assert_eq!(stored.created_at, first);

        let again = FormReference::new("f1", "Renamed", NodeId::new("f1")).upsert_over(Some(&stored), later);
        assert_eq!(again.created_at, first);
        assert_eq!(again.updated_at, later);
        assert_eq!(again.name, "Renamed");
    }

    #[test]
    fn reference_for_root_defaults_name() {
        let root = SchemaNode::widget(Widget::Root).with_id("r1");
        let reference = FormReference::for_root(&root).unwrap();
        assert_eq!(reference.name, "Untitled Form");
        assert_eq!(reference.id, "r1");
        assert_eq!(reference.root_node_id, NodeId::new("r1"));

        assert!(FormReference::for_root(&SchemaNode::widget(Widget::Root)).is_none());
    }

    #[test]
    fn reference_uses_stored_field_names() {
        let reference = FormReference::new("f1", "Form", NodeId::new("f1"));
        let value = serde_json::to_value(&reference).unwrap();
        assert_eq!(value["rootNodeId"], json!("f1"));
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn workflow_versions() {
        let now = Utc::now();
        let created = WorkflowDraft::new("Review", "<xml/>").into_record(None, now);
        assert_eq!(created.version, 1);
        assert!(!created.id.is_empty());

        let updated = WorkflowDraft::new("Review v2", "<xml2/>")
            .for_id(created.id.clone())
            .into_record(Some(&created), now + Duration::seconds(1));
        assert_eq!(updated.version, 2);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.bpmn_xml, "<xml2/>");
    }
}
