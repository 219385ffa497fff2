//! Tree index
//!
//! [`flatten`] walks a nested document into a flat id → record map.
//! [`reconstruct`] is its inverse for persisted record lists, where
//! structure is known only through `x-parent-id` back-references.

use crate::id::NodeId;
use crate::node::{NodeRecord, SchemaNode};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Errors rebuilding a tree from flat records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconstructError {
    /// No record carries the requested root id
    #[error("root node not found: {0}")]
    RootNotFound(NodeId),
}

/// Flatten a document rooted at `root`
///
/// Depth-first, pre-order. `parent_id` is stamped from containment; the
/// root gets none.
#[must_use]
pub fn flatten(root: &SchemaNode) -> IndexMap<NodeId, NodeRecord> {
    flatten_subtree(root, None)
}

/// Flatten a subtree that will hang under `parent`
///
/// Nodes without an id are skipped; their identified descendants attach
/// to the nearest identified ancestor. A repeated id keeps its first
/// occurrence and drops the later subtree.
#[must_use]
pub fn flatten_subtree(node: &SchemaNode, parent: Option<&NodeId>) -> IndexMap<NodeId, NodeRecord> {
    let mut out = IndexMap::new();
    let key = node.id().map(ToString::to_string).unwrap_or_default();
    collect(node, &key, parent, &mut out);
    out
}

fn collect(
    node: &SchemaNode,
    key: &str,
    parent: Option<&NodeId>,
    out: &mut IndexMap<NodeId, NodeRecord>,
) -> Vec<(String, NodeId)> {
    let Some(id) = node.id() else {
        return node
            .properties
            .iter()
            .flat_map(|(child_key, child)| collect(child, child_key, parent, out))
            .collect();
    };

    if out.contains_key(id) {
        tracing::warn!("duplicate node id {} skipped while flattening", id);
        return Vec::new();
    }

    let mut record = NodeRecord::from(node.data.clone());
    record.data.parent_id = parent.cloned();
    out.insert(id.clone(), record);

    let children: IndexMap<String, NodeId> = node
        .properties
        .iter()
        .flat_map(|(child_key, child)| collect(child, child_key, Some(id), out))
        .collect();
    if let Some(record) = out.get_mut(id) {
        record.children = children;
    }

    vec![(key.to_string(), id.clone())]
}

/// Rebuild a nested document from flat records
///
/// Children of a node are the records whose `parent_id` equals its id, in
/// ascending `priority` (records without priority follow, in list order).
/// Accepts records in any order; each node is expanded at most once, so
/// cyclic back-references cannot loop. Records unreachable from the root
/// are ignored.
///
/// # Errors
/// Returns [`ReconstructError::RootNotFound`] if no record has `root_id`.
pub fn reconstruct(root_id: &NodeId, records: &[NodeRecord]) -> Result<SchemaNode, ReconstructError> {
    let mut by_id: HashMap<&NodeId, &NodeRecord> = HashMap::with_capacity(records.len());
    let mut by_parent: HashMap<&NodeId, Vec<&NodeRecord>> = HashMap::new();
    for record in records {
        let Some(id) = record.id() else { continue };
        by_id.insert(id, record);
        if let Some(parent) = record.parent_id() {
            by_parent.entry(parent).or_default().push(record);
        }
    }

    let root = by_id
        .get(root_id)
        .copied()
        .ok_or_else(|| ReconstructError::RootNotFound(root_id.clone()))?;

    let mut visited = HashSet::new();
    Ok(expand(root_id, root, &by_parent, &mut visited))
}

fn expand<'a>(
    id: &'a NodeId,
    record: &'a NodeRecord,
    by_parent: &HashMap<&'a NodeId, Vec<&'a NodeRecord>>,
    visited: &mut HashSet<&'a NodeId>,
) -> SchemaNode {
    visited.insert(id);
    let mut node = SchemaNode::new(record.data.clone());

    let mut kids = by_parent.get(id).cloned().unwrap_or_default();
    kids.sort_by(|a, b| by_priority(a.data.priority, b.data.priority));

    for kid in kids {
        let Some(kid_id) = kid.id() else { continue };
        if visited.contains(kid_id) {
            tracing::warn!("node {} already placed; skipping repeated reference", kid_id);
            continue;
        }
        let child = expand(kid_id, kid, by_parent, visited);
        node.properties.insert(kid_id.to_string(), child);
    }

    node
}

fn by_priority(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;
    use crate::widget::Widget;
    use pretty_assertions::assert_eq;

    fn record(id: &str, parent: Option<&str>, priority: Option<i64>) -> NodeRecord {
        let mut data = NodeData::new(Widget::Section);
        data.id = Some(NodeId::new(id));
        data.parent_id = parent.map(NodeId::new);
        data.priority = priority;
        NodeRecord::from(data)
    }

    fn doc() -> SchemaNode {
        SchemaNode::widget(Widget::Root).with_id("root").with_child(
            "s",
            SchemaNode::widget(Widget::Section)
                .with_id("s1")
                .with_child("h", SchemaNode::widget(Widget::Header).with_id("h1"))
                .with_child("q", SchemaNode::widget(Widget::ShortText).with_id("q1")),
        )
    }

    #[test]
    fn flatten_collects_every_node() {
        let flat = flatten(&doc());
        let ids: Vec<_> = flat.keys().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["root", "s1", "h1", "q1"]);
    }

    #[test]
    fn flatten_stamps_parents_and_child_lists() {
        let flat = flatten(&doc());
        assert_eq!(flat["root"].parent_id(), None);
        assert_eq!(flat["s1"].parent_id().unwrap().as_str(), "root");
        assert_eq!(flat["q1"].parent_id().unwrap().as_str(), "s1");
        let kids: Vec<_> = flat["s1"].children.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(kids, vec![("h", "h1"), ("q", "q1")]);
        assert!(flat["h1"].children.is_empty());
    }

    #[test]
    fn flatten_attaches_through_unidentified_nodes() {
        let tree = SchemaNode::widget(Widget::Root).with_id("r").with_child(
            "anon",
            SchemaNode::widget(Widget::Section)
                .with_child("q", SchemaNode::widget(Widget::Number).with_id("q")),
        );
        let flat = flatten(&tree);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["q"].parent_id().unwrap().as_str(), "r");
        assert_eq!(flat["r"].children.get("q").map(NodeId::as_str), Some("q"));
    }

    #[test]
    fn flatten_skips_duplicate_ids() {
        let tree = SchemaNode::widget(Widget::Root)
            .with_id("r")
            .with_child("a", SchemaNode::widget(Widget::Section).with_id("dup"))
            .with_child("b", SchemaNode::widget(Widget::Section).with_id("dup"));
        let flat = flatten(&tree);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["r"].children.len(), 1);
    }

    #[test]
    fn reconstruct_inverts_flatten() {
        let original = doc();
        let records: Vec<NodeRecord> = flatten(&original).into_values().collect();
        let rebuilt = reconstruct(&NodeId::new("root"), &records).unwrap();

        assert_eq!(rebuilt.subtree_len(), 4);
        let section = &rebuilt.properties["s1"];
        let order: Vec<_> = section.properties.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["h1", "q1"]);
    }

    #[test]
    fn reconstruct_accepts_any_order_and_sorts_by_priority() {
        let records = vec![
            record("c", Some("root"), Some(200)),
            record("a", Some("root"), Some(0)),
            record("x", Some("a"), None),
            record("root", None, None),
            record("b", Some("root"), Some(100)),
        ];
        let tree = reconstruct(&NodeId::new("root"), &records).unwrap();
        let order: Vec<_> = tree.properties.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(tree.properties["a"].properties.len(), 1);
    }

    #[test]
    fn reconstruct_terminates_on_cycles() {
        let records = vec![
            record("root", Some("b"), None),
            record("a", Some("root"), None),
            record("b", Some("a"), None),
            record("self", Some("self"), None),
        ];
        let tree = reconstruct(&NodeId::new("root"), &records).unwrap();
        assert_eq!(tree.subtree_len(), 3);
    }

    #[test]
    fn reconstruct_missing_root() {
        let err = reconstruct(&NodeId::new("nope"), &[]).unwrap_err();
        assert_eq!(err, ReconstructError::RootNotFound(NodeId::new("nope")));
    }
}
