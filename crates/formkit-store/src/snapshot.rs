//! Immutable document snapshots
//!
//! A [`DocumentSnapshot`] shares structure with the live document, so
//! taking one is O(1). Later mutations of the document replace entries in
//! the document's own map and never reach the snapshot.

use crate::error::ConsistencyError;
use crate::table::Entities;
use formkit_schema::{NodeId, NodeRecord, SchemaNode};
use std::collections::HashSet;
use std::sync::Arc;

/// Frozen view of a document at one point in time
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    root: Option<NodeId>,
    entities: Entities,
    priority_step: i64,
}

impl DocumentSnapshot {
    pub(crate) fn new(root: Option<NodeId>, entities: Entities, priority_step: i64) -> Self {
        Self {
            root,
            entities,
            priority_step,
        }
    }

    /// Root id, if a document was loaded
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    /// Record by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.entities.get(id).map(Arc::as_ref)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if snapshot is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Records reachable from the root, depth-first pre-order
    ///
    /// This is the persisted form: structure is carried by `x-parent-id`.
    #[must_use]
    pub fn records(&self) -> Vec<NodeRecord> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(self.entities.len());
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(record) = self.entities.get(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            stack.extend(record.children.values().rev());
            out.push(NodeRecord::clone(record));
        }
        out
    }

    /// Nested document rebuilt from the child lists
    #[must_use]
    pub fn tree(&self) -> Option<SchemaNode> {
        materialize(&self.entities, self.root.as_ref()?)
    }

    /// Verify the document invariants
    ///
    /// # Errors
    /// Returns the first violated invariant found.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        check(self.root.as_ref(), &self.entities, self.priority_step)
    }
}

/// Build the nested subtree under `id`; each node is placed at most once
pub(crate) fn materialize(entities: &Entities, id: &NodeId) -> Option<SchemaNode> {
    let mut visited = HashSet::new();
    build_node(entities, id, &mut visited)
}

fn build_node(entities: &Entities, id: &NodeId, visited: &mut HashSet<NodeId>) -> Option<SchemaNode> {
    let record = entities.get(id)?;
    if !visited.insert(id.clone()) {
        return None;
    }
    let mut node = SchemaNode::new(record.data.clone());
    for (key, child_id) in &record.children {
        if let Some(child) = build_node(entities, child_id, visited) {
            node.properties.insert(key.clone(), child);
        }
    }
    Some(node)
}

/// Priority implied by a position in a child list
pub(crate) fn priority_at(step: i64, index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX).saturating_mul(step)
}

pub(crate) fn check(
    root: Option<&NodeId>,
    entities: &Entities,
    priority_step: i64,
) -> Result<(), ConsistencyError> {
    for (key, record) in entities.iter() {
        if record.id() != Some(key) {
            return Err(ConsistencyError::KeyMismatch {
                key: key.clone(),
                id: record.id().cloned(),
            });
        }
    }

    let Some(root) = root.filter(|r| entities.contains_key(*r)) else {
        return if entities.is_empty() {
            Ok(())
        } else {
            Err(ConsistencyError::MissingRoot(entities.len()))
        };
    };

    let mut reached: HashSet<&NodeId> = HashSet::from([root]);
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(record) = entities.get(id) else {
            continue;
        };
        for (index, child) in record.children.values().enumerate() {
            let Some(child_record) = entities.get(child) else {
                return Err(ConsistencyError::DanglingChild {
                    parent: id.clone(),
                    child: child.clone(),
                });
            };
            if !reached.insert(child) {
                return Err(ConsistencyError::SharedChild(child.clone()));
            }
            if child_record.parent_id() != Some(id) {
                return Err(ConsistencyError::ParentMismatch {
                    child: child.clone(),
                    holder: id.clone(),
                    declared: child_record.parent_id().cloned(),
                });
            }
            let expected = priority_at(priority_step, index);
            if child_record.data.priority != Some(expected) {
                return Err(ConsistencyError::PriorityDrift {
                    child: child.clone(),
                    index,
                    actual: child_record.data.priority,
                    expected,
                });
            }
            stack.push(child);
        }
    }

    if reached.len() != entities.len() {
        let mut stray: Vec<NodeId> = entities
            .keys()
            .filter(|id| !reached.contains(id))
            .cloned()
            .collect();
        stray.sort();
        return Err(ConsistencyError::Unreachable(stray));
    }

    Ok(())
}
