//! Entity table
//!
//! Provides [`NodeTable`]: the arena holding every node record of a
//! document, keyed by id, plus a reverse index from parent id to the ids
//! whose `x-parent-id` points at it.
//!
//! Records are stored behind `Arc` in persistent maps, so cloning the
//! table is O(1) and shares structure with the original. Updating a
//! record replaces its `Arc`; every other entry keeps its identity.

use formkit_schema::{NodeId, NodeRecord};
use std::collections::HashSet;
use std::sync::Arc;

/// Shared, persistent map of node records
pub type Entities = im::HashMap<NodeId, Arc<NodeRecord>>;

/// Node records by id with a parent back-reference index
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    /// id -> record
    entities: Entities,

    /// Reverse index: parent id -> ids declaring it as parent
    by_parent: im::HashMap<NodeId, Vec<NodeId>>,
}

impl NodeTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build table from records keyed by id
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = (NodeId, NodeRecord)>) -> Self {
        let mut table = Self::new();
        for (id, record) in records {
            table.insert(id, Arc::new(record));
        }
        table
    }

    /// Record by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&Arc<NodeRecord>> {
        self.entities.get(id)
    }

    /// Check if id is present
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All ids, unordered
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.entities.keys()
    }

    /// All entries, unordered
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Arc<NodeRecord>)> {
        self.entities.iter()
    }

    /// Insert or replace a record, keeping the reverse index in step
    ///
    /// Returns the previous record under `id`.
    pub fn insert(&mut self, id: NodeId, record: Arc<NodeRecord>) -> Option<Arc<NodeRecord>> {
        let new_parent = record.parent_id().cloned();
        let previous = self.entities.insert(id.clone(), record);

        let old_parent = previous.as_ref().and_then(|r| r.parent_id().cloned());
        if old_parent != new_parent {
            if let Some(old) = old_parent {
                self.unlink(&old, &id);
            }
            if let Some(new) = new_parent {
                self.by_parent.entry(new).or_insert_with(Vec::new).push(id);
            }
        }

        previous
    }

    /// Copy-on-write update of one record
    ///
    /// The record is cloned, `f` is applied and the result stored under a
    /// new `Arc`. Returns false if `id` is unknown.
    pub fn update(&mut self, id: &NodeId, f: impl FnOnce(&mut NodeRecord)) -> bool {
        let Some(current) = self.entities.get(id) else {
            return false;
        };
        let mut record = NodeRecord::clone(current);
        f(&mut record);
        self.insert(id.clone(), Arc::new(record));
        true
    }

    /// Remove a record
    pub fn remove(&mut self, id: &NodeId) -> Option<Arc<NodeRecord>> {
        let removed = self.entities.remove(id)?;
        if let Some(parent) = removed.parent_id() {
            self.unlink(parent, id);
        }
        Some(removed)
    }

    /// Ids whose `x-parent-id` is `parent`, in insertion order
    #[must_use]
    pub fn get_by_parent(&self, parent: &NodeId) -> Vec<NodeId> {
        self.by_parent.get(parent).cloned().unwrap_or_default()
    }

    /// Every descendant of `id` through parent back-references
    ///
    /// Breadth-first; `id` itself is excluded. Each id is visited once, so
    /// a cyclic back-reference cannot loop.
    #[must_use]
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut out = Vec::new();
        let mut cursor = 0;
        let mut frontier = self.get_by_parent(id);

        loop {
            for child in frontier.drain(..) {
                if seen.insert(child.clone()) {
                    out.push(child);
                }
            }
            let Some(next) = out.get(cursor) else { break };
            frontier = self.get_by_parent(next);
            cursor += 1;
        }

        out
    }

    /// Structurally shared copy of the entity map
    #[inline]
    #[must_use]
    pub fn entities(&self) -> Entities {
        self.entities.clone()
    }

    fn unlink(&mut self, parent: &NodeId, child: &NodeId) {
        let now_empty = match self.by_parent.get_mut(parent) {
            Some(children) => {
                children.retain(|c| c != child);
                children.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_parent.remove(parent);
        }
    }
}
