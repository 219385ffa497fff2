//! Form document and mutation engine
//!
//! [`FormDocument`] owns the normalized node table of one form. All edits
//! go through its methods; each either applies completely or returns a
//! [`MutationError`] with the document untouched.
//!
//! # Ownership
//! - the table is the source of truth; [`FormDocument::tree`] is derived
//! - each record's child list is the display order; `x-priority` is
//!   renumbered from it on every structural change
//! - touched records get a new `Arc`, all others keep their identity

use crate::error::{ConsistencyError, MutationError};
use crate::snapshot::{check, materialize, priority_at, DocumentSnapshot};
use crate::table::NodeTable;
use formkit_schema::{
    flatten, flatten_subtree, reconstruct, NodeData, NodeFactory, NodeId, NodeRecord, SchemaNode,
    SourceType,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Default distance between sibling priorities
pub const DEFAULT_PRIORITY_STEP: i64 = 100;

/// Default marker appended to the title of a copied node
pub const DEFAULT_COPY_SUFFIX: &str = " (Copy)";

/// Tunables of the mutation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Distance between sibling priorities
    pub priority_step: i64,
    /// Appended to the title of a copied node
    pub copy_suffix: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            priority_step: DEFAULT_PRIORITY_STEP,
            copy_suffix: DEFAULT_COPY_SUFFIX.to_string(),
        }
    }
}

/// One editable form: normalized node table plus editor selection
#[derive(Debug, Clone, Default)]
pub struct FormDocument {
    root: Option<NodeId>,
    table: NodeTable,
    factory: NodeFactory,
    options: DocumentOptions,
    selected: Option<NodeId>,
}

fn refused(operation: &'static str, error: MutationError) -> MutationError {
    tracing::warn!(operation, error = %error, "mutation refused");
    error
}

impl FormDocument {
    /// Create empty document (no root)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With node factory
    #[inline]
    #[must_use]
    pub fn with_factory(mut self, factory: NodeFactory) -> Self {
        self.factory = factory;
        self
    }

    /// With engine options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: DocumentOptions) -> Self {
        self.options = options;
        self
    }

    /// Create document from a nested tree
    #[must_use]
    pub fn from_tree(document: SchemaNode) -> Self {
        let mut this = Self::new();
        this.replace_document(Some(document));
        this
    }

    /// Node factory used for new and copied nodes
    #[inline]
    #[must_use]
    pub fn factory(&self) -> &NodeFactory {
        &self.factory
    }

    /// Engine options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------

    /// Root id, if a document is loaded
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    /// Root record
    #[must_use]
    pub fn root(&self) -> Option<&NodeRecord> {
        self.get(self.root.as_ref()?)
    }

    /// Record by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.table.get(id).map(Arc::as_ref)
    }

    /// Shared handle to a record; identity is stable until the record is edited
    #[inline]
    #[must_use]
    pub fn get_shared(&self, id: &NodeId) -> Option<Arc<NodeRecord>> {
        self.table.get(id).cloned()
    }

    /// Check if id is present
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.table.contains(id)
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if no document is loaded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All node ids, unordered
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.table.ids()
    }

    /// Children of `id` in display order
    #[must_use]
    pub fn children_of(&self, id: &NodeId) -> Vec<&NodeRecord> {
        self.get(id)
            .map(|record| record.child_ids().filter_map(|c| self.get(c)).collect())
            .unwrap_or_default()
    }

    /// Top-level sections in display order
    #[must_use]
    pub fn top_level(&self) -> Vec<&NodeRecord> {
        self.root
            .as_ref()
            .map(|root| self.children_of(root))
            .unwrap_or_default()
    }

    /// Record holding `id` in its child list
    #[must_use]
    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeRecord> {
        let record = self.table.get(id)?;
        self.holder_of(id, record).and_then(|holder| self.get(&holder))
    }

    /// Every node below `id`, pre-order; `id` itself excluded
    #[must_use]
    pub fn descendants_of(&self, id: &NodeId) -> Vec<NodeId> {
        self.subtree_ids(id)
    }

    /// Nested document derived from the table
    #[must_use]
    pub fn tree(&self) -> Option<SchemaNode> {
        materialize(&self.table.entities(), self.root.as_ref()?)
    }

    /// Nested subtree under `id`
    #[must_use]
    pub fn subtree(&self, id: &NodeId) -> Option<SchemaNode> {
        materialize(&self.table.entities(), id)
    }

    /// Records in persisted order (depth-first pre-order)
    #[must_use]
    pub fn records(&self) -> Vec<NodeRecord> {
        self.snapshot().records()
    }

    /// O(1) frozen copy for the save boundary
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::new(
            self.root.clone(),
            self.table.entities(),
            self.options.priority_step,
        )
    }

    /// Verify every document invariant
    ///
    /// # Errors
    /// Returns the first violated invariant found.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        check(
            self.root.as_ref(),
            &self.table.entities(),
            self.options.priority_step,
        )
    }

    /// Currently selected node, if it still exists
    #[must_use]
    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref().filter(|id| self.table.contains(id))
    }

    /// Select a node, or clear the selection with `None`
    ///
    /// # Errors
    /// [`MutationError::NodeNotFound`] if `id` is unknown.
    pub fn select(&mut self, id: Option<&NodeId>) -> Result<(), MutationError> {
        match id {
            Some(id) if !self.table.contains(id) => {
                Err(refused("select", MutationError::NodeNotFound(id.clone())))
            }
            _ => {
                self.selected = id.cloned();
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Whole-document operations
    // ------------------------------------------------------------------

    /// Replace the whole document; `None` clears it
    ///
    /// The tree is built by the factory (missing ids assigned), flattened
    /// and renumbered. Selection is left as is. Returns the new root id.
    pub fn replace_document(&mut self, document: Option<SchemaNode>) -> Option<NodeId> {
        let Some(mut document) = document else {
            self.root = None;
            self.table = NodeTable::new();
            tracing::debug!("document cleared");
            return None;
        };

        let root = document
            .data
            .id
            .get_or_insert_with(|| self.factory.fresh_id())
            .clone();
        let document = self.factory.build(document);
        let mut flat = flatten(&document);
        renumber_flat(self.options.priority_step, &mut flat);

        self.table = NodeTable::from_records(flat);
        self.root = Some(root.clone());
        tracing::debug!(root = %root, nodes = self.table.len(), "document replaced");
        Some(root)
    }

    /// Replace the document with one rebuilt from persisted records
    ///
    /// # Errors
    /// [`MutationError::Reconstruct`] if no record has `root_id`.
    pub fn load_records(
        &mut self,
        root_id: &NodeId,
        records: &[NodeRecord],
    ) -> Result<NodeId, MutationError> {
        let tree = reconstruct(root_id, records)
            .map_err(|e| refused("load_records", MutationError::from(e)))?;
        Ok(self
            .replace_document(Some(tree))
            .unwrap_or_else(|| root_id.clone()))
    }

    // ------------------------------------------------------------------
    // Property edits
    // ------------------------------------------------------------------

    /// Set a scalar top-level property of the document (`title`, ...)
    ///
    /// # Errors
    /// - [`MutationError::NoDocument`] if nothing is loaded
    /// - [`MutationError::NonScalarMeta`] for object or array values
    /// - [`MutationError::Property`] for structural keys or bad values
    pub fn update_meta(&mut self, key: &str, value: Value) -> Result<(), MutationError> {
        self.try_update_meta(key, value)
            .map_err(|e| refused("update_meta", e))
    }

    fn try_update_meta(&mut self, key: &str, value: Value) -> Result<(), MutationError> {
        let root = self.root.clone().ok_or(MutationError::NoDocument)?;
        if value.is_object() || value.is_array() {
            return Err(MutationError::NonScalarMeta(key.to_string()));
        }
        self.try_update_node_property(&root, key, value)
    }

    /// Set one property of a node by its JSON key; `null` removes it
    ///
    /// # Errors
    /// - [`MutationError::NodeNotFound`] if `id` is unknown
    /// - [`MutationError::Property`] for structural keys or bad values
    /// - [`MutationError::IncompatibleParent`] if a widget change breaks
    ///   containment
    pub fn update_node_property(
        &mut self,
        id: &NodeId,
        key: &str,
        value: Value,
    ) -> Result<(), MutationError> {
        self.try_update_node_property(id, key, value)
            .map_err(|e| refused("update_node_property", e))
    }

    fn try_update_node_property(
        &mut self,
        id: &NodeId,
        key: &str,
        value: Value,
    ) -> Result<(), MutationError> {
        let current = self.shared(id)?;
        let mut next = NodeRecord::clone(&current);
        next.data.set_property(key, value)?;
        self.commit_edit(id, &current, next)
    }

    /// Edit a node's attributes in place
    ///
    /// Id, schema URI, parent link and priority are owned by the engine
    /// and restored after `edit` runs.
    ///
    /// # Errors
    /// - [`MutationError::NodeNotFound`] if `id` is unknown
    /// - [`MutationError::IncompatibleParent`] if a widget change breaks
    ///   containment
    pub fn update_node(
        &mut self,
        id: &NodeId,
        edit: impl FnOnce(&mut NodeData),
    ) -> Result<(), MutationError> {
        self.try_update_node(id, edit)
            .map_err(|e| refused("update_node", e))
    }

    fn try_update_node(
        &mut self,
        id: &NodeId,
        edit: impl FnOnce(&mut NodeData),
    ) -> Result<(), MutationError> {
        let current = self.shared(id)?;
        let mut next = NodeRecord::clone(&current);
        edit(&mut next.data);
        next.data.id = current.data.id.clone();
        next.data.schema_uri = current.data.schema_uri.clone();
        next.data.parent_id = current.data.parent_id.clone();
        next.data.priority = current.data.priority;
        self.commit_edit(id, &current, next)
    }

    fn commit_edit(
        &mut self,
        id: &NodeId,
        current: &NodeRecord,
        next: NodeRecord,
    ) -> Result<(), MutationError> {
        if next.data.widget != current.data.widget {
            if let Some(holder) = self.parent_of(id) {
                ensure_accepts(holder, &next)?;
            }
            for child in self.children_of(id) {
                ensure_accepts(&next, child)?;
            }
        }
        self.table.insert(id.clone(), Arc::new(next));
        tracing::debug!(node = %id, "node updated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Insert a new subtree under `parent_id`
    ///
    /// `position` indexes the parent's child list; `None` or past-the-end
    /// appends. Returns the new node's id.
    ///
    /// # Errors
    /// - [`MutationError::NoDocument`] if nothing is loaded
    /// - [`MutationError::ParentNotFound`] if `parent_id` is unknown
    /// - [`MutationError::IncompatibleParent`] on containment violation
    /// - [`MutationError::DuplicateId`] if the subtree reuses a live id
    pub fn add_child(
        &mut self,
        parent_id: &NodeId,
        node: SchemaNode,
        position: Option<usize>,
    ) -> Result<NodeId, MutationError> {
        self.try_add_child(parent_id, node, position)
            .map_err(|e| refused("add_child", e))
    }

    fn try_add_child(
        &mut self,
        parent_id: &NodeId,
        mut node: SchemaNode,
        position: Option<usize>,
    ) -> Result<NodeId, MutationError> {
        if self.root.is_none() {
            return Err(MutationError::NoDocument);
        }
        let parent = self
            .table
            .get(parent_id)
            .cloned()
            .ok_or_else(|| MutationError::ParentNotFound(parent_id.clone()))?;

        let id = node
            .data
            .id
            .get_or_insert_with(|| self.factory.fresh_id())
            .clone();
        let node = self.factory.build(node);
        if !parent.data.widget.accepts_child(&node.data.widget) {
            return Err(MutationError::IncompatibleParent {
                parent_widget: parent.data.widget.clone(),
                child_widget: node.data.widget.clone(),
            });
        }

        let mut flat = flatten_subtree(&node, Some(parent_id));
        if let Some(taken) = flat.keys().find(|id| self.table.contains(id)) {
            return Err(MutationError::DuplicateId(taken.clone()));
        }
        renumber_flat(self.options.priority_step, &mut flat);

        let mut holder = NodeRecord::clone(&parent);
        let key = free_key(&holder, id.as_str());
        insert_at(&mut holder, position, key, id.clone());

        let added = flat.len();
        for (new_id, record) in flat {
            self.table.insert(new_id, Arc::new(record));
        }
        self.table.insert(parent_id.clone(), Arc::new(holder));
        self.renumber(parent_id);

        tracing::debug!(node = %id, parent = %parent_id, added, "child added");
        Ok(id)
    }

    /// Remove `id` from `parent_id` together with its subtree
    ///
    /// # Errors
    /// - [`MutationError::ParentNotFound`] if `parent_id` is unknown
    /// - [`MutationError::NotAChild`] if `id` is not in its child list
    /// - see [`FormDocument::remove_subtree`]
    pub fn remove_node(
        &mut self,
        parent_id: &NodeId,
        id: &NodeId,
    ) -> Result<Vec<NodeId>, MutationError> {
        self.try_remove_node(parent_id, id)
            .map_err(|e| refused("remove_node", e))
    }

    fn try_remove_node(
        &mut self,
        parent_id: &NodeId,
        id: &NodeId,
    ) -> Result<Vec<NodeId>, MutationError> {
        if self.root.is_none() {
            return Err(MutationError::NoDocument);
        }
        let parent = self
            .table
            .get(parent_id)
            .ok_or_else(|| MutationError::ParentNotFound(parent_id.clone()))?;
        if parent.key_of(id).is_none() {
            return Err(MutationError::NotAChild {
                parent: parent_id.clone(),
                child: id.clone(),
            });
        }
        self.try_remove_subtree(id)
    }

    /// Remove a node and everything below it
    ///
    /// Descendants are found through child lists and `x-parent-id`
    /// back-references. Returns every removed id, `id` first.
    ///
    /// # Errors
    /// - [`MutationError::NodeNotFound`] if `id` is unknown
    /// - [`MutationError::RootNode`] for the root
    pub fn remove_subtree(&mut self, id: &NodeId) -> Result<Vec<NodeId>, MutationError> {
        self.try_remove_subtree(id)
            .map_err(|e| refused("remove_subtree", e))
    }

    fn try_remove_subtree(&mut self, id: &NodeId) -> Result<Vec<NodeId>, MutationError> {
        let root = self.root.clone().ok_or(MutationError::NoDocument)?;
        let record = self.shared(id)?;
        if *id == root {
            return Err(MutationError::RootNode);
        }

        let holder = self.holder_of(id, &record);
        let mut removed = vec![id.clone()];
        removed.extend(self.subtree_ids(id));

        if let Some(holder) = &holder {
            self.table.update(holder, |r| r.children.retain(|_, child| child != id));
        }
        for gone in &removed {
            self.table.remove(gone);
        }
        if let Some(holder) = &holder {
            self.renumber(holder);
        }

        tracing::debug!(node = %id, removed = removed.len(), "subtree removed");
        Ok(removed)
    }

    /// Deep-copy a subtree with fresh ids
    ///
    /// The copy is appended to `new_parent`, or to the original's parent
    /// when `None`. Its title gets the copy suffix; every copied node is
    /// marked `duplicated` and references its original. Internal parent
    /// links point at the copies. Returns the copy's id.
    ///
    /// # Errors
    /// - [`MutationError::NodeNotFound`] if `id` is unknown
    /// - [`MutationError::RootNode`] for the root
    /// - [`MutationError::ParentNotFound`] if the target parent is unknown
    /// - [`MutationError::IncompatibleParent`] on containment violation
    /// - [`MutationError::DuplicateId`] if no free id could be minted
    pub fn clone_subtree(
        &mut self,
        id: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<NodeId, MutationError> {
        self.try_clone_subtree(id, new_parent)
            .map_err(|e| refused("clone_subtree", e))
    }

    fn try_clone_subtree(
        &mut self,
        id: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<NodeId, MutationError> {
        let root = self.root.clone().ok_or(MutationError::NoDocument)?;
        let source = self.shared(id)?;
        if *id == root {
            return Err(MutationError::RootNode);
        }

        let target = match new_parent {
            Some(parent) => parent.clone(),
            None => self
                .holder_of(id, &source)
                .ok_or_else(|| MutationError::ParentNotFound(id.clone()))?,
        };
        let target_record = self
            .table
            .get(&target)
            .cloned()
            .ok_or_else(|| MutationError::ParentNotFound(target.clone()))?;
        ensure_accepts(&target_record, &source)?;

        // Remap table first so internal links can be rewritten in one pass.
        let mut batch = vec![id.clone()];
        batch.extend(self.subtree_ids(id));
        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(batch.len());
        for old in &batch {
            let new_id = self.unused_id(&remap)?;
            remap.insert(old.clone(), new_id);
        }
        let top = remap
            .get(id)
            .cloned()
            .ok_or_else(|| MutationError::NodeNotFound(id.clone()))?;

        let mut copies = Vec::with_capacity(batch.len());
        for old in &batch {
            let (Some(original), Some(new_id)) = (self.table.get(old), remap.get(old)) else {
                continue;
            };
            let mut copy = NodeRecord::clone(original);
            copy.data.id = Some(new_id.clone());
            copy.data.schema_uri = Some(self.factory.schema_uri(new_id));
            copy.data.parent_id = if old == id {
                Some(target.clone())
            } else {
                copy.data
                    .parent_id
                    .map(|p| remap.get(&p).cloned().unwrap_or(p))
            };
            copy.children = original
                .children
                .iter()
                .filter_map(|(key, child)| {
                    let new_child = remap.get(child)?;
                    let new_key = if key == child.as_str() {
                        new_child.to_string()
                    } else {
                        key.clone()
                    };
                    Some((new_key, new_child.clone()))
                })
                .collect();
            copy.data.source_type = Some(SourceType::Duplicated);
            copy.data.source_ref = Some(old.to_string());
            if old == id {
                if let Some(title) = copy.data.title.as_mut() {
                    title.push_str(&self.options.copy_suffix);
                }
            }
            self.factory.reissue_nested_ids(&mut copy.data);
            copies.push((new_id.clone(), copy));
        }

        let mut holder = NodeRecord::clone(&target_record);
        let key = free_key(&holder, top.as_str());
        insert_at(&mut holder, None, key, top.clone());

        let copied = copies.len();
        for (new_id, copy) in copies {
            self.table.insert(new_id, Arc::new(copy));
        }
        self.table.insert(target.clone(), Arc::new(holder));
        self.renumber(&target);

        tracing::debug!(source = %id, copy = %top, parent = %target, copied, "subtree cloned");
        Ok(top)
    }

    /// Mint an id that is neither in the table nor already handed out
    ///
    /// Loaded records may share a prefix with the factory's id source, so
    /// minted ids are skipped until one is free. The attempt bound covers
    /// a sequential source walking past every live id.
    fn unused_id(&self, taken: &HashMap<NodeId, NodeId>) -> Result<NodeId, MutationError> {
        let attempts = self.table.len() + taken.len() + 1;
        let mut candidate = self.factory.fresh_id();
        for _ in 0..attempts {
            let in_use = self.table.contains(&candidate) || taken.values().any(|v| *v == candidate);
            if !in_use {
                return Ok(candidate);
            }
            candidate = self.factory.fresh_id();
        }
        Err(MutationError::DuplicateId(candidate))
    }

    /// Reparent a node, keeping its subtree
    ///
    /// `position` indexes the new parent's child list after the node has
    /// been detached; `None` appends.
    ///
    /// # Errors
    /// - [`MutationError::NodeNotFound`] if `id` is unknown
    /// - [`MutationError::RootNode`] for the root
    /// - [`MutationError::ParentNotFound`] if `new_parent` is unknown
    /// - [`MutationError::MoveIntoDescendant`] if `new_parent` is `id` or
    ///   below it
    /// - [`MutationError::IncompatibleParent`] on containment violation
    pub fn move_node(
        &mut self,
        id: &NodeId,
        new_parent: &NodeId,
        position: Option<usize>,
    ) -> Result<(), MutationError> {
        self.try_move_node(id, new_parent, position)
            .map_err(|e| refused("move_node", e))
    }

    fn try_move_node(
        &mut self,
        id: &NodeId,
        new_parent: &NodeId,
        position: Option<usize>,
    ) -> Result<(), MutationError> {
        let root = self.root.clone().ok_or(MutationError::NoDocument)?;
        let record = self.shared(id)?;
        if *id == root {
            return Err(MutationError::RootNode);
        }
        let target = self
            .table
            .get(new_parent)
            .cloned()
            .ok_or_else(|| MutationError::ParentNotFound(new_parent.clone()))?;
        if new_parent == id || self.subtree_ids(id).contains(new_parent) {
            return Err(MutationError::MoveIntoDescendant {
                node: id.clone(),
                target: new_parent.clone(),
            });
        }
        ensure_accepts(&target, &record)?;

        let holder = self.holder_of(id, &record);
        let key = holder
            .as_ref()
            .and_then(|h| self.table.get(h))
            .and_then(|h| h.key_of(id).map(str::to_string))
            .unwrap_or_else(|| id.to_string());

        if let Some(holder) = &holder {
            self.table.update(holder, |r| r.children.retain(|_, child| child != id));
        }
        let key = self
            .table
            .get(new_parent)
            .map_or(key.clone(), |t| free_key(t, &key));
        self.table
            .update(new_parent, |r| insert_at(r, position, key, id.clone()));
        self.table
            .update(id, |r| r.data.parent_id = Some(new_parent.clone()));

        if let Some(holder) = holder.as_ref().filter(|h| *h != new_parent) {
            self.renumber(holder);
        }
        self.renumber(new_parent);

        tracing::debug!(node = %id, parent = %new_parent, "node moved");
        Ok(())
    }

    /// Add a top-level section
    ///
    /// # Errors
    /// See [`FormDocument::add_child`]; only sections are accepted.
    pub fn add_tab(
        &mut self,
        node: SchemaNode,
        position: Option<usize>,
    ) -> Result<NodeId, MutationError> {
        let Some(root) = self.root.clone() else {
            return Err(refused("add_tab", MutationError::NoDocument));
        };
        self.try_add_child(&root, node, position)
            .map_err(|e| refused("add_tab", e))
    }

    /// Remove a top-level section and its subtree
    ///
    /// # Errors
    /// - [`MutationError::NotTopLevel`] if `id` is not a root child
    /// - [`MutationError::LastTopLevelSection`] if it is the only one
    pub fn remove_tab(&mut self, id: &NodeId) -> Result<Vec<NodeId>, MutationError> {
        self.try_remove_tab(id)
            .map_err(|e| refused("remove_tab", e))
    }

    fn try_remove_tab(&mut self, id: &NodeId) -> Result<Vec<NodeId>, MutationError> {
        let root = self.root.clone().ok_or(MutationError::NoDocument)?;
        self.shared(id)?;
        let root_record = self.shared(&root)?;
        if root_record.key_of(id).is_none() {
            return Err(MutationError::NotTopLevel(id.clone()));
        }
        if root_record.children.len() <= 1 {
            return Err(MutationError::LastTopLevelSection(id.clone()));
        }
        self.try_remove_subtree(id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn shared(&self, id: &NodeId) -> Result<Arc<NodeRecord>, MutationError> {
        self.table
            .get(id)
            .cloned()
            .ok_or_else(|| MutationError::NodeNotFound(id.clone()))
    }

    /// Id of the record whose child list holds `id`
    fn holder_of(&self, id: &NodeId, record: &NodeRecord) -> Option<NodeId> {
        let declared = record
            .parent_id()
            .filter(|p| self.table.get(p).is_some_and(|r| r.key_of(id).is_some()));
        if let Some(parent) = declared {
            return Some(parent.clone());
        }
        self.table
            .iter()
            .find(|(_, r)| r.key_of(id).is_some())
            .map(|(holder, _)| holder.clone())
    }

    /// Ids below `id`: child lists first (pre-order), then any record
    /// reachable only through `x-parent-id`
    fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .table
            .get(id)
            .map(|r| r.children.values().rev().cloned().collect())
            .unwrap_or_default();

        while let Some(current) = stack.pop() {
            let Some(record) = self.table.get(&current) else {
                continue;
            };
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(record.children.values().rev().cloned());
            out.push(current);
        }

        for orphan in self.table.descendants(id) {
            if seen.insert(orphan.clone()) {
                out.push(orphan);
            }
        }
        out
    }

    /// Rewrite sibling priorities of `parent_id` from its child order
    fn renumber(&mut self, parent_id: &NodeId) {
        let Some(parent) = self.table.get(parent_id).cloned() else {
            return;
        };
        for (index, child) in parent.children.values().enumerate() {
            let expected = priority_at(self.options.priority_step, index);
            let stale = self
                .table
                .get(child)
                .is_some_and(|r| r.data.priority != Some(expected));
            if stale {
                self.table
                    .update(child, |r| r.data.priority = Some(expected));
            }
        }
    }
}

fn ensure_accepts(parent: &NodeRecord, child: &NodeRecord) -> Result<(), MutationError> {
    if parent.data.widget.accepts_child(&child.data.widget) {
        Ok(())
    } else {
        Err(MutationError::IncompatibleParent {
            parent_widget: parent.data.widget.clone(),
            child_widget: child.data.widget.clone(),
        })
    }
}

/// Child key not yet used by `holder`, based on `wanted`
fn free_key(holder: &NodeRecord, wanted: &str) -> String {
    if !holder.children.contains_key(wanted) {
        return wanted.to_string();
    }
    (2..)
        .map(|n| format!("{wanted}-{n}"))
        .find(|key| !holder.children.contains_key(key.as_str()))
        .unwrap_or_else(|| wanted.to_string())
}

fn insert_at(holder: &mut NodeRecord, position: Option<usize>, key: String, id: NodeId) {
    let len = holder.children.len();
    let index = position.map_or(len, |p| p.min(len));
    holder.children.shift_insert(index, key, id);
}

/// Stamp priorities inside freshly flattened records
fn renumber_flat(step: i64, flat: &mut IndexMap<NodeId, NodeRecord>) {
    let updates: Vec<(NodeId, i64)> = flat
        .values()
        .flat_map(|record| {
            record
                .children
                .values()
                .enumerate()
                .map(move |(index, child)| (child.clone(), priority_at(step, index)))
        })
        .collect();
    for (id, priority) in updates {
        if let Some(record) = flat.get_mut(&id) {
            record.data.priority = Some(priority);
        }
    }
}
