//! Per-node editor UI state
//!
//! Collapsed flags and scroll offsets live here, keyed by node id, so the
//! document core never carries presentation-only data. The store is shared
//! by reference between views.

use dashmap::DashMap;
use formkit_schema::NodeId;
use formkit_store::FormDocument;
use parking_lot::RwLock;

/// UI state of one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeUiState {
    /// Children folded away
    pub collapsed: bool,
    /// Vertical scroll offset in pixels
    pub scroll_offset: u32,
}

/// Injected store of UI-only state
#[derive(Debug, Default)]
pub struct UiStateStore {
    nodes: DashMap<NodeId, NodeUiState>,
    active_tab: RwLock<Option<NodeId>>,
}

impl UiStateStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `id`; defaults when never touched
    #[must_use]
    pub fn get(&self, id: &NodeId) -> NodeUiState {
        self.nodes.get(id).map(|entry| *entry).unwrap_or_default()
    }

    /// Whether `id` is collapsed
    #[inline]
    #[must_use]
    pub fn is_collapsed(&self, id: &NodeId) -> bool {
        self.get(id).collapsed
    }

    /// Set collapsed flag
    pub fn set_collapsed(&self, id: &NodeId, collapsed: bool) {
        self.nodes.entry(id.clone()).or_default().collapsed = collapsed;
    }

    /// Flip collapsed flag; returns the new value
    pub fn toggle_collapsed(&self, id: &NodeId) -> bool {
        let mut entry = self.nodes.entry(id.clone()).or_default();
        entry.collapsed = !entry.collapsed;
        entry.collapsed
    }

    /// Scroll offset of `id`
    #[inline]
    #[must_use]
    pub fn scroll_offset(&self, id: &NodeId) -> u32 {
        self.get(id).scroll_offset
    }

    /// Remember scroll offset
    pub fn set_scroll_offset(&self, id: &NodeId, offset: u32) {
        self.nodes.entry(id.clone()).or_default().scroll_offset = offset;
    }

    /// Currently shown top-level section
    #[must_use]
    pub fn active_tab(&self) -> Option<NodeId> {
        self.active_tab.read().clone()
    }

    /// Show a top-level section
    pub fn set_active_tab(&self, id: Option<NodeId>) {
        *self.active_tab.write() = id;
    }

    /// Drop state of nodes no longer in `document`
    ///
    /// An active tab that was removed falls back to the first top-level
    /// section. Returns the number of entries dropped.
    pub fn prune(&self, document: &FormDocument) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|id, _| document.contains(id));

        let mut active = self.active_tab.write();
        if active.as_ref().is_some_and(|id| !document.contains(id)) {
            *active = document
                .top_level()
                .first()
                .and_then(|section| section.id().cloned());
        }
        before - self.nodes.len()
    }
}
