//! Error types for the mutation engine
//!
//! Every refused operation leaves the document exactly as it was.

use formkit_schema::{NodeId, PropertyError, ReconstructError, Widget};

/// Refused document mutation
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// No document is loaded
    #[error("no document loaded")]
    NoDocument,

    /// Node id not in the table
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Parent id not in the table
    #[error("parent not found: {0}")]
    ParentNotFound(NodeId),

    /// Node is not a child of the given parent
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        /// Claimed parent
        parent: NodeId,
        /// Claimed child
        child: NodeId,
    },

    /// Containment rule violated
    #[error("a {parent_widget} node cannot contain a {child_widget} node")]
    IncompatibleParent {
        /// Target parent widget
        parent_widget: Widget,
        /// Rejected child widget
        child_widget: Widget,
    },

    /// Node id already present in the table
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    /// Operation is not allowed on the root node
    #[error("operation not allowed on the root node")]
    RootNode,

    /// Node is not a top-level section
    #[error("node {0} is not a top-level section")]
    NotTopLevel(NodeId),

    /// Removing the only top-level section
    #[error("cannot remove the last top-level section {0}")]
    LastTopLevelSection(NodeId),

    /// Reparenting a node under itself or its descendant
    #[error("cannot move {node} into its own subtree at {target}")]
    MoveIntoDescendant {
        /// Node being moved
        node: NodeId,
        /// Requested new parent
        target: NodeId,
    },

    /// Document-level property must be a scalar
    #[error("document property '{0}' must be a scalar value")]
    NonScalarMeta(String),

    /// Property could not be set
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Persisted records could not be assembled into a tree
    #[error("cannot load records: {0}")]
    Reconstruct(#[from] ReconstructError),
}

impl MutationError {
    /// Check if the error is a lookup miss rather than a rule violation
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_) | Self::ParentNotFound(_) | Self::NoDocument
        )
    }
}

/// Violated document invariant, reported by
/// [`FormDocument::check_consistency`](crate::FormDocument::check_consistency)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    /// Table is non-empty but has no root
    #[error("table holds {0} records but no root is set")]
    MissingRoot(usize),

    /// A record is stored under a key different from its own id
    #[error("record stored under {key} carries id {id:?}")]
    KeyMismatch {
        /// Table key
        key: NodeId,
        /// Id inside the record
        id: Option<NodeId>,
    },

    /// A child list names an id absent from the table
    #[error("{parent} lists missing child {child}")]
    DanglingChild {
        /// Holder
        parent: NodeId,
        /// Missing id
        child: NodeId,
    },

    /// A node is listed by more than one holder
    #[error("{0} is listed by more than one parent")]
    SharedChild(NodeId),

    /// `x-parent-id` disagrees with containment
    #[error("{child} is held by {holder} but declares parent {declared:?}")]
    ParentMismatch {
        /// Node
        child: NodeId,
        /// Node whose child list holds it
        holder: NodeId,
        /// Declared parent
        declared: Option<NodeId>,
    },

    /// Table holds records not reachable from the root
    #[error("{} records are unreachable from the root", .0.len())]
    Unreachable(Vec<NodeId>),

    /// Priority disagrees with child list order
    #[error("{child} at position {index} has priority {actual:?}, expected {expected}")]
    PriorityDrift {
        /// Node
        child: NodeId,
        /// Position in the holder's child list
        index: usize,
        /// Stored priority
        actual: Option<i64>,
        /// Priority implied by position
        expected: i64,
    },
}
