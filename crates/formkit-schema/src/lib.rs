//! Formkit Schema
//!
//! Node model, node factory and tree index for observation-tool form
//! documents (extended JSON Schema).
//!
//! # Core Concepts
//!
//! - [`SchemaNode`]: nested document node (attributes + ordered children)
//! - [`NodeRecord`]: flat node form held by the entity table and persisted
//! - [`NodeFactory`]: assigns stable ids through every schema position
//! - [`flatten`] / [`reconstruct`]: tree ↔ flat record conversions
//! - [`Widget`]: closed widget vocabulary deciding legal containment
//!
//! # Example
//!
//! ```rust
//! use formkit_schema::{flatten, NodeFactory};
//!
//! let factory = NodeFactory::new();
//! let document = factory.form_template(None);
//!
//! // root, two sections, one header
//! let index = flatten(&document);
//! assert_eq!(index.len(), 4);
//! ```

#![warn(unreachable_pub)]

pub mod factory;
pub mod id;
pub mod index;
pub mod node;
pub mod rule;
pub mod widget;

// Re-exports
pub use factory::{NodeFactory, DEFAULT_SCHEMA_URI_BASE};
pub use id::{IdSource, NodeId, SequentialIds, UlidIds};
pub use index::{flatten, flatten_subtree, reconstruct, ReconstructError};
pub use node::{
    Composition, Constraints, NodeData, NodeRecord, PropertyError, SchemaNode, SourceType,
    StyleOverlay, SubSchema, STRUCTURAL_KEYS,
};
pub use rule::{Condition, ConditionOperator, LogicMode, VisibilityRule};
pub use widget::{ValueType, Widget, WidgetClass};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with form schemas
    pub use crate::{
        flatten, reconstruct, NodeData, NodeFactory, NodeId, NodeRecord, SchemaNode, ValueType,
        VisibilityRule, Widget,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
