//! Formkit Store
//!
//! Normalized node table and mutation engine for form documents.
//!
//! # Core Concepts
//!
//! - [`NodeTable`]: id → record arena with a parent back-reference index
//! - [`FormDocument`]: the editable document; every edit is atomic
//! - [`DocumentSnapshot`]: O(1) frozen copy handed to the save boundary
//!
//! # Example
//!
//! ```rust
//! use formkit_schema::{SchemaNode, Widget};
//! use formkit_store::FormDocument;
//!
//! let mut doc = FormDocument::new();
//! let template = doc.factory().form_template(None);
//! doc.replace_document(Some(template));
//!
//! let section = doc.top_level()[0].id().cloned().unwrap();
//! let question = SchemaNode::widget(Widget::ShortText).with_title("Name");
//! doc.add_child(&section, question, None).unwrap();
//!
//! assert_eq!(doc.len(), 5);
//! assert!(doc.check_consistency().is_ok());
//! ```

#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod snapshot;
pub mod table;

// Re-exports
pub use document::{DocumentOptions, FormDocument, DEFAULT_COPY_SUFFIX, DEFAULT_PRIORITY_STEP};
pub use error::{ConsistencyError, MutationError};
pub use snapshot::DocumentSnapshot;
pub use table::{Entities, NodeTable};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for editing form documents
    pub use crate::{DocumentOptions, DocumentSnapshot, FormDocument, MutationError};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
