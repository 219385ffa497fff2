//! Formkit Persist
//!
//! Storage collaborators for the editor: node records (structure carried by
//! `x-parent-id` only), the form catalog and the workflow list.
//!
//! # Example
//!
//! ```rust
//! use formkit_persist::{MemoryRepository, NodeRepository, FormReference};
//! use formkit_schema::NodeId;
//!
//! # tokio_test_block(async {
//! let repo = MemoryRepository::new();
//! let saved = repo
//!     .save_form_reference(FormReference::new("f1", "Survey", NodeId::new("f1")))
//!     .await
//!     .unwrap();
//! assert_eq!(saved.created_at, saved.updated_at);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod file;
pub mod memory;
pub mod records;
pub mod repository;

// Re-exports
pub use error::{PersistError, Result};
pub use file::{JsonFileRepository, FORMS_FILE, NODES_FILE, WORKFLOWS_FILE};
pub use memory::MemoryRepository;
pub use records::{FormReference, WorkflowDraft, WorkflowRecord};
pub use repository::{NodeRepository, WorkflowRepository};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
