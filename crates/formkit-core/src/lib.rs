//! Formkit Core
//!
//! Editor-facing layer over the document store: the [`EditorSession`]
//! save/load boundary, the read-only presentation [`view`], UI-only state,
//! configuration and logging setup. The `formkit` binary is built on it.
//!
//! # Example
//!
//! ```rust
//! use formkit_core::{EditorConfig, EditorSession};
//! use formkit_persist::MemoryRepository;
//! use formkit_rules::Answers;
//! use std::sync::Arc;
//!
//! let config = EditorConfig::new().with_priority_step(10);
//! let mut session = EditorSession::new(&config, Arc::new(MemoryRepository::new()));
//! session.new_form(None);
//!
//! let view = session.view(&Answers::new()).unwrap();
//! assert_eq!(view.children().len(), 2);
//! assert!(session.validate(&Answers::new()).is_empty());
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod session;
pub mod ui_state;
pub mod view;

// Re-exports
pub use config::{ConfigError, EditorConfig};
pub use error::{EditorError, Result};
pub use report::CheckReport;
pub use session::{validate_document, EditorSession};
pub use ui_state::{NodeUiState, UiStateStore};
pub use view::{project, DisplayView, QuestionView, SectionView, ViewCommon, ViewNode};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the editor
    pub use crate::{EditorConfig, EditorError, EditorSession, UiStateStore, ViewNode};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
