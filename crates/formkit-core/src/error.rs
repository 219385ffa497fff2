//! Error types for the editor session

use crate::config::ConfigError;
use formkit_persist::PersistError;
use formkit_store::{ConsistencyError, MutationError};

/// Main editor error type
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// No document is loaded
    #[error("no document loaded")]
    NoDocument,

    /// Document edit refused
    #[error("edit refused: {0}")]
    Mutation(#[from] MutationError),

    /// Document failed its consistency check
    #[error("document inconsistent: {0}")]
    Inconsistent(#[from] ConsistencyError),

    /// Storage failed
    #[error("storage error: {0}")]
    Persist(#[from] PersistError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl EditorError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persist(e) if e.is_retryable())
    }
}

/// Result alias for session calls
pub type Result<T> = std::result::Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_only_for_transient_storage_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk");
        assert!(EditorError::from(PersistError::io_error("nodes.json", io)).is_retryable());
        assert!(!EditorError::NoDocument.is_retryable());
        assert!(!EditorError::from(MutationError::RootNode).is_retryable());
    }
}
