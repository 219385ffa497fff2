//! Error types for the repositories

use std::path::PathBuf;

/// Errors reading or writing persisted records
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// IO error on a backing file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file holds malformed JSON
    #[error("malformed data in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Record to update does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Record carries no id and cannot be keyed
    #[error("{0} record has no id")]
    MissingId(&'static str),
}

impl PersistError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create serialization error for path
    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }

    /// Create not-found error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if a retry could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self,
            Self::Io { source, .. } if matches!(
                source.kind(),
                ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
            )
        )
    }
}

/// Result alias for repository calls
pub type Result<T> = std::result::Result<T, PersistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_io_is_retryable() {
        let interrupted = std::io::Error::new(std::io::ErrorKind::Interrupted, "signal");
        assert!(PersistError::io_error("nodes.json", interrupted).is_retryable());

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!PersistError::io_error("nodes.json", denied).is_retryable());
        assert!(!PersistError::not_found("workflow", "w1").is_retryable());
    }

    #[test]
    fn messages_name_the_record() {
        let err = PersistError::not_found("form", "f1");
        assert_eq!(err.to_string(), "form not found: f1");
    }
}
