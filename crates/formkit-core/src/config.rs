//! Editor configuration
//!
//! Every field has a default, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! priority_step = 10
//! validation_policy = "fail_closed"
//! data_dir = "/var/lib/formkit"
//! ```

use formkit_rules::{FieldValidator, ValidationPolicy};
use formkit_schema::{NodeFactory, DEFAULT_SCHEMA_URI_BASE};
use formkit_store::{DocumentOptions, DEFAULT_COPY_SUFFIX, DEFAULT_PRIORITY_STEP};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Value out of range
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Prefix of generated `$id` URIs
    pub schema_uri_base: String,
    /// Distance between sibling priorities
    pub priority_step: i64,
    /// Appended to the title of copied nodes
    pub copy_suffix: String,
    /// Engine failure policy of the validator
    pub validation_policy: ValidationPolicy,
    /// Directory of the JSON-file repository
    pub data_dir: PathBuf,
    /// Default `tracing` filter directive; `RUST_LOG` overrides it
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl EditorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// [`ConfigError`] if the file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] or [`ConfigError::InvalidValue`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for a non-positive priority step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.priority_step <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "priority_step",
                reason: format!("must be positive, got {}", self.priority_step),
            });
        }
        Ok(())
    }

    /// With schema URI base
    #[inline]
    #[must_use]
    pub fn with_schema_uri_base(mut self, base: impl Into<String>) -> Self {
        self.schema_uri_base = base.into();
        self
    }

    /// With priority step
    #[inline]
    #[must_use]
    pub fn with_priority_step(mut self, step: i64) -> Self {
        self.priority_step = step;
        self
    }

    /// With copy suffix
    #[inline]
    #[must_use]
    pub fn with_copy_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.copy_suffix = suffix.into();
        self
    }

    /// With validation policy
    #[inline]
    #[must_use]
    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = policy;
        self
    }

    /// With data directory
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// With log filter and format
    #[inline]
    #[must_use]
    pub fn with_logging(mut self, filter: impl Into<String>, json: bool) -> Self {
        self.log_filter = filter.into();
        self.log_json = json;
        self
    }

    /// Mutation engine options
    #[must_use]
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            priority_step: self.priority_step,
            copy_suffix: self.copy_suffix.clone(),
        }
    }

    /// Node factory using the configured URI base
    #[must_use]
    pub fn node_factory(&self) -> NodeFactory {
        NodeFactory::new().with_schema_uri_base(self.schema_uri_base.clone())
    }

    /// Validator using the configured policy
    #[must_use]
    pub fn validator(&self) -> FieldValidator {
        FieldValidator::new().with_policy(self.validation_policy)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            schema_uri_base: DEFAULT_SCHEMA_URI_BASE.to_string(),
            priority_step: DEFAULT_PRIORITY_STEP,
            copy_suffix: DEFAULT_COPY_SUFFIX.to_string(),
            validation_policy: ValidationPolicy::FailOpen,
            data_dir: PathBuf::from("./formkit-data"),
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}
