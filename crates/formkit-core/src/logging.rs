//! Log subscriber installation for binaries

use crate::config::EditorConfig;
use crate::error::EditorError;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins over the configured filter. Fails if a subscriber is
/// already installed or the filter does not parse.
///
/// # Errors
/// [`EditorError::Logging`].
pub fn init(config: &EditorConfig) -> Result<(), EditorError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .map_err(|e| EditorError::Logging(format!("bad filter '{}': {e}", config.log_filter)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EditorError::Logging(e.to_string()))
}
