//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable has no value in any layer.
    #[error("could not load config variable: {0}")]
    Missing(String),

    /// A config file exists but could not be read.
    #[error("could not read config file {}: {source}", path.display())]
    Read {
        /// File that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A config file is not a flat JSON object of strings.
    #[error("could not parse config file {}: {source}", path.display())]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}
