//! Error types for tether
//!
//! Request execution never returns an error: its failures are recorded on
//! the [`Outcome`](tether_core::Outcome). These errors cover setting the
//! executor up.

use tether_core::ConfigError;
use tether_transport::TransportError;
use thiserror::Error;

/// Result type alias for tether operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while wiring an executor together
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not be constructed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A global tracing subscriber could not be installed
    #[error("Tracing setup failed: {0}")]
    Tracing(String),
}
