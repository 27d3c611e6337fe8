//! Tracing integration
//!
//! The [`Outcome`](tether_core::Outcome) trail is the record a caller
//! flushes. Alongside it, every attempt runs inside a `tracing` span and the
//! executor emits structured events, so a process-wide subscriber sees the
//! same calls without waiting for the trail.

use std::time::Duration;
use tracing::{Span, debug, warn};

/// Span wrapping a single attempt
pub(crate) fn attempt_span(
    operation: Option<&str>,
    method: &str,
    url: &str,
    attempt: u32,
) -> Span {
    tracing::debug_span!(
        "tether.attempt",
        operation = operation.unwrap_or(""),
        method = %method,
        url = %url,
        attempt = attempt + 1,
    )
}

/// Structured summary of a finished execution
pub(crate) fn log_finished(
    operation: Option<&str>,
    url: &str,
    success: bool,
    status: u16,
    attempts: u32,
    elapsed: Duration,
) {
    let operation = operation.unwrap_or("");
    if success {
        debug!(
            operation,
            url,
            status,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "request succeeded"
        );
    } else {
        warn!(
            operation,
            url,
            status,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "request failed"
        );
    }
}

/// Install a global `tracing` subscriber.
///
/// Honors `RUST_LOG` when set, otherwise logs at `info` in production and
/// `debug` elsewhere. Fails if a subscriber is already installed.
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub fn init_tracing(production: bool) -> crate::Result<()> {
    use tracing_subscriber::EnvFilter;

    let default_directive = if production { "info" } else { "debug" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(!production)
        .try_init()
        .map_err(|e| crate::Error::Tracing(e.to_string()))
}
