//! Destinations for flushed outcome trails.
//!
//! A root outcome writes its aggregated trail through [`LogSink::write_trail`].
//! A child whose parent never picks up its trail falls back to
//! [`LogSink::write_degraded`] so nothing is silently lost.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives rendered trails from flushed outcomes.
pub trait LogSink: Send + Sync + fmt::Debug {
    /// Write the trail of a root outcome.
    fn write_trail(&self, trail: &str);

    /// Write the trail of a child whose parent never received it.
    fn write_degraded(&self, trail: &str) {
        self.write_trail(trail);
    }
}

/// Writes trails to the process's standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_trail(&self, trail: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = writeln!(stdout, "{}", trail) {
            tracing::warn!(error = %err, "failed to write outcome trail to stdout");
        }
    }

    fn write_degraded(&self, trail: &str) {
        tracing::warn!(
            trail_len = trail.len(),
            "parent outcome never received child trail, writing it locally"
        );
        self.write_trail(trail);
    }
}

#[derive(Debug, Default)]
struct Captured {
    trails: Vec<String>,
    degraded: Vec<String>,
}

/// Captures trails in memory, keeping normal and degraded writes apart.
///
/// Clones share the same buffer, so a clone handed to an outcome can be
/// inspected from the test that created it.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    captured: Arc<Mutex<Captured>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trails written by root outcomes, in write order.
    pub fn trails(&self) -> Vec<String> {
        self.lock().trails.clone()
    }

    /// Trails written through the degraded fallback, in write order.
    pub fn degraded(&self) -> Vec<String> {
        self.lock().degraded.clone()
    }

    /// True when nothing has been written to either channel.
    pub fn is_empty(&self) -> bool {
        let captured = self.lock();
        captured.trails.is_empty() && captured.degraded.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for MemorySink {
    fn write_trail(&self, trail: &str) {
        self.lock().trails.push(trail.to_string());
    }

    fn write_degraded(&self, trail: &str) {
        self.lock().degraded.push(trail.to_string());
    }
}
