#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core abstractions for tether.
//!
//! This crate provides the pieces shared by every tether crate:
//!
//! - **Outcome aggregation tree** via [`Outcome`]
//!   - Ordered, level-tagged log trails
//!   - Child outcomes for concurrent branches, drained in creation order
//!   - Bounded, non-blocking [`Outcome::flush`]
//! - **Log sinks** via [`LogSink`], with a separate degraded channel
//! - **Configuration** via [`ConfigProvider`] and the [`LoggingSettings`] snapshot
//! - **Fixed-delay attempt schedules** via [`RetrySchedule`]
//!
//! # Examples
//!
//! ```rust
//! use tether_core::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = StaticConfig::new().with("LOGGING_LEVEL", "DEBUG");
//! let mut outcome = Outcome::from_provider(&config);
//! outcome.debug("starting");
//! outcome.succeed();
//! outcome.flush();
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod level;
pub mod outcome;
pub mod retry;
pub mod sink;

pub use config::{
    ConfigProvider, LayeredConfig, LoggingLevel, LoggingSettings, StaticConfig,
    DEFAULT_FLUSH_TIMEOUT, LOGGING_LEVEL_VAR,
};
pub use entry::{EntryTag, LogEntry};
pub use error::ConfigError;
pub use level::Level;
pub use outcome::{AsyncLogPackage, Delivery, FlushHandle, FlushReport, Outcome, INHERITED_PREFIX};
pub use retry::RetrySchedule;
pub use sink::{LogSink, MemorySink, StdoutSink};

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use tether_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigProvider, LayeredConfig, LoggingSettings, StaticConfig};
    pub use crate::level::Level;
    pub use crate::outcome::{FlushHandle, Outcome};
    pub use crate::sink::{LogSink, MemorySink, StdoutSink};
}
