//! The outcome aggregation tree.
//!
//! An [`Outcome`] collects the result of one logical operation: a success
//! flag, the last status code and response message seen, and an ordered
//! trail of log entries. Operations that fan out create children with
//! [`Outcome::create_child`]; each child is owned by the branch that uses it
//! and ships its trail up exactly once, when it is flushed. The parent's own
//! flush waits for its children in creation order, each wait bounded by
//! [`LoggingSettings::flush_timeout`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_core::{LoggingSettings, MemorySink, Outcome};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = MemorySink::new();
//! let mut root = Outcome::with_sink(LoggingSettings::default(), Arc::new(sink.clone()));
//! root.info("loading account");
//!
//! let mut child = root.create_child();
//! tokio::spawn(async move {
//!     child.info("fetching permissions");
//!     child.flush();
//! });
//!
//! root.succeed();
//! root.flush().wait().await;
//! assert_eq!(sink.trails().len(), 1);
//! # }
//! ```

mod flush;

pub use flush::{Delivery, FlushHandle, FlushReport, INHERITED_PREFIX};

use crate::config::{ConfigProvider, LoggingSettings};
use crate::entry::{EntryTag, LogEntry};
use crate::level::Level;
use crate::sink::{LogSink, StdoutSink};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tokio::sync::oneshot;

/// The trail and level a flushed child hands to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncLogPackage {
    /// Rendered lines, already numbered by the child.
    pub messages: Vec<String>,
    /// The child's final level.
    pub level: Level,
}

/// What travels over a child edge: the package plus a receipt for the child.
#[derive(Debug)]
pub(crate) struct ChildReport {
    pub(crate) package: AsyncLogPackage,
    pub(crate) receipt: oneshot::Sender<()>,
}

/// A node in the outcome tree.
///
/// Mutated only by the flow that owns it; handed off by value through
/// [`merge_with_result`](Self::merge_with_result) or [`flush`](Self::flush).
pub struct Outcome {
    success: bool,
    entries: Vec<LogEntry>,
    level: Level,
    status_code: u16,
    response_message: String,
    settings: LoggingSettings,
    sink: Arc<dyn LogSink>,
    parent: Option<oneshot::Sender<ChildReport>>,
    children: Vec<oneshot::Receiver<ChildReport>>,
}

impl Outcome {
    /// Create a root outcome that prints to standard output.
    pub fn new(settings: LoggingSettings) -> Self {
        Self::with_sink(settings, Arc::new(StdoutSink))
    }

    /// Create a root outcome that writes its trail to `sink`.
    pub fn with_sink(settings: LoggingSettings, sink: Arc<dyn LogSink>) -> Self {
        Self {
            success: false,
            entries: Vec::new(),
            level: Level::None,
            status_code: 0,
            response_message: String::new(),
            settings,
            sink,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create a root outcome from the `LOGGING_LEVEL` of a provider.
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        Self::new(LoggingSettings::from_provider(provider))
    }

    /// Create a child wired to report to this outcome when it is flushed.
    ///
    /// Both sides get a marker entry (`[CHILD #N STARTED]` here,
    /// `[CHILD #N OUTPUT]` in the child) so the trails can be matched up.
    #[track_caller]
    pub fn create_child(&mut self) -> Outcome {
        let location = Location::caller();
        let (sender, receiver) = oneshot::channel();
        self.children.push(receiver);
        let number = self.children.len();

        let settings = LoggingSettings {
            errors_only: false,
            ..self.settings.clone()
        };
        let mut child = Outcome::with_sink(settings, Arc::clone(&self.sink));
        child.parent = Some(sender);

        self.entries.push(LogEntry::contextual(
            EntryTag::Marker(format!("CHILD #{} STARTED", number)),
            "",
            location,
        ));
        child.entries.push(LogEntry::contextual(
            EntryTag::Marker(format!("CHILD #{} OUTPUT", number)),
            "",
            location,
        ));

        child
    }

    /// Whether the operation succeeded.
    pub fn was_successful(&self) -> bool {
        self.success
    }

    /// Mark the operation successful. Independent of the log level.
    pub fn succeed(&mut self) {
        self.success = true;
    }

    /// Mark the operation failed.
    pub fn fail(&mut self) {
        self.success = false;
    }

    /// Record a debug entry. Dropped unless debug logging is enabled.
    #[track_caller]
    pub fn debug(&mut self, text: impl Into<String>) {
        if !self.settings.debug {
            return;
        }
        self.push(EntryTag::Debug, text.into(), Location::caller());
    }

    /// Record a context-free `[Message]` entry. Dropped unless debug logging
    /// is enabled; does not affect the level.
    pub fn debug_message(&mut self, text: impl Into<String>) {
        if !self.settings.debug {
            return;
        }
        self.entries.push(LogEntry::bare(EntryTag::Message, text));
    }

    /// Record an info entry and raise the level to at least `Info`.
    #[track_caller]
    pub fn info(&mut self, text: impl Into<String>) {
        self.level.raise(Level::Info);
        self.push(EntryTag::Info, text.into(), Location::caller());
    }

    /// Record an error entry and raise the level to `Error`.
    #[track_caller]
    pub fn error(&mut self, text: impl Into<String>) {
        self.level.raise(Level::Error);
        self.push(EntryTag::Error, text.into(), Location::caller());
    }

    fn push(&mut self, tag: EntryTag, text: String, location: &'static Location<'static>) {
        self.entries.push(LogEntry::contextual(tag, text, location));
    }

    /// Absorb the outcome of a nested call.
    ///
    /// Appends its entries and children, raises the level to the maximum of
    /// both, and takes over its status code and response message (the most
    /// recent merge wins).
    pub fn merge_with_result(&mut self, other: Outcome) {
        let Outcome {
            entries,
            level,
            status_code,
            response_message,
            children,
            ..
        } = other;

        self.entries.extend(entries);
        self.level.raise(level);
        self.children.extend(children);
        self.status_code = status_code;
        self.response_message = response_message;
    }

    /// Rendered entries, in insertion order.
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(LogEntry::render).collect()
    }

    /// Raw entries, in insertion order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The most recent rendered entry.
    pub fn last_message(&self) -> Option<String> {
        self.entries.last().map(LogEntry::render)
    }

    /// Highest level logged so far.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Last recorded status code, `0` when unset.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Set the status code. Last write wins.
    pub fn set_status_code(&mut self, code: u16) {
        self.status_code = code;
    }

    /// Last recorded response message, empty when unset.
    pub fn response_message(&self) -> &str {
        &self.response_message
    }

    /// Set the response message. Last write wins.
    pub fn set_response_message(&mut self, message: impl Into<String>) {
        self.response_message = message.into();
    }

    /// Logging settings this outcome was created with.
    pub fn settings(&self) -> &LoggingSettings {
        &self.settings
    }

    /// Number of child edges registered, including merged ones.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether this outcome reports to a parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("success", &self.success)
            .field("level", &self.level)
            .field("status_code", &self.status_code)
            .field("response_message", &self.response_message)
            .field("entries", &self.entries.len())
            .field("children", &self.children.len())
            .field("is_root", &self.parent.is_none())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entries.last() {
            Some(entry) => write!(f, "{}", entry),
            None => Ok(()),
        }
    }
}
