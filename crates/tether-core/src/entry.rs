//! Individual log entries recorded by an [`Outcome`](crate::Outcome).

use chrono::{DateTime, Local, SecondsFormat};
use std::fmt;
use std::panic::Location;
use std::path::Path;

/// The header printed in front of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTag {
    /// `[Debug]`
    Debug,
    /// `[Info]`
    Info,
    /// `[Error]`
    Error,
    /// `[Message]`, a context-free debug line.
    Message,
    /// A free-form bracketed marker such as `[CHILD #1 STARTED]`.
    Marker(String),
}

impl fmt::Display for EntryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "[Debug]"),
            Self::Info => write!(f, "[Info]"),
            Self::Error => write!(f, "[Error]"),
            Self::Message => write!(f, "[Message]"),
            Self::Marker(label) => write!(f, "[{}]", label),
        }
    }
}

/// One line of an outcome's trail.
///
/// Contextual entries carry the caller location and are rendered with their
/// timestamp; bare entries (`[Message]`) render only the tag and text.
#[derive(Debug, Clone)]
pub struct LogEntry {
    tag: EntryTag,
    text: String,
    location: Option<&'static Location<'static>>,
    timestamp: DateTime<Local>,
}

impl LogEntry {
    /// Create an entry that records where it was logged from.
    pub fn contextual(
        tag: EntryTag,
        text: impl Into<String>,
        location: &'static Location<'static>,
    ) -> Self {
        Self {
            tag,
            text: trim_newline(text.into()),
            location: Some(location),
            timestamp: Local::now(),
        }
    }

    /// Create an entry without caller context.
    pub fn bare(tag: EntryTag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: trim_newline(text.into()),
            location: None,
            timestamp: Local::now(),
        }
    }

    /// The entry's header tag.
    pub fn tag(&self) -> &EntryTag {
        &self.tag
    }

    /// The message text, without trailing newline.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the entry was logged from, if recorded.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }

    /// When the entry was created.
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Render the entry as a single trail line.
    ///
    /// `[Info] text  2024-05-01T10:00:00-06:00  executor.rs::42`
    pub fn render(&self) -> String {
        match self.location {
            Some(location) => {
                let file = Path::new(location.file())
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| location.file().to_string());
                format!(
                    "{} {}  {}  {}::{}",
                    self.tag,
                    self.text,
                    self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
                    file,
                    location.line()
                )
            }
            None => format!("{} {}", self.tag, self.text),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn trim_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
    }
    text
}
