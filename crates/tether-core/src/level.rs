//! Importance level carried by an outcome.

use std::fmt;

/// How important the entries collected so far are.
///
/// Ordering follows severity, so the level of an outcome is always the
/// maximum of everything logged into it (or merged into it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Only debug entries (or nothing) have been written.
    #[default]
    None = 0,
    /// At least one info entry was written.
    Info = 1,
    /// At least one error entry was written.
    Error = 2,
}

impl Level {
    /// Raise `self` to `other` if `other` is more severe. Never lowers.
    pub fn raise(&mut self, other: Level) {
        if other > *self {
            *self = other;
        }
    }

    /// Numeric value used by the wire-compatible log package.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}
