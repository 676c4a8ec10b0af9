//! Call-site provenance for healing proposals.
//!
//! The caller states where the healed action lives in its test code, either
//! with [`SourceLocation::caller`] (via `#[track_caller]`) or the
//! [`source_location!`](crate::source_location) macro. No stack walking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

/// File and line of the test code that issued an action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path as the compiler reports it
    pub file: String,
    /// 1-based line number
    pub line: u32,
}

impl SourceLocation {
    /// Create a location
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of whoever called the `#[track_caller]` chain ending here
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    /// Placeholder for actions issued outside test code
    #[must_use]
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0)
    }

    /// Whether this is the placeholder location
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.file == "<unknown>"
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Expands to the [`SourceLocation`] of the macro invocation
#[macro_export]
macro_rules! source_location {
    () => {
        $crate::provenance::SourceLocation::new(file!(), line!())
    };
}
