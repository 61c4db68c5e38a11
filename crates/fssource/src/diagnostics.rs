//! Warning channel for non-fatal conditions.
//!
//! Conditions a caller may want to observe (bad exclusion patterns, entries
//! dropped during the walk, a missing alias) are reported to an injected
//! [`DiagnosticSink`] rather than straight to the global logger. The default
//! [`LogSink`] forwards to `log::warn!`; [`RecordingSink`] keeps them in memory.

use std::fmt;

use parking_lot::Mutex;

/// A non-fatal condition raised while building or identifying a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An exclusion pattern failed to compile and will never match.
    InvalidExclusion { pattern: String, message: String },
    /// Info for an entry could not be read, so it was left out of the index.
    EntrySkipped { path: String, message: String },
    /// No alias was configured, so the source ID is the generic fallback.
    MissingAlias,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidExclusion { pattern, message } => {
                write!(f, "invalid exclusion pattern={pattern:?} : {message}")
            }
            Self::EntrySkipped { path, message } => {
                write!(f, "unable to get file info for path={path:?} : {message}")
            }
            Self::MissingAlias => f.write_str(
                "no explicit name and version provided for fs source, deriving generic artifact ID (which is not ideal)",
            ),
        }
    }
}

/// Receiver for [`Diagnostic`]s.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
    }
}

/// Collects diagnostics in memory, in report order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything reported so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.events.lock().push(diagnostic);
    }
}
