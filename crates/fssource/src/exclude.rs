//! Exclusion matching for the walker.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{FsSourceError, Result};
use crate::path::{normalize_path, ROOT};

/// Outcome of checking an entry against the exclusion patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDecision {
    Keep,
    /// Skip this file only.
    SkipEntry,
    /// Skip this directory and everything beneath it.
    PruneSubtree,
}

impl SkipDecision {
    pub fn skip(self) -> bool {
        !matches!(self, Self::Keep)
    }

    pub fn prune_subtree(self) -> bool {
        matches!(self, Self::PruneSubtree)
    }
}

/// Compiles a shell-style glob with the crate's path semantics.
///
/// `*`, `?` and character classes stay within one path segment; `**` as a
/// whole segment spans any number of directories, including none.
pub(crate) fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|error| FsSourceError::InvalidPattern {
            pattern: pattern.to_string(),
            message: error.kind().to_string(),
        })
}

/// Decides which walked entries are left out of the index.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    set: GlobSet,
    patterns: Vec<String>,
}

impl ExclusionMatcher {
    /// Compiles the patterns after cleaning them like index keys, so
    /// `./vendor`, `/vendor` and `vendor/` are the same pattern. Malformed
    /// patterns are reported once to `diagnostics` and never match.
    pub fn new<S: AsRef<str>>(patterns: &[S], diagnostics: &dyn DiagnosticSink) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut accepted = Vec::new();

        for raw in patterns {
            let pattern = normalize_path(raw.as_ref());
            let pattern = pattern.as_str();
            match compile_glob(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    accepted.push(pattern.to_string());
                }
                Err(FsSourceError::InvalidPattern { pattern, message }) => {
                    diagnostics.report(Diagnostic::InvalidExclusion { pattern, message });
                }
                Err(other) => {
                    diagnostics.report(Diagnostic::InvalidExclusion {
                        pattern: pattern.to_string(),
                        message: other.to_string(),
                    });
                }
            }
        }

        let set = match builder.build() {
            Ok(set) => set,
            Err(error) => {
                for pattern in accepted.drain(..) {
                    diagnostics.report(Diagnostic::InvalidExclusion {
                        pattern,
                        message: error.to_string(),
                    });
                }
                GlobSet::empty()
            }
        };

        Self {
            set,
            patterns: accepted,
        }
    }

    /// A matcher that never skips anything.
    pub fn none() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Patterns that compiled successfully.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Checks a normalized path. The root is never excluded.
    pub fn should_skip(&self, path: &str, is_dir: bool) -> SkipDecision {
        if path == ROOT || !self.set.is_match(path) {
            return SkipDecision::Keep;
        }
        if is_dir {
            SkipDecision::PruneSubtree
        } else {
            SkipDecision::SkipEntry
        }
    }
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::none()
    }
}
