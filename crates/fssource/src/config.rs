//! Source configuration.
//!
//! The filesystem handle itself is not part of the config; it is passed
//! alongside it so the serializable part can be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{FsSourceError, Result};

/// Base path reported when none is configured.
pub const DEFAULT_BASE: &str = "/";

/// Glob patterns for paths that must not be indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    pub paths: Vec<String>,
}

impl ExcludeConfig {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// Caller-supplied name and version for the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alias {
    pub name: String,
    pub version: String,
}

impl Alias {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// True when neither a name nor a version is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.version.is_empty()
    }
}

/// Configuration for an [`FsSource`](crate::FsSource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    pub base: String,
    pub exclude: ExcludeConfig,
    pub alias: Alias,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            exclude: ExcludeConfig::default(),
            alias: Alias::default(),
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON config document. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| FsSourceError::InvalidInput(format!("invalid source config: {error}")))?;
        let base = config.base.clone();
        Ok(config.with_base(base))
    }

    /// Sets the base path; an empty value falls back to `/`.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base_path(base.into());
        self
    }

    pub fn with_exclusions<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = ExcludeConfig::new(paths);
        self
    }

    pub fn with_alias(mut self, alias: Alias) -> Self {
        self.alias = alias;
        self
    }
}

/// Ensures a base path is set.
pub fn base_path(base: String) -> String {
    if base.is_empty() {
        DEFAULT_BASE.to_string()
    } else {
        base
    }
}
