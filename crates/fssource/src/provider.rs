//! Named factory for filesystem sources.

use std::sync::Arc;

use crate::config::{base_path, Alias, ExcludeConfig, SourceConfig};
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::error::Result;
use crate::handle::FilesystemHandle;
use crate::id::FALLBACK_NAME;
use crate::source::FsSource;

/// Builds [`FsSource`]s from a handle and its settings.
pub struct FsSourceProvider {
    fs: Arc<dyn FilesystemHandle>,
    exclude: ExcludeConfig,
    alias: Alias,
    base: String,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl FsSourceProvider {
    pub fn new(
        fs: Arc<dyn FilesystemHandle>,
        exclude: ExcludeConfig,
        alias: Alias,
        base: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            exclude,
            alias,
            base: base.into(),
            diagnostics: Arc::new(LogSink),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn name(&self) -> &'static str {
        FALLBACK_NAME
    }

    /// Creates a new source. An empty base becomes `/`.
    pub fn provide(&self) -> Result<FsSource> {
        let config = SourceConfig {
            base: base_path(self.base.clone()),
            exclude: self.exclude.clone(),
            alias: self.alias.clone(),
        };
        Ok(FsSource::with_diagnostics(
            Arc::clone(&self.fs),
            config,
            Arc::clone(&self.diagnostics),
        ))
    }
}
