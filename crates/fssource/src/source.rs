//! Lifecycle of a filesystem source.
//!
//! An [`FsSource`] starts unbuilt. The first call to
//! [`FsSource::file_resolver`] walks the filesystem and caches the resulting
//! [`FsResolver`]; concurrent first callers wait for that single build and all
//! receive the same resolver. [`FsSource::close`] drops the cached resolver and
//! every later request fails with [`FsSourceError::Closed`].

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::SourceConfig;
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::error::{FsSourceError, Result};
use crate::exclude::ExclusionMatcher;
use crate::handle::FilesystemHandle;
use crate::id::{derive_artifact_id, ArtifactId, FALLBACK_NAME};
use crate::resolver::FsResolver;

/// Lifecycle state of a source.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum ResolverState {
    Unbuilt = 0,
    Built = 1,
    Closed = 2,
}

impl ResolverState {
    pub fn load(atomic: &AtomicU8) -> Self {
        match atomic.load(Ordering::Acquire) {
            1 => Self::Built,
            2 => Self::Closed,
            _ => Self::Unbuilt,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unbuilt => "unbuilt",
            Self::Built => "built",
            Self::Closed => "closed",
        }
    }
}

enum Slot {
    Unbuilt,
    Built(Arc<FsResolver>),
    Closed,
}

/// Where a source's files come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMetadata {
    pub path: String,
    pub base: String,
}

/// Summary of a source for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub id: ArtifactId,
    pub name: String,
    pub version: String,
    pub metadata: DirectoryMetadata,
}

/// A filesystem handle plus the configuration used to index it.
pub struct FsSource {
    id: ArtifactId,
    config: SourceConfig,
    fs: Arc<dyn FilesystemHandle>,
    exclusions: ExclusionMatcher,
    diagnostics: Arc<dyn DiagnosticSink>,
    /// Mirror of `resolver` for lock-free `state()` reads. Transitions are
    /// only ever decided under the mutex.
    state: AtomicU8,
    resolver: Mutex<Slot>,
}

impl FsSource {
    /// Creates a source that reports diagnostics through `log`.
    pub fn new(fs: Arc<dyn FilesystemHandle>, config: SourceConfig) -> Self {
        Self::with_diagnostics(fs, config, Arc::new(LogSink))
    }

    /// Creates a source with an explicit diagnostics sink.
    ///
    /// The artifact ID is derived and exclusion patterns are compiled here,
    /// so their diagnostics are reported once per source.
    pub fn with_diagnostics(
        fs: Arc<dyn FilesystemHandle>,
        config: SourceConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let id = derive_artifact_id(&config.alias, diagnostics.as_ref());
        let exclusions = ExclusionMatcher::new(config.exclude.paths.as_slice(), diagnostics.as_ref());
        Self {
            id,
            config,
            fs,
            exclusions,
            diagnostics,
            state: AtomicU8::new(ResolverState::Unbuilt as u8),
            resolver: Mutex::new(Slot::Unbuilt),
        }
    }

    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Current lifecycle state, read without taking the lock.
    pub fn state(&self) -> ResolverState {
        ResolverState::load(&self.state)
    }

    pub fn describe(&self) -> Description {
        let alias = &self.config.alias;
        let name = if alias.name.is_empty() {
            FALLBACK_NAME.to_string()
        } else {
            alias.name.clone()
        };

        Description {
            id: self.id.clone(),
            name,
            version: alias.version.clone(),
            metadata: DirectoryMetadata {
                path: FALLBACK_NAME.to_string(),
                base: self.config.base.clone(),
            },
        }
    }

    /// Returns the resolver, building it on first use.
    ///
    /// A failed build leaves the source unbuilt, so the next call retries.
    pub fn file_resolver(&self) -> Result<Arc<FsResolver>> {
        let mut slot = self.resolver.lock();
        match &*slot {
            Slot::Built(resolver) => return Ok(Arc::clone(resolver)),
            Slot::Closed => return Err(FsSourceError::Closed),
            Slot::Unbuilt => {}
        }

        log::debug!("building fs resolver id={} base={}", self.id, self.config.base);
        let resolver = FsResolver::new(
            Arc::clone(&self.fs),
            self.config.base.clone(),
            &self.exclusions,
            self.diagnostics.as_ref(),
        )
        .map_err(|error| {
            log::warn!("unable to create fs resolver id={}: {error}", self.id);
            error
        })?;

        let resolver = Arc::new(resolver);
        *slot = Slot::Built(Arc::clone(&resolver));
        self.state
            .store(ResolverState::Built as u8, Ordering::Release);
        Ok(resolver)
    }

    /// Drops the cached resolver. Resolvers already handed out stay usable.
    pub fn close(&self) {
        let mut slot = self.resolver.lock();
        *slot = Slot::Closed;
        self.state
            .store(ResolverState::Closed as u8, Ordering::Release);
    }
}

impl fmt::Debug for FsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsSource")
            .field("id", &self.id)
            .field("base", &self.config.base)
            .field("state", &self.state().as_str())
            .finish()
    }
}
