//! Read-only, queryable index over an abstract filesystem.
//!
//! This crate provides:
//! - A one-pass indexer with glob-based exclusions
//! - Path, glob, and content-type search over the built index
//! - Content and metadata access plus cancellable enumeration of every file
//! - A lazily built, closable source wrapping the above

pub mod config;
pub mod content_type;
pub mod diagnostics;
pub mod error;
pub mod exclude;
pub mod handle;
pub mod id;
pub mod index;
pub mod location;
pub mod path;
pub mod provider;
pub mod resolver;
pub mod search;
pub mod source;
pub mod tree;
pub mod walk;

// Re-export main types
pub use config::{Alias, ExcludeConfig, SourceConfig};
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, RecordingSink};
pub use error::{FsSourceError, Result};
pub use exclude::{ExclusionMatcher, SkipDecision};
pub use handle::{DirEntry, DirFs, EntryInfo, EntryKind, FilesystemHandle, MemoryFs};
pub use id::{derive_artifact_id, ArtifactId};
pub use index::{Index, IndexEntry};
pub use location::Location;
pub use path::normalize_path;
pub use provider::FsSourceProvider;
pub use resolver::{FsResolver, LocationStream};
pub use search::{ResolvedRef, SearchContext};
pub use source::{Description, DirectoryMetadata, FsSource, ResolverState};
pub use tree::{NodeIndex, RefId, Tree, TreeNode};
pub use walk::{build_index, BuiltIndex, WalkStats};
pub use tokio_util::sync::CancellationToken;
