//! Filesystem capability consumed by the indexer.
//!
//! The index never touches `std::fs` directly. Everything goes through a
//! [`FilesystemHandle`], which may be a real directory ([`DirFs`]), an
//! in-memory tree ([`MemoryFs`]), or anything else that can list directories
//! and open files by path.
//!
//! Paths handed to a handle are always normalized index keys: relative to the
//! filesystem root, slash-separated, with `"."` naming the root.

mod dir;
mod memory;

use std::fmt;
use std::io::{self, Read};

use serde::{Deserialize, Serialize};

pub use dir::DirFs;
pub use memory::MemoryFs;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }

    #[inline]
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<std::fs::FileType> for EntryKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_file() {
            Self::File
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Base name of the entry.
    pub name: String,
    /// Kind as reported by the listing (symlinks are not followed).
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Platform metadata for an entry, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub kind: EntryKind,
    pub size: u64,
    /// Permission bits; 0 when the platform has none.
    pub mode: u32,
    /// Unix timestamps in seconds.
    pub modified_at: Option<u64>,
    pub created_at: Option<u64>,
}

impl EntryInfo {
    pub fn new(kind: EntryKind, size: u64) -> Self {
        Self {
            kind,
            size,
            mode: 0,
            modified_at: None,
            created_at: None,
        }
    }

    /// Creates info from `std::fs` metadata.
    pub fn from_fs_metadata(metadata: &std::fs::Metadata) -> Self {
        use std::time::UNIX_EPOCH;

        let created_at = metadata
            .created()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        let modified_at = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        Self {
            kind: EntryKind::from(metadata.file_type()),
            size: metadata.len(),
            mode: mode_bits(metadata),
            modified_at,
            created_at,
        }
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Read-only access to a directory tree.
///
/// Implementations must be safe to call from several threads at once.
pub trait FilesystemHandle: Send + Sync {
    /// Lists the direct children of a directory.
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    /// Returns metadata for an entry without following symlinks.
    fn info(&self, path: &str) -> io::Result<EntryInfo>;

    /// Opens a file for reading. The caller owns (and drops) the reader.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>>;

    /// Returns the target of a symlink as seen from inside this filesystem.
    ///
    /// Absolute targets are rooted at the filesystem root. Handles without
    /// symlink support keep the default.
    fn read_link(&self, path: &str) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("symlinks are not supported: {path}"),
        ))
    }
}
