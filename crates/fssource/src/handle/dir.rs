//! Handle over a real directory on disk.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::{DirEntry, EntryInfo, EntryKind, FilesystemHandle};
use crate::path::ROOT;

/// Canonicalizes a path, returning the original if canonicalization fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

/// A [`FilesystemHandle`] confined to one directory of the host filesystem.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    /// Creates a handle rooted at `root`. The directory is not checked until
    /// the first read.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: canonicalize_existing_path(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path == ROOT {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl FilesystemHandle for DirFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            let kind = entry
                .file_type()
                .map(EntryKind::from)
                .unwrap_or(EntryKind::Other);
            entries.push(DirEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                kind,
            ));
        }
        Ok(entries)
    }

    fn info(&self, path: &str) -> io::Result<EntryInfo> {
        fs::symlink_metadata(self.resolve(path)).map(|metadata| EntryInfo::from_fs_metadata(&metadata))
    }

    /// Opens a regular file. Symlinks are refused, as is any path whose
    /// canonical form lies outside the root.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        let resolved = self.resolve(path);
        if fs::symlink_metadata(&resolved)?.file_type().is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to open symlink: {path}"),
            ));
        }
        if !fs::canonicalize(&resolved)?.starts_with(&self.root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("path escapes {}: {path}", self.root.display()),
            ));
        }
        let file = fs::File::open(resolved)?;
        Ok(Box::new(file))
    }

    fn read_link(&self, path: &str) -> io::Result<String> {
        let target = fs::read_link(self.resolve(path))?;
        if target.is_relative() {
            return Ok(target.to_string_lossy().replace('\\', "/"));
        }
        match target.strip_prefix(&self.root) {
            Ok(inside) => Ok(format!("/{}", inside.to_string_lossy().replace('\\', "/"))),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("link target {} is outside {}", target.display(), self.root.display()),
            )),
        }
    }
}
