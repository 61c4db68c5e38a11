//! In-memory filesystem handle.
//!
//! Useful for synthetic trees and for exercising failure paths: any entry can
//! be made to fail its info lookup, and any directory can be made unreadable.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read};
use std::ops::Bound;
use std::sync::Arc;

use super::{DirEntry, EntryInfo, EntryKind, FilesystemHandle};
use crate::path::{normalize_path, parent_of, ROOT};

#[derive(Debug, Clone)]
enum MemoryNode {
    Dir,
    File(Arc<[u8]>),
    Symlink(String),
}

impl MemoryNode {
    fn kind(&self) -> EntryKind {
        match self {
            Self::Dir => EntryKind::Directory,
            Self::File(_) => EntryKind::File,
            Self::Symlink(_) => EntryKind::Symlink,
        }
    }
}

/// A [`FilesystemHandle`] backed by a map of normalized paths.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    nodes: BTreeMap<String, MemoryNode>,
    info_failures: BTreeSet<String>,
    read_dir_failures: BTreeSet<String>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Creates a filesystem holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT.to_string(), MemoryNode::Dir);
        Self {
            nodes,
            info_failures: BTreeSet::new(),
            read_dir_failures: BTreeSet::new(),
        }
    }

    /// Adds a file, creating missing parent directories.
    pub fn with_file(mut self, path: &str, contents: impl AsRef<[u8]>) -> Self {
        let path = normalize_path(path);
        self.ensure_parents(&path);
        self.nodes
            .insert(path, MemoryNode::File(Arc::from(contents.as_ref())));
        self
    }

    /// Adds an empty directory, creating missing parents.
    pub fn with_dir(mut self, path: &str) -> Self {
        let path = normalize_path(path);
        self.ensure_parents(&path);
        self.nodes.insert(path, MemoryNode::Dir);
        self
    }

    /// Adds a symlink. `target` is stored verbatim.
    pub fn with_symlink(mut self, path: &str, target: &str) -> Self {
        let path = normalize_path(path);
        self.ensure_parents(&path);
        self.nodes
            .insert(path, MemoryNode::Symlink(target.to_string()));
        self
    }

    /// Makes `info` fail for the given path.
    pub fn with_info_failure(mut self, path: &str) -> Self {
        self.info_failures.insert(normalize_path(path));
        self
    }

    /// Makes `read_dir` fail for the given directory.
    pub fn with_read_dir_failure(mut self, path: &str) -> Self {
        self.read_dir_failures.insert(normalize_path(path));
        self
    }

    fn ensure_parents(&mut self, path: &str) {
        let mut parent = parent_of(path);
        while parent != ROOT {
            self.nodes
                .entry(parent.to_string())
                .or_insert(MemoryNode::Dir);
            parent = parent_of(parent);
        }
    }

    fn node(&self, path: &str) -> io::Result<&MemoryNode> {
        self.nodes
            .get(path)
            .ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {path}"))
}

impl FilesystemHandle for MemoryFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        if self.read_dir_failures.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot read directory: {path}"),
            ));
        }
        match self.node(path)? {
            MemoryNode::Dir => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a directory: {path}"),
                ))
            }
        }

        if path == ROOT {
            return Ok(self
                .nodes
                .iter()
                .filter(|(key, _)| key.as_str() != ROOT && !key.contains('/'))
                .map(|(key, node)| DirEntry::new(key.as_str(), node.kind()))
                .collect());
        }

        // Descendants of `path` are contiguous in key order from `path/`.
        let prefix = format!("{path}/");
        Ok(self
            .nodes
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, node)| {
                let name = &key[prefix.len()..];
                (!name.contains('/')).then(|| DirEntry::new(name, node.kind()))
            })
            .collect())
    }

    fn info(&self, path: &str) -> io::Result<EntryInfo> {
        if self.info_failures.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot stat: {path}"),
            ));
        }
        let node = self.node(path)?;
        let (size, mode) = match node {
            MemoryNode::Dir => (0, 0o755),
            MemoryNode::File(contents) => (contents.len() as u64, 0o644),
            MemoryNode::Symlink(target) => (target.len() as u64, 0o777),
        };
        Ok(EntryInfo {
            mode,
            ..EntryInfo::new(node.kind(), size)
        })
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        match self.node(path)? {
            MemoryNode::File(contents) => Ok(Box::new(Cursor::new(contents.clone()))),
            MemoryNode::Dir => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {path}"),
            )),
            MemoryNode::Symlink(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a symlink: {path}"),
            )),
        }
    }

    fn read_link(&self, path: &str) -> io::Result<String> {
        match self.node(path)? {
            MemoryNode::Symlink(target) => Ok(target.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {path}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_are_created() {
        let fs = MemoryFs::new().with_file("dir/sub/c.txt", "c");

        assert_eq!(fs.info("dir").unwrap().kind, EntryKind::Directory);
        assert_eq!(fs.info("dir/sub").unwrap().kind, EntryKind::Directory);
        assert_eq!(
            fs.read_dir(".").unwrap(),
            vec![DirEntry::new("dir", EntryKind::Directory)]
        );
        assert_eq!(
            fs.read_dir("dir/sub").unwrap(),
            vec![DirEntry::new("c.txt", EntryKind::File)]
        );
    }

    #[test]
    fn listing_ignores_names_sharing_a_prefix() {
        let fs = MemoryFs::new()
            .with_file("dir.txt", "x")
            .with_file("dir-other/x", "x")
            .with_file("dir/a", "a")
            .with_file("dir/sub/b", "b")
            .with_file("dirz", "z");

        assert_eq!(
            fs.read_dir("dir").unwrap(),
            vec![
                DirEntry::new("a", EntryKind::File),
                DirEntry::new("sub", EntryKind::Directory),
            ]
        );
        assert_eq!(
            fs.read_dir("dir/sub").unwrap(),
            vec![DirEntry::new("b", EntryKind::File)]
        );
        let names: Vec<_> = fs
            .read_dir(".")
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["dir", "dir-other", "dir.txt", "dirz"]);
    }

    #[test]
    fn open_returns_stored_bytes() {
        let fs = MemoryFs::new().with_file("./a.txt", b"hello");
        let mut contents = Vec::new();
        fs.open("a.txt").unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"hello");
        assert_eq!(fs.info("a.txt").unwrap().size, 5);
    }

    #[test]
    fn directories_cannot_be_opened() {
        let fs = MemoryFs::new().with_dir("empty");
        assert!(fs.open("empty").is_err());
        assert!(fs.read_dir("empty").unwrap().is_empty());
    }

    #[test]
    fn injected_failures() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_dir("locked")
            .with_info_failure("a.txt")
            .with_read_dir_failure("locked");

        assert_eq!(
            fs.info("a.txt").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        assert!(fs.read_dir("locked").is_err());
        // The listing itself still shows the entry.
        assert_eq!(fs.read_dir(".").unwrap().len(), 2);
    }

    #[test]
    fn symlinks_report_their_target() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_symlink("link", "a.txt");
        assert_eq!(fs.info("link").unwrap().kind, EntryKind::Symlink);
        assert_eq!(fs.read_link("link").unwrap(), "a.txt");
        assert!(fs.read_link("a.txt").is_err());
    }
}
