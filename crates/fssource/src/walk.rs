//! One-pass indexing of a filesystem handle.
//!
//! The walk is depth-first from the root with siblings visited in name order.
//! Per-directory entry info and content sniffing fan out over rayon, then the
//! results are inserted sequentially so tree order stays deterministic.

use std::io;
use std::time::Instant;

use rayon::prelude::*;

use crate::content_type::detect_content_type;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{FsSourceError, Result};
use crate::exclude::ExclusionMatcher;
use crate::handle::{EntryInfo, EntryKind, FilesystemHandle};
use crate::index::{Index, IndexEntry};
use crate::path::{self, ROOT};
use crate::tree::{next_generation, NodeIndex, Tree};

/// Counters collected while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
    pub other: usize,
    /// Entries dropped because their info could not be read.
    pub skipped: usize,
    /// Entries (or whole subtrees) left out by exclusion patterns.
    pub excluded: usize,
}

/// Output of [`build_index`]. Immutable from here on.
#[derive(Debug)]
pub struct BuiltIndex {
    pub tree: Tree,
    pub index: Index,
    pub stats: WalkStats,
}

/// Walks `fs` once and builds the tree and index.
///
/// Failing to read a directory (or the root's own info) aborts the whole
/// build. Failing to read a single entry's info is reported to `diagnostics`
/// and that entry is skipped.
pub fn build_index(
    fs: &dyn FilesystemHandle,
    exclusions: &ExclusionMatcher,
    diagnostics: &dyn DiagnosticSink,
) -> Result<BuiltIndex> {
    let started = Instant::now();
    let generation = next_generation();

    let root_info = fs
        .info(ROOT)
        .map_err(|source| FsSourceError::walk(ROOT, source))?;
    if !root_info.kind.is_dir() {
        return Err(FsSourceError::walk(
            ROOT,
            io::Error::new(io::ErrorKind::InvalidInput, "root is not a directory"),
        ));
    }

    let mut walker = Walker {
        fs,
        exclusions,
        diagnostics,
        tree: Tree::new(generation),
        index: Index::new(generation),
        stats: WalkStats::default(),
    };

    let root = walker.tree.root();
    walker
        .index
        .insert(IndexEntry::new(walker.tree.reference(root), ROOT, &root_info));
    walker.stats.dirs += 1;
    walker.walk_dir(ROOT, root)?;

    let Walker {
        tree, index, stats, ..
    } = walker;

    log::info!(
        "fs index built generation={} entries={} files={} dirs={} symlinks={} skipped={} excluded={} elapsed_ms={}",
        generation,
        tree.len(),
        stats.files,
        stats.dirs,
        stats.symlinks,
        stats.skipped,
        stats.excluded,
        started.elapsed().as_millis(),
    );

    Ok(BuiltIndex { tree, index, stats })
}

struct Walker<'a> {
    fs: &'a dyn FilesystemHandle,
    exclusions: &'a ExclusionMatcher,
    diagnostics: &'a dyn DiagnosticSink,
    tree: Tree,
    index: Index,
    stats: WalkStats,
}

/// An entry whose info has been read.
struct Scanned {
    info: EntryInfo,
    content_type: Option<&'static str>,
    link_target: Option<String>,
}

impl Walker<'_> {
    fn walk_dir(&mut self, dir_path: &str, dir_node: NodeIndex) -> Result<()> {
        let mut entries = self
            .fs
            .read_dir(dir_path)
            .map_err(|source| FsSourceError::walk(dir_path, source))?;
        entries.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        entries.dedup_by(|a, b| a.name == b.name);

        let exclusions = self.exclusions;
        let mut excluded = 0;
        let kept: Vec<(String, String)> = entries
            .into_iter()
            .filter_map(|entry| {
                if !is_valid_name(&entry.name) {
                    log::debug!("ignoring invalid entry name {:?} in {dir_path}", entry.name);
                    return None;
                }
                let entry_path = path::join(dir_path, &entry.name);
                let decision = exclusions.should_skip(&entry_path, entry.kind.is_dir());
                if decision.skip() {
                    log::debug!(
                        "excluding path={entry_path} prune_subtree={}",
                        decision.prune_subtree()
                    );
                    excluded += 1;
                    return None;
                }
                Some((entry.name, entry_path))
            })
            .collect();
        self.stats.excluded += excluded;

        let fs = self.fs;
        let scanned: Vec<(String, String, io::Result<Scanned>)> = kept
            .into_par_iter()
            .map(|(name, entry_path)| {
                let outcome = scan_entry(fs, &entry_path, &name);
                (name, entry_path, outcome)
            })
            .collect();

        for (name, entry_path, outcome) in scanned {
            let scanned = match outcome {
                Ok(scanned) => scanned,
                Err(source) => {
                    self.diagnostics.report(Diagnostic::EntrySkipped {
                        path: entry_path,
                        message: source.to_string(),
                    });
                    self.stats.skipped += 1;
                    continue;
                }
            };

            let kind = scanned.info.kind;
            let node = self
                .tree
                .add(dir_node, &name, kind, scanned.link_target.clone());
            self.index.insert(
                IndexEntry::new(self.tree.reference(node), entry_path.as_str(), &scanned.info)
                    .with_content_type(scanned.content_type)
                    .with_link_target(scanned.link_target),
            );

            match kind {
                EntryKind::Directory => {
                    self.stats.dirs += 1;
                    self.walk_dir(&entry_path, node)?;
                }
                EntryKind::File => self.stats.files += 1,
                EntryKind::Symlink => self.stats.symlinks += 1,
                EntryKind::Other => self.stats.other += 1,
            }
        }

        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

fn scan_entry(fs: &dyn FilesystemHandle, entry_path: &str, name: &str) -> io::Result<Scanned> {
    let info = fs.info(entry_path)?;

    let link_target = if info.kind == EntryKind::Symlink {
        match fs.read_link(entry_path) {
            Ok(target) => Some(target),
            Err(error) => {
                log::debug!("unable to read link target for path={entry_path}: {error}");
                None
            }
        }
    } else {
        None
    };

    let content_type = if info.kind == EntryKind::File {
        match detect_content_type(fs, entry_path, name) {
            Ok(content_type) => Some(content_type),
            Err(error) => {
                log::debug!("unable to detect content type for path={entry_path}: {error}");
                None
            }
        }
    } else {
        None
    };

    Ok(Scanned {
        info,
        content_type,
        link_target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::handle::MemoryFs;

    fn paths(built: &BuiltIndex) -> Vec<String> {
        built
            .tree
            .preorder()
            .map(|(_, node)| node.path().to_string())
            .collect()
    }

    fn build(fs: &MemoryFs, exclusions: &[&str]) -> (Result<BuiltIndex>, RecordingSink) {
        let sink = RecordingSink::new();
        let matcher = ExclusionMatcher::new(exclusions, &sink);
        (build_index(fs, &matcher, &sink), sink)
    }

    #[test]
    fn walks_depth_first_in_name_order() {
        let fs = MemoryFs::new()
            .with_file("zebra.txt", "z")
            .with_file("dir/b.txt", "b")
            .with_file("apple.txt", "a")
            .with_file("dir/sub/c.txt", "c");

        let (built, sink) = build(&fs, &[]);
        let built = built.unwrap();

        assert_eq!(
            paths(&built),
            [".", "apple.txt", "dir", "dir/b.txt", "dir/sub", "dir/sub/c.txt", "zebra.txt"]
        );
        assert_eq!(built.stats.files, 4);
        assert_eq!(built.stats.dirs, 3);
        assert!(sink.is_empty());
    }

    #[test]
    fn every_node_has_an_index_entry() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_file("dir/b.json", "{}");
        let (built, _) = build(&fs, &[]);
        let built = built.unwrap();

        assert_eq!(built.index.len(), built.tree.len());
        for (node, tree_node) in built.tree.preorder() {
            let entry = built.index.get(built.tree.reference(node)).unwrap();
            assert_eq!(entry.path, tree_node.path());
            assert_eq!(entry.kind, tree_node.kind());
        }
        let b = built.tree.lookup("dir/b.json").unwrap();
        assert_eq!(
            built.index.get_node(b).unwrap().content_type.as_deref(),
            Some("application/json")
        );
        assert_eq!(built.index.get_node(built.tree.root()).unwrap().content_type, None);
    }

    #[test]
    fn excluded_directory_is_pruned() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_file("dir/b.txt", "b")
            .with_file("dir/sub/c.txt", "c");

        let (built, _) = build(&fs, &["dir/sub"]);
        let built = built.unwrap();

        assert_eq!(paths(&built), [".", "a.txt", "dir", "dir/b.txt"]);
        assert!(!built.tree.has_path("dir/sub/c.txt"));
        assert_eq!(built.stats.excluded, 1);
    }

    #[test]
    fn excluded_file_is_skipped_alone() {
        let fs = MemoryFs::new()
            .with_file("keep.txt", "k")
            .with_file("drop.log", "d");

        let (built, _) = build(&fs, &["*.log"]);
        assert_eq!(paths(&built.unwrap()), [".", "keep.txt"]);
    }

    #[test]
    fn unreadable_entry_info_is_skipped_and_reported() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_file("b.txt", "b")
            .with_info_failure("a.txt");

        let (built, sink) = build(&fs, &[]);
        let built = built.unwrap();

        assert_eq!(paths(&built), [".", "b.txt"]);
        assert_eq!(built.stats.skipped, 1);
        assert!(matches!(
            &sink.events()[..],
            [Diagnostic::EntrySkipped { path, .. }] if path == "a.txt"
        ));
    }

    #[test]
    fn unreadable_directory_is_fatal() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_dir("locked")
            .with_read_dir_failure("locked");

        let (built, _) = build(&fs, &[]);
        match built {
            Err(FsSourceError::Walk { path, .. }) => assert_eq!(path, "locked"),
            other => panic!("expected walk error, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_root_is_fatal() {
        let fs = MemoryFs::new().with_read_dir_failure(".");
        let (built, _) = build(&fs, &[]);
        assert!(matches!(built, Err(FsSourceError::Walk { .. })));
    }

    #[test]
    fn excluded_unreadable_directory_is_never_read() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_dir("locked")
            .with_read_dir_failure("locked");

        let (built, _) = build(&fs, &["locked"]);
        assert_eq!(paths(&built.unwrap()), [".", "a.txt"]);
    }

    #[test]
    fn symlinks_keep_their_target() {
        let fs = MemoryFs::new()
            .with_file("a.txt", "a")
            .with_symlink("link", "a.txt");

        let (built, _) = build(&fs, &[]);
        let built = built.unwrap();
        let link = built.tree.lookup("link").unwrap();
        let node = built.tree.get(link).unwrap();

        assert_eq!(node.kind(), EntryKind::Symlink);
        assert_eq!(node.link_target(), Some("a.txt"));
        assert_eq!(built.stats.symlinks, 1);
        assert_eq!(built.index.get_node(link).unwrap().content_type, None);
    }
}
