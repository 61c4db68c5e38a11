//! Queries over a built tree and index.
//!
//! Every lookup resolves to a [`Location`] tagged with the [`RefId`] of the
//! entry holding the content. Batch queries never fail on a single miss; the
//! miss is simply absent from the result.

use fnv::FnvHashSet;

use crate::error::Result;
use crate::exclude::compile_glob;
use crate::handle::EntryKind;
use crate::index::Index;
use crate::location::Location;
use crate::path::{self, normalize_path};
use crate::tree::{NodeIndex, RefId, Tree};

/// Upper bound on symlinks followed while resolving one path.
pub const MAX_LINK_HOPS: usize = 40;

/// A path resolved through the tree, after following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRef {
    /// Node the request path names (possibly a symlink).
    pub requested: NodeIndex,
    /// Node holding the content; never a symlink.
    pub target: NodeIndex,
    pub reference: RefId,
}

/// Read-only search state over one built index.
#[derive(Debug)]
pub struct SearchContext {
    tree: Tree,
    index: Index,
}

impl SearchContext {
    pub fn new(tree: Tree, index: Index) -> Self {
        Self { tree, index }
    }

    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[inline]
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Exact structural lookup; symlinks are not followed.
    pub fn has_path(&self, raw: &str) -> bool {
        self.tree.has_path(&normalize_path(raw))
    }

    /// Resolves a normalized path, following symlinks whose targets exist in
    /// the tree. Links that dangle, point outside the tree, or loop resolve
    /// to nothing.
    pub fn resolve(&self, normalized: &str) -> Option<ResolvedRef> {
        let mut hops = 0;
        let requested = self.lookup_following_parents(normalized, &mut hops)?;
        let target = self.follow(requested, &mut hops)?;
        Some(ResolvedRef {
            requested,
            target,
            reference: self.tree.reference(target),
        })
    }

    /// Finds the node named by a path, following links in every segment but
    /// the last.
    fn lookup_following_parents(&self, normalized: &str, hops: &mut usize) -> Option<NodeIndex> {
        let mut current = self.tree.root();
        for segment in path::segments(normalized) {
            current = self.follow(current, hops)?;
            current = self.tree.child(current, segment)?;
        }
        Some(current)
    }

    /// Follows a node to the entry holding its content. Non-links map to
    /// themselves; links that dangle, leave the tree, or loop give `None`.
    pub fn follow_links(&self, node: NodeIndex) -> Option<NodeIndex> {
        let mut hops = 0;
        self.follow(node, &mut hops)
    }

    fn follow(&self, node: NodeIndex, hops: &mut usize) -> Option<NodeIndex> {
        let tree_node = self.tree.get(node)?;
        if tree_node.kind() != EntryKind::Symlink {
            return Some(node);
        }
        *hops += 1;
        if *hops > MAX_LINK_HOPS {
            log::debug!("too many levels of symbolic links at path={}", tree_node.path());
            return None;
        }
        let target = path::resolve_link_target(tree_node.path(), tree_node.link_target()?);
        let next = self.lookup_following_parents(&target, hops)?;
        self.follow(next, hops)
    }

    /// Resolves each path and returns the non-directory hits.
    ///
    /// Unresolved paths are skipped. The same request resolving to the same
    /// entry twice yields one location; different request paths reaching one
    /// entry each keep their own location.
    pub fn find_by_path<S: AsRef<str>>(&self, paths: &[S]) -> Vec<Location> {
        let mut seen: FnvHashSet<(RefId, String)> = FnvHashSet::default();
        let mut locations = Vec::new();

        for raw in paths {
            let request = normalize_path(raw.as_ref());
            let Some(resolved) = self.resolve(&request) else {
                log::trace!("unable to find file by path={:?}", raw.as_ref());
                continue;
            };
            let Some(target) = self.tree.get(resolved.target) else {
                continue;
            };
            if target.is_dir() {
                continue;
            }
            if !seen.insert((resolved.reference, request.clone())) {
                continue;
            }
            locations.push(Location::new(target.path(), request, resolved.reference));
        }

        locations
    }

    /// Matches every pattern against tree paths in traversal order.
    ///
    /// Matched symlinks resolve to their target. Results are unique by
    /// reference across all patterns, first match wins. A malformed pattern
    /// fails the whole call.
    pub fn find_by_glob<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<Location>> {
        let mut seen: FnvHashSet<RefId> = FnvHashSet::default();
        let mut locations = Vec::new();

        for raw in patterns {
            let matcher = compile_glob(&normalize_path(raw.as_ref()))?.compile_matcher();

            for (node, tree_node) in self.tree.preorder().skip(1) {
                if !matcher.is_match(tree_node.path()) {
                    continue;
                }
                let Some(target) = self.follow_links(node) else {
                    continue;
                };
                let Some(target_node) = self.tree.get(target) else {
                    continue;
                };
                if target_node.is_dir() {
                    continue;
                }
                let reference = self.tree.reference(target);
                if seen.insert(reference) {
                    locations.push(Location::new(target_node.path(), tree_node.path(), reference));
                }
            }
        }

        Ok(locations)
    }

    /// Returns files whose detected content type is one of `types`, unique
    /// by reference.
    pub fn find_by_content_type<S: AsRef<str>>(&self, types: &[S]) -> Vec<Location> {
        let mut seen: FnvHashSet<RefId> = FnvHashSet::default();
        let mut locations = Vec::new();

        for content_type in types {
            for &node in self.index.nodes_with_content_type(content_type.as_ref()) {
                let Some(tree_node) = self.tree.get(node) else {
                    continue;
                };
                if tree_node.is_dir() {
                    continue;
                }
                let reference = self.tree.reference(node);
                if seen.insert(reference) {
                    locations.push(Location::direct(tree_node.path(), reference));
                }
            }
        }

        locations
    }

    /// Every non-directory entry in traversal order.
    pub fn all_locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.tree
            .files()
            .map(|(node, tree_node)| Location::direct(tree_node.path(), self.tree.reference(node)))
    }
}
