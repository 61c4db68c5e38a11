//! Hierarchical structure of an indexed filesystem.
//!
//! Nodes live in an arena and refer to each other by [`NodeIndex`]. The walker
//! inserts nodes depth-first with children in name order, so arena order is
//! also preorder traversal order, and each node's children are sorted by name.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thin_vec::ThinVec;

use crate::handle::EntryKind;
use crate::path::{self, ROOT};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique generation for a newly built tree.
pub(crate) fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Position of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// # Panics
    /// Panics if `index` does not fit in a `u32`.
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        assert!(index < u32::MAX as usize, "tree index must be less than u32::MAX");
        Self(index as u32)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Stable reference to an indexed entry.
///
/// Unique across every index built in this process, so a reference taken from
/// one index never resolves in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefId {
    generation: u64,
    node: NodeIndex,
}

impl RefId {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }
}

/// One entry of the tree.
#[derive(Debug)]
pub struct TreeNode {
    name: Box<str>,
    path: Box<str>,
    parent: Option<NodeIndex>,
    /// Sorted by name.
    pub children: ThinVec<NodeIndex>,
    kind: EntryKind,
    link_target: Option<Box<str>>,
}

impl TreeNode {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized path of the node.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Raw target of a symlink node, if it could be read.
    pub fn link_target(&self) -> Option<&str> {
        self.link_target.as_deref()
    }
}

/// Path-addressable tree rooted at `"."`.
#[derive(Debug)]
pub struct Tree {
    generation: u64,
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Creates a tree holding only the root directory.
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            nodes: vec![TreeNode {
                name: ROOT.into(),
                path: ROOT.into(),
                parent: None,
                children: ThinVec::new(),
                kind: EntryKind::Directory,
                link_target: None,
            }],
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Appends a child of `parent`.
    ///
    /// Callers insert siblings in name order and recurse depth-first; that is
    /// what keeps arena order equal to traversal order.
    pub(crate) fn add(
        &mut self,
        parent: NodeIndex,
        name: &str,
        kind: EntryKind,
        link_target: Option<String>,
    ) -> NodeIndex {
        let index = NodeIndex::new(self.nodes.len());
        let parent_path = self
            .nodes
            .get(parent.get())
            .map(|node| node.path())
            .unwrap_or(ROOT);
        let node_path = path::join(parent_path, name);

        self.nodes.push(TreeNode {
            name: name.into(),
            path: node_path.into_boxed_str(),
            parent: Some(parent),
            children: ThinVec::new(),
            kind,
            link_target: link_target.map(String::into_boxed_str),
        });
        if let Some(parent_node) = self.nodes.get_mut(parent.get()) {
            parent_node.children.push(index);
        }
        index
    }

    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index.get())
    }

    /// Returns the reference for a node of this tree.
    #[inline]
    pub fn reference(&self, index: NodeIndex) -> RefId {
        RefId {
            generation: self.generation,
            node: index,
        }
    }

    /// Maps a reference back to a node, if it belongs to this tree.
    pub fn node_for(&self, reference: RefId) -> Option<NodeIndex> {
        if reference.generation != self.generation || reference.node.get() >= self.nodes.len() {
            return None;
        }
        Some(reference.node)
    }

    /// Finds a direct child by name.
    pub fn child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        let children = &self.get(parent)?.children;
        children
            .binary_search_by(|&child| {
                self.nodes[child.get()].name().cmp(name)
            })
            .ok()
            .map(|position| children[position])
    }

    /// Exact structural lookup of a normalized path. Symlinks are not followed.
    pub fn lookup(&self, normalized: &str) -> Option<NodeIndex> {
        let mut current = self.root();
        for segment in path::segments(normalized) {
            current = self.child(current, segment)?;
        }
        Some(current)
    }

    /// Returns true if the normalized path is present.
    pub fn has_path(&self, normalized: &str) -> bool {
        self.lookup(normalized).is_some()
    }

    /// Iterates every node in depth-first preorder, root first.
    pub fn preorder(&self) -> impl Iterator<Item = (NodeIndex, &TreeNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeIndex::new(index), node))
    }

    /// Iterates every non-directory node in traversal order.
    pub fn files(&self) -> impl Iterator<Item = (NodeIndex, &TreeNode)> + '_ {
        self.preorder().filter(|(_, node)| !node.is_dir())
    }

    /// Returns all descendants of a node in preorder.
    pub fn descendants(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeIndex> = match self.get(index) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return result,
        };

        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(node) = self.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }

        result
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
