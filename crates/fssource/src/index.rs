//! Per-entry metadata keyed by reference.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::handle::{EntryInfo, EntryKind};
use crate::tree::{NodeIndex, RefId};

/// Metadata recorded for one indexed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub reference: RefId,
    pub path: String,
    pub kind: EntryKind,
    /// Detected content type; only files carry one.
    pub content_type: Option<String>,
    pub size: u64,
    pub mode: u32,
    pub modified_at: Option<u64>,
    pub created_at: Option<u64>,
    /// Raw link target for symlinks.
    pub link_target: Option<String>,
}

impl IndexEntry {
    pub fn new(reference: RefId, path: impl Into<String>, info: &EntryInfo) -> Self {
        Self {
            reference,
            path: path.into(),
            kind: info.kind,
            content_type: None,
            size: info.size,
            mode: info.mode,
            modified_at: info.modified_at,
            created_at: info.created_at,
            link_target: None,
        }
    }

    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(str::to_string);
        self
    }

    pub fn with_link_target(mut self, link_target: Option<String>) -> Self {
        self.link_target = link_target;
        self
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Content type to nodes carrying it, in traversal order.
pub type ContentTypeIndex = BTreeMap<String, Vec<NodeIndex>>;

/// Flat map from reference to [`IndexEntry`].
#[derive(Debug)]
pub struct Index {
    generation: u64,
    entries: BTreeMap<NodeIndex, IndexEntry>,
    by_content_type: ContentTypeIndex,
}

impl Index {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            entries: BTreeMap::new(),
            by_content_type: ContentTypeIndex::new(),
        }
    }

    /// Adds an entry. Entries arrive in traversal order, so each content type
    /// list stays sorted.
    pub(crate) fn insert(&mut self, entry: IndexEntry) {
        let node = entry.reference.node();
        if let Some(content_type) = entry.content_type.as_deref() {
            match self.by_content_type.get_mut(content_type) {
                Some(nodes) => nodes.push(node),
                None => {
                    self.by_content_type
                        .insert(content_type.to_string(), vec![node]);
                }
            }
        }
        self.entries.insert(node, entry);
    }

    /// Looks up an entry by reference; references from other indexes miss.
    pub fn get(&self, reference: RefId) -> Option<&IndexEntry> {
        if reference.generation() != self.generation {
            return None;
        }
        self.entries.get(&reference.node())
    }

    #[inline]
    pub fn get_node(&self, node: NodeIndex) -> Option<&IndexEntry> {
        self.entries.get(&node)
    }

    /// Nodes whose content type is exactly `content_type`.
    pub fn nodes_with_content_type(&self, content_type: &str) -> &[NodeIndex] {
        self.by_content_type
            .get(content_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every content type seen during indexing.
    pub fn content_types(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_content_type.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
