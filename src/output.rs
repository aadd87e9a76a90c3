use std::collections::HashMap;
use std::fmt;

use crate::node::{Document, Node, NodeId};

/// Side-channel from caller-chosen keys to nodes built during a render.
///
/// Keys are shared by a template and every partial it calls; a later write
/// under the same key replaces the earlier node.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateCache {
    entries: HashMap<String, NodeId>,
}

impl TemplateCache {
    pub(crate) fn insert(&mut self, key: String, id: NodeId) {
        if let Some(previous) = self.entries.insert(key, id) {
            log::trace!(target: "marker::cache", "cache entry replaced node {previous:?}");
        }
    }

    /// Forgets entries pointing at nodes with an index of `first` or above.
    pub(crate) fn discard_from(&mut self, first: usize) {
        self.entries.retain(|_, id| id.index() < first);
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.entries.iter().map(|(key, id)| (key.as_str(), *id))
    }
}

/// The shape of a finished render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tree<'a> {
    /// Exactly one top-level node was built.
    Node(NodeId),
    /// Zero or several top-level nodes were built.
    Fragment(&'a [NodeId]),
}

/// The result of rendering a template: the built tree and its cache map.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    document: Document,
    cache: TemplateCache,
}

impl Rendered {
    pub(crate) const fn new(document: Document, cache: TemplateCache) -> Self {
        Self { document, cache }
    }

    /// A single node when the render produced exactly one root, otherwise the
    /// whole fragment.
    pub fn tree(&self) -> Tree<'_> {
        match self.document.roots() {
            [root] => Tree::Node(*root),
            roots => Tree::Fragment(roots),
        }
    }

    pub const fn document(&self) -> &Document {
        &self.document
    }

    pub const fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Looks up the node cached under `key`.
    pub fn cached(&self, key: &str) -> Option<&Node> {
        self.cache.get(key).and_then(|id| self.document.get(id))
    }

    pub fn into_parts(self) -> (Document, TemplateCache) {
        (self.document, self.cache)
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.document, f)
    }
}
