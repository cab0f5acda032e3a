#![forbid(unsafe_code)]

//! Node sets selected by Reference URIs and narrowed by transforms.
//!
//! A `NodeSet` is the XPath-style input of canonicalization: the set of
//! nodes (by [`NodeId`]) that are visible. Attributes and namespace
//! declarations follow their element; there is no separate attribute axis.

use std::collections::HashSet;

use crate::document::{NodeId, XmlDocument};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<usize>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node in the document, comments included (`#xpointer(/)`).
    pub fn all(doc: &XmlDocument) -> Self {
        Self::tree_with_comments(doc.root(), doc)
    }

    /// Every node except comments. `URI=""` selects this set.
    pub fn all_without_comments(doc: &XmlDocument) -> Self {
        Self::tree_without_comments(doc.root(), doc)
    }

    /// The subtree at `root` without comments (`URI="#id"`).
    pub fn tree_without_comments(root: NodeId, doc: &XmlDocument) -> Self {
        let mut set = Self::new();
        collect_subtree(root, doc, &mut set.nodes, false);
        set
    }

    /// The subtree at `root` including comments (`#xpointer(id('...'))`).
    pub fn tree_with_comments(root: NodeId, doc: &XmlDocument) -> Self {
        let mut set = Self::new();
        collect_subtree(root, doc, &mut set.nodes, true);
        set
    }

    /// Every node in the subtrees rooted at `roots`, comments included.
    pub fn subtrees(roots: &[NodeId], doc: &XmlDocument) -> Self {
        let mut set = Self::new();
        for root in roots {
            collect_subtree(*root, doc, &mut set.nodes, true);
        }
        set
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id.index())
    }

    pub fn insert(&mut self, id: NodeId) {
        self.nodes.insert(id.index());
    }

    pub fn remove(&mut self, id: NodeId) {
        self.nodes.remove(&id.index());
    }

    /// Remove `root` and everything below it.
    pub fn remove_subtree(&mut self, root: NodeId, doc: &XmlDocument) {
        self.remove(root);
        for n in doc.descendants(root) {
            self.remove(n);
        }
    }

    /// Keep only nodes also in `other`.
    pub fn intersect(&mut self, other: &NodeSet) {
        self.nodes.retain(|n| other.nodes.contains(n));
    }

    /// Drop nodes that are in `other`.
    pub fn subtract(&mut self, other: &NodeSet) {
        self.nodes.retain(|n| !other.nodes.contains(n));
    }

    pub fn union(&mut self, other: &NodeSet) {
        self.nodes.extend(other.nodes.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn collect_subtree(id: NodeId, doc: &XmlDocument, set: &mut HashSet<usize>, include_comments: bool) {
    if !include_comments && doc.is_comment(id) {
        return;
    }
    set.insert(id.index());
    for child in doc.children(id) {
        collect_subtree(child, doc, set, include_comments);
    }
}
