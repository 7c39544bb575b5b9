//! # Node Index
//!
//! Derived lookup structure mapping node identity to location.
//!
//! Built in a single pre-order pass (O(n) in node count) and borrowed from
//! the document it describes, so it can never outlive or drift from it.
//! Rebuild after every structural change; it is never serialized.

use crate::error::DocumentError;
use crate::model::{Artboard, CanvasDocument, Node};
use crate::path::TreePath;
use crate::visitor::{walk_artboard, walk_node, Visitor};
use std::collections::HashMap;

/// Location record for a single node
#[derive(Debug, Clone)]
pub struct NodeIndexEntry<'a> {
    pub node: &'a Node,
    /// `[artboard, child, child, ...]`
    pub path: TreePath,
    /// Owning node id, or the artboard id for top-level nodes
    pub parent_id: &'a str,
    pub artboard_id: &'a str,
    /// 0 for direct artboard children
    pub depth: usize,
}

impl<'a> NodeIndexEntry<'a> {
    /// Position inside the parent's children array
    pub fn index_in_parent(&self) -> usize {
        self.path.last_index().unwrap_or(0)
    }

    pub fn is_top_level(&self) -> bool {
        self.depth == 0
    }

    pub fn pointer(&self) -> String {
        self.path.to_pointer()
    }
}

#[derive(Debug, Default)]
pub struct NodeIndex<'a> {
    entries: HashMap<&'a str, NodeIndexEntry<'a>>,
    by_path: HashMap<TreePath, &'a str>,
    by_semantic_key: HashMap<&'a str, &'a str>,
    artboards: HashMap<&'a str, usize>,
    order: Vec<&'a str>,
}

impl<'a> NodeIndex<'a> {
    pub fn build(doc: &'a CanvasDocument) -> Self {
        let mut builder = IndexBuilder {
            index: NodeIndex::default(),
            current_artboard: "",
        };
        builder.visit_document(doc);

        tracing::trace!(
            nodes = builder.index.order.len(),
            artboards = builder.index.artboards.len(),
            "built node index"
        );

        builder.index
    }

    pub fn get(&self, id: &str) -> Option<&NodeIndexEntry<'a>> {
        self.entries.get(id)
    }

    pub fn node(&self, id: &str) -> Option<&'a Node> {
        self.entries.get(id).map(|entry| entry.node)
    }

    pub fn path_of(&self, id: &str) -> Option<&TreePath> {
        self.entries.get(id).map(|entry| &entry.path)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Id of the node at `path`
    pub fn id_at(&self, path: &TreePath) -> Option<&'a str> {
        self.by_path.get(path).copied()
    }

    pub fn by_semantic_key(&self, key: &str) -> Option<&NodeIndexEntry<'a>> {
        self.by_semantic_key
            .get(key)
            .and_then(|id| self.entries.get(id))
    }

    /// Position of an artboard in the document's artboard list
    pub fn artboard_index(&self, artboard_id: &str) -> Option<usize> {
        self.artboards.get(artboard_id).copied()
    }

    /// Resolve a container id (artboard or Frame/Group node) to its tree path
    pub fn container_path(&self, id: &str) -> Option<TreePath> {
        if let Some(index) = self.artboard_index(id) {
            return Some(TreePath::artboard(index));
        }
        self.entries
            .get(id)
            .filter(|entry| entry.node.is_container())
            .map(|entry| entry.path.clone())
    }

    /// True if `id` lies inside the subtree rooted at `ancestor_id`
    pub fn is_descendant(&self, id: &str, ancestor_id: &str) -> bool {
        match (self.path_of(id), self.path_of(ancestor_id)) {
            (Some(path), Some(ancestor)) => path.is_descendant_of(ancestor),
            _ => false,
        }
    }

    /// Entries in document pre-order
    pub fn iter(&self) -> impl Iterator<Item = &NodeIndexEntry<'a>> + '_ {
        self.order.iter().filter_map(move |id| self.entries.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

struct IndexBuilder<'a> {
    index: NodeIndex<'a>,
    current_artboard: &'a str,
}

impl<'a> Visitor<'a> for IndexBuilder<'a> {
    fn visit_artboard(&mut self, artboard: &'a Artboard, path: &TreePath) {
        if let Some(index) = path.artboard_index() {
            self.index.artboards.entry(artboard.id.as_str()).or_insert(index);
        }
        self.current_artboard = artboard.id.as_str();
        walk_artboard(self, artboard, path);
    }

    fn visit_node(&mut self, node: &'a Node, path: &TreePath) {
        let parent_id = path
            .parent()
            .filter(|parent| !parent.is_artboard())
            .and_then(|parent| self.index.by_path.get(&parent).copied())
            .unwrap_or(self.current_artboard);

        if self.index.entries.contains_key(node.id.as_str()) {
            // Duplicate ids are a validation error; keep the first occurrence
            tracing::warn!(node_id = %node.id, path = %path, "duplicate node id while indexing");
        } else {
            self.index.entries.insert(
                node.id.as_str(),
                NodeIndexEntry {
                    node,
                    path: path.clone(),
                    parent_id,
                    artboard_id: self.current_artboard,
                    depth: path.depth(),
                },
            );
            self.index.order.push(node.id.as_str());

            if let Some(key) = node.semantic_key.as_deref() {
                self.index.by_semantic_key.entry(key).or_insert(node.id.as_str());
            }
        }

        self.index.by_path.insert(path.clone(), node.id.as_str());
        walk_node(self, node, path);
    }
}

/// Look up a node by id
///
/// `NotFound` is an ordinary, recoverable outcome.
pub fn find_node_by_id<'a>(doc: &'a CanvasDocument, id: &str) -> Result<&'a Node, DocumentError> {
    NodeIndex::build(doc)
        .node(id)
        .ok_or_else(|| DocumentError::NotFound(id.to_string()))
}
