use crate::model::{Artboard, CanvasDocument, Node};
use crate::path::TreePath;

/// Visitor pattern for traversing a document immutably
///
/// Default implementations walk the entire tree in pre-order, passing the
/// tree path of every artboard and node. Override specific visit_* methods
/// to act on nodes; call the matching walk_* function to keep descending.
pub trait Visitor<'a>: Sized {
    fn visit_document(&mut self, doc: &'a CanvasDocument) {
        walk_document(self, doc);
    }

    fn visit_artboard(&mut self, artboard: &'a Artboard, path: &TreePath) {
        walk_artboard(self, artboard, path);
    }

    fn visit_node(&mut self, node: &'a Node, path: &TreePath) {
        walk_node(self, node, path);
    }
}

pub fn walk_document<'a, V: Visitor<'a>>(visitor: &mut V, doc: &'a CanvasDocument) {
    for (index, artboard) in doc.artboards.iter().enumerate() {
        visitor.visit_artboard(artboard, &TreePath::artboard(index));
    }
}

pub fn walk_artboard<'a, V: Visitor<'a>>(visitor: &mut V, artboard: &'a Artboard, path: &TreePath) {
    for (index, child) in artboard.children.iter().enumerate() {
        visitor.visit_node(child, &path.child(index));
    }
}

pub fn walk_node<'a, V: Visitor<'a>>(visitor: &mut V, node: &'a Node, path: &TreePath) {
    for (index, child) in node.children().iter().enumerate() {
        visitor.visit_node(child, &path.child(index));
    }
}

/// Counts nodes (artboards excluded)
#[derive(Debug, Default)]
pub struct NodeCounter {
    pub nodes: usize,
    pub max_depth: usize,
}

impl<'a> Visitor<'a> for NodeCounter {
    fn visit_node(&mut self, node: &'a Node, path: &TreePath) {
        self.nodes += 1;
        self.max_depth = self.max_depth.max(path.depth());
        walk_node(self, node, path);
    }
}
