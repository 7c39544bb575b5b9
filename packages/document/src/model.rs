//! # Document Model
//!
//! Canonical tree shape of a canvas design document.
//!
//! ```text
//! CanvasDocument
//!   └─ Artboard*            (at least one)
//!        └─ Node*           (Frame / Group nest further Nodes)
//! ```
//!
//! The model is plain data: every engine operation takes a snapshot and
//! returns a new one. Location lookups go through [`crate::NodeIndex`].

use crate::id::new_id;
use crate::path::TreePath;
use crate::value::{PropertyMap, PropertyValue};
use crate::visitor::{NodeCounter, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current schema version written by [`CanvasDocument::new`]
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDocument {
    pub schema_version: u32,
    pub id: String,
    pub name: String,
    pub artboards: Vec<Artboard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artboard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub frame: Rect,
    #[serde(default)]
    pub children: Vec<Node>,
}

/// Position and size in canvas units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// A node in the design tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    /// Variant tag (`type`) plus variant-specific fields
    #[serde(flatten)]
    pub kind: NodeKind,

    pub name: String,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default)]
    pub frame: Rect,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<PropertyMap>,

    /// Stable role label, e.g. `hero.title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PropertyMap>,
}

fn default_visible() -> bool {
    true
}

/// Closed set of node variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Frame {
        #[serde(default)]
        children: Vec<Node>,
        #[serde(default)]
        clip_content: bool,
    },
    Group {
        #[serde(default)]
        children: Vec<Node>,
    },
    #[serde(rename_all = "camelCase")]
    Vector { path_data: String },
    Text { content: String },
    Image { src: String },
    #[serde(rename_all = "camelCase")]
    ComponentInstance {
        component_id: String,
        #[serde(default)]
        overrides: PropertyMap,
    },
}

/// Fieldless mirror of [`NodeKind`] for matching and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Frame,
    Group,
    Vector,
    Text,
    Image,
    ComponentInstance,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Frame => "frame",
            NodeType::Group => "group",
            NodeType::Vector => "vector",
            NodeType::Text => "text",
            NodeType::Image => "image",
            NodeType::ComponentInstance => "componentInstance",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeType::Frame | NodeType::Group)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Frame { .. } => NodeType::Frame,
            NodeKind::Group { .. } => NodeType::Group,
            NodeKind::Vector { .. } => NodeType::Vector,
            NodeKind::Text { .. } => NodeType::Text,
            NodeKind::Image { .. } => NodeType::Image,
            NodeKind::ComponentInstance { .. } => NodeType::ComponentInstance,
        }
    }
}

impl Node {
    fn with_kind(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            visible: true,
            frame: Rect::default(),
            style: None,
            semantic_key: None,
            data: None,
        }
    }

    pub fn frame(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(
            id,
            name,
            NodeKind::Frame {
                children: Vec::new(),
                clip_content: false,
            },
        )
    }

    pub fn group(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(id, name, NodeKind::Group { children: Vec::new() })
    }

    pub fn text(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_kind(
            id,
            name,
            NodeKind::Text {
                content: content.into(),
            },
        )
    }

    pub fn vector(id: impl Into<String>, name: impl Into<String>, path_data: impl Into<String>) -> Self {
        Self::with_kind(
            id,
            name,
            NodeKind::Vector {
                path_data: path_data.into(),
            },
        )
    }

    pub fn image(id: impl Into<String>, name: impl Into<String>, src: impl Into<String>) -> Self {
        Self::with_kind(id, name, NodeKind::Image { src: src.into() })
    }

    pub fn component_instance(
        id: impl Into<String>,
        name: impl Into<String>,
        component_id: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            id,
            name,
            NodeKind::ComponentInstance {
                component_id: component_id.into(),
                overrides: PropertyMap::new(),
            },
        )
    }

    /// Replace the children of a Frame/Group. Ignored for leaf nodes.
    pub fn with_children(mut self, new_children: Vec<Node>) -> Self {
        if let Some(children) = self.children_mut() {
            *children = new_children;
        }
        self
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.style
            .get_or_insert_with(PropertyMap::new)
            .insert(property.into(), value.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.data
            .get_or_insert_with(PropertyMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_semantic_key(mut self, key: impl Into<String>) -> Self {
        self.semantic_key = Some(key.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is_container(&self) -> bool {
        self.node_type().is_container()
    }

    /// Children of a Frame/Group; empty for leaf nodes
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Frame { children, .. } | NodeKind::Group { children } => children,
            _ => &[],
        }
    }

    /// Mutable children, `None` for leaf nodes
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.kind {
            NodeKind::Frame { children, .. } | NodeKind::Group { children } => Some(children),
            _ => None,
        }
    }

    /// Copy of this node without its subtree
    pub fn shallow_clone(&self) -> Node {
        Node {
            id: self.id.clone(),
            kind: match &self.kind {
                NodeKind::Frame { clip_content, .. } => NodeKind::Frame {
                    children: Vec::new(),
                    clip_content: *clip_content,
                },
                NodeKind::Group { .. } => NodeKind::Group { children: Vec::new() },
                other => other.clone(),
            },
            name: self.name.clone(),
            visible: self.visible,
            frame: self.frame,
            style: self.style.clone(),
            semantic_key: self.semantic_key.clone(),
            data: self.data.clone(),
        }
    }

    /// Total number of nodes in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(Node::subtree_len).sum::<usize>()
    }
}

impl Artboard {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            frame: Rect::default(),
            children: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }
}

impl CanvasDocument {
    /// New document with a freshly generated id
    pub fn new(name: impl Into<String>, artboards: Vec<Artboard>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: new_id(),
            name: name.into(),
            artboards,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Node at a tree path (`[artboard, child, child, ...]`)
    pub fn node_at(&self, path: &TreePath) -> Option<&Node> {
        let (artboard, rest) = path.as_slice().split_first()?;
        let (first, rest) = rest.split_first()?;
        let mut node = self.artboards.get(*artboard)?.children.get(*first)?;
        for index in rest {
            node = node.children().get(*index)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &TreePath) -> Option<&mut Node> {
        let (artboard, rest) = path.as_slice().split_first()?;
        let (first, rest) = rest.split_first()?;
        let mut node = self.artboards.get_mut(*artboard)?.children.get_mut(*first)?;
        for index in rest {
            node = node.children_mut()?.get_mut(*index)?;
        }
        Some(node)
    }

    /// Children array owned by a container: an artboard (`[a]`) or a
    /// Frame/Group node (`[a, i, ...]`)
    pub fn children_at(&self, container: &TreePath) -> Option<&[Node]> {
        match container.as_slice() {
            [] => None,
            [artboard] => self.artboards.get(*artboard).map(|a| a.children.as_slice()),
            _ => {
                let node = self.node_at(container)?;
                if node.is_container() {
                    Some(node.children())
                } else {
                    None
                }
            }
        }
    }

    pub fn children_at_mut(&mut self, container: &TreePath) -> Option<&mut Vec<Node>> {
        match container.as_slice() {
            [] => None,
            [artboard] => self.artboards.get_mut(*artboard).map(|a| &mut a.children),
            _ => self.node_at_mut(container)?.children_mut(),
        }
    }

    /// Number of nodes across all artboards (artboards excluded)
    pub fn node_count(&self) -> usize {
        let mut counter = NodeCounter::default();
        counter.visit_document(self);
        counter.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CanvasDocument {
        CanvasDocument::new(
            "Landing",
            vec![Artboard::new("ab-1", "Desktop").with_children(vec![
                Node::frame("hero", "Hero").with_children(vec![
                    Node::text("title", "Title", "Welcome").with_semantic_key("hero.title"),
                ]),
                Node::text("subtitle", "Subtitle", "Build faster"),
            ])],
        )
    }

    #[test]
    fn test_node_wire_shape() {
        let node = Node::text("n1", "Title", "Hello")
            .with_frame(Rect::new(0.0, 0.0, 100.0, 20.0))
            .with_semantic_key("hero.title");

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "n1",
                "type": "text",
                "content": "Hello",
                "name": "Title",
                "visible": true,
                "frame": { "x": 0.0, "y": 0.0, "width": 100.0, "height": 20.0 },
                "semanticKey": "hero.title"
            })
        );

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_defaults_on_deserialize() {
        let node: Node = serde_json::from_value(json!({
            "id": "g1",
            "type": "group",
            "name": "Group"
        }))
        .unwrap();

        assert!(node.visible);
        assert_eq!(node.frame, Rect::default());
        assert_eq!(node.node_type(), NodeType::Group);
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_component_instance_fields_are_camel_case() {
        let node: Node = serde_json::from_value(json!({
            "id": "c1",
            "type": "componentInstance",
            "name": "Button",
            "componentId": "button",
            "overrides": { "label": { "type": "string", "value": "Buy" } }
        }))
        .unwrap();

        match &node.kind {
            NodeKind::ComponentInstance {
                component_id,
                overrides,
            } => {
                assert_eq!(component_id, "button");
                assert_eq!(overrides.get("label"), Some(&PropertyValue::from("Buy")));
            }
            other => panic!("Expected component instance, got {:?}", other),
        }
    }

    #[test]
    fn test_path_accessors() {
        let doc = sample();

        let title = doc.node_at(&TreePath::from(vec![0, 0, 0])).unwrap();
        assert_eq!(title.id, "title");

        assert_eq!(doc.children_at(&TreePath::from(vec![0])).unwrap().len(), 2);
        assert_eq!(doc.children_at(&TreePath::from(vec![0, 0])).unwrap().len(), 1);

        // Text nodes own no children array
        assert!(doc.children_at(&TreePath::from(vec![0, 1])).is_none());
        assert!(doc.node_at(&TreePath::from(vec![0, 5])).is_none());
        assert!(doc.node_at(&TreePath::from(vec![0])).is_none());
    }

    #[test]
    fn test_node_count_and_shallow_clone() {
        let doc = sample();
        assert_eq!(doc.node_count(), 3);

        let hero = &doc.artboards[0].children[0];
        assert_eq!(hero.subtree_len(), 2);

        let shallow = hero.shallow_clone();
        assert!(shallow.children().is_empty());
        assert_eq!(shallow.name, "Hero");
    }

    #[test]
    fn test_with_children_ignored_for_leaves() {
        let text = Node::text("t", "T", "x").with_children(vec![Node::group("g", "G")]);
        assert!(text.children().is_empty());
    }
}
