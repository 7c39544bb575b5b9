//! # Forward Patches
//!
//! Turns the difference between two documents into a patch list that,
//! applied to `base`, reproduces `other` exactly.
//!
//! Patches are generated against a working copy and applied as they are
//! produced, so every intermediate document passes validation:
//!
//! ```text
//! 1. structure   artboards, then each container top-down:
//!                move misplaced nodes in, add missing ones as bare shells
//!                (no children, no semantic key)
//! 2. leftovers   remove the topmost nodes and artboards `other` lacks
//! 3. fields      drop changed semantic keys, sync every other field,
//!                then set the new semantic keys
//! ```
//!
//! Splitting semantic keys into a drop pass and a set pass lets two nodes
//! swap keys without ever holding a duplicate.

use crate::diff::{shallow_artboard, PROPERTY_MAPS};
use canvas_document::{CanvasDocument, Node, NodeIndex, TreePath, ValidationError};
use canvas_editor::{apply_patch, escape_token, json_eq, Patch, PatchError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashSet};

/// Patches that take `base` to `other`
pub fn forward_patches(base: &CanvasDocument, other: &CanvasDocument) -> Result<Vec<Patch>, PatchError> {
    let mut forward = Forward {
        working: base.clone(),
        patches: Vec::new(),
    };

    forward.place_artboards(other)?;
    for (i, artboard) in other.artboards.iter().enumerate() {
        forward.place_children(&artboard.children, &TreePath::artboard(i))?;
    }
    forward.remove_leftovers(other)?;
    forward.sync_fields(other)?;

    tracing::debug!(patches = forward.patches.len(), "generated forward patches");

    Ok(forward.patches)
}

struct Forward {
    working: CanvasDocument,
    patches: Vec<Patch>,
}

impl Forward {
    fn apply(&mut self, patch: Patch) -> Result<(), PatchError> {
        self.working = apply_patch(&self.working, &patch)?;
        self.patches.push(patch);
        Ok(())
    }

    fn place_artboards(&mut self, other: &CanvasDocument) -> Result<(), PatchError> {
        for (i, artboard) in other.artboards.iter().enumerate() {
            let target = TreePath::artboard(i).to_pointer();
            match self.working.artboards.iter().position(|a| a.id == artboard.id) {
                Some(j) if j == i => {}
                Some(j) => self.apply(Patch::move_from(TreePath::artboard(j).to_pointer(), target))?,
                None => {
                    let mut shell = artboard.clone();
                    shell.children.clear();
                    self.apply(Patch::add(target, to_json(&shell)?))?;
                }
            }
        }
        Ok(())
    }

    /// Bring `container`'s children in line with `children`, then recurse
    fn place_children(&mut self, children: &[Node], container: &TreePath) -> Result<(), PatchError> {
        for (i, child) in children.iter().enumerate() {
            let target = container.child(i);
            let in_place = self
                .working
                .node_at(&target)
                .map_or(false, |node| node.id == child.id);

            if !in_place {
                let current = NodeIndex::build(&self.working).path_of(&child.id).cloned();
                match current {
                    Some(from) => self.apply(Patch::move_from(from.to_pointer(), target.to_pointer()))?,
                    None => {
                        let mut shell = child.shallow_clone();
                        shell.semantic_key = None;
                        self.apply(Patch::add(target.to_pointer(), to_json(&shell)?))?;
                    }
                }
            }

            // Containers must have their final type before children go in
            if child.is_container() {
                let retyped = self
                    .working
                    .node_at(&target)
                    .map_or(false, |node| node.node_type() != child.node_type());
                if retyped {
                    self.retype(child, &target)?;
                }
            }
        }

        for (i, child) in children.iter().enumerate() {
            if child.is_container() {
                self.place_children(child.children(), &container.child(i))?;
            }
        }

        Ok(())
    }

    /// Replace the node at `path` with `target`'s variant, keeping the
    /// working node's children and semantic key
    fn retype(&mut self, target: &Node, path: &TreePath) -> Result<(), PatchError> {
        let Some(current) = self.working.node_at(path) else {
            return Err(PatchError::PathNotFound(path.to_pointer()));
        };

        let mut replacement = target.shallow_clone();
        replacement.semantic_key = current.semantic_key.clone();
        let kept = current.children().to_vec();
        if let Some(children) = replacement.children_mut() {
            *children = kept;
        }

        self.apply(Patch::replace(path.to_pointer(), to_json(&replacement)?))
    }

    fn remove_leftovers(&mut self, other: &CanvasDocument) -> Result<(), PatchError> {
        let other_index = NodeIndex::build(other);
        let wanted: HashSet<&str> = other_index
            .ids()
            .chain(other.artboards.iter().map(|a| a.id.as_str()))
            .collect();

        let mut doomed = Vec::new();
        for (a, artboard) in self.working.artboards.iter().enumerate() {
            if wanted.contains(artboard.id.as_str()) {
                collect_leftovers(&artboard.children, &TreePath::artboard(a), &wanted, &mut doomed);
            }
        }

        // Last first, so earlier paths stay valid
        doomed.sort();
        for path in doomed.into_iter().rev() {
            self.apply(Patch::remove(path.to_pointer()))?;
        }

        let stale: Vec<usize> = self
            .working
            .artboards
            .iter()
            .enumerate()
            .filter(|(_, artboard)| !wanted.contains(artboard.id.as_str()))
            .map(|(j, _)| j)
            .collect();
        for j in stale.into_iter().rev() {
            self.apply(Patch::remove(TreePath::artboard(j).to_pointer()))?;
        }

        Ok(())
    }

    fn sync_fields(&mut self, other: &CanvasDocument) -> Result<(), PatchError> {
        let other_index = NodeIndex::build(other);

        // Drop semantic keys that are about to change
        for entry in other_index.iter() {
            let stale = self
                .working
                .node_at(&entry.path)
                .and_then(|node| node.semantic_key.as_ref())
                .map_or(false, |key| Some(key) != entry.node.semantic_key.as_ref());
            if stale {
                self.apply(Patch::remove(format!("{}/semanticKey", entry.pointer())))?;
            }
        }

        let document_fields = |doc: &CanvasDocument| {
            json!({ "schemaVersion": doc.schema_version, "id": doc.id, "name": doc.name })
        };
        let (current, target) = (document_fields(&self.working), document_fields(other));
        self.sync_object("", &current, &target, &[])?;

        for (i, artboard) in other.artboards.iter().enumerate() {
            let current = self
                .working
                .artboards
                .get(i)
                .map(shallow_artboard)
                .unwrap_or(Value::Null);
            self.sync_object(&TreePath::artboard(i).to_pointer(), &current, &shallow_artboard(artboard), &["id"])?;
        }

        for entry in other_index.iter() {
            let Some(current) = self.working.node_at(&entry.path) else {
                return Err(PatchError::PathNotFound(entry.pointer()));
            };

            if current.node_type() != entry.node.node_type() {
                self.retype(entry.node, &entry.path)?;
                continue;
            }

            let current = bare_json(current)?;
            let target = bare_json(entry.node)?;
            self.sync_object(&entry.pointer(), &current, &target, &["id", "type", "children", "semanticKey"])?;
        }

        // Set the new semantic keys
        for entry in other_index.iter() {
            let Some(key) = entry.node.semantic_key.as_ref() else {
                continue;
            };
            let current = self
                .working
                .node_at(&entry.path)
                .and_then(|node| node.semantic_key.as_ref());
            if current != Some(key) {
                self.apply(Patch::add(format!("{}/semanticKey", entry.pointer()), json!(key)))?;
            }
        }

        Ok(())
    }

    /// Emit add/remove/replace patches that turn `current` into `target`
    fn sync_object(&mut self, pointer: &str, current: &Value, target: &Value, skip: &[&str]) -> Result<(), PatchError> {
        let empty = Map::new();
        let current = current.as_object().unwrap_or(&empty);
        let target = target.as_object().unwrap_or(&empty);

        let keys: BTreeSet<&String> = current
            .keys()
            .chain(target.keys())
            .filter(|key| !skip.contains(&key.as_str()))
            .collect();

        for key in keys {
            let field = format!("{}/{}", pointer, escape_token(key));
            match (current.get(key.as_str()), target.get(key.as_str())) {
                (Some(a), Some(b)) if json_eq(a, b) => {}
                (Some(a @ Value::Object(_)), Some(b @ Value::Object(_)))
                    if PROPERTY_MAPS.contains(&key.as_str()) =>
                {
                    self.sync_object(&field, a, b, &[])?;
                }
                (Some(_), Some(b)) => self.apply(Patch::replace(field, b.clone()))?,
                (None, Some(b)) => self.apply(Patch::add(field, b.clone()))?,
                (Some(_), None) => self.apply(Patch::remove(field))?,
                (None, None) => {}
            }
        }

        Ok(())
    }
}

fn collect_leftovers(children: &[Node], container: &TreePath, wanted: &HashSet<&str>, out: &mut Vec<TreePath>) {
    for (i, child) in children.iter().enumerate() {
        let path = container.child(i);
        if wanted.contains(child.id.as_str()) {
            collect_leftovers(child.children(), &path, wanted, out);
        } else {
            out.push(path);
        }
    }
}

/// Node JSON without its subtree
fn bare_json(node: &Node) -> Result<Value, PatchError> {
    to_json(&node.shallow_clone()).map(|mut value| {
        if let Value::Object(object) = &mut value {
            object.remove("children");
        }
        value
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, PatchError> {
    serde_json::to_value(value).map_err(|e| ValidationError::from(e).into())
}
