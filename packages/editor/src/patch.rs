//! # Patch Engine
//!
//! Applies RFC 6902-style patches to a document snapshot.
//!
//! ## Design
//!
//! - Every patch works on a copy; the input document is never touched
//! - The result is validated before it is returned, so a patch either
//!   applies completely or fails with an error
//! - Whole artboards/nodes are addressed by slot; anything below that is a
//!   field tail edited through the serialized element
//! - `apply_patch_recorded` also returns the patch as it actually ran
//!   (concrete indices, captured pre-image) so it can be inverted later

use crate::errors::{BatchError, PatchError};
use crate::json::{self, json_eq};
use crate::pointer::{Pointer, Slot, Target};
use canvas_document::{new_id, Artboard, CanvasDocument, Node, NodeIndex, TreePath, ValidationError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
    /// Anything else read off the wire; applying it fails with
    /// [`PatchError::UnknownOperation`]
    Unknown(String),
}

impl PatchOp {
    pub fn as_str(&self) -> &str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
            PatchOp::Replace => "replace",
            PatchOp::Move => "move",
            PatchOp::Copy => "copy",
            PatchOp::Test => "test",
            PatchOp::Unknown(op) => op,
        }
    }
}

impl From<String> for PatchOp {
    fn from(op: String) -> Self {
        match op.as_str() {
            "add" => PatchOp::Add,
            "remove" => PatchOp::Remove,
            "replace" => PatchOp::Replace,
            "move" => PatchOp::Move,
            "copy" => PatchOp::Copy,
            "test" => PatchOp::Test,
            _ => PatchOp::Unknown(op),
        }
    }
}

impl From<PatchOp> for String {
    fn from(op: PatchOp) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single patch operation
///
/// `oldValue` is not part of RFC 6902: it carries the pre-image captured
/// when the patch was applied, which is what makes `remove` and `replace`
/// invertible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
}

impl Patch {
    fn new(op: PatchOp, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            value: None,
            from: None,
            old_value: None,
        }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOp::Add, path).with_value(value)
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::new(PatchOp::Remove, path)
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOp::Replace, path).with_value(value)
    }

    pub fn move_from(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(PatchOp::Move, path).with_from(from)
    }

    pub fn copy_from(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(PatchOp::Copy, path).with_from(from)
    }

    pub fn test(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOp::Test, path).with_value(value)
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_old_value(mut self, old_value: Value) -> Self {
        self.old_value = Some(old_value);
        self
    }
}

/// What to do when a `test` patch fails inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchPolicy {
    /// Any failure, including a failed test, aborts the whole batch
    #[default]
    Abort,
    /// Failed tests are skipped; every other failure still aborts
    SkipFailedTests,
}

/// A successfully applied patch
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPatch {
    pub document: CanvasDocument,
    /// The patch as it ran: concrete indices, captured pre-image
    pub recorded: Patch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub document: CanvasDocument,
    pub recorded: Vec<Patch>,
    /// Indices of `test` patches skipped under [`BatchPolicy::SkipFailedTests`]
    pub skipped: Vec<usize>,
}

/// Apply one patch, returning the new document
pub fn apply_patch(doc: &CanvasDocument, patch: &Patch) -> Result<CanvasDocument, PatchError> {
    apply_patch_recorded(doc, patch).map(|applied| applied.document)
}

/// Apply one patch and record it with its pre-image
pub fn apply_patch_recorded(doc: &CanvasDocument, patch: &Patch) -> Result<AppliedPatch, PatchError> {
    if let PatchOp::Unknown(op) = &patch.op {
        return Err(PatchError::UnknownOperation(op.clone()));
    }

    let pointer = Pointer::parse(&patch.path)?;
    let mut document = doc.clone();

    let recorded = match &patch.op {
        PatchOp::Add => add(&mut document, &pointer, patch)?,
        PatchOp::Remove => remove(&mut document, &pointer, patch)?,
        PatchOp::Replace => replace(&mut document, &pointer, patch)?,
        PatchOp::Move => move_element(&mut document, &pointer, patch)?,
        PatchOp::Copy => copy_element(&mut document, &pointer, patch)?,
        PatchOp::Test | PatchOp::Unknown(_) => {
            test(&document, &pointer, patch)?;
            return Ok(AppliedPatch {
                document,
                recorded: patch.clone(),
            });
        }
    };

    document.validate()?;

    tracing::debug!(op = %patch.op, path = %recorded.path, "applied patch");

    Ok(AppliedPatch { document, recorded })
}

/// Apply patches in order under `policy`
///
/// On error nothing is applied: the caller still holds the original
/// document and the error names the failing patch.
pub fn apply_patches(
    doc: &CanvasDocument,
    patches: &[Patch],
    policy: BatchPolicy,
) -> Result<BatchOutcome, BatchError> {
    let mut document = doc.clone();
    let mut recorded = Vec::with_capacity(patches.len());
    let mut skipped = Vec::new();

    for (index, patch) in patches.iter().enumerate() {
        match apply_patch_recorded(&document, patch) {
            Ok(applied) => {
                document = applied.document;
                recorded.push(applied.recorded);
            }
            Err(e) if e.is_test_failure() && policy == BatchPolicy::SkipFailedTests => {
                tracing::warn!(index, path = %patch.path, "skipping failed test: {}", e);
                skipped.push(index);
            }
            Err(source) => {
                tracing::debug!(index, op = %patch.op, path = %patch.path, "batch aborted: {}", source);
                return Err(BatchError {
                    index,
                    op: patch.op.clone(),
                    path: patch.path.clone(),
                    source,
                });
            }
        }
    }

    Ok(BatchOutcome {
        document,
        recorded,
        skipped,
    })
}

// ---- operations ------------------------------------------------------------

fn add(doc: &mut CanvasDocument, pointer: &Pointer, patch: &Patch) -> Result<Patch, PatchError> {
    let value = require_value(patch)?;

    if pointer.field.is_empty() {
        if pointer.target == Target::Document {
            let previous = replace_document(doc, value)?;
            return Ok(Patch::replace("", value.clone()).with_old_value(previous));
        }
        let element = Element::from_value(&pointer.target, value, &patch.path)?;
        let index = insert_element(doc, &pointer.target, element, &patch.path)?;
        return Ok(Patch::add(slot_pointer(&pointer.target, index), value.clone()));
    }

    let added = edit_field(doc, pointer, &patch.path, |root| {
        json::add(root, &pointer.field, value.clone())
    })?;

    let mut concrete = pointer.clone();
    if let Some(last) = concrete.field.last_mut() {
        *last = added.token;
    }

    // Adding over an existing member is a replace as far as undo is concerned
    Ok(match added.previous {
        Some(previous) => Patch::replace(concrete.to_string(), value.clone()).with_old_value(previous),
        None => Patch::add(concrete.to_string(), value.clone()),
    })
}

fn remove(doc: &mut CanvasDocument, pointer: &Pointer, patch: &Patch) -> Result<Patch, PatchError> {
    let canonical = pointer.to_string();

    if pointer.field.is_empty() {
        let path = pointer.tree_path().ok_or_else(|| PatchError::InvalidPath {
            path: patch.path.clone(),
            reason: "remove needs an existing artboard or node".to_string(),
        })?;
        let removed = take_element(doc, &path, &patch.path)?;
        return Ok(Patch::remove(canonical).with_old_value(removed.to_value()?));
    }

    let removed = edit_field(doc, pointer, &patch.path, |root| json::remove(root, &pointer.field))?;
    Ok(Patch::remove(canonical).with_old_value(removed))
}

fn replace(doc: &mut CanvasDocument, pointer: &Pointer, patch: &Patch) -> Result<Patch, PatchError> {
    let value = require_value(patch)?;
    let canonical = pointer.to_string();

    if pointer.field.is_empty() {
        if pointer.target == Target::Document {
            let previous = replace_document(doc, value)?;
            return Ok(Patch::replace(canonical, value.clone()).with_old_value(previous));
        }
        let path = pointer.tree_path().ok_or_else(|| PatchError::InvalidPath {
            path: patch.path.clone(),
            reason: "replace needs an existing artboard or node".to_string(),
        })?;
        let element = Element::from_value(&pointer.target, value, &patch.path)?;
        let previous = take_element(doc, &path, &patch.path)?;
        insert_element(doc, &pointer.target, element, &patch.path)?;
        return Ok(Patch::replace(canonical, value.clone()).with_old_value(previous.to_value()?));
    }

    let previous = edit_field(doc, pointer, &patch.path, |root| {
        json::replace(root, &pointer.field, value.clone())
    })?;
    Ok(Patch::replace(canonical, value.clone()).with_old_value(previous))
}

fn move_element(doc: &mut CanvasDocument, pointer: &Pointer, patch: &Patch) -> Result<Patch, PatchError> {
    let (from, source) = source_of(pointer, patch)?;

    if let Target::Node { container, .. } = &pointer.target {
        if container == &source || container.is_descendant_of(&source) {
            return Err(PatchError::CycleDetected {
                from: from.to_string(),
                path: patch.path.clone(),
            });
        }
    }

    // `path` is interpreted against the document after the removal
    let element = take_element(doc, &source, &from.to_string())?;
    let index = insert_element(doc, &pointer.target, element, &patch.path)?;

    Ok(Patch::move_from(source.to_pointer(), slot_pointer(&pointer.target, index)))
}

fn copy_element(doc: &mut CanvasDocument, pointer: &Pointer, patch: &Patch) -> Result<Patch, PatchError> {
    let (from, source) = source_of(pointer, patch)?;
    let raw_from = from.to_string();

    require_element(doc, &source, &raw_from)?;
    let not_found = || PatchError::PathNotFound(raw_from.clone());
    let mut element = if source.is_artboard() {
        let index = source.artboard_index().ok_or_else(not_found)?;
        Element::Artboard(doc.artboards.get(index).ok_or_else(not_found)?.clone())
    } else {
        Element::Node(doc.node_at(&source).ok_or_else(not_found)?.clone())
    };

    element.reidentify();
    let value = element.to_value()?;
    let index = insert_element(doc, &pointer.target, element, &patch.path)?;

    Ok(Patch::copy_from(source.to_pointer(), slot_pointer(&pointer.target, index)).with_value(value))
}

fn test(doc: &CanvasDocument, pointer: &Pointer, patch: &Patch) -> Result<(), PatchError> {
    let expected = require_value(patch)?;
    let actual = read(doc, pointer, &patch.path)?;

    match actual {
        Some(actual) if json_eq(&actual, expected) => Ok(()),
        actual => Err(PatchError::TestFailed {
            path: patch.path.clone(),
            expected: expected.clone(),
            actual: actual.unwrap_or(Value::Null),
        }),
    }
}

// ---- element plumbing ------------------------------------------------------

/// A whole artboard or node lifted out of the document
enum Element {
    Artboard(Artboard),
    Node(Node),
}

impl Element {
    fn from_value(target: &Target, value: &Value, raw: &str) -> Result<Self, PatchError> {
        match target {
            Target::Artboard(_) => Ok(Element::Artboard(from_json(value)?)),
            Target::Node { .. } => Ok(Element::Node(from_json(value)?)),
            Target::Document => Err(PatchError::InvalidPath {
                path: raw.to_string(),
                reason: "expected an artboard or node slot".to_string(),
            }),
        }
    }

    fn to_value(&self) -> Result<Value, PatchError> {
        match self {
            Element::Artboard(artboard) => to_json(artboard),
            Element::Node(node) => to_json(node),
        }
    }

    /// Fresh ids throughout the subtree; semantic keys are dropped so the
    /// copy cannot collide with the original
    fn reidentify(&mut self) {
        fn refresh(node: &mut Node) {
            node.id = new_id();
            node.semantic_key = None;
            if let Some(children) = node.children_mut() {
                children.iter_mut().for_each(refresh);
            }
        }

        match self {
            Element::Artboard(artboard) => {
                artboard.id = new_id();
                artboard.children.iter_mut().for_each(refresh);
            }
            Element::Node(node) => refresh(node),
        }
    }
}

fn require_value(patch: &Patch) -> Result<&Value, PatchError> {
    patch.value.as_ref().ok_or_else(|| PatchError::MissingValue {
        op: patch.op.clone(),
        path: patch.path.clone(),
    })
}

/// Parse and check the `from` pointer of a move/copy
fn source_of(pointer: &Pointer, patch: &Patch) -> Result<(Pointer, TreePath), PatchError> {
    let raw_from = patch.from.as_deref().ok_or_else(|| PatchError::MissingFrom {
        op: patch.op.clone(),
        path: patch.path.clone(),
    })?;
    let from = Pointer::parse(raw_from)?;

    let source = from
        .tree_path()
        .filter(|_| from.is_element())
        .ok_or_else(|| PatchError::InvalidPath {
            path: raw_from.to_string(),
            reason: format!("{} source must be an artboard or node", patch.op),
        })?;

    if !pointer.is_element() {
        return Err(PatchError::InvalidPath {
            path: patch.path.clone(),
            reason: format!("{} target must be an artboard or node slot", patch.op),
        });
    }

    Ok((from, source))
}

fn slot_pointer(target: &Target, index: usize) -> String {
    match target {
        Target::Node { container, .. } => container.child(index).to_pointer(),
        _ => TreePath::artboard(index).to_pointer(),
    }
}

/// Fail unless an artboard or node exists at `path`
fn require_element(doc: &CanvasDocument, path: &TreePath, raw: &str) -> Result<(), PatchError> {
    let exists = if path.is_artboard() {
        path.artboard_index()
            .map_or(false, |index| index < doc.artboards.len())
    } else {
        NodeIndex::build(doc).id_at(path).is_some()
    };

    if exists {
        Ok(())
    } else {
        Err(PatchError::PathNotFound(raw.to_string()))
    }
}

/// Fail unless `container` is an artboard or a Frame/Group node
fn require_container(doc: &CanvasDocument, container: &TreePath, raw: &str) -> Result<(), PatchError> {
    if container.is_artboard() {
        return require_element(doc, container, raw);
    }

    let index = NodeIndex::build(doc);
    let node = index
        .id_at(container)
        .and_then(|id| index.node(id))
        .ok_or_else(|| PatchError::PathNotFound(raw.to_string()))?;

    if node.is_container() {
        Ok(())
    } else {
        Err(PatchError::NotAContainer(container.to_pointer()))
    }
}

fn take_element(doc: &mut CanvasDocument, path: &TreePath, raw: &str) -> Result<Element, PatchError> {
    require_element(doc, path, raw)?;
    let not_found = || PatchError::PathNotFound(raw.to_string());
    let index = path.last_index().ok_or_else(not_found)?;

    match path.parent() {
        None => {
            if index >= doc.artboards.len() {
                return Err(not_found());
            }
            Ok(Element::Artboard(doc.artboards.remove(index)))
        }
        Some(container) => {
            let children = doc.children_at_mut(&container).ok_or_else(not_found)?;
            if index >= children.len() {
                return Err(not_found());
            }
            Ok(Element::Node(children.remove(index)))
        }
    }
}

/// Insert at a slot, shifting later siblings; returns the concrete index
fn insert_element(
    doc: &mut CanvasDocument,
    target: &Target,
    element: Element,
    raw: &str,
) -> Result<usize, PatchError> {
    let not_found = || PatchError::PathNotFound(raw.to_string());

    match (target, element) {
        (Target::Artboard(slot), Element::Artboard(artboard)) => {
            let index = slot.resolve(doc.artboards.len());
            if index > doc.artboards.len() {
                return Err(not_found());
            }
            doc.artboards.insert(index, artboard);
            Ok(index)
        }
        (Target::Node { container, slot }, Element::Node(node)) => {
            require_container(doc, container, raw)?;
            let children = doc.children_at_mut(container).ok_or_else(not_found)?;
            let index = slot.resolve(children.len());
            if index > children.len() {
                return Err(not_found());
            }
            children.insert(index, node);
            Ok(index)
        }
        _ => Err(PatchError::InvalidPath {
            path: raw.to_string(),
            reason: "artboards and nodes cannot take each other's slots".to_string(),
        }),
    }
}

/// Run a field-tail edit against the addressed element
fn edit_field<R>(
    doc: &mut CanvasDocument,
    pointer: &Pointer,
    raw: &str,
    edit: impl FnOnce(&mut Value) -> Option<R>,
) -> Result<R, PatchError> {
    let not_found = || PatchError::PathNotFound(raw.to_string());

    let edited = match &pointer.target {
        Target::Document => json::edit_as_json(doc, edit),
        Target::Artboard(Slot::Index(index)) => {
            let artboard = doc.artboards.get_mut(*index).ok_or_else(not_found)?;
            json::edit_as_json(artboard, edit)
        }
        Target::Node { .. } => {
            let path = pointer.tree_path().ok_or_else(not_found)?;
            require_element(doc, &path, raw)?;
            let node = doc.node_at_mut(&path).ok_or_else(not_found)?;
            json::edit_as_json(node, edit)
        }
        Target::Artboard(Slot::Append) => return Err(not_found()),
    };

    edited.map_err(ValidationError::from)?.ok_or_else(not_found)
}

/// Current value at a pointer, `None` if nothing is there
fn read(doc: &CanvasDocument, pointer: &Pointer, raw: &str) -> Result<Option<Value>, PatchError> {
    let root = match &pointer.target {
        Target::Document => to_json(doc)?,
        _ => {
            let Some(path) = pointer.tree_path() else {
                return Err(PatchError::InvalidPath {
                    path: raw.to_string(),
                    reason: "'-' does not address a value".to_string(),
                });
            };
            let element = if path.is_artboard() {
                path.artboard_index()
                    .and_then(|index| doc.artboards.get(index))
                    .map(to_json)
            } else {
                doc.node_at(&path).map(to_json)
            };
            match element {
                Some(value) => value?,
                None => return Ok(None),
            }
        }
    };

    Ok(json::get(&root, &pointer.field).cloned())
}

fn replace_document(doc: &mut CanvasDocument, value: &Value) -> Result<Value, PatchError> {
    let next: CanvasDocument = from_json(value)?;
    let previous = to_json(&*doc)?;
    *doc = next;
    Ok(previous)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, PatchError> {
    serde_json::to_value(value).map_err(|e| ValidationError::from(e).into())
}

fn from_json<T: DeserializeOwned>(value: &Value) -> Result<T, PatchError> {
    T::deserialize(value).map_err(|e| ValidationError::from(e).into())
}
