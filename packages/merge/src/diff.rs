//! # Semantic Diff
//!
//! Describes how `other` differs from `base` in terms of logical elements.
//!
//! ## Matching
//!
//! 1. Nodes pair by id
//! 2. An unpaired `other` node whose semantic key belongs to an unpaired
//!    `base` node is the same element re-created; it reports under the base
//!    id with a `modified` op on `id`
//! 3. Whatever is left is `added` (only in other) or `removed` (only in base)
//!
//! ## Moves
//!
//! A paired node is `moved` when its parent changed, or when it falls
//! outside the longest run of surviving siblings that kept their relative
//! order. Moving one node to the front therefore reports one move, not a
//! shift of every sibling.
//!
//! ## Ordering
//!
//! Operations sort by their path in `other` (removed ones by their `base`
//! path, after everything else), then by change type, then by field.

use crate::config::MergeConfig;
use crate::error::MergeError;
use canvas_document::{Artboard, CanvasDocument, Node, NodeIndex, NodeIndexEntry, TreePath};
use canvas_editor::{escape_token, json_eq};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Added,
    Moved,
    Modified,
    Removed,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeType::Added => "added",
            ChangeType::Moved => "moved",
            ChangeType::Modified => "modified",
            ChangeType::Removed => "removed",
        })
    }
}

/// What kind of element an operation describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Document,
    Artboard,
    Node,
}

/// Parent and index of an element; artboards use the document id as parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub parent_id: String,
    pub index: usize,
}

impl Location {
    pub fn new(parent_id: impl Into<String>, index: usize) -> Self {
        Self {
            parent_id: parent_id.into(),
            index,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "parentId": self.parent_id, "index": self.index })
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            parent_id: value.get("parentId")?.as_str()?.to_string(),
            index: usize::try_from(value.get("index")?.as_u64()?).ok()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOperation {
    #[serde(rename = "type")]
    pub change: ChangeType,
    pub element: ElementKind,
    /// Base id for paired and removed elements, other id for added ones
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_key: Option<String>,
    /// Pointer in `other` (in `base` for removed elements)
    pub path: String,
    /// Relative pointer of the changed field (`name`, `style/color`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Where the element sits in `other` (in `base` for removed elements)
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub description: String,
}

/// Diff two documents
pub fn diff_documents(base: &CanvasDocument, other: &CanvasDocument) -> Vec<DiffOperation> {
    let mut differ = Differ::new(base, other);
    differ.document_fields();
    differ.artboards();
    differ.nodes();
    differ.finish()
}

/// Diff two documents after checking them against the node ceiling
pub fn diff_documents_checked(
    base: &CanvasDocument,
    other: &CanvasDocument,
    config: &MergeConfig,
) -> Result<Vec<DiffOperation>, MergeError> {
    check_size("base", base, config)?;
    check_size("other", other, config)?;
    Ok(diff_documents(base, other))
}

pub(crate) fn check_size(side: &'static str, doc: &CanvasDocument, config: &MergeConfig) -> Result<(), MergeError> {
    let nodes = doc.node_count();
    if nodes > config.max_nodes {
        return Err(MergeError::DocumentTooLarge {
            side,
            nodes,
            limit: config.max_nodes,
        });
    }
    Ok(())
}

/// (removed, path, change, field)
type SortKey = (bool, TreePath, ChangeType, String);

struct Differ<'a> {
    base: &'a CanvasDocument,
    other: &'a CanvasDocument,
    base_index: NodeIndex<'a>,
    other_index: NodeIndex<'a>,
    ops: Vec<(SortKey, DiffOperation)>,
}

impl<'a> Differ<'a> {
    fn new(base: &'a CanvasDocument, other: &'a CanvasDocument) -> Self {
        Self {
            base,
            other,
            base_index: NodeIndex::build(base),
            other_index: NodeIndex::build(other),
            ops: Vec::new(),
        }
    }

    fn push(&mut self, sort_path: TreePath, op: DiffOperation) {
        let key = (
            op.change == ChangeType::Removed,
            sort_path,
            op.change,
            op.field.clone().unwrap_or_default(),
        );
        self.ops.push((key, op));
    }

    fn finish(mut self) -> Vec<DiffOperation> {
        self.ops.sort_by(|a, b| a.0.cmp(&b.0));

        tracing::debug!(operations = self.ops.len(), "computed document diff");

        self.ops.into_iter().map(|(_, op)| op).collect()
    }

    fn document_fields(&mut self) {
        if self.base.name != self.other.name {
            self.push(
                TreePath::default(),
                DiffOperation {
                    change: ChangeType::Modified,
                    element: ElementKind::Document,
                    node_id: self.base.id.clone(),
                    semantic_key: None,
                    path: String::new(),
                    field: Some("name".to_string()),
                    location: Location::new("", 0),
                    old_value: Some(json!(self.base.name)),
                    new_value: Some(json!(self.other.name)),
                    description: format!("Renamed document to \"{}\"", self.other.name),
                },
            );
        }
    }

    fn artboards(&mut self) {
        let (base, other) = (self.base, self.other);
        let base_positions: HashMap<&str, usize> = base
            .artboards
            .iter()
            .enumerate()
            .map(|(i, artboard)| (artboard.id.as_str(), i))
            .collect();
        let other_ids: HashSet<&str> = other.artboards.iter().map(|a| a.id.as_str()).collect();

        let surviving: Vec<(usize, usize)> = other
            .artboards
            .iter()
            .enumerate()
            .filter_map(|(i, artboard)| base_positions.get(artboard.id.as_str()).map(|&j| (i, j)))
            .collect();
        let in_order = kept_in_order(&surviving);

        for (i, artboard) in other.artboards.iter().enumerate() {
            let path = TreePath::artboard(i);
            let location = Location::new(other.id.clone(), i);

            let Some(&j) = base_positions.get(artboard.id.as_str()) else {
                self.push(
                    path.clone(),
                    DiffOperation {
                        change: ChangeType::Added,
                        element: ElementKind::Artboard,
                        node_id: artboard.id.clone(),
                        semantic_key: None,
                        path: path.to_pointer(),
                        field: None,
                        location,
                        old_value: None,
                        new_value: Some(shallow_artboard(artboard)),
                        description: format!("Added artboard \"{}\"", artboard.name),
                    },
                );
                continue;
            };

            let before = &base.artboards[j];
            let changes = field_changes(&shallow_artboard(before), &shallow_artboard(artboard));
            for (field, old_value, new_value) in changes {
                self.push(
                    path.clone(),
                    DiffOperation {
                        change: ChangeType::Modified,
                        element: ElementKind::Artboard,
                        node_id: artboard.id.clone(),
                        semantic_key: None,
                        path: path.to_pointer(),
                        description: format!("Changed {} of artboard \"{}\"", field, artboard.name),
                        field: Some(field),
                        location: location.clone(),
                        old_value,
                        new_value,
                    },
                );
            }

            if !in_order.contains(&i) {
                self.push(
                    path.clone(),
                    DiffOperation {
                        change: ChangeType::Moved,
                        element: ElementKind::Artboard,
                        node_id: artboard.id.clone(),
                        semantic_key: None,
                        path: path.to_pointer(),
                        field: None,
                        location: location.clone(),
                        old_value: Some(Location::new(base.id.clone(), j).to_value()),
                        new_value: Some(location.to_value()),
                        description: format!("Moved artboard \"{}\" to position {}", artboard.name, i),
                    },
                );
            }
        }

        for (j, artboard) in base.artboards.iter().enumerate() {
            if other_ids.contains(artboard.id.as_str()) {
                continue;
            }
            let path = TreePath::artboard(j);
            self.push(
                path.clone(),
                DiffOperation {
                    change: ChangeType::Removed,
                    element: ElementKind::Artboard,
                    node_id: artboard.id.clone(),
                    semantic_key: None,
                    path: path.to_pointer(),
                    field: None,
                    location: Location::new(base.id.clone(), j),
                    old_value: Some(shallow_artboard(artboard)),
                    new_value: None,
                    description: format!("Removed artboard \"{}\"", artboard.name),
                },
            );
        }
    }

    fn nodes(&mut self) {
        let pairs = self.pair_nodes();
        let base_to_other: HashMap<&str, &str> = pairs.iter().map(|(b, o)| (*b, *o)).collect();
        let other_to_base: HashMap<&str, &str> = pairs.iter().map(|(b, o)| (*o, *b)).collect();
        let moved = self.moved_nodes(&base_to_other, &other_to_base);

        let other_entries: Vec<NodeIndexEntry<'a>> = self.other_index.iter().cloned().collect();
        for entry in &other_entries {
            match other_to_base.get(entry.node.id.as_str()) {
                Some(base_id) => {
                    if let Some(base_entry) = self.base_index.get(base_id).cloned() {
                        let is_moved = moved.contains(entry.node.id.as_str());
                        self.compare_nodes(&base_entry, entry, is_moved);
                    }
                }
                None => self.added_node(entry),
            }
        }

        let base_entries: Vec<NodeIndexEntry<'a>> = self.base_index.iter().cloned().collect();
        for entry in &base_entries {
            if !base_to_other.contains_key(entry.node.id.as_str()) {
                self.removed_node(entry);
            }
        }
    }

    /// (base id, other id) pairs, by id first and then by semantic key
    fn pair_nodes(&self) -> Vec<(&'a str, &'a str)> {
        let mut pairs = Vec::new();
        let mut paired_base: HashSet<&str> = HashSet::new();

        for id in self.other_index.ids() {
            if self.base_index.contains(id) {
                pairs.push((id, id));
                paired_base.insert(id);
            }
        }

        for entry in self.other_index.iter() {
            let id = entry.node.id.as_str();
            if self.base_index.contains(id) {
                continue;
            }
            let Some(key) = entry.node.semantic_key.as_deref() else {
                continue;
            };
            let Some(base_entry) = self.base_index.by_semantic_key(key) else {
                continue;
            };
            let base_id = base_entry.node.id.as_str();
            if !self.other_index.contains(base_id) && paired_base.insert(base_id) {
                pairs.push((base_id, id));
            }
        }

        pairs
    }

    /// Other-side ids of paired nodes that moved
    fn moved_nodes(
        &self,
        base_to_other: &HashMap<&str, &str>,
        other_to_base: &HashMap<&str, &str>,
    ) -> HashSet<&'a str> {
        let mut moved = HashSet::new();
        // other parent id → (other id, base index) of siblings that kept their parent
        let mut siblings: BTreeMap<&str, Vec<(&'a str, usize)>> = BTreeMap::new();

        for entry in self.other_index.iter() {
            let id = entry.node.id.as_str();
            let Some(base_entry) = other_to_base.get(id).and_then(|b| self.base_index.get(b)) else {
                continue;
            };

            let base_parent = base_entry.parent_id;
            let mapped_parent = base_to_other.get(base_parent).copied().unwrap_or(base_parent);

            if mapped_parent == entry.parent_id {
                siblings
                    .entry(entry.parent_id)
                    .or_default()
                    .push((id, base_entry.index_in_parent()));
            } else {
                moved.insert(id);
            }
        }

        for group in siblings.values() {
            let keep = kept_in_order(
                &group
                    .iter()
                    .enumerate()
                    .map(|(i, (_, base_index))| (i, *base_index))
                    .collect::<Vec<_>>(),
            );
            for (i, (id, _)) in group.iter().enumerate() {
                if !keep.contains(&i) {
                    moved.insert(*id);
                }
            }
        }

        moved
    }

    fn compare_nodes(&mut self, base: &NodeIndexEntry<'a>, other: &NodeIndexEntry<'a>, moved: bool) {
        let sort_path = other.path.clone();
        let path = other.pointer();
        let location = Location::new(other.parent_id, other.index_in_parent());
        let name = other.node.name.clone();

        let op = |change, field: Option<String>, old_value, new_value, description| DiffOperation {
            change,
            element: ElementKind::Node,
            node_id: base.node.id.clone(),
            semantic_key: other.node.semantic_key.clone(),
            path: path.clone(),
            field,
            location: location.clone(),
            old_value,
            new_value,
            description,
        };

        let mut found = Vec::new();

        if base.node.id != other.node.id {
            found.push(op(
                ChangeType::Modified,
                Some("id".to_string()),
                Some(json!(base.node.id)),
                Some(json!(other.node.id)),
                format!("Re-identified \"{}\" as {}", name, other.node.id),
            ));
        }

        let before = shallow_node(base.node);
        let after = shallow_node(other.node);

        if base.node.node_type() != other.node.node_type() {
            found.push(op(
                ChangeType::Modified,
                Some("type".to_string()),
                Some(before),
                Some(after),
                format!(
                    "Changed \"{}\" from {} to {}",
                    name,
                    base.node.node_type(),
                    other.node.node_type()
                ),
            ));
        } else {
            for (field, old_value, new_value) in field_changes(&before, &after) {
                let description = format!("Changed {} of \"{}\"", field, name);
                found.push(op(ChangeType::Modified, Some(field), old_value, new_value, description));
            }
        }

        if moved {
            let from = Location::new(base.parent_id, base.index_in_parent());
            found.push(op(
                ChangeType::Moved,
                None,
                Some(from.to_value()),
                Some(location.to_value()),
                format!("Moved \"{}\" to {}[{}]", name, location.parent_id, location.index),
            ));
        }

        for diff in found {
            self.push(sort_path.clone(), diff);
        }
    }

    fn added_node(&mut self, entry: &NodeIndexEntry<'a>) {
        self.push(
            entry.path.clone(),
            DiffOperation {
                change: ChangeType::Added,
                element: ElementKind::Node,
                node_id: entry.node.id.clone(),
                semantic_key: entry.node.semantic_key.clone(),
                path: entry.pointer(),
                field: None,
                location: Location::new(entry.parent_id, entry.index_in_parent()),
                old_value: None,
                new_value: Some(shallow_node(entry.node)),
                description: format!("Added {} \"{}\"", entry.node.node_type(), entry.node.name),
            },
        );
    }

    fn removed_node(&mut self, entry: &NodeIndexEntry<'a>) {
        self.push(
            entry.path.clone(),
            DiffOperation {
                change: ChangeType::Removed,
                element: ElementKind::Node,
                node_id: entry.node.id.clone(),
                semantic_key: entry.node.semantic_key.clone(),
                path: entry.pointer(),
                field: None,
                location: Location::new(entry.parent_id, entry.index_in_parent()),
                old_value: Some(shallow_node(entry.node)),
                new_value: None,
                description: format!("Removed {} \"{}\"", entry.node.node_type(), entry.node.name),
            },
        );
    }
}

/// Positions (first element of each pair) that stay in relative order
///
/// Pairs are `(position in other, position in base)`, already sorted by
/// position in other. The kept set is one longest increasing run of base
/// positions.
fn kept_in_order(pairs: &[(usize, usize)]) -> BTreeSet<usize> {
    let sequence: Vec<usize> = pairs.iter().map(|(_, base)| *base).collect();
    longest_increasing(&sequence)
        .into_iter()
        .map(|i| pairs[i].0)
        .collect()
}

/// Indices into `sequence` of one longest strictly increasing subsequence
pub(crate) fn longest_increasing(sequence: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; sequence.len()];

    for (i, &value) in sequence.iter().enumerate() {
        let slot = tails.partition_point(|&t| sequence[t] < value);
        if slot > 0 {
            previous[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        run.push(i);
        cursor = previous[i];
    }
    run.reverse();
    run
}

pub(crate) const PROPERTY_MAPS: [&str; 3] = ["style", "data", "overrides"];

/// Node as JSON without its subtree
pub fn shallow_node(node: &Node) -> Value {
    let mut value = serde_json::to_value(node.shallow_clone()).unwrap_or(Value::Null);
    if let Value::Object(object) = &mut value {
        object.remove("children");
    }
    value
}

/// Artboard as JSON without its children
pub fn shallow_artboard(artboard: &Artboard) -> Value {
    json!({
        "id": artboard.id,
        "name": artboard.name,
        "frame": artboard.frame,
    })
}

/// Comparable fields of a shallow element
///
/// `id`, `type` and `children` are left out; property maps are split into
/// one entry per key (`style/color`).
pub(crate) fn field_map(value: &Value) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    let Value::Object(object) = value else {
        return fields;
    };

    for (key, field) in object {
        match (key.as_str(), field) {
            ("id" | "type" | "children", _) => {}
            (map, Value::Object(entries)) if PROPERTY_MAPS.contains(&map) => {
                for (entry, entry_value) in entries {
                    fields.insert(format!("{}/{}", map, escape_token(entry)), entry_value.clone());
                }
            }
            _ => {
                fields.insert(key.clone(), field.clone());
            }
        }
    }

    fields
}

/// (field, old, new) for every field that differs, in field order
fn field_changes(before: &Value, after: &Value) -> Vec<(String, Option<Value>, Option<Value>)> {
    let before = field_map(before);
    let after = field_map(after);
    let fields: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    fields
        .into_iter()
        .filter_map(|field| {
            let old_value = before.get(field);
            let new_value = after.get(field);
            let same = match (old_value, new_value) {
                (Some(a), Some(b)) => json_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            (!same).then(|| (field.clone(), old_value.cloned(), new_value.cloned()))
        })
        .collect()
}
