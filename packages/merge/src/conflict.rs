//! # Conflict Detection
//!
//! Compares the local and remote diffs (both against the same base) and
//! reports where they disagree.
//!
//! Operations are keyed by `(nodeId, target)`:
//!
//! ```text
//! modified  → field      (name, frame, style/color, ...)
//! moved     → position
//! added     → existence
//! removed   → existence
//! ```
//!
//! Both sides making the same change is convergent, not a conflict.

use crate::config::ConflictType;
use crate::diff::{ChangeType, DiffOperation, PROPERTY_MAPS};
use canvas_editor::{json_eq, unescape_token};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The aspect of a node two edits compete for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConflictTarget {
    Field(String),
    Position,
    Existence,
}

impl ConflictTarget {
    pub fn of(op: &DiffOperation) -> Self {
        match op.change {
            ChangeType::Modified => ConflictTarget::Field(op.field.clone().unwrap_or_default()),
            ChangeType::Moved => ConflictTarget::Position,
            ChangeType::Added | ChangeType::Removed => ConflictTarget::Existence,
        }
    }
}

impl From<String> for ConflictTarget {
    fn from(target: String) -> Self {
        match target.as_str() {
            "position" => ConflictTarget::Position,
            "existence" => ConflictTarget::Existence,
            _ => ConflictTarget::Field(target),
        }
    }
}

impl From<ConflictTarget> for String {
    fn from(target: ConflictTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for ConflictTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictTarget::Field(field) => f.write_str(field),
            ConflictTarget::Position => f.write_str("position"),
            ConflictTarget::Existence => f.write_str("existence"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// `<nodeId>:<target>`
    pub id: String,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub node_id: String,
    pub target: ConflictTarget,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_key: Option<String>,
    pub base_value: Value,
    pub local_value: Value,
    pub remote_value: Value,
}

impl Conflict {
    /// Whether `op` is one of the edits this conflict holds back
    ///
    /// A delete-vs-modify conflict covers every operation on the node,
    /// anything added or moved into it, and the removal of everything below
    /// it. A type change conflict covers every field edit of the node.
    pub fn covers(&self, op: &DiffOperation) -> bool {
        if op.node_id == self.node_id {
            return match self.conflict_type {
                ConflictType::DeleteModify => true,
                _ if self.is_retype() => op.change == ChangeType::Modified && op.field.as_deref() != Some("id"),
                _ => ConflictTarget::of(op) == self.target,
            };
        }
        if self.conflict_type != ConflictType::DeleteModify {
            return false;
        }
        match op.change {
            ChangeType::Added | ChangeType::Moved => op.location.parent_id == self.node_id,
            // removed ops carry their base path, as does this conflict
            ChangeType::Removed => op.path.starts_with(&format!("{}/children/", self.path)),
            ChangeType::Modified => false,
        }
    }

    /// Conflict over a node's type; its values are whole shallow nodes
    pub fn is_retype(&self) -> bool {
        self.target == ConflictTarget::Field(TYPE_FIELD.to_string())
    }
}

const TYPE_FIELD: &str = "type";

fn is_retype(op: &DiffOperation) -> bool {
    op.change == ChangeType::Modified && op.field.as_deref() == Some(TYPE_FIELD)
}

type Key = (String, ConflictTarget);

/// Conflicts between two diffs of the same base, sorted by id
pub fn detect_conflicts(local: &[DiffOperation], remote: &[DiffOperation]) -> Vec<Conflict> {
    let local_ops = keyed(local);
    let remote_ops = keyed(remote);
    let mut conflicts: BTreeMap<String, Conflict> = BTreeMap::new();

    for (key, local_op) in &local_ops {
        let Some(remote_op) = remote_ops.get(key) else {
            continue;
        };
        if let Some(conflict_type) = competing(local_op, remote_op) {
            let conflict = Conflict {
                id: conflict_id(&key.0, &key.1),
                conflict_type,
                node_id: key.0.clone(),
                target: key.1.clone(),
                path: remote_op.path.clone(),
                semantic_key: local_op.semantic_key.clone().or_else(|| remote_op.semantic_key.clone()),
                base_value: local_op.old_value.clone().unwrap_or(Value::Null),
                local_value: side_value(local_op),
                remote_value: side_value(remote_op),
            };
            conflicts.insert(conflict.id.clone(), conflict);
        }
    }

    // A type change replaces the whole node, so it competes with every
    // field edit the other side made to that node
    for (typing, edits, typed_locally) in [(local, remote, true), (remote, local, false)] {
        for retype in typing.iter().filter(|op| is_retype(op)) {
            let target = ConflictTarget::Field(TYPE_FIELD.to_string());
            let id = conflict_id(&retype.node_id, &target);
            if conflicts.contains_key(&id) {
                continue;
            }

            let field_edits: Vec<&DiffOperation> = edits
                .iter()
                .filter(|op| {
                    op.node_id == retype.node_id
                        && op.change == ChangeType::Modified
                        && op.field.as_deref() != Some("id")
                })
                .collect();
            // both sides retyping is settled by the keyed pass above
            if field_edits.is_empty() || field_edits.iter().any(|op| is_retype(op)) {
                continue;
            }

            let base_value = retype.old_value.clone().unwrap_or(Value::Null);
            let edited = with_edits(&base_value, &field_edits);
            let retyped = retype.new_value.clone().unwrap_or(Value::Null);
            let (local_value, remote_value) = if typed_locally {
                (retyped, edited)
            } else {
                (edited, retyped)
            };

            conflicts.insert(
                id.clone(),
                Conflict {
                    id,
                    conflict_type: ConflictType::ModifyModify,
                    node_id: retype.node_id.clone(),
                    target,
                    path: retype.path.clone(),
                    semantic_key: retype.semantic_key.clone(),
                    base_value,
                    local_value,
                    remote_value,
                },
            );
        }
    }

    for (removals, edits, removed_locally) in [(local, remote, true), (remote, local, false)] {
        for removal in removals.iter().filter(|op| op.change == ChangeType::Removed) {
            let touched: Vec<&DiffOperation> = edits
                .iter()
                .filter(|op| op.change != ChangeType::Removed && touches(op, &removal.node_id))
                .collect();
            if touched.is_empty() {
                continue;
            }

            let edit_summary = summarize(&removal.node_id, &touched);
            let (local_value, remote_value) = if removed_locally {
                (Value::Null, edit_summary)
            } else {
                (edit_summary, Value::Null)
            };

            let id = conflict_id(&removal.node_id, &ConflictTarget::Existence);
            conflicts.insert(
                id.clone(),
                Conflict {
                    id,
                    conflict_type: ConflictType::DeleteModify,
                    node_id: removal.node_id.clone(),
                    target: ConflictTarget::Existence,
                    path: removal.path.clone(),
                    semantic_key: removal.semantic_key.clone(),
                    base_value: removal.old_value.clone().unwrap_or(Value::Null),
                    local_value,
                    remote_value,
                },
            );
        }
    }

    tracing::debug!(
        local = local.len(),
        remote = remote.len(),
        conflicts = conflicts.len(),
        "detected conflicts"
    );

    conflicts.into_values().collect()
}

fn keyed(ops: &[DiffOperation]) -> BTreeMap<Key, &DiffOperation> {
    ops.iter()
        .map(|op| ((op.node_id.clone(), ConflictTarget::of(op)), op))
        .collect()
}

pub(crate) fn conflict_id(node_id: &str, target: &ConflictTarget) -> String {
    format!("{}:{}", node_id, target)
}

/// Conflict type for two operations on the same key, `None` if they agree
fn competing(local: &DiffOperation, remote: &DiffOperation) -> Option<ConflictType> {
    let same_value = |a: &Option<Value>, b: &Option<Value>| match (a, b) {
        (Some(a), Some(b)) => json_eq(a, b),
        (None, None) => true,
        _ => false,
    };

    match (local.change, remote.change) {
        (ChangeType::Removed, ChangeType::Removed) => None,
        (ChangeType::Modified, ChangeType::Modified) => {
            (!same_value(&local.new_value, &remote.new_value)).then_some(ConflictType::ModifyModify)
        }
        (ChangeType::Moved, ChangeType::Moved) => {
            (local.location != remote.location).then_some(ConflictType::MoveMove)
        }
        (ChangeType::Added, ChangeType::Added) => {
            let differs = !same_value(&local.new_value, &remote.new_value) || local.location != remote.location;
            differs.then_some(ConflictType::AddAdd)
        }
        _ => None,
    }
}

fn side_value(op: &DiffOperation) -> Value {
    match op.change {
        ChangeType::Moved => op.location.to_value(),
        _ => op.new_value.clone().unwrap_or(Value::Null),
    }
}

/// Shallow node `base` with field edits laid over it
fn with_edits(base: &Value, edits: &[&DiffOperation]) -> Value {
    let mut node = base.as_object().cloned().unwrap_or_default();
    for op in edits {
        let Some(field) = op.field.as_deref() else {
            continue;
        };
        let map = field
            .split_once('/')
            .filter(|(map, _)| PROPERTY_MAPS.contains(map));

        match (map, &op.new_value) {
            (Some((map, key)), value) => {
                let entries = node
                    .entry(map.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(entries) = entries {
                    match value {
                        Some(value) => {
                            entries.insert(unescape_token(key), value.clone());
                        }
                        None => {
                            entries.remove(&unescape_token(key));
                        }
                    }
                }
            }
            (None, Some(value)) => {
                node.insert(field.to_string(), value.clone());
            }
            (None, None) => {
                node.remove(field);
            }
        }
    }
    Value::Object(node)
}

/// True if `op` edits `node_id` or puts something inside it
fn touches(op: &DiffOperation, node_id: &str) -> bool {
    op.node_id == node_id
        || (matches!(op.change, ChangeType::Added | ChangeType::Moved) && op.location.parent_id == node_id)
}

/// What the surviving side did to a node the other side removed
///
/// Keys are the node's own targets (`name`, `position`) or
/// `<change>:<childId>` for nodes put inside it.
fn summarize(node_id: &str, ops: &[&DiffOperation]) -> Value {
    let mut summary = Map::new();
    for op in ops {
        let key = if op.node_id == node_id {
            ConflictTarget::of(op).to_string()
        } else {
            format!("{}:{}", op.change, op.node_id)
        };
        summary.insert(key, side_value(op));
    }
    Value::Object(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ElementKind, Location};
    use serde_json::json;

    fn modified(node_id: &str, field: &str, old: Value, new: Value) -> DiffOperation {
        DiffOperation {
            change: ChangeType::Modified,
            element: ElementKind::Node,
            node_id: node_id.to_string(),
            semantic_key: None,
            path: "/artboards/0/children/0".to_string(),
            field: Some(field.to_string()),
            location: Location::new("ab", 0),
            old_value: Some(old),
            new_value: Some(new),
            description: String::new(),
        }
    }

    #[test]
    fn test_target_wire_format() {
        assert_eq!(ConflictTarget::from("position".to_string()), ConflictTarget::Position);
        assert_eq!(
            ConflictTarget::from("style/color".to_string()),
            ConflictTarget::Field("style/color".to_string())
        );
        assert_eq!(conflict_id("hero", &ConflictTarget::Existence), "hero:existence");
    }

    #[test]
    fn test_same_change_is_convergent() {
        let local = vec![modified("hero", "name", json!("A"), json!("B"))];
        let remote = vec![modified("hero", "name", json!("A"), json!("B"))];
        assert!(detect_conflicts(&local, &remote).is_empty());
    }

    #[test]
    fn test_different_values_conflict_once() {
        let local = vec![modified("hero", "name", json!("A"), json!("B"))];
        let remote = vec![modified("hero", "name", json!("A"), json!("C"))];

        let conflicts = detect_conflicts(&local, &remote);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "hero:name");
        assert_eq!(conflicts[0].conflict_type, ConflictType::ModifyModify);
        assert_eq!(conflicts[0].base_value, json!("A"));
        assert_eq!(conflicts[0].local_value, json!("B"));
        assert_eq!(conflicts[0].remote_value, json!("C"));
    }

    #[test]
    fn test_disjoint_fields_do_not_conflict() {
        let local = vec![modified("hero", "name", json!("A"), json!("B"))];
        let remote = vec![modified("hero", "visible", json!(true), json!(false))];
        assert!(detect_conflicts(&local, &remote).is_empty());
    }

    #[test]
    fn test_retype_competes_with_field_edits() {
        let before = json!({ "id": "footer", "type": "text", "name": "Footer", "content": "(c)" });
        let after = json!({ "id": "footer", "type": "image", "name": "Footer", "src": "logo.png" });
        let local = vec![modified("footer", "type", before.clone(), after.clone())];
        let remote = vec![
            modified("footer", "name", json!("Footer"), json!("Footer 2026")),
            modified("footer", "style/color", Value::Null, json!({ "type": "color", "value": "#fff" })),
        ];

        let conflicts = detect_conflicts(&local, &remote);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "footer:type");
        assert!(conflicts[0].is_retype());
        assert_eq!(conflicts[0].base_value, before);
        assert_eq!(conflicts[0].local_value, after);
        assert_eq!(conflicts[0].remote_value["name"], json!("Footer 2026"));
        assert_eq!(conflicts[0].remote_value["style"]["color"]["value"], json!("#fff"));

        assert!(remote.iter().all(|op| conflicts[0].covers(op)));
    }

    #[test]
    fn test_delete_covers_removals_below() {
        let conflict = Conflict {
            id: "hero:existence".to_string(),
            conflict_type: ConflictType::DeleteModify,
            node_id: "hero".to_string(),
            target: ConflictTarget::Existence,
            path: "/artboards/0/children/0".to_string(),
            semantic_key: None,
            base_value: Value::Null,
            local_value: Value::Null,
            remote_value: Value::Null,
        };
        let removal = |path: &str| DiffOperation {
            change: ChangeType::Removed,
            path: path.to_string(),
            field: None,
            node_id: "x".to_string(),
            ..modified("x", "name", Value::Null, Value::Null)
        };

        assert!(conflict.covers(&removal("/artboards/0/children/0/children/1")));
        assert!(conflict.covers(&removal("/artboards/0/children/0/children/1/children/0")));
        assert!(!conflict.covers(&removal("/artboards/0/children/1")));
        assert!(!conflict.covers(&removal("/artboards/0/children/01")));
    }
}
