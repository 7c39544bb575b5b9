//! # Three-way Merge
//!
//! Merges two edited copies of the same base document.
//!
//! ## Flow
//!
//! ```text
//! base ──diff──► local ops ──┐
//!      ──diff──► remote ops ─┴─► detect_conflicts ─► resolve_merge_conflicts
//!                                         │
//!        ops no conflict holds back ──────┤
//!        ops of accepted resolutions ─────┘
//!                                         ↓
//!                         steps, applied to base one patch at a time
//! ```
//!
//! ## Step order
//!
//! 1. adds (artboards first, then shallowest nodes first)
//! 2. retypes that turn a node into a container
//! 3. moves
//! 4. field writes
//! 5. removals
//! 6. retypes that turn a container into a leaf
//! 7. id changes, so every earlier step can still find the base id
//!
//! Every step is resolved by id against a fresh Node Index, so it lands
//! wherever the element sits after the steps before it. A step that no
//! longer applies is reported in [`MergeOutcome::rejected`] and the merge
//! carries on.

use crate::config::{MergeConfig, Strategy};
use crate::conflict::{detect_conflicts, Conflict, ConflictTarget};
use crate::diff::{
    check_size, diff_documents, shallow_node, ChangeType, DiffOperation, ElementKind, Location, PROPERTY_MAPS,
};
use crate::error::MergeError;
use crate::resolve::{resolve_merge_conflicts, MergeResolution};
use canvas_document::{CanvasDocument, Node, NodeIndex, TreePath, ValidationError};
use canvas_editor::{apply_patch, field_pointer, json_eq, unescape_token, Patch, PatchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub document: CanvasDocument,
    pub conflicts: Vec<Conflict>,
    pub resolutions: Vec<MergeResolution>,
    pub rejected: Vec<RejectedStep>,
}

impl MergeOutcome {
    /// Resolutions waiting on a human decision
    pub fn review_queue(&self) -> Vec<&MergeResolution> {
        self.resolutions.iter().filter(|r| r.requires_review).collect()
    }

    /// No review entries and no rejected steps
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.resolutions.iter().all(|r| !r.requires_review)
    }
}

/// A change from one side that could not be applied to the merged document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedStep {
    pub node_id: String,
    pub description: String,
    pub reason: String,
    /// Set when the step came from an accepted resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_id: Option<String>,
}

#[derive(Error, Debug)]
enum Rejection {
    #[error("{0} no longer exists")]
    Missing(String),

    #[error("container {0} no longer exists")]
    MissingContainer(String),

    #[error("{0} already exists")]
    AlreadyPresent(String),

    #[error("operation carries no value")]
    NoValue,

    #[error("{node} contains {held}, which has unresolved changes")]
    Protected { node: String, held: String },

    #[error("changing the type of {0} would drop its children")]
    DropsChildren(String),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

impl From<serde_json::Error> for Rejection {
    fn from(e: serde_json::Error) -> Self {
        Rejection::Patch(ValidationError::from(e).into())
    }
}

/// Merge `local` and `remote`, both edited from `base`
pub fn merge_documents(
    base: &CanvasDocument,
    local: &CanvasDocument,
    remote: &CanvasDocument,
    config: &MergeConfig,
) -> Result<MergeOutcome, MergeError> {
    for (side, doc) in [("base", base), ("local", local), ("remote", remote)] {
        check_size(side, doc, config)?;
        doc.validate()
            .map_err(|source| MergeError::InvalidInput { side, source })?;
    }

    let local_ops = diff_documents(base, local);
    let remote_ops = diff_documents(base, remote);
    let conflicts = detect_conflicts(&local_ops, &remote_ops);
    let mut resolutions = resolve_merge_conflicts(&conflicts, config);

    let plan = Plan::build(&local_ops, &remote_ops, &resolutions);

    let mut merger = Merger {
        document: base.clone(),
        protected: plan.protected,
        rejected: Vec::new(),
    };
    for step in &plan.steps {
        if let Err(reason) = merger.run(step) {
            let conflict_id = step.resolution.map(|i| resolutions[i].conflict.id.clone());
            if let Some(i) = step.resolution {
                resolutions[i].applied = false;
            }

            tracing::warn!(node = %step.op.node_id, %reason, "rejected merge step");

            merger.rejected.push(RejectedStep {
                node_id: step.op.node_id.clone(),
                description: step.op.description.clone(),
                reason: reason.to_string(),
                conflict_id,
            });
        }
    }

    let outcome = MergeOutcome {
        document: merger.document,
        conflicts,
        resolutions,
        rejected: merger.rejected,
    };

    tracing::info!(
        local = local_ops.len(),
        remote = remote_ops.len(),
        steps = plan.steps.len(),
        conflicts = outcome.conflicts.len(),
        review = outcome.review_queue().len(),
        rejected = outcome.rejected.len(),
        "merged documents"
    );

    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Add,
    Expand,
    Move,
    Write,
    Remove,
    Collapse,
    Reidentify,
}

#[derive(Debug)]
struct Step {
    op: DiffOperation,
    phase: Phase,
    /// Index of the resolution this step carries out
    resolution: Option<usize>,
}

impl Step {
    fn new(op: DiffOperation, resolution: Option<usize>) -> Self {
        let phase = match op.change {
            ChangeType::Added => Phase::Add,
            ChangeType::Moved => Phase::Move,
            ChangeType::Removed => Phase::Remove,
            ChangeType::Modified if op.field.as_deref() == Some("id") => Phase::Reidentify,
            ChangeType::Modified if op.field.as_deref() == Some("type") => {
                if op.new_value.as_ref().map_or(false, becomes_container) {
                    Phase::Expand
                } else {
                    Phase::Collapse
                }
            }
            ChangeType::Modified => Phase::Write,
        };
        Self { op, phase, resolution }
    }

    fn order(&self) -> (Phase, bool, usize, usize) {
        let artboard = self.op.element == ElementKind::Artboard;
        // artboards go in first and come out last
        let element_rank = if self.phase == Phase::Remove { artboard } else { !artboard };
        (
            self.phase,
            element_rank,
            self.op.path.matches("/children/").count(),
            self.op.location.index,
        )
    }
}

struct Plan {
    steps: Vec<Step>,
    /// Nodes a conflict keeps alive; nothing holding them may be removed
    protected: BTreeSet<String>,
}

impl Plan {
    fn build(local: &[DiffOperation], remote: &[DiffOperation], resolutions: &[MergeResolution]) -> Self {
        let mut steps = Vec::new();
        let mut protected = BTreeSet::new();

        // Convergent ops appear on both sides; take them once
        let mut seen: HashSet<(String, ConflictTarget)> = HashSet::new();
        for op in local.iter().chain(remote) {
            if resolutions.iter().any(|r| r.conflict.covers(op)) {
                continue;
            }
            if seen.insert((op.node_id.clone(), ConflictTarget::of(op))) {
                steps.push(Step::new(op.clone(), None));
            }
        }

        let mut taken: HashSet<(bool, usize)> = HashSet::new();
        for (r, resolution) in resolutions.iter().enumerate() {
            let conflict = &resolution.conflict;
            let winner = match resolution.strategy {
                Strategy::PreferLocal if resolution.applied => Some((true, local)),
                Strategy::PreferRemote | Strategy::MergeBoth if resolution.applied => Some((false, remote)),
                _ => None,
            };

            let Some((is_local, ops)) = winner else {
                protected.insert(conflict.node_id.clone());
                continue;
            };

            let removes = ops
                .iter()
                .any(|op| op.change == ChangeType::Removed && op.node_id == conflict.node_id);
            if !removes {
                protected.insert(conflict.node_id.clone());
            }

            // The resolved value is the whole shallow node; one retype step
            // writes it, whichever side changed the type
            if conflict.is_retype() {
                let losing = if is_local { remote } else { local };
                let template = ops.iter().chain(losing).find(|op| {
                    op.node_id == conflict.node_id && op.field.as_deref() == Some("type")
                });
                if let (Some(op), Some(value)) = (template, &resolution.resolved_value) {
                    let mut op = op.clone();
                    op.new_value = Some(value.clone());
                    steps.push(Step::new(op, Some(r)));
                }
                continue;
            }

            for (i, op) in ops.iter().enumerate() {
                if !conflict.covers(op) || !taken.insert((is_local, i)) {
                    continue;
                }
                let mut op = op.clone();
                let holds_value = op.node_id == conflict.node_id && ConflictTarget::of(&op) == conflict.target;
                if resolution.strategy == Strategy::MergeBoth && holds_value {
                    if let Some(value) = &resolution.resolved_value {
                        if op.change == ChangeType::Moved {
                            if let Some(location) = Location::from_value(value) {
                                op.location = location;
                            }
                        }
                        op.new_value = Some(value.clone());
                    }
                }
                steps.push(Step::new(op, Some(r)));
            }
        }

        steps.sort_by_key(Step::order);

        Self { steps, protected }
    }
}

struct Merger {
    document: CanvasDocument,
    protected: BTreeSet<String>,
    rejected: Vec<RejectedStep>,
}

impl Merger {
    fn run(&mut self, step: &Step) -> Result<(), Rejection> {
        let Some(patch) = self.patch_for(step)? else {
            tracing::debug!(node = %step.op.node_id, "merge step already satisfied");
            return Ok(());
        };

        tracing::debug!(op = %patch.op, path = %patch.path, "applying merge step");

        self.document = apply_patch(&self.document, &patch)?;
        Ok(())
    }

    /// The patch that carries out `step` on the current document, `None`
    /// when there is nothing left to do
    fn patch_for(&self, step: &Step) -> Result<Option<Patch>, Rejection> {
        let op = &step.op;
        let index = NodeIndex::build(&self.document);

        match (step.phase, op.element) {
            (Phase::Add, ElementKind::Artboard) => {
                if index.artboard_index(&op.node_id).is_some() {
                    return Err(Rejection::AlreadyPresent(op.node_id.clone()));
                }
                let slot = op.location.index.min(self.document.artboards.len());
                Ok(Some(Patch::add(TreePath::artboard(slot).to_pointer(), value_of(op)?)))
            }
            (Phase::Add, _) => {
                if index.contains(&op.node_id) {
                    return Err(Rejection::AlreadyPresent(op.node_id.clone()));
                }
                let container = container(&index, &op.location)?;
                let len = self.document.children_at(&container).map_or(0, <[Node]>::len);
                let target = container.child(op.location.index.min(len));
                Ok(Some(Patch::add(target.to_pointer(), value_of(op)?)))
            }

            (Phase::Move, ElementKind::Artboard) => {
                let from = index
                    .artboard_index(&op.node_id)
                    .ok_or_else(|| Rejection::Missing(op.node_id.clone()))?;
                let to = op.location.index.min(self.document.artboards.len().saturating_sub(1));
                if from == to {
                    return Ok(None);
                }
                Ok(Some(Patch::move_from(
                    TreePath::artboard(from).to_pointer(),
                    TreePath::artboard(to).to_pointer(),
                )))
            }
            (Phase::Move, _) => {
                let from = index
                    .path_of(&op.node_id)
                    .cloned()
                    .ok_or_else(|| Rejection::Missing(op.node_id.clone()))?;
                let container = container(&index, &op.location)?;
                let mut len = self.document.children_at(&container).map_or(0, <[Node]>::len);
                // the node leaves its slot before it is put back
                if from.parent().as_ref() == Some(&container) {
                    len = len.saturating_sub(1);
                }
                let to = container.child(op.location.index.min(len));
                if to == from {
                    return Ok(None);
                }
                Ok(Some(Patch::move_from(from.to_pointer(), to.to_pointer())))
            }

            (Phase::Remove, ElementKind::Artboard) => {
                let Some(slot) = index.artboard_index(&op.node_id) else {
                    return Ok(None);
                };
                let held = self
                    .protected
                    .iter()
                    .find(|id| index.get(id).map_or(false, |entry| entry.artboard_id == op.node_id));
                if let Some(held) = held {
                    return Err(Rejection::Protected {
                        node: op.node_id.clone(),
                        held: held.clone(),
                    });
                }
                Ok(Some(Patch::remove(TreePath::artboard(slot).to_pointer())))
            }
            (Phase::Remove, _) => {
                let Some(path) = index.path_of(&op.node_id) else {
                    return Ok(None);
                };
                let held = self
                    .protected
                    .iter()
                    .find(|id| index.is_descendant(id, &op.node_id));
                if let Some(held) = held {
                    return Err(Rejection::Protected {
                        node: op.node_id.clone(),
                        held: held.clone(),
                    });
                }
                Ok(Some(Patch::remove(path.to_pointer())))
            }

            (_, ElementKind::Document) => {
                let field = op.field.as_deref().unwrap_or_default();
                Ok(Some(Patch::replace(format!("/{}", field), value_of(op)?)))
            }
            (_, ElementKind::Artboard) => {
                let slot = index
                    .artboard_index(&op.node_id)
                    .ok_or_else(|| Rejection::Missing(op.node_id.clone()))?;
                let field = op.field.as_deref().unwrap_or_default();
                Ok(Some(Patch::replace(
                    field_pointer(&TreePath::artboard(slot), field),
                    value_of(op)?,
                )))
            }
            (_, ElementKind::Node) => {
                let entry = index
                    .get(&op.node_id)
                    .ok_or_else(|| Rejection::Missing(op.node_id.clone()))?;
                match op.field.as_deref().unwrap_or_default() {
                    "type" => retype(entry.node, &entry.path, op).map(Some),
                    field => write_field(entry.node, &entry.path, field, op.new_value.as_ref()),
                }
            }
        }
    }
}

fn container(index: &NodeIndex<'_>, location: &Location) -> Result<TreePath, Rejection> {
    index
        .container_path(&location.parent_id)
        .ok_or_else(|| Rejection::MissingContainer(location.parent_id.clone()))
}

fn value_of(op: &DiffOperation) -> Result<Value, Rejection> {
    op.new_value.clone().ok_or(Rejection::NoValue)
}

fn becomes_container(value: &Value) -> bool {
    matches!(value.get("type").and_then(Value::as_str), Some("frame" | "group"))
}

/// Fields every node variant has
const SHARED_FIELDS: [&str; 6] = ["name", "visible", "frame", "style", "data", "semanticKey"];

/// Whole-node replacement for a type change, keeping id and children
///
/// Shared fields the new value leaves at their base value take the current
/// node's value, so earlier steps' edits survive.
fn retype(current: &Node, path: &TreePath, op: &DiffOperation) -> Result<Patch, Rejection> {
    let mut value = value_of(op)?;
    if let (Some(Value::Object(base)), Value::Object(target)) = (&op.old_value, &mut value) {
        let now = shallow_node(current);
        for field in SHARED_FIELDS {
            let untouched = match (base.get(field), target.get(field)) {
                (Some(a), Some(b)) => json_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if !untouched {
                continue;
            }
            match now.get(field) {
                Some(kept) => target.insert(field.to_string(), kept.clone()),
                None => target.remove(field),
            };
        }
    }

    let mut replacement: Node = serde_json::from_value(value)?;
    replacement.id = current.id.clone();

    if !current.children().is_empty() {
        let Some(children) = replacement.children_mut() else {
            return Err(Rejection::DropsChildren(current.id.clone()));
        };
        *children = current.children().to_vec();
    }

    Ok(Patch::replace(path.to_pointer(), serde_json::to_value(&replacement)?))
}

/// Set or clear one field; `style/color`-style fields create their map when
/// it is missing
fn write_field(node: &Node, path: &TreePath, field: &str, value: Option<&Value>) -> Result<Option<Patch>, Rejection> {
    let current = shallow_node(node);
    let pointer = field_pointer(path, field);

    let map = field
        .split_once('/')
        .filter(|(map, _)| PROPERTY_MAPS.contains(map));

    let patch = match (map, value) {
        (Some((map, key)), Some(value)) if current.get(map).is_none() => {
            let mut entries = serde_json::Map::new();
            entries.insert(unescape_token(key), value.clone());
            Some(Patch::add(field_pointer(path, map), Value::Object(entries)))
        }
        (_, Some(value)) => Some(Patch::add(pointer, value.clone())),
        (Some((map, key)), None) => current
            .get(map)
            .and_then(|entries| entries.get(unescape_token(key)))
            .map(|_| Patch::remove(pointer)),
        (None, None) => current.get(field).map(|_| Patch::remove(pointer)),
    };

    Ok(patch)
}
