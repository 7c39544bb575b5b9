//! # Conflict Resolution
//!
//! Scores candidate resolutions and decides which can be applied without a
//! human.
//!
//! For each conflict the configured strategies are tried in order; the
//! first one that can produce a value wins. A resolution whose confidence
//! is below `autoApplyThreshold` is turned into a manual-review entry with
//! no value.

use crate::config::{ConflictType, MergeConfig, Strategy};
use crate::conflict::Conflict;
use canvas_document::PropertyValue;
use canvas_editor::json_eq;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResolution {
    pub conflict: Conflict,
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<Value>,
    pub confidence: f64,
    pub requires_review: bool,
    pub explanation: String,
    /// Accepted for application; cleared again if the merge could not apply it
    pub applied: bool,
}

pub fn resolve_conflict(conflict: &Conflict, config: &MergeConfig) -> MergeResolution {
    let candidate = config
        .strategies_for(conflict.conflict_type)
        .iter()
        .find_map(|&strategy| candidate_value(conflict, strategy).map(|value| (strategy, value)));

    match candidate {
        Some((strategy, value)) if strategy.confidence() >= config.auto_apply_threshold => MergeResolution {
            conflict: conflict.clone(),
            strategy,
            resolved_value: Some(value),
            confidence: strategy.confidence(),
            requires_review: false,
            explanation: explain(conflict, strategy),
            applied: true,
        },
        candidate => {
            let explanation = match candidate {
                Some((strategy, _)) => format!(
                    "{} scored {:.2}, below the auto-apply threshold of {:.2}; {}",
                    strategy,
                    strategy.confidence(),
                    config.auto_apply_threshold,
                    review_reason(conflict)
                ),
                None => review_reason(conflict),
            };

            tracing::warn!(conflict = %conflict.id, kind = %conflict.conflict_type, "conflict needs manual review");

            MergeResolution {
                conflict: conflict.clone(),
                strategy: Strategy::Manual,
                resolved_value: None,
                confidence: Strategy::Manual.confidence(),
                requires_review: true,
                explanation,
                applied: false,
            }
        }
    }
}

pub fn can_auto_resolve(conflict: &Conflict, config: &MergeConfig) -> bool {
    config
        .strategies_for(conflict.conflict_type)
        .iter()
        .find(|&&strategy| candidate_value(conflict, strategy).is_some())
        .map_or(false, |strategy| strategy.confidence() >= config.auto_apply_threshold)
}

/// Resolve each conflict independently, preserving order
pub fn resolve_merge_conflicts(conflicts: &[Conflict], config: &MergeConfig) -> Vec<MergeResolution> {
    conflicts
        .iter()
        .map(|conflict| resolve_conflict(conflict, config))
        .collect()
}

/// Value a strategy would produce, `None` if it does not apply
fn candidate_value(conflict: &Conflict, strategy: Strategy) -> Option<Value> {
    match strategy {
        Strategy::PreferLocal => Some(conflict.local_value.clone()),
        Strategy::PreferRemote => Some(conflict.remote_value.clone()),
        Strategy::MergeBoth => merge_both(&conflict.base_value, &conflict.local_value, &conflict.remote_value),
        Strategy::Manual => None,
    }
}

/// Three-way union of two object values
///
/// Each key takes whichever side changed it. If both sides changed the same
/// key to different values the union does not exist. Property values are
/// atomic: their kind and payload are never taken from different sides.
pub fn merge_both(base: &Value, local: &Value, remote: &Value) -> Option<Value> {
    if [base, local, remote].into_iter().any(is_property_value) {
        return None;
    }
    let (Value::Object(local), Value::Object(remote)) = (local, remote) else {
        return None;
    };
    let empty = Map::new();
    let base = base.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = local.keys().chain(remote.keys()).collect();
    let mut merged = Map::new();

    for key in keys {
        let (b, l, r) = (base.get(key.as_str()), local.get(key.as_str()), remote.get(key.as_str()));
        let same = |x: Option<&Value>, y: Option<&Value>| match (x, y) {
            (Some(x), Some(y)) => json_eq(x, y),
            (None, None) => true,
            _ => false,
        };

        let chosen = if same(l, r) || same(r, b) {
            l
        } else if same(l, b) {
            r
        } else {
            return None;
        };

        if let Some(value) = chosen {
            merged.insert(key.clone(), value.clone());
        }
    }

    Some(Value::Object(merged))
}

fn is_property_value(value: &Value) -> bool {
    value.as_object().map_or(false, |object| {
        object.len() == 2
            && object.contains_key("type")
            && object.contains_key("value")
            && PropertyValue::deserialize(value).is_ok()
    })
}

fn explain(conflict: &Conflict, strategy: Strategy) -> String {
    match strategy {
        Strategy::PreferLocal => format!("Kept the local value of {}", conflict.target),
        Strategy::PreferRemote => format!("Took the remote value of {}", conflict.target),
        Strategy::MergeBoth => format!("Merged non-overlapping changes to {}", conflict.target),
        Strategy::Manual => review_reason(conflict),
    }
}

fn review_reason(conflict: &Conflict) -> String {
    match conflict.conflict_type {
        ConflictType::DeleteModify => format!(
            "Node {} was removed on one side and changed on the other",
            conflict.node_id
        ),
        ConflictType::AddAdd => format!("Node {} was added on both sides with different content", conflict.node_id),
        ConflictType::MoveMove => format!("Node {} was moved to different places", conflict.node_id),
        ConflictType::ModifyModify => format!(
            "Both sides changed {} of {} and the changes overlap",
            conflict.target, conflict.node_id
        ),
    }
}
