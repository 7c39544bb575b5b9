//! Merge configuration
//!
//! Everything the resolution engine needs is passed in explicitly; there is
//! no global strategy table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a conflict gets settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    PreferLocal,
    PreferRemote,
    /// Field-level three-way union when the two sides touched different sub-fields
    MergeBoth,
    Manual,
}

impl Strategy {
    /// Fixed confidence weight of a resolution produced by this strategy
    pub fn confidence(self) -> f64 {
        match self {
            Strategy::PreferLocal => 0.6,
            Strategy::PreferRemote => 0.7,
            Strategy::MergeBoth => 0.9,
            Strategy::Manual => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::PreferLocal => "preferLocal",
            Strategy::PreferRemote => "preferRemote",
            Strategy::MergeBoth => "mergeBoth",
            Strategy::Manual => "manual",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConflictType {
    #[serde(rename = "modify-vs-modify")]
    ModifyModify,
    #[serde(rename = "delete-vs-modify")]
    DeleteModify,
    #[serde(rename = "move-vs-move")]
    MoveMove,
    #[serde(rename = "add-vs-add")]
    AddAdd,
}

impl ConflictType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictType::ModifyModify => "modify-vs-modify",
            ConflictType::DeleteModify => "delete-vs-modify",
            ConflictType::MoveMove => "move-vs-move",
            ConflictType::AddAdd => "add-vs-add",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeConfig {
    /// Resolutions below this confidence go to manual review
    pub auto_apply_threshold: f64,
    /// Strategies tried in order for each conflict type
    pub policy: BTreeMap<ConflictType, Vec<Strategy>>,
    /// Largest document (in nodes) accepted by diff and merge
    pub max_nodes: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        let policy = BTreeMap::from([
            (
                ConflictType::ModifyModify,
                vec![Strategy::MergeBoth, Strategy::PreferRemote],
            ),
            (ConflictType::DeleteModify, vec![Strategy::Manual]),
            (ConflictType::MoveMove, vec![Strategy::PreferRemote]),
            (ConflictType::AddAdd, vec![Strategy::MergeBoth, Strategy::Manual]),
        ]);

        Self {
            auto_apply_threshold: 0.65,
            policy,
            max_nodes: 50_000,
        }
    }
}

impl MergeConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.auto_apply_threshold = threshold;
        self
    }

    pub fn with_policy(mut self, conflict_type: ConflictType, strategies: Vec<Strategy>) -> Self {
        self.policy.insert(conflict_type, strategies);
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Strategies for a conflict type; unlisted types fall back to manual
    pub fn strategies_for(&self, conflict_type: ConflictType) -> &[Strategy] {
        self.policy
            .get(&conflict_type)
            .map(Vec::as_slice)
            .unwrap_or(&[Strategy::Manual])
    }
}
