//! Error types for the editor

use crate::patch::PatchOp;
use canvas_document::ValidationError;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("{op} at {path} requires a value")]
    MissingValue { op: PatchOp, path: String },

    #[error("{op} at {path} requires a from pointer")]
    MissingFrom { op: PatchOp, path: String },

    #[error("Cannot invert {op} at {path}: no captured pre-image")]
    MissingPreImage { op: PatchOp, path: String },

    #[error("Test failed at {path}: expected {expected}, found {actual}")]
    TestFailed {
        path: String,
        expected: Value,
        actual: Value,
    },

    #[error("Cannot move {from} into its own subtree ({path})")]
    CycleDetected { from: String, path: String },

    #[error("Node at {0} cannot have children")]
    NotAContainer(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl PatchError {
    pub fn is_test_failure(&self) -> bool {
        matches!(self, PatchError::TestFailed { .. })
    }
}

/// A patch list that stopped partway
///
/// The caller's document is untouched; `index` names the failing patch.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Patch {index} ({op} {path}) failed: {source}")]
pub struct BatchError {
    pub index: usize,
    pub op: PatchOp,
    pub path: String,
    pub source: PatchError,
}
