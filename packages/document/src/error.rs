//! Error types for the document model

use crate::semantic_key::SemanticKeyError;
use crate::validate::ValidationReport;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Invalid semantic key: {0}")]
    SemanticKey(#[from] SemanticKeyError),
}

/// Schema validation failure
///
/// Fatal at the caller boundary: a document that fails validation must be
/// rejected, never silently corrected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Document does not match schema: {0}")]
    Schema(String),

    #[error("Document failed validation ({} issue(s)): {}", .0.errors.len(), .0.summary())]
    Invalid(ValidationReport),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Schema(e.to_string())
    }
}
