//! Error types for diff and merge

use canvas_document::ValidationError;
use canvas_editor::PatchError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("{side} document has {nodes} nodes, above the limit of {limit}")]
    DocumentTooLarge {
        side: &'static str,
        nodes: usize,
        limit: usize,
    },

    #[error("{side} document is invalid: {source}")]
    InvalidInput {
        side: &'static str,
        source: ValidationError,
    },

    #[error(transparent)]
    Patch(#[from] PatchError),
}
