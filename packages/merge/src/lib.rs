//! # Canvas Merge
//!
//! Semantic diff and three-way merge for canvas documents.
//!
//! ## Architecture
//!
//! ```text
//! base + other ──► diff_documents ──► [DiffOperation]
//!                  forward_patches ─► [Patch] (base → other)
//!
//! base + local + remote
//!     ↓
//! detect_conflicts        → [Conflict], keyed by (nodeId, target)
//!     ↓
//! resolve_merge_conflicts → [MergeResolution], scored against MergeConfig
//!     ↓
//! merge_documents         → MergeOutcome { document, review queue, rejected }
//! ```
//!
//! Everything here is a pure function of its inputs: no caches, no global
//! registries, and the same inputs always give the same output order.

pub mod config;
pub mod conflict;
pub mod diff;
pub mod error;
pub mod forward;
pub mod merge;
pub mod resolve;

pub use config::{ConflictType, MergeConfig, Strategy};
pub use conflict::{detect_conflicts, Conflict, ConflictTarget};
pub use diff::{
    diff_documents, diff_documents_checked, shallow_artboard, shallow_node, ChangeType, DiffOperation, ElementKind,
    Location,
};
pub use error::MergeError;
pub use forward::forward_patches;
pub use merge::{merge_documents, MergeOutcome, RejectedStep};
pub use resolve::{can_auto_resolve, merge_both, resolve_conflict, resolve_merge_conflicts, MergeResolution};
