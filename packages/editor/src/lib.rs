//! # Canvas Editor
//!
//! Patch engine for canvas documents.
//!
//! ## Architecture
//!
//! ```text
//! Patch (wire JSON)
//!     ↓
//! Pointer::parse          → artboard / node slot + field tail
//!     ↓
//! apply_patch_recorded    → copy, mutate, validate
//!     ↓
//! AppliedPatch            → new document + recorded patch (pre-image)
//!     ↓
//! invert_patch / History  → undo / redo
//! ```
//!
//! ## Core Principles
//!
//! 1. **All or nothing**: a failing patch or batch leaves the caller's
//!    document as it was
//! 2. **Validated output**: every returned document passes schema validation
//! 3. **Record, then invert**: inverses come from recorded patches, never
//!    from guessing at the prior state

pub mod errors;
pub mod history;
pub mod invert;
mod json;
pub mod patch;
pub mod pointer;

pub use errors::{BatchError, PatchError};
pub use history::{History, PatchBatch};
pub use invert::{invert_patch, invert_patches};
pub use json::json_eq;
pub use patch::{
    apply_patch, apply_patch_recorded, apply_patches, AppliedPatch, BatchOutcome, BatchPolicy, Patch,
    PatchOp,
};
pub use pointer::{escape_token, field_pointer, unescape_token, Pointer, Slot, Target};
