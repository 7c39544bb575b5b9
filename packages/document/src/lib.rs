//! # Canvas Document
//!
//! Tree model for collaborative design documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: model + node index + validation   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: patches, inversion, undo/redo       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ merge: semantic diff, conflicts, resolution │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are values**: operations never mutate their input
//! 2. **Identity by id, role by semantic key**: keys survive re-creation
//! 3. **Index is derived**: rebuilt after every structural change
//! 4. **Closed value types**: style/data are tagged, not reflective

pub mod error;
pub mod id;
pub mod index;
pub mod model;
pub mod path;
pub mod semantic_key;
pub mod validate;
pub mod value;
pub mod visitor;

pub use error::{DocumentError, ValidationError};
pub use id::{is_valid_id, new_id};
pub use index::{find_node_by_id, NodeIndex, NodeIndexEntry};
pub use model::{Artboard, CanvasDocument, Node, NodeKind, NodeType, Rect, SCHEMA_VERSION};
pub use path::TreePath;
pub use semantic_key::{is_valid_semantic_key, parse_semantic_key, KeySegment, SemanticKeyError};
pub use validate::{validate, IssueKind, ValidationIssue, ValidationReport};
pub use value::{Gradient, GradientKind, GradientStop, PropertyMap, PropertyValue};
pub use visitor::{walk_artboard, walk_document, walk_node, NodeCounter, Visitor};
