//! # Undo/Redo History
//!
//! Records applied patches with their inverses.
//!
//! ## Design
//!
//! - The inverse comes from the recorded patch, so it reflects the
//!   document as it was when the patch ran
//! - Undo applies the inverses and moves the batch to the redo stack
//! - Redo reapplies the recorded patches
//! - New edits clear the redo stack
//! - `begin_batch`/`end_batch` group several applies into one undo step
//!
//! History never owns the document: callers pass the current snapshot and
//! get the next one back.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! let doc = history.apply(&doc, &Patch::replace("/name", json!("Draft")))?;
//! let doc = history.undo(&doc)?.unwrap_or(doc);
//! ```

use crate::errors::{BatchError, PatchError};
use crate::invert::invert_patch;
use crate::patch::{apply_patch_recorded, apply_patches, BatchPolicy, Patch};
use canvas_document::CanvasDocument;

/// Patches undone/redone together
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchBatch {
    /// Recorded patches, in application order
    pub patches: Vec<Patch>,
    /// Inverses, in undo order
    pub inverses: Vec<Patch>,
    pub description: Option<String>,
}

impl PatchBatch {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn push(&mut self, recorded: Patch, inverse: Patch) {
        self.patches.push(recorded);
        self.inverses.insert(0, inverse);
    }
}

#[derive(Debug)]
pub struct History {
    undo_stack: Vec<PatchBatch>,
    redo_stack: Vec<PatchBatch>,
    /// 0 = unlimited
    max_levels: usize,
    current_batch: Option<PatchBatch>,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Apply a patch and record it for undo
    pub fn apply(&mut self, doc: &CanvasDocument, patch: &Patch) -> Result<CanvasDocument, PatchError> {
        let applied = apply_patch_recorded(doc, patch)?;
        let inverse = invert_patch(&applied.recorded)?;

        if let Some(batch) = &mut self.current_batch {
            batch.push(applied.recorded, inverse);
        } else {
            let mut batch = PatchBatch::default();
            batch.push(applied.recorded, inverse);
            self.push_batch(batch);
        }

        Ok(applied.document)
    }

    /// Apply a patch list as one undo step (or into the open batch)
    pub fn apply_all(
        &mut self,
        doc: &CanvasDocument,
        patches: &[Patch],
        policy: BatchPolicy,
    ) -> Result<CanvasDocument, BatchError> {
        let outcome = apply_patches(doc, patches, policy)?;

        let open = self.current_batch.is_some();
        let mut batch = self.current_batch.take().unwrap_or_default();

        for (index, recorded) in outcome.recorded.into_iter().enumerate() {
            let inverse = invert_patch(&recorded).map_err(|source| BatchError {
                index,
                op: recorded.op.clone(),
                path: recorded.path.clone(),
                source,
            })?;
            batch.push(recorded, inverse);
        }

        if open {
            self.current_batch = Some(batch);
        } else if !batch.patches.is_empty() {
            self.push_batch(batch);
        }

        Ok(outcome.document)
    }

    /// Start grouping applies into one undo step
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(PatchBatch::default());
    }

    /// Close the open batch and push it to the undo stack
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.patches.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_batch(&mut self, batch: PatchBatch) {
        tracing::debug!(
            patches = batch.patches.len(),
            description = batch.description.as_deref().unwrap_or(""),
            "recorded undo step"
        );

        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Undo the most recent batch; `None` when there is nothing to undo
    pub fn undo(&mut self, doc: &CanvasDocument) -> Result<Option<CanvasDocument>, BatchError> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(None);
        };

        match apply_patches(doc, &batch.inverses, BatchPolicy::Abort) {
            Ok(outcome) => {
                self.redo_stack.push(batch);
                Ok(Some(outcome.document))
            }
            Err(e) => {
                self.undo_stack.push(batch);
                Err(e)
            }
        }
    }

    /// Redo the most recently undone batch; `None` when there is nothing to redo
    pub fn redo(&mut self, doc: &CanvasDocument) -> Result<Option<CanvasDocument>, BatchError> {
        let Some(batch) = self.redo_stack.pop() else {
            return Ok(None);
        };

        match apply_patches(doc, &batch.patches, BatchPolicy::Abort) {
            Ok(outcome) => {
                self.undo_stack.push(batch);
                Ok(Some(outcome.document))
            }
            Err(e) => {
                self.redo_stack.push(batch);
                Err(e)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
