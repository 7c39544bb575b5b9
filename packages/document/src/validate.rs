//! # Schema Validation
//!
//! Checks the document invariants the engine relies on:
//!
//! - at least one artboard
//! - document id is a ULID
//! - artboard and node ids are non-empty and unique across the document
//! - semantic keys are well-formed and unique
//! - frames are finite with non-negative size
//!
//! Every issue carries the JSON pointer of the offending element.

use crate::error::ValidationError;
use crate::id::is_valid_id;
use crate::model::{Artboard, CanvasDocument, Node, Rect};
use crate::path::TreePath;
use crate::semantic_key::parse_semantic_key;
use crate::visitor::{walk_artboard, walk_node, Visitor};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    NoArtboards,
    InvalidDocumentId,
    EmptyId,
    DuplicateId,
    InvalidSemanticKey,
    DuplicateSemanticKey,
    InvalidFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// First issue, formatted for error messages
    pub fn summary(&self) -> String {
        match self.errors.first() {
            Some(issue) if issue.path.is_empty() => issue.message.clone(),
            Some(issue) => format!("{} at {}", issue.message, issue.path),
            None => "no issues".to_string(),
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.success {
            Ok(())
        } else {
            Err(ValidationError::Invalid(self))
        }
    }
}

/// Validate a document against the schema invariants
pub fn validate(doc: &CanvasDocument) -> ValidationReport {
    let mut validator = Validator::default();

    if doc.artboards.is_empty() {
        validator.issue(IssueKind::NoArtboards, "/artboards", "Document has no artboards".to_string());
    }
    if !is_valid_id(&doc.id) {
        validator.issue(
            IssueKind::InvalidDocumentId,
            "/id",
            format!("Document id {:?} is not a ULID", doc.id),
        );
    }

    validator.visit_document(doc);

    ValidationReport {
        success: validator.errors.is_empty(),
        errors: validator.errors,
    }
}

impl CanvasDocument {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self).into_result()
    }
}

#[derive(Default)]
struct Validator<'a> {
    ids: HashMap<&'a str, String>,
    semantic_keys: HashMap<&'a str, String>,
    errors: Vec<ValidationIssue>,
}

impl<'a> Validator<'a> {
    fn issue(&mut self, kind: IssueKind, path: &str, message: String) {
        self.errors.push(ValidationIssue {
            kind,
            path: path.to_string(),
            message,
        });
    }

    fn check_id(&mut self, id: &'a str, pointer: &str) {
        if id.is_empty() {
            self.issue(IssueKind::EmptyId, pointer, "Empty id".to_string());
            return;
        }
        if let Some(first) = self.ids.get(id) {
            let message = format!("Duplicate id {:?} (first seen at {})", id, first);
            self.issue(IssueKind::DuplicateId, pointer, message);
        } else {
            self.ids.insert(id, pointer.to_string());
        }
    }

    fn check_frame(&mut self, frame: &Rect, pointer: &str) {
        let finite = [frame.x, frame.y, frame.width, frame.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || frame.width < 0.0 || frame.height < 0.0 {
            self.issue(
                IssueKind::InvalidFrame,
                &format!("{}/frame", pointer),
                format!(
                    "Invalid frame ({}, {}, {}x{})",
                    frame.x, frame.y, frame.width, frame.height
                ),
            );
        }
    }

    fn check_semantic_key(&mut self, key: &'a str, pointer: &str) {
        let key_pointer = format!("{}/semanticKey", pointer);
        if let Err(e) = parse_semantic_key(key) {
            self.issue(IssueKind::InvalidSemanticKey, &key_pointer, e.to_string());
            return;
        }
        if let Some(first) = self.semantic_keys.get(key) {
            let message = format!("Duplicate semantic key {:?} (first seen at {})", key, first);
            self.issue(IssueKind::DuplicateSemanticKey, &key_pointer, message);
        } else {
            self.semantic_keys.insert(key, pointer.to_string());
        }
    }
}

impl<'a> Visitor<'a> for Validator<'a> {
    fn visit_artboard(&mut self, artboard: &'a Artboard, path: &TreePath) {
        let pointer = path.to_pointer();
        self.check_id(&artboard.id, &pointer);
        self.check_frame(&artboard.frame, &pointer);
        walk_artboard(self, artboard, path);
    }

    fn visit_node(&mut self, node: &'a Node, path: &TreePath) {
        let pointer = path.to_pointer();
        self.check_id(&node.id, &pointer);
        self.check_frame(&node.frame, &pointer);
        if let Some(key) = node.semantic_key.as_deref() {
            self.check_semantic_key(key, &pointer);
        }
        walk_node(self, node, path);
    }
}
