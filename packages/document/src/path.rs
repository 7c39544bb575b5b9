//! Tree paths: `[artboard, child, child, ...]`
//!
//! A path of length 1 addresses an artboard, longer paths address nodes.
//! Paths order lexicographically, which matches document pre-order.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    pub fn artboard(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the path addresses an artboard rather than a node
    pub fn is_artboard(&self) -> bool {
        self.0.len() == 1
    }

    pub fn artboard_index(&self) -> Option<usize> {
        self.0.first().copied()
    }

    /// Index inside the owning children array (or artboard list)
    pub fn last_index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the owning container; `None` for artboards
    pub fn parent(&self) -> Option<TreePath> {
        if self.0.len() < 2 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, index: usize) -> TreePath {
        let mut segments = self.0.clone();
        segments.push(index);
        Self(segments)
    }

    /// Replace the last index
    pub fn with_last(&self, index: usize) -> TreePath {
        let mut segments = self.0.clone();
        if let Some(last) = segments.last_mut() {
            *last = index;
        }
        Self(segments)
    }

    /// Nesting depth below the artboard (0 for artboard children)
    pub fn depth(&self) -> usize {
        self.0.len().saturating_sub(2)
    }

    /// True if `self` lies strictly inside `ancestor`'s subtree
    pub fn is_descendant_of(&self, ancestor: &TreePath) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }

    /// JSON pointer for this location, e.g. `/artboards/0/children/1`
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for (i, index) in self.0.iter().enumerate() {
            if i == 0 {
                pointer.push_str("/artboards/");
            } else {
                pointer.push_str("/children/");
            }
            pointer.push_str(&index.to_string());
        }
        pointer
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(segments: Vec<usize>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}
