//! # Patch Pointers
//!
//! Slash-delimited pointers into the artboard/children arrays
//! (RFC 6901 escaping, RFC 6902 `-` append marker).
//!
//! ```text
//! ""                                        document root
//! /name                                     document field
//! /artboards/1                              artboard slot
//! /artboards/0/children/2/children/0        node slot
//! /artboards/0/children/2/frame/x           node field
//! /artboards/0/children/-                   append position (add/move/copy targets)
//! ```

use crate::errors::PatchError;
use canvas_document::TreePath;
use std::fmt;

/// Position inside an artboard list or children array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Index(usize),
    /// `-`: one past the last element
    Append,
}

impl Slot {
    /// Concrete index for an array of `len` elements (`Append` → `len`)
    pub fn resolve(self, len: usize) -> usize {
        match self {
            Slot::Index(index) => index,
            Slot::Append => len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Document,
    Artboard(Slot),
    Node { container: TreePath, slot: Slot },
}

/// Parsed pointer: an element location plus an optional field tail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    pub target: Target,
    pub field: Vec<String>,
}

impl Pointer {
    pub fn parse(pointer: &str) -> Result<Self, PatchError> {
        if pointer.is_empty() {
            return Ok(Self {
                target: Target::Document,
                field: Vec::new(),
            });
        }

        let rest = pointer.strip_prefix('/').ok_or_else(|| PatchError::InvalidPath {
            path: pointer.to_string(),
            reason: "pointer must start with '/'".to_string(),
        })?;
        let tokens: Vec<String> = rest.split('/').map(unescape_token).collect();

        if tokens.len() < 2 || tokens[0] != "artboards" {
            return Ok(Self {
                target: Target::Document,
                field: tokens,
            });
        }

        let invalid = |reason: &str| PatchError::InvalidPath {
            path: pointer.to_string(),
            reason: reason.to_string(),
        };

        let mut target = Target::Artboard(
            parse_slot(&tokens[1]).ok_or_else(|| invalid("artboard index must be a number or '-'"))?,
        );
        let mut cursor = 2;

        while cursor + 1 < tokens.len() && tokens[cursor] == "children" {
            let slot = parse_slot(&tokens[cursor + 1])
                .ok_or_else(|| invalid("child index must be a number or '-'"))?;
            let container = match &target {
                Target::Artboard(Slot::Index(artboard)) => TreePath::artboard(*artboard),
                Target::Node {
                    container,
                    slot: Slot::Index(index),
                } => container.child(*index),
                _ => return Err(invalid("'-' may only appear as the last index")),
            };
            target = Target::Node { container, slot };
            cursor += 2;
        }

        let field = tokens[cursor..].to_vec();
        let appends = matches!(
            target,
            Target::Artboard(Slot::Append) | Target::Node { slot: Slot::Append, .. }
        );
        if appends && !field.is_empty() {
            return Err(invalid("'-' may only appear as the last index"));
        }

        Ok(Self { target, field })
    }

    /// Tree path of the addressed artboard/node, if it is a concrete slot
    pub fn tree_path(&self) -> Option<TreePath> {
        match &self.target {
            Target::Document => None,
            Target::Artboard(Slot::Index(index)) => Some(TreePath::artboard(*index)),
            Target::Node {
                container,
                slot: Slot::Index(index),
            } => Some(container.child(*index)),
            _ => None,
        }
    }

    /// True when the pointer addresses a whole artboard or node
    pub fn is_element(&self) -> bool {
        self.field.is_empty() && !matches!(self.target, Target::Document)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = |slot: &Slot| match slot {
            Slot::Index(index) => index.to_string(),
            Slot::Append => "-".to_string(),
        };
        match &self.target {
            Target::Document => {}
            Target::Artboard(s) => write!(f, "/artboards/{}", slot(s))?,
            Target::Node { container, slot: s } => write!(f, "{}/children/{}", container, slot(s))?,
        }
        for token in &self.field {
            write!(f, "/{}", escape_token(token))?;
        }
        Ok(())
    }
}

fn parse_slot(token: &str) -> Option<Slot> {
    if token == "-" {
        return Some(Slot::Append);
    }
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().map(Slot::Index)
}

pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Pointer to a field of the artboard/node at `path`
///
/// `field` is a relative pointer such as `name` or `style/color`; its
/// segments must already be escaped.
pub fn field_pointer(path: &TreePath, field: &str) -> String {
    if field.is_empty() {
        path.to_pointer()
    } else {
        format!("{}/{}", path.to_pointer(), field)
    }
}
