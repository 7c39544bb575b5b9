//! # Semantic Keys
//!
//! Stable role labels that identify "the same logical element" across
//! structural changes, independent of node identity.
//!
//! Format: dot-separated segments, each optionally followed by bracketed
//! indices.
//!
//! - `hero.title`
//! - `nav.items[0]`
//! - `grid.cells[2][3].label`

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySegment {
    pub name: String,
    pub indices: Vec<usize>,
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for index in &self.indices {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticKeyError {
    #[error("Semantic key is empty")]
    Empty,

    #[error("Invalid character {found:?} at offset {offset} in semantic key {key:?}")]
    InvalidCharacter { key: String, offset: usize, found: char },

    #[error("Empty segment at offset {offset} in semantic key {key:?}")]
    EmptySegment { key: String, offset: usize },

    #[error("Unclosed or empty index at offset {offset} in semantic key {key:?}")]
    InvalidIndex { key: String, offset: usize },
}

/// Parse a semantic key into its segments
pub fn parse_semantic_key(key: &str) -> Result<Vec<KeySegment>, SemanticKeyError> {
    if key.is_empty() {
        return Err(SemanticKeyError::Empty);
    }

    let mut segments = Vec::new();
    let mut chars = key.char_indices().peekable();

    loop {
        let segment_start = chars.peek().map(|(i, _)| *i).unwrap_or(key.len());
        let mut name = String::new();

        while let Some(&(offset, c)) = chars.peek() {
            let valid = if name.is_empty() {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_' || c == '-'
            };

            if valid {
                name.push(c);
                chars.next();
            } else if c == '.' || c == '[' {
                break;
            } else {
                return Err(SemanticKeyError::InvalidCharacter {
                    key: key.to_string(),
                    offset,
                    found: c,
                });
            }
        }

        if name.is_empty() {
            return Err(SemanticKeyError::EmptySegment {
                key: key.to_string(),
                offset: segment_start,
            });
        }

        let mut indices = Vec::new();
        while let Some(&(open, '[')) = chars.peek() {
            chars.next();
            let mut digits = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == ']' {
                    closed = true;
                    break;
                }
                digits.push(c);
            }

            let index = digits
                .parse::<usize>()
                .ok()
                .filter(|_| closed && digits.chars().all(|c| c.is_ascii_digit()))
                .ok_or_else(|| SemanticKeyError::InvalidIndex {
                    key: key.to_string(),
                    offset: open,
                })?;
            indices.push(index);
        }

        segments.push(KeySegment { name, indices });

        match chars.next() {
            None => break,
            Some((_, '.')) => {
                if chars.peek().is_none() {
                    return Err(SemanticKeyError::EmptySegment {
                        key: key.to_string(),
                        offset: key.len(),
                    });
                }
            }
            Some((offset, found)) => {
                return Err(SemanticKeyError::InvalidCharacter {
                    key: key.to_string(),
                    offset,
                    found,
                });
            }
        }
    }

    Ok(segments)
}

pub fn is_valid_semantic_key(key: &str) -> bool {
    parse_semantic_key(key).is_ok()
}

/// Render segments back to key syntax
pub fn format_semantic_key(segments: &[KeySegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
