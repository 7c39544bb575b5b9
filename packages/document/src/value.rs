//! # Property Values
//!
//! Closed, tagged value type for style, data and override maps.
//!
//! Every value carries its kind on the wire so that diff and merge can
//! compare values exhaustively instead of guessing from JSON shapes:
//!
//! ```json
//! { "type": "color", "value": "#3366ff" }
//! { "type": "tokenRef", "value": "spacing.md" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered property map (deterministic iteration for diffing)
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single style / data / override value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// Hex color literal (`#rrggbb` or `#rrggbbaa`)
    Color(String),
    /// Reference to a design token, resolved outside the engine
    TokenRef(String),
    Gradient(Gradient),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    pub kind: GradientKind,
    /// Angle in degrees (linear gradients only)
    #[serde(default)]
    pub angle: f64,
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient, 0.0..=1.0
    pub offset: f64,
    pub color: String,
}

impl PropertyValue {
    /// Tag name as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "string",
            PropertyValue::Number(_) => "number",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Color(_) => "color",
            PropertyValue::TokenRef(_) => "tokenRef",
            PropertyValue::Gradient(_) => "gradient",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) | PropertyValue::Color(s) | PropertyValue::TokenRef(s) => {
                Some(s.as_str())
            }
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// True for values that contain no nested structure
    pub fn is_scalar(&self) -> bool {
        !matches!(self, PropertyValue::Gradient(_))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{:?}", s),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Color(c) => write!(f, "{}", c),
            PropertyValue::TokenRef(t) => write!(f, "${}", t),
            PropertyValue::Gradient(g) => {
                let kind = match g.kind {
                    GradientKind::Linear => "linear",
                    GradientKind::Radial => "radial",
                };
                write!(f, "{}-gradient({} stops)", kind, g.stops.len())
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}
