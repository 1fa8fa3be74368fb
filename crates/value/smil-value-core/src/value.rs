//! Value: runtime instances of animatable attribute values.
//! Numeric payloads use f32 throughout.

use serde::{Deserialize, Serialize};

use crate::path::PathData;
use crate::transform::TransformList;

/// Lightweight kind enum for dispatch and diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Number,
    Length,
    Color,
    Point,
    Rect,
    Numbers,
    Points,
    Path,
    Transform,
    Matrix,
    Paint,
    Token,
    Bool,
}

impl ValueKind {
    /// Kinds that never interpolate numerically and always snap between endpoints.
    #[inline]
    pub fn is_discrete(&self) -> bool {
        matches!(self, ValueKind::Token | ValueKind::Bool)
    }
}

/// Length units understood by [`crate::ValueContext`] when converting to user units.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Number,
    Px,
    Em,
    Ex,
    Percent,
    Cm,
    Mm,
    In,
    Pt,
    Pc,
}

/// Paint server reference used by `fill`/`stroke`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Paint {
    None,
    CurrentColor,
    Color([f32; 4]),
    /// Reference to a paint server, with an optional fallback color.
    Url {
        href: String,
        fallback: Option<[f32; 4]>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// Plain number
    Number(f32),

    /// Length with unit
    Length { value: f32, unit: LengthUnit },

    /// RGBA color, channels in 0..=255
    Color([f32; 4]),

    /// 2D point (x, y)
    Point([f32; 2]),

    /// Rectangle (x, y, width, height), e.g. viewBox
    Rect([f32; 4]),

    /// List of numbers, e.g. stroke-dasharray
    Numbers(Vec<f32>),

    /// List of points, e.g. polygon points
    Points(Vec<[f32; 2]>),

    /// Path data
    Path(PathData),

    /// Transform list
    Transform(TransformList),

    /// Resolved 2D affine matrix (a, b, c, d, e, f)
    Matrix([f32; 6]),

    /// Paint reference
    Paint(Paint),

    /// Enumerated token; step-only
    Token(String),

    /// Boolean; step-only
    Bool(bool),
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Length { .. } => ValueKind::Length,
            Value::Color(_) => ValueKind::Color,
            Value::Point(_) => ValueKind::Point,
            Value::Rect(_) => ValueKind::Rect,
            Value::Numbers(_) => ValueKind::Numbers,
            Value::Points(_) => ValueKind::Points,
            Value::Path(_) => ValueKind::Path,
            Value::Transform(_) => ValueKind::Transform,
            Value::Matrix(_) => ValueKind::Matrix,
            Value::Paint(_) => ValueKind::Paint,
            Value::Token(_) => ValueKind::Token,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// Convenience constructors
    pub fn n(v: f32) -> Self {
        Value::Number(v)
    }

    pub fn px(v: f32) -> Self {
        Value::Length {
            value: v,
            unit: LengthUnit::Px,
        }
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Value::Color([r, g, b, 255.0])
    }

    pub fn point(x: f32, y: f32) -> Self {
        Value::Point([x, y])
    }

    pub fn token(s: impl Into<String>) -> Self {
        Value::Token(s.into())
    }

    /// Numeric payload for number-like values, used by tests and simple hosts.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Length { value, .. } => Some(*value),
            _ => None,
        }
    }
}
