//! Coercion helpers between value shapes.
//! Used when declarative values arrive in a looser form than the target
//! attribute needs (e.g. `animateTransform` values given as number lists).

use crate::context::ValueContext;
use crate::value::{Paint, Value};

/// Attempt to coerce a Value into a scalar f32.
/// Rules:
/// - Number / Length -> value in user units
/// - Bool -> 1.0 / 0.0
/// - Point / Rect / Color -> first component
/// - Numbers -> first element
/// - anything else -> None
pub fn to_float(v: &Value, ctx: &ValueContext) -> Option<f32> {
    match v {
        Value::Number(f) => Some(*f),
        Value::Length { value, unit } => Some(ctx.to_user_units(*value, *unit)),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Point(a) => Some(a[0]),
        Value::Rect(a) => Some(a[0]),
        Value::Color(a) => Some(a[0]),
        Value::Numbers(vec) => vec.first().copied(),
        _ => None,
    }
}

/// Convert a Value into a flat list of numbers.
/// - Number / Length -> single element (user units)
/// - Point / Rect / Color / Matrix -> components
/// - Numbers -> clone
/// - Points -> x, y pairs flattened
/// - Transform -> parameters of every operation
pub fn to_numbers(v: &Value, ctx: &ValueContext) -> Vec<f32> {
    match v {
        Value::Number(f) => vec![*f],
        Value::Length { value, unit } => vec![ctx.to_user_units(*value, *unit)],
        Value::Bool(b) => vec![if *b { 1.0 } else { 0.0 }],
        Value::Point(a) => a.to_vec(),
        Value::Rect(a) => a.to_vec(),
        Value::Color(a) => a.to_vec(),
        Value::Matrix(a) => a.to_vec(),
        Value::Numbers(vec) => vec.clone(),
        Value::Points(pts) => pts.iter().flat_map(|p| p.iter().copied()).collect(),
        Value::Transform(list) => list.0.iter().flat_map(|op| op.params()).collect(),
        Value::Paint(Paint::Color(c)) => c.to_vec(),
        Value::Paint(_) | Value::Path(_) | Value::Token(_) => vec![],
    }
}

/// Try to coerce a Value into a point. Scalars become (s, 0).
pub fn to_point(v: &Value, ctx: &ValueContext) -> Option<[f32; 2]> {
    match v {
        Value::Point(p) => Some(*p),
        Value::Points(pts) => pts.first().copied(),
        Value::Numbers(vec) if vec.len() >= 2 => Some([vec[0], vec[1]]),
        other => to_float(other, ctx).map(|x| [x, 0.0]),
    }
}
