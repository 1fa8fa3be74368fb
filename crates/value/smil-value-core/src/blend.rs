//! Interpolation between two values of the same semantic kind.
//! - f32 linear interpolation for numbers and fixed-size components
//! - lengths with mismatched units are blended in user units
//! - colors channel-wise (paint colors too, `currentColor` resolved via context)
//! - paths and transform lists only when their structure matches
//! - step blending (choose left or right by t < 0.5) for everything else

use crate::context::ValueContext;
use crate::path::{PathCommand, PathData, PathSegment};
use crate::transform::TransformList;
use crate::value::{LengthUnit, Paint, Value};

/// Linear interpolation for f32
#[inline]
pub fn lerp_f(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Lerp for fixed-size arrays
pub fn lerp_array<const N: usize>(a: &[f32; N], b: &[f32; N], t: f32) -> [f32; N] {
    let mut out = [0.0f32; N];
    for i in 0..N {
        out[i] = lerp_f(a[i], b[i], t);
    }
    out
}

fn lerp_slice(a: &[f32], b: &[f32], t: f32) -> Option<Vec<f32>> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b).map(|(x, y)| lerp_f(*x, *y, t)).collect())
}

/// Number or length as (value, unit); plain numbers count as unitless lengths.
pub(crate) fn as_length(v: &Value) -> Option<(f32, LengthUnit)> {
    match v {
        Value::Number(n) => Some((*n, LengthUnit::Number)),
        Value::Length { value, unit } => Some((*value, *unit)),
        _ => None,
    }
}

pub(crate) fn paint_color(p: &Paint, ctx: &ValueContext) -> Option<[f32; 4]> {
    match p {
        Paint::Color(c) => Some(*c),
        Paint::CurrentColor => Some(ctx.current_color),
        _ => None,
    }
}

fn blend_path(a: &PathData, b: &PathData, t: f32) -> Option<PathData> {
    if !a.same_structure(b) {
        return None;
    }
    let segments = a
        .segments
        .iter()
        .zip(b.segments.iter())
        .map(|(sa, sb)| {
            let mut coords = lerp_slice(&sa.coords, &sb.coords, t).unwrap_or_default();
            if sa.command == PathCommand::Arc {
                // Arc flags are booleans and snap instead of blending.
                let pick = if t < 0.5 { sa } else { sb };
                coords[3] = pick.coords[3];
                coords[4] = pick.coords[4];
            }
            PathSegment {
                command: sa.command,
                relative: sa.relative,
                coords,
            }
        })
        .collect();
    Some(PathData { segments })
}

fn blend_transform(a: &TransformList, b: &TransformList, t: f32) -> Option<TransformList> {
    if !a.same_structure(b) {
        return None;
    }
    let ops = a
        .0
        .iter()
        .zip(b.0.iter())
        .map(|(oa, ob)| {
            let params = lerp_slice(&oa.params(), &ob.params(), t).unwrap_or_default();
            oa.with_params(&params)
        })
        .collect();
    Some(TransformList(ops))
}

/// Interpolate `a → b` at `t`. Returns `None` when the pair has no numeric
/// interpolation (tokens, mismatched paths/lists, url paints, mixed kinds).
pub fn interpolate(a: &Value, b: &Value, t: f32, ctx: &ValueContext) -> Option<Value> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Some(Value::Number(lerp_f(*x, *y, t))),

        (Value::Color(ca), Value::Color(cb)) => Some(Value::Color(lerp_array(ca, cb, t))),
        (Value::Point(pa), Value::Point(pb)) => Some(Value::Point(lerp_array(pa, pb, t))),
        (Value::Rect(ra), Value::Rect(rb)) => Some(Value::Rect(lerp_array(ra, rb, t))),
        (Value::Matrix(ma), Value::Matrix(mb)) => Some(Value::Matrix(lerp_array(ma, mb, t))),

        (Value::Numbers(va), Value::Numbers(vb)) => lerp_slice(va, vb, t).map(Value::Numbers),
        (Value::Points(va), Value::Points(vb)) => {
            if va.len() != vb.len() {
                return None;
            }
            Some(Value::Points(
                va.iter().zip(vb).map(|(p, q)| lerp_array(p, q, t)).collect(),
            ))
        }

        (Value::Path(pa), Value::Path(pb)) => blend_path(pa, pb, t).map(Value::Path),
        (Value::Transform(ta), Value::Transform(tb)) => {
            blend_transform(ta, tb, t).map(Value::Transform)
        }

        (Value::Paint(pa), Value::Paint(pb)) => {
            let ca = paint_color(pa, ctx)?;
            let cb = paint_color(pb, ctx)?;
            Some(Value::Paint(Paint::Color(lerp_array(&ca, &cb, t))))
        }

        // Length / number mixes
        (la, lb) => {
            let (va, ua) = as_length(la)?;
            let (vb, ub) = as_length(lb)?;
            if ua == ub {
                return Some(match a {
                    Value::Number(_) => Value::Number(lerp_f(va, vb, t)),
                    _ => Value::Length {
                        value: lerp_f(va, vb, t),
                        unit: ua,
                    },
                });
            }
            let ya = ctx.to_user_units(va, ua);
            let yb = ctx.to_user_units(vb, ub);
            Some(Value::Length {
                value: lerp_f(ya, yb, t),
                unit: LengthUnit::Px,
            })
        }
    }
}

/// Step blending for step-only types: choose a for t < 0.5, else b.
pub fn step_blend(a: &Value, b: &Value, t: f32) -> Value {
    if t < 0.5 {
        a.clone()
    } else {
        b.clone()
    }
}

/// Interpolate when the kinds allow it, otherwise snap at the midpoint.
pub fn interpolate_or_step(a: &Value, b: &Value, t: f32, ctx: &ValueContext) -> Value {
    interpolate(a, b, t, ctx).unwrap_or_else(|| step_blend(a, b, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformOp;
    use approx::assert_relative_eq;

    fn ctx() -> ValueContext {
        ValueContext::default()
    }

    #[test]
    fn blend_numbers() {
        let r = interpolate(&Value::n(0.0), &Value::n(100.0), 0.25, &ctx());
        assert_eq!(r, Some(Value::Number(25.0)));
    }

    #[test]
    fn blend_colors_channel_wise() {
        let r = interpolate(
            &Value::Color([0.0, 0.0, 255.0, 255.0]),
            &Value::Color([255.0, 0.0, 0.0, 255.0]),
            0.5,
            &ctx(),
        );
        assert_eq!(r, Some(Value::Color([127.5, 0.0, 127.5, 255.0])));
    }

    #[test]
    fn blend_lengths_across_units() {
        let a = Value::Length {
            value: 1.0,
            unit: LengthUnit::Em,
        };
        let b = Value::px(32.0);
        match interpolate(&a, &b, 0.5, &ctx()) {
            Some(Value::Length { value, unit }) => {
                assert_eq!(unit, LengthUnit::Px);
                assert_relative_eq!(value, 24.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_paths_degrade_to_step() {
        let a = Value::Path(PathData::from_points(&[[0.0, 0.0], [1.0, 1.0]]));
        let b = Value::Path(PathData::from_points(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]));
        assert!(interpolate(&a, &b, 0.3, &ctx()).is_none());
        assert_eq!(interpolate_or_step(&a, &b, 0.3, &ctx()), a);
        assert_eq!(interpolate_or_step(&a, &b, 0.7, &ctx()), b);
    }

    #[test]
    fn short_arc_segments_do_not_blend() {
        let arc = |x: f32| {
            Value::Path(PathData {
                segments: vec![
                    PathSegment::move_to(0.0, 0.0),
                    PathSegment {
                        command: PathCommand::Arc,
                        relative: false,
                        coords: vec![x, 2.0],
                    },
                ],
            })
        };
        let (a, b) = (arc(1.0), arc(5.0));
        assert!(interpolate(&a, &b, 0.5, &ctx()).is_none());
        assert_eq!(interpolate_or_step(&a, &b, 0.7, &ctx()), b);
    }

    #[test]
    fn matching_paths_blend_coordinates() {
        let a = Value::Path(PathData::from_points(&[[0.0, 0.0], [10.0, 10.0]]));
        let b = Value::Path(PathData::from_points(&[[10.0, 0.0], [20.0, 30.0]]));
        let Some(Value::Path(p)) = interpolate(&a, &b, 0.5, &ctx()) else {
            panic!("expected path");
        };
        assert_eq!(p.segments[1].coords, vec![15.0, 20.0]);
    }

    #[test]
    fn transform_lists_blend_per_operation() {
        let a = Value::Transform(TransformList::single(TransformOp::Rotate([0.0, 5.0, 5.0])));
        let b = Value::Transform(TransformList::single(TransformOp::Rotate([90.0, 5.0, 5.0])));
        assert_eq!(
            interpolate(&a, &b, 0.5, &ctx()),
            Some(Value::Transform(TransformList::single(TransformOp::Rotate([
                45.0, 5.0, 5.0
            ]))))
        );
    }

    #[test]
    fn current_color_paint_resolves_through_context() {
        let a = Value::Paint(Paint::CurrentColor);
        let b = Value::Paint(Paint::Color([255.0, 255.0, 255.0, 255.0]));
        let r = interpolate(&a, &b, 0.5, &ctx());
        assert_eq!(
            r,
            Some(Value::Paint(Paint::Color([127.5, 127.5, 127.5, 255.0])))
        );
        let url = Value::Paint(Paint::Url {
            href: "#grad".into(),
            fallback: None,
        });
        assert!(interpolate(&url, &b, 0.5, &ctx()).is_none());
    }

    #[test]
    fn step_tokens() {
        let a = Value::token("hidden");
        let b = Value::token("visible");
        assert!(interpolate(&a, &b, 0.5, &ctx()).is_none());
        assert_eq!(step_blend(&a, &b, 0.25), a);
        assert_eq!(step_blend(&a, &b, 0.75), b);
    }
}
