//! Additive operators used by `additive="sum"` and `accumulate="sum"`,
//! plus the per-kind distance used by paced interpolation.
//!
//! Every operator returns `None` when the pair has no arithmetic meaning;
//! callers then fall back to replace/discrete behaviour.

use crate::blend::{as_length, paint_color};
use crate::context::ValueContext;
use crate::path::{PathCommand, PathData, PathSegment};
use crate::transform::{Matrix, TransformList, TransformOp};
use crate::value::{LengthUnit, Paint, Value};

fn zip_with<const N: usize>(a: &[f32; N], b: &[f32; N], f: impl Fn(f32, f32) -> f32) -> [f32; N] {
    let mut out = [0.0f32; N];
    for i in 0..N {
        out[i] = f(a[i], b[i]);
    }
    out
}

fn zip_slice(a: &[f32], b: &[f32], f: impl Fn(f32, f32) -> f32) -> Option<Vec<f32>> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect())
}

fn zip_path(a: &PathData, b: &PathData, f: impl Fn(f32, f32) -> f32) -> Option<PathData> {
    if !a.same_structure(b) {
        return None;
    }
    let segments = a
        .segments
        .iter()
        .zip(b.segments.iter())
        .map(|(sa, sb)| {
            let mut coords: Vec<f32> = sa
                .coords
                .iter()
                .zip(&sb.coords)
                .map(|(x, y)| f(*x, *y))
                .collect();
            if sa.command == PathCommand::Arc {
                coords[3] = sa.coords[3];
                coords[4] = sa.coords[4];
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

fn zip_length(
    a: &Value,
    b: &Value,
    ctx: &ValueContext,
    f: impl Fn(f32, f32) -> f32,
) -> Option<Value> {
    let (va, ua) = as_length(a)?;
    let (vb, ub) = as_length(b)?;
    if ua == ub {
        return Some(match (a, b) {
            (Value::Number(_), Value::Number(_)) => Value::Number(f(va, vb)),
            _ => Value::Length {
                value: f(va, vb),
                unit: ua,
            },
        });
    }
    Some(Value::Length {
        value: f(ctx.to_user_units(va, ua), ctx.to_user_units(vb, ub)),
        unit: LengthUnit::Px,
    })
}

fn zip_values(
    a: &Value,
    b: &Value,
    ctx: &ValueContext,
    f: impl Fn(f32, f32) -> f32 + Copy,
) -> Option<Value> {
    match (a, b) {
        (Value::Color(x), Value::Color(y)) => Some(Value::Color(zip_with(x, y, f))),
        (Value::Point(x), Value::Point(y)) => Some(Value::Point(zip_with(x, y, f))),
        (Value::Rect(x), Value::Rect(y)) => Some(Value::Rect(zip_with(x, y, f))),
        (Value::Numbers(x), Value::Numbers(y)) => zip_slice(x, y, f).map(Value::Numbers),
        (Value::Points(x), Value::Points(y)) => {
            if x.len() != y.len() {
                return None;
            }
            Some(Value::Points(
                x.iter().zip(y).map(|(p, q)| zip_with(p, q, f)).collect(),
            ))
        }
        (Value::Path(x), Value::Path(y)) => zip_path(x, y, f).map(Value::Path),
        (Value::Paint(x), Value::Paint(y)) => {
            let cx = paint_color(x, ctx)?;
            let cy = paint_color(y, ctx)?;
            Some(Value::Paint(Paint::Color(zip_with(&cx, &cy, f))))
        }
        _ => zip_length(a, b, ctx, f),
    }
}

/// `a + b`. Transform lists concatenate (b applied after a), matrices multiply.
pub fn add(a: &Value, b: &Value, ctx: &ValueContext) -> Option<Value> {
    match (a, b) {
        (Value::Transform(x), Value::Transform(y)) => {
            let mut ops = x.0.clone();
            ops.extend(y.0.iter().copied());
            Some(Value::Transform(TransformList(ops)))
        }
        (Value::Matrix(x), Value::Matrix(y)) => {
            Some(Value::Matrix(Matrix(*x).multiply(&Matrix(*y)).0))
        }
        (Value::Transform(x), Value::Matrix(y)) => {
            Some(Value::Matrix(x.to_matrix().multiply(&Matrix(*y)).0))
        }
        (Value::Matrix(x), Value::Transform(y)) => {
            Some(Value::Matrix(Matrix(*x).multiply(&y.to_matrix()).0))
        }
        _ => zip_values(a, b, ctx, |x, y| x + y),
    }
}

/// `a - b`, used to derive per-repetition accumulation deltas.
pub fn sub(a: &Value, b: &Value, ctx: &ValueContext) -> Option<Value> {
    match (a, b) {
        (Value::Transform(x), Value::Transform(y)) => {
            if !x.same_structure(y) {
                return None;
            }
            let ops = x
                .0
                .iter()
                .zip(y.0.iter())
                .map(|(oa, ob)| {
                    let d: Vec<f32> = oa
                        .params()
                        .iter()
                        .zip(ob.params())
                        .map(|(p, q)| p - q)
                        .collect();
                    oa.with_params(&d)
                })
                .collect();
            Some(Value::Transform(TransformList(ops)))
        }
        (Value::Matrix(x), Value::Matrix(y)) => {
            Some(Value::Matrix(zip_with(x, y, |p, q| p - q)))
        }
        _ => zip_values(a, b, ctx, |x, y| x - y),
    }
}

/// `n × a`.
pub fn scale(a: &Value, n: f32) -> Option<Value> {
    fn s(arr: &[f32], n: f32) -> Vec<f32> {
        arr.iter().map(|x| x * n).collect()
    }
    Some(match a {
        Value::Number(x) => Value::Number(x * n),
        Value::Length { value, unit } => Value::Length {
            value: value * n,
            unit: *unit,
        },
        Value::Color(c) => Value::Color(c.map(|x| x * n)),
        Value::Point(p) => Value::Point(p.map(|x| x * n)),
        Value::Rect(r) => Value::Rect(r.map(|x| x * n)),
        Value::Matrix(m) => Value::Matrix(m.map(|x| x * n)),
        Value::Numbers(v) => Value::Numbers(s(v, n)),
        Value::Points(v) => Value::Points(v.iter().map(|p| p.map(|x| x * n)).collect()),
        Value::Path(p) => Value::Path(PathData {
            segments: p
                .segments
                .iter()
                .map(|seg| {
                    let mut coords = s(&seg.coords, n);
                    if seg.command == PathCommand::Arc {
                        coords[3] = seg.coords[3];
                        coords[4] = seg.coords[4];
                    }
                    PathSegment {
                        command: seg.command,
                        relative: seg.relative,
                        coords,
                    }
                })
                .collect(),
        }),
        Value::Transform(list) => Value::Transform(TransformList(
            list.0
                .iter()
                .map(|op| op.with_params(&s(&op.params(), n)))
                .collect(),
        )),
        Value::Paint(Paint::Color(c)) => Value::Paint(Paint::Color(c.map(|x| x * n))),
        Value::Paint(_) | Value::Token(_) | Value::Bool(_) => return None,
    })
}

/// Clamp color channels into 0..=255 before a value is written back.
pub fn clamp_for_output(v: Value) -> Value {
    let clamp = |c: [f32; 4]| c.map(|x| x.clamp(0.0, 255.0));
    match v {
        Value::Color(c) => Value::Color(clamp(c)),
        Value::Paint(Paint::Color(c)) => Value::Paint(Paint::Color(clamp(c))),
        other => other,
    }
}

fn single_op_distance(a: &TransformOp, b: &TransformOp) -> Option<f32> {
    match (a, b) {
        (TransformOp::Translate(p), TransformOp::Translate(q))
        | (TransformOp::Scale(p), TransformOp::Scale(q)) => {
            Some(((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt())
        }
        (TransformOp::Rotate(p), TransformOp::Rotate(q)) => Some((p[0] - q[0]).abs()),
        (TransformOp::SkewX(p), TransformOp::SkewX(q))
        | (TransformOp::SkewY(p), TransformOp::SkewY(q)) => Some((p - q).abs()),
        _ => None,
    }
}

fn euclid(d: &[f32]) -> f32 {
    d.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Distance between two values for paced interpolation.
pub fn distance(a: &Value, b: &Value, ctx: &ValueContext) -> Option<f32> {
    match (a, b) {
        (Value::Color(x), Value::Color(y)) => {
            Some(euclid(&[x[0] - y[0], x[1] - y[1], x[2] - y[2]]))
        }
        (Value::Point(x), Value::Point(y)) => Some(euclid(&[x[0] - y[0], x[1] - y[1]])),
        (Value::Rect(x), Value::Rect(y)) => Some(euclid(&zip_with(x, y, |p, q| p - q))),
        (Value::Numbers(x), Value::Numbers(y)) => zip_slice(x, y, |p, q| p - q).map(|d| euclid(&d)),
        (Value::Transform(x), Value::Transform(y)) => match (x.0.as_slice(), y.0.as_slice()) {
            ([oa], [ob]) => single_op_distance(oa, ob),
            _ => None,
        },
        (Value::Paint(x), Value::Paint(y)) => {
            let cx = paint_color(x, ctx)?;
            let cy = paint_color(y, ctx)?;
            Some(euclid(&[cx[0] - cy[0], cx[1] - cy[1], cx[2] - cy[2]]))
        }
        _ => {
            let (va, ua) = as_length(a)?;
            let (vb, ub) = as_length(b)?;
            Some((ctx.to_user_units(va, ua) - ctx.to_user_units(vb, ub)).abs())
        }
    }
}
