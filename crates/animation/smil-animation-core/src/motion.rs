//! Motion along a path: position and orientation as an affine matrix.

use std::f32::consts::PI;

use smil_value_core::coercion::to_point;
use smil_value_core::path::PathMeasure;
use smil_value_core::{Matrix, PathData, Value, ValueContext};

use crate::calculator::{resolve_value_mode, select_sub_interval, CalcCache, ValueMode};
use crate::interp::spline_ease;
use crate::params::{
    Accumulate, Additive, AnimationParameters, CalcMode, MotionRotate, MotionSpec,
};

fn base_matrix(base: &Value) -> Matrix {
    match base {
        Value::Matrix(m) => Matrix(*m),
        Value::Transform(list) => list.to_matrix(),
        _ => Matrix::IDENTITY,
    }
}

fn ease(params: &AnimationParameters, calc: CalcMode, index: usize, local: f32) -> f32 {
    if calc != CalcMode::Spline {
        return local;
    }
    params
        .key_splines
        .as_ref()
        .and_then(|s| s.get(index))
        .map_or(local, |ctrl| spline_ease(local, *ctrl))
}

/// Fraction of the path length at `position`, honouring `keyPoints`.
fn path_fraction(params: &AnimationParameters, spec: &MotionSpec, calc: CalcMode, position: f32) -> f32 {
    let Some(points) = spec.key_points.as_ref().filter(|p| !p.is_empty()) else {
        return match calc {
            CalcMode::Discrete => {
                select_sub_interval(calc, 2, None, None, position).index as f32
            }
            _ => position,
        };
    };
    // keyPoints are paired with keyTimes, so paced spacing does not apply
    let calc = if calc == CalcMode::Paced {
        CalcMode::Linear
    } else {
        calc
    };
    let sub = select_sub_interval(calc, points.len(), params.key_times.as_deref(), None, position);
    let a = points[sub.index];
    let b = points.get(sub.index + 1).copied().unwrap_or(a);
    if calc == CalcMode::Discrete {
        a
    } else {
        a + (b - a) * ease(params, calc, sub.index, sub.local)
    }
}

fn sample_path(
    params: &AnimationParameters,
    spec: &MotionSpec,
    measure: &PathMeasure,
    position: f32,
) -> ([f32; 2], f32, [f32; 2]) {
    let fraction = path_fraction(params, spec, params.calc_mode(), position);
    let (point, angle) = measure.point_at_fraction(fraction);
    let (start, _) = measure.point_at_fraction(0.0);
    let (end, _) = measure.point_at_fraction(1.0);
    (point, angle, [end[0] - start[0], end[1] - start[1]])
}

fn point_of(v: &Option<Value>, name: &str, ctx: &ValueContext) -> Result<[f32; 2], String> {
    v.as_ref()
        .and_then(|v| to_point(v, ctx))
        .ok_or_else(|| format!("'{name}' is not a point"))
}

/// Keyframe points when no explicit path is given.
fn motion_points(
    params: &AnimationParameters,
    mode: ValueMode,
    origin: [f32; 2],
    ctx: &ValueContext,
) -> Result<Vec<[f32; 2]>, String> {
    Ok(match mode {
        ValueMode::Values => params
            .values
            .iter()
            .flatten()
            .map(|v| to_point(v, ctx).ok_or_else(|| "motion value is not a point".to_string()))
            .collect::<Result<_, _>>()?,
        ValueMode::Normal => vec![
            point_of(&params.from, "from", ctx)?,
            point_of(&params.to, "to", ctx)?,
        ],
        ValueMode::BothFromBy => {
            let from = point_of(&params.from, "from", ctx)?;
            let by = point_of(&params.by, "by", ctx)?;
            vec![from, [from[0] + by[0], from[1] + by[1]]]
        }
        ValueMode::OnlyBy => vec![[0.0, 0.0], point_of(&params.by, "by", ctx)?],
        ValueMode::OnlyTo => vec![origin, point_of(&params.to, "to", ctx)?],
    })
}

fn sample_points(
    params: &AnimationParameters,
    points: &[[f32; 2]],
    position: f32,
) -> ([f32; 2], f32, [f32; 2]) {
    let calc = params.calc_mode();
    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0f32;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            let q = points[i - 1];
            total += ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt();
        }
        cumulative.push(total);
    }
    let sub = select_sub_interval(
        calc,
        points.len(),
        params.key_times.as_deref(),
        Some(&cumulative),
        position,
    );
    let a = points[sub.index];
    let b = points.get(sub.index + 1).copied().unwrap_or(a);
    let angle = (b[1] - a[1]).atan2(b[0] - a[0]);
    let point = if calc == CalcMode::Discrete {
        a
    } else {
        let t = ease(params, calc, sub.index, sub.local);
        [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
    };
    let first = points[0];
    let last = points[points.len() - 1];
    (point, angle, [last[0] - first[0], last[1] - first[1]])
}

/// Matrix for a motion animation at `position` of repetition `repetition`.
pub(crate) fn motion_value(
    params: &AnimationParameters,
    spec: &MotionSpec,
    position: f32,
    repetition: u32,
    base: &Value,
    ctx: &ValueContext,
    cache: &mut CalcCache,
) -> Result<Value, String> {
    let base_m = base_matrix(base);
    let mut mode = None;

    let (point, angle, cycle) = match &spec.path {
        Some(path) => {
            let measure = cache.path.get_or_insert_with(|| path.measure());
            sample_path(params, spec, measure, position)
        }
        None => {
            let m = resolve_value_mode(params).ok_or("motion without path, values, 'to' or 'by'")?;
            mode = Some(m);
            let points = motion_points(params, m, [base_m.0[4], base_m.0[5]], ctx)?;
            if points.is_empty() {
                return Err("motion without points".into());
            }
            if spec.key_points.is_some() {
                let measure = PathData::from_points(&points).measure();
                sample_path(params, spec, &measure, position)
            } else {
                sample_points(params, &points, position)
            }
        }
    };

    let rotation = match spec.rotate {
        MotionRotate::Angle(deg) => deg.to_radians(),
        MotionRotate::Auto => angle,
        MotionRotate::AutoReverse => angle + PI,
    };
    let mut m = Matrix::translate(point[0], point[1]).multiply(&Matrix::rotate(rotation));

    if params.accumulate == Accumulate::Sum && repetition > 0 && mode != Some(ValueMode::OnlyTo) {
        let n = repetition as f32;
        m = Matrix::translate(cycle[0] * n, cycle[1] * n).multiply(&m);
    }

    let additive = match mode {
        Some(ValueMode::OnlyBy) => true,
        Some(ValueMode::OnlyTo) => false,
        _ => params.additive == Additive::Sum,
    };
    if additive {
        m = base_m.multiply(&m);
    }
    Ok(Value::Matrix(m.0))
}
