//! Calculator: value of one animation at a position inside its interval.
//!
//! Pure functions over [`AnimationParameters`]; the only state is the small
//! per-slice [`CalcCache`] holding values that do not depend on the base value.

use log::warn;
use smil_value_core::arith::{add, distance, scale, sub};
use smil_value_core::blend::interpolate_or_step;
use smil_value_core::coercion::to_numbers;
use smil_value_core::path::PathMeasure;
use smil_value_core::{TransformList, TransformOp, TransformType, Value, ValueContext};

use crate::interp::spline_ease;
use crate::params::{Accumulate, Additive, AnimationKind, AnimationParameters, CalcMode};

/// Which attributes drive the keyframes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueMode {
    /// `values` list; overrides from/to/by.
    Values,
    /// from → to
    Normal,
    /// from → from + by
    BothFromBy,
    /// base → base + by, always additive
    OnlyBy,
    /// base → to, never additive or accumulating
    OnlyTo,
}

/// Bracketing keyframe pair and local progress between them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SubInterval {
    pub index: usize,
    pub local: f32,
}

/// Per-slice cache of base-independent derived data.
#[derive(Clone, Debug, Default)]
pub struct CalcCache {
    frames: Option<Vec<Value>>,
    cumulative: Option<Option<Vec<f32>>>,
    pub(crate) path: Option<PathMeasure>,
}

pub fn resolve_value_mode(params: &AnimationParameters) -> Option<ValueMode> {
    if params.values.as_ref().is_some_and(|v| !v.is_empty()) {
        return Some(ValueMode::Values);
    }
    match (&params.from, &params.to, &params.by) {
        (Some(_), Some(_), _) => Some(ValueMode::Normal),
        (Some(_), None, Some(_)) => Some(ValueMode::BothFromBy),
        (None, Some(_), _) => Some(ValueMode::OnlyTo),
        (None, None, Some(_)) => Some(ValueMode::OnlyBy),
        _ => None,
    }
}

/// Pick the keyframe pair for `position` in [0, 1].
///
/// `cumulative` holds the running distance at each keyframe and is used for
/// paced mode; without it paced falls back to an equal split.
pub fn select_sub_interval(
    calc: CalcMode,
    count: usize,
    key_times: Option<&[f32]>,
    cumulative: Option<&[f32]>,
    position: f32,
) -> SubInterval {
    if count <= 1 {
        return SubInterval {
            index: 0,
            local: 0.0,
        };
    }
    let last = count - 1;
    let key_times = key_times.filter(|k| k.len() == count);

    if calc == CalcMode::Discrete {
        let index = match key_times {
            Some(times) => times.partition_point(|t| *t <= position).saturating_sub(1),
            None => ((position * count as f32).floor() as usize).min(last),
        };
        return SubInterval {
            index: index.min(last),
            local: 0.0,
        };
    }

    if calc == CalcMode::Paced {
        if let Some(cum) = cumulative.filter(|c| c.len() == count) {
            let total = cum[last];
            if total <= 0.0 {
                return SubInterval {
                    index: 0,
                    local: 0.0,
                };
            }
            let target = position * total;
            let index = cum[..last]
                .partition_point(|d| *d <= target)
                .saturating_sub(1)
                .min(last - 1);
            let span = cum[index + 1] - cum[index];
            let local = if span > 0.0 {
                ((target - cum[index]) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            return SubInterval { index, local };
        }
    }

    let key_times = key_times.filter(|_| calc != CalcMode::Paced);
    match key_times {
        Some(times) => {
            let index = times[..last]
                .partition_point(|t| *t <= position)
                .saturating_sub(1)
                .min(last - 1);
            let span = times[index + 1] - times[index];
            let local = if span > 0.0 {
                ((position - times[index]) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            SubInterval { index, local }
        }
        None => {
            let scaled = position * last as f32;
            let index = (scaled.floor() as usize).min(last - 1);
            SubInterval {
                index,
                local: (scaled - index as f32).clamp(0.0, 1.0),
            }
        }
    }
}

/// Running distances for paced interpolation; `None` when some pair has no distance.
pub fn paced_cumulative(frames: &[Value], ctx: &ValueContext) -> Option<Vec<f32>> {
    let mut out = Vec::with_capacity(frames.len());
    let mut total = 0.0f32;
    out.push(0.0);
    for pair in frames.windows(2) {
        total += distance(&pair[0], &pair[1], ctx)?;
        out.push(total);
    }
    Some(out)
}

/// Wrap loose parameter lists into a single-operation transform list.
fn as_transform(kind: TransformType, v: &Value, ctx: &ValueContext) -> Result<Value, String> {
    match v {
        Value::Transform(_) => Ok(v.clone()),
        other => TransformOp::from_params(kind, &to_numbers(other, ctx))
            .map(|op| Value::Transform(TransformList::single(op)))
            .map_err(|e| e.to_string()),
    }
}

fn prepare(params: &AnimationParameters, v: &Value, ctx: &ValueContext) -> Result<Value, String> {
    match params.kind {
        AnimationKind::Transform(kind) => as_transform(kind, v, ctx),
        _ => Ok(v.clone()),
    }
}

fn required<'a>(v: &'a Option<Value>, name: &str) -> Result<&'a Value, String> {
    v.as_ref().ok_or_else(|| format!("missing '{name}'"))
}

/// Keyframes for `mode`. Values mode is cached because it does not depend on `base`.
fn keyframes(
    params: &AnimationParameters,
    mode: ValueMode,
    base: &Value,
    ctx: &ValueContext,
    cache: &mut CalcCache,
) -> Result<Vec<Value>, String> {
    Ok(match mode {
        ValueMode::Values => {
            if cache.frames.is_none() {
                let values = params.values.as_deref().unwrap_or_default();
                let prepared = values
                    .iter()
                    .map(|v| prepare(params, v, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                cache.frames = Some(prepared);
            }
            cache.frames.clone().unwrap_or_default()
        }
        ValueMode::Normal => vec![
            prepare(params, required(&params.from, "from")?, ctx)?,
            prepare(params, required(&params.to, "to")?, ctx)?,
        ],
        ValueMode::BothFromBy => {
            let from = prepare(params, required(&params.from, "from")?, ctx)?;
            let by = prepare(params, required(&params.by, "by")?, ctx)?;
            let to = add(&from, &by, ctx).ok_or("'by' cannot be added to 'from'")?;
            vec![from, to]
        }
        ValueMode::OnlyBy => {
            let by = prepare(params, required(&params.by, "by")?, ctx)?;
            let zero = scale(&by, 0.0).ok_or("'by' has no additive identity")?;
            vec![zero, by]
        }
        ValueMode::OnlyTo => vec![
            base.clone(),
            prepare(params, required(&params.to, "to")?, ctx)?,
        ],
    })
}

/// Change covered by one full repetition, used by `accumulate="sum"`.
fn cycle_delta(mode: ValueMode, frames: &[Value], ctx: &ValueContext) -> Option<Value> {
    match mode {
        ValueMode::OnlyTo => None,
        ValueMode::OnlyBy | ValueMode::BothFromBy | ValueMode::Normal | ValueMode::Values => {
            let first = frames.first()?;
            let last = frames.last()?;
            sub(last, first, ctx)
        }
    }
}

/// Compute the animation's value at `position` of repetition `repetition`,
/// composed onto `base` (the result of lower-priority slices).
pub fn compute_value(
    params: &AnimationParameters,
    position: f32,
    repetition: u32,
    base: &Value,
    ctx: &ValueContext,
    cache: &mut CalcCache,
) -> Result<Value, String> {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };
    match &params.kind {
        AnimationKind::Set => {
            return params
                .to
                .clone()
                .ok_or_else(|| "set animation without 'to'".to_string());
        }
        AnimationKind::Motion(spec) => {
            return crate::motion::motion_value(params, spec, position, repetition, base, ctx, cache);
        }
        AnimationKind::Animate | AnimationKind::Transform(_) => {}
    }

    let mode = resolve_value_mode(params).ok_or("neither 'values', 'to' nor 'by' present")?;
    let frames = keyframes(params, mode, base, ctx, cache)?;
    let Some(first) = frames.first() else {
        return Err("no keyframes".into());
    };

    let mut calc = params.calc_mode();
    if first.kind().is_discrete() {
        calc = CalcMode::Discrete;
    }
    let cumulative = if calc == CalcMode::Paced && frames.len() > 2 {
        let cached = cache
            .cumulative
            .get_or_insert_with(|| paced_cumulative(&frames, ctx));
        if cached.is_none() {
            warn!("paced calc mode on values without a distance; using linear spacing");
        }
        cached.clone()
    } else {
        None
    };

    let sub_interval = select_sub_interval(
        calc,
        frames.len(),
        params.key_times.as_deref(),
        cumulative.as_deref(),
        position,
    );
    let a = &frames[sub_interval.index];
    let b = frames.get(sub_interval.index + 1).unwrap_or(a);

    let mut result = if calc == CalcMode::Discrete {
        a.clone()
    } else {
        let mut local = sub_interval.local;
        if calc == CalcMode::Spline {
            if let Some(ctrl) = params
                .key_splines
                .as_ref()
                .and_then(|s| s.get(sub_interval.index))
            {
                local = spline_ease(local, *ctrl);
            }
        }
        interpolate_or_step(a, b, local, ctx)
    };

    if params.accumulate == Accumulate::Sum && repetition > 0 {
        let accumulated = cycle_delta(mode, &frames, ctx)
            .and_then(|delta| scale(&delta, repetition as f32))
            .and_then(|delta| add(&result, &delta, ctx));
        if let Some(v) = accumulated {
            result = v;
        }
    }

    let additive = match mode {
        ValueMode::OnlyBy => true,
        ValueMode::OnlyTo => false,
        _ => params.additive == Additive::Sum,
    };
    if additive {
        if let Some(v) = add(base, &result, ctx) {
            result = v;
        }
    }
    Ok(result)
}
