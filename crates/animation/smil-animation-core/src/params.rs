//! Value-producing configuration of one animation element.

use serde::{Deserialize, Serialize};
use smil_value_core::{PathData, TransformType, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalcMode {
    Discrete,
    #[default]
    Linear,
    Paced,
    Spline,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Additive {
    #[default]
    Replace,
    Sum,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Accumulate {
    #[default]
    None,
    Sum,
}

/// Orientation of an element moving along a motion path.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionRotate {
    /// Fixed angle in degrees.
    Angle(f32),
    Auto,
    AutoReverse,
}

impl Default for MotionRotate {
    fn default() -> Self {
        MotionRotate::Angle(0.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSpec {
    /// Explicit path; when absent the from/to/by/values points form the path.
    pub path: Option<PathData>,
    /// Fractions of the path length, parallel to `key_times`.
    pub key_points: Option<Vec<f32>>,
    pub rotate: MotionRotate,
}

/// Element flavour, deciding how values are interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    #[default]
    Animate,
    /// Always yields `to`; calc mode, additive and accumulate are ignored.
    Set,
    /// Values are parameter lists of one transform operation.
    Transform(TransformType),
    Motion(MotionSpec),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationParameters {
    pub kind: AnimationKind,
    /// Absent means the element default: paced for motion, linear otherwise.
    pub calc_mode: Option<CalcMode>,
    pub additive: Additive,
    pub accumulate: Accumulate,
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub by: Option<Value>,
    pub values: Option<Vec<Value>>,
    pub key_times: Option<Vec<f32>>,
    /// Control points `(x1, y1, x2, y2)` per segment.
    pub key_splines: Option<Vec<[f32; 4]>>,
}

impl AnimationParameters {
    pub fn from_to(from: Value, to: Value) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn with_values(values: Vec<Value>) -> Self {
        Self {
            values: Some(values),
            ..Self::default()
        }
    }

    pub fn calc_mode(&self) -> CalcMode {
        match (self.calc_mode, &self.kind) {
            (Some(mode), _) => mode,
            (None, AnimationKind::Motion(_)) => CalcMode::Paced,
            (None, _) => CalcMode::Linear,
        }
    }

    fn motion(&self) -> Option<&MotionSpec> {
        match &self.kind {
            AnimationKind::Motion(spec) => Some(spec),
            _ => None,
        }
    }

    /// Number of keyframes the key attributes must line up with.
    fn keyframe_count(&self) -> usize {
        if let Some(points) = self.motion().and_then(|m| m.key_points.as_ref()) {
            return points.len();
        }
        self.values.as_ref().map_or(2, Vec::len)
    }

    /// Check structural consistency; the error string explains what is wrong.
    pub fn validate(&self) -> Result<(), String> {
        if let AnimationKind::Set = self.kind {
            return match self.to {
                Some(_) => Ok(()),
                None => Err("set animation without 'to'".into()),
            };
        }

        let has_path = self.motion().is_some_and(|m| m.path.is_some());
        if let Some(values) = &self.values {
            if values.is_empty() {
                return Err("empty 'values' list".into());
            }
        } else if !has_path && self.to.is_none() && self.by.is_none() {
            return Err(if self.motion().is_some() {
                "motion without path, values, 'to' or 'by'".into()
            } else {
                "neither 'values', 'to' nor 'by' present".into()
            });
        }

        if let Some(points) = self.motion().and_then(|m| m.key_points.as_ref()) {
            if self.key_times.is_none() {
                return Err("'keyPoints' requires 'keyTimes'".into());
            }
            if points.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return Err("'keyPoints' outside [0, 1]".into());
            }
        }

        let mode = self.calc_mode();
        let frames = self.keyframe_count();
        if let (Some(times), true) = (&self.key_times, mode != CalcMode::Paced) {
            if times.len() != frames {
                return Err(format!(
                    "'keyTimes' has {} entries for {} values",
                    times.len(),
                    frames
                ));
            }
            if times.windows(2).any(|w| w[1] < w[0]) {
                return Err("'keyTimes' not ascending".into());
            }
            if times.first().is_some_and(|t| *t != 0.0) {
                return Err("'keyTimes' must start at 0".into());
            }
            if mode != CalcMode::Discrete && times.last().is_some_and(|t| *t != 1.0) {
                return Err("'keyTimes' must end at 1".into());
            }
        }

        if mode == CalcMode::Spline {
            let Some(splines) = &self.key_splines else {
                return Err("spline mode without 'keySplines'".into());
            };
            if splines.len() + 1 != frames.max(2) {
                return Err(format!(
                    "'keySplines' has {} entries for {} values",
                    splines.len(),
                    frames
                ));
            }
            if splines
                .iter()
                .flatten()
                .any(|c| !(0.0..=1.0).contains(c))
            {
                return Err("'keySplines' control point outside [0, 1]".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_kind() {
        let p = AnimationParameters::from_to(Value::n(0.0), Value::n(1.0));
        assert_eq!(p.calc_mode(), CalcMode::Linear);
        let m = AnimationParameters {
            kind: AnimationKind::Motion(MotionSpec::default()),
            ..AnimationParameters::default()
        };
        assert_eq!(m.calc_mode(), CalcMode::Paced);
        assert!(m.validate().is_err());
    }

    #[test]
    fn key_attribute_validation() {
        let mut p = AnimationParameters::with_values(vec![Value::n(0.0), Value::n(5.0), Value::n(10.0)]);
        p.key_times = Some(vec![0.0, 0.3, 1.0]);
        assert!(p.validate().is_ok());
        p.key_times = Some(vec![0.0, 1.0]);
        assert!(p.validate().unwrap_err().contains("keyTimes"));
        p.key_times = None;
        p.calc_mode = Some(CalcMode::Spline);
        assert!(p.validate().is_err());
        p.key_splines = Some(vec![[0.42, 0.0, 0.58, 1.0]; 2]);
        assert!(p.validate().is_ok());
        assert!(AnimationParameters::default().validate().is_err());
    }

    #[test]
    fn parameters_from_json() {
        let p: AnimationParameters = serde_json::from_str(
            r#"{
                "kind": {"transform": "rotate"},
                "calc_mode": "discrete",
                "values": [{"type": "Numbers", "data": [0, 50, 50]}, {"type": "Numbers", "data": [90, 50, 50]}],
                "accumulate": "sum"
            }"#,
        )
        .unwrap();
        assert_eq!(p.kind, AnimationKind::Transform(TransformType::Rotate));
        assert_eq!(p.accumulate, Accumulate::Sum);
        assert!(p.validate().is_ok());
    }
}
