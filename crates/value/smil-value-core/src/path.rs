//! Path data and arc-length measurement.
//!
//! Segments keep the command letter and relative flag so that two paths can be
//! interpolated segment-by-segment when their structure matches. Motion along a
//! path goes through [`PathMeasure`], which flattens curves and arcs into line
//! pieces and answers "point and tangent at distance d".

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

const CURVE_STEPS: usize = 16;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo,
    LineTo,
    HorizontalLineTo,
    VerticalLineTo,
    CurveTo,
    SmoothCurveTo,
    QuadTo,
    SmoothQuadTo,
    /// rx ry x-axis-rotation large-arc-flag sweep-flag x y
    Arc,
    ClosePath,
}

impl PathCommand {
    /// Number of coordinates one segment of this command carries.
    pub fn arity(&self) -> usize {
        match self {
            PathCommand::MoveTo | PathCommand::LineTo | PathCommand::SmoothQuadTo => 2,
            PathCommand::HorizontalLineTo | PathCommand::VerticalLineTo => 1,
            PathCommand::CurveTo => 6,
            PathCommand::SmoothCurveTo | PathCommand::QuadTo => 4,
            PathCommand::Arc => 7,
            PathCommand::ClosePath => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub command: PathCommand,
    #[serde(default)]
    pub relative: bool,
    #[serde(default)]
    pub coords: Vec<f32>,
}

impl PathSegment {
    pub fn new(command: PathCommand, relative: bool, coords: Vec<f32>) -> Result<Self, ValueError> {
        if coords.len() != command.arity() {
            return Err(ValueError::PathArity {
                command,
                expected: command.arity(),
                actual: coords.len(),
            });
        }
        Ok(Self {
            command,
            relative,
            coords,
        })
    }

    pub fn move_to(x: f32, y: f32) -> Self {
        Self {
            command: PathCommand::MoveTo,
            relative: false,
            coords: vec![x, y],
        }
    }

    pub fn line_to(x: f32, y: f32) -> Self {
        Self {
            command: PathCommand::LineTo,
            relative: false,
            coords: vec![x, y],
        }
    }

    /// Two segments can be interpolated when command and relativity agree
    /// and both carry the full coordinate set for the command.
    #[inline]
    pub fn same_shape(&self, other: &PathSegment) -> bool {
        self.command == other.command
            && self.relative == other.relative
            && self.coords.len() == self.command.arity()
            && other.coords.len() == other.command.arity()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPathData")]
pub struct PathData {
    pub segments: Vec<PathSegment>,
}

#[derive(Deserialize)]
struct RawPathData {
    #[serde(default)]
    segments: Vec<PathSegment>,
}

impl TryFrom<RawPathData> for PathData {
    type Error = ValueError;

    fn try_from(raw: RawPathData) -> Result<Self, Self::Error> {
        PathData::new(raw.segments)
    }
}

impl PathData {
    pub fn new(segments: Vec<PathSegment>) -> Result<Self, ValueError> {
        match segments.first() {
            Some(first) if first.command == PathCommand::MoveTo => {}
            Some(_) => return Err(ValueError::PathWithoutMoveTo),
            None => return Ok(Self::default()),
        }
        for seg in &segments {
            if seg.coords.len() != seg.command.arity() {
                return Err(ValueError::PathArity {
                    command: seg.command,
                    expected: seg.command.arity(),
                    actual: seg.coords.len(),
                });
            }
        }
        Ok(Self { segments })
    }

    /// Polyline path through `points` (moveto followed by linetos).
    pub fn from_points(points: &[[f32; 2]]) -> Self {
        let mut segments = Vec::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            if i == 0 {
                segments.push(PathSegment::move_to(p[0], p[1]));
            } else {
                segments.push(PathSegment::line_to(p[0], p[1]));
            }
        }
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when both paths have identical command sequences.
    pub fn same_structure(&self, other: &PathData) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a.same_shape(b))
    }

    /// Flatten into line pieces with cumulative lengths.
    pub fn measure(&self) -> PathMeasure {
        PathMeasure::new(self)
    }
}

/// One straight piece of a flattened path.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Piece {
    start: [f32; 2],
    end: [f32; 2],
    offset: f32,
    length: f32,
}

/// Arc-length table over a flattened path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathMeasure {
    pieces: Vec<Piece>,
    total: f32,
    first_point: Option<[f32; 2]>,
}

impl PathMeasure {
    fn new(path: &PathData) -> Self {
        let mut flat = Flattener::default();
        for seg in &path.segments {
            flat.segment(seg);
        }
        let mut measure = PathMeasure {
            pieces: Vec::with_capacity(flat.lines.len()),
            total: 0.0,
            first_point: flat.first_point,
        };
        for (start, end) in flat.lines {
            let length = distance(start, end);
            measure.pieces.push(Piece {
                start,
                end,
                offset: measure.total,
                length,
            });
            measure.total += length;
        }
        measure
    }

    /// Total drawn length; moveto jumps do not contribute.
    #[inline]
    pub fn total_length(&self) -> f32 {
        self.total
    }

    /// Point and tangent angle (radians) at `distance` along the path.
    /// Distances are clamped into `[0, total_length]`.
    pub fn point_at_length(&self, distance: f32) -> ([f32; 2], f32) {
        if self.pieces.is_empty() {
            return (self.first_point.unwrap_or([0.0, 0.0]), 0.0);
        }
        let d = distance.clamp(0.0, self.total);
        // Binary search on piece offsets; zero-length pieces never win a tie.
        let idx = match self
            .pieces
            .binary_search_by(|p| p.offset.partial_cmp(&d).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let mut idx = idx.min(self.pieces.len() - 1);
        while idx + 1 < self.pieces.len() && self.pieces[idx].length == 0.0 {
            idx += 1;
        }
        let piece = self.pieces[idx];
        let t = if piece.length > 0.0 {
            ((d - piece.offset) / piece.length).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let p = [
            piece.start[0] + (piece.end[0] - piece.start[0]) * t,
            piece.start[1] + (piece.end[1] - piece.start[1]) * t,
        ];
        let angle = (piece.end[1] - piece.start[1]).atan2(piece.end[0] - piece.start[0]);
        (p, angle)
    }

    /// Point at a fraction of the total length.
    #[inline]
    pub fn point_at_fraction(&self, fraction: f32) -> ([f32; 2], f32) {
        self.point_at_length(fraction.clamp(0.0, 1.0) * self.total)
    }
}

#[inline]
fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

#[derive(Default)]
struct Flattener {
    lines: Vec<([f32; 2], [f32; 2])>,
    current: [f32; 2],
    subpath_start: [f32; 2],
    last_cubic_ctrl: Option<[f32; 2]>,
    last_quad_ctrl: Option<[f32; 2]>,
    first_point: Option<[f32; 2]>,
}

impl Flattener {
    fn abs(&self, relative: bool, x: f32, y: f32) -> [f32; 2] {
        if relative {
            [self.current[0] + x, self.current[1] + y]
        } else {
            [x, y]
        }
    }

    fn line(&mut self, to: [f32; 2]) {
        self.lines.push((self.current, to));
        self.current = to;
    }

    fn segment(&mut self, seg: &PathSegment) {
        let c = &seg.coords;
        if c.len() != seg.command.arity() {
            return;
        }
        let rel = seg.relative;
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;
        match seg.command {
            PathCommand::MoveTo => {
                let p = self.abs(rel, c[0], c[1]);
                self.current = p;
                self.subpath_start = p;
                self.first_point.get_or_insert(p);
            }
            PathCommand::LineTo => {
                let p = self.abs(rel, c[0], c[1]);
                self.line(p);
            }
            PathCommand::HorizontalLineTo => {
                let x = if rel { self.current[0] + c[0] } else { c[0] };
                self.line([x, self.current[1]]);
            }
            PathCommand::VerticalLineTo => {
                let y = if rel { self.current[1] + c[0] } else { c[0] };
                self.line([self.current[0], y]);
            }
            PathCommand::CurveTo => {
                let p1 = self.abs(rel, c[0], c[1]);
                let p2 = self.abs(rel, c[2], c[3]);
                let p3 = self.abs(rel, c[4], c[5]);
                self.cubic(p1, p2, p3);
                cubic_ctrl = Some(p2);
            }
            PathCommand::SmoothCurveTo => {
                let p1 = reflect(self.last_cubic_ctrl, self.current);
                let p2 = self.abs(rel, c[0], c[1]);
                let p3 = self.abs(rel, c[2], c[3]);
                self.cubic(p1, p2, p3);
                cubic_ctrl = Some(p2);
            }
            PathCommand::QuadTo => {
                let p1 = self.abs(rel, c[0], c[1]);
                let p2 = self.abs(rel, c[2], c[3]);
                self.quad(p1, p2);
                quad_ctrl = Some(p1);
            }
            PathCommand::SmoothQuadTo => {
                let p1 = reflect(self.last_quad_ctrl, self.current);
                let p2 = self.abs(rel, c[0], c[1]);
                self.quad(p1, p2);
                quad_ctrl = Some(p1);
            }
            PathCommand::Arc => {
                let to = self.abs(rel, c[5], c[6]);
                self.arc(c[0], c[1], c[2], c[3] != 0.0, c[4] != 0.0, to);
            }
            PathCommand::ClosePath => {
                let start = self.subpath_start;
                self.line(start);
            }
        }
        self.last_cubic_ctrl = cubic_ctrl;
        self.last_quad_ctrl = quad_ctrl;
    }

    fn cubic(&mut self, p1: [f32; 2], p2: [f32; 2], p3: [f32; 2]) {
        let p0 = self.current;
        for i in 1..=CURVE_STEPS {
            let t = i as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let b = |a0: f32, a1: f32, a2: f32, a3: f32| {
                u * u * u * a0 + 3.0 * u * u * t * a1 + 3.0 * u * t * t * a2 + t * t * t * a3
            };
            self.line([b(p0[0], p1[0], p2[0], p3[0]), b(p0[1], p1[1], p2[1], p3[1])]);
        }
    }

    fn quad(&mut self, p1: [f32; 2], p2: [f32; 2]) {
        let p0 = self.current;
        for i in 1..=CURVE_STEPS {
            let t = i as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let b = |a0: f32, a1: f32, a2: f32| u * u * a0 + 2.0 * u * t * a1 + t * t * a2;
            self.line([b(p0[0], p1[0], p2[0]), b(p0[1], p1[1], p2[1])]);
        }
    }

    /// Endpoint-to-center arc conversion, then uniform sampling in angle.
    fn arc(&mut self, rx: f32, ry: f32, x_rot_deg: f32, large: bool, sweep: bool, to: [f32; 2]) {
        let from = self.current;
        let (mut rx, mut ry) = (rx.abs(), ry.abs());
        if rx == 0.0 || ry == 0.0 || from == to {
            self.line(to);
            return;
        }
        let phi = x_rot_deg.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let dx = (from[0] - to[0]) / 2.0;
        let dy = (from[1] - to[1]) / 2.0;
        let x1p = cos_phi * dx + sin_phi * dy;
        let y1p = -sin_phi * dx + cos_phi * dy;

        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }
        let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
        let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
        let mut coef = if den == 0.0 { 0.0 } else { (num / den).max(0.0).sqrt() };
        if large == sweep {
            coef = -coef;
        }
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;
        let cx = cos_phi * cxp - sin_phi * cyp + (from[0] + to[0]) / 2.0;
        let cy = sin_phi * cxp + cos_phi * cyp + (from[1] + to[1]) / 2.0;

        let angle = |ux: f32, uy: f32, vx: f32, vy: f32| {
            let dot = ux * vx + uy * vy;
            let len = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
            let mut a = (dot / len).clamp(-1.0, 1.0).acos();
            if ux * vy - uy * vx < 0.0 {
                a = -a;
            }
            a
        };
        let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
        let mut delta = angle(
            (x1p - cxp) / rx,
            (y1p - cyp) / ry,
            (-x1p - cxp) / rx,
            (-y1p - cyp) / ry,
        );
        if !sweep && delta > 0.0 {
            delta -= std::f32::consts::TAU;
        } else if sweep && delta < 0.0 {
            delta += std::f32::consts::TAU;
        }

        for i in 1..=CURVE_STEPS {
            if i == CURVE_STEPS {
                self.line(to);
                break;
            }
            let theta = theta1 + delta * (i as f32 / CURVE_STEPS as f32);
            let (s, c) = theta.sin_cos();
            let x = cos_phi * rx * c - sin_phi * ry * s + cx;
            let y = sin_phi * rx * c + cos_phi * ry * s + cy;
            self.line([x, y]);
        }
    }
}

fn reflect(ctrl: Option<[f32; 2]>, around: [f32; 2]) -> [f32; 2] {
    match ctrl {
        Some(c) => [2.0 * around[0] - c[0], 2.0 * around[1] - c[1]],
        None => around,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn polyline_length_skips_moveto_jumps() {
        let path = PathData::new(vec![
            PathSegment::move_to(0.0, 0.0),
            PathSegment::line_to(10.0, 0.0),
            PathSegment::move_to(100.0, 100.0),
            PathSegment::line_to(100.0, 110.0),
        ])
        .unwrap();
        let m = path.measure();
        assert_relative_eq!(m.total_length(), 20.0);
        let (p, angle) = m.point_at_length(15.0);
        assert_relative_eq!(p[0], 100.0);
        assert_relative_eq!(p[1], 105.0);
        assert_relative_eq!(angle, std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn relative_and_close_segments() {
        let path = PathData::new(vec![
            PathSegment::move_to(0.0, 0.0),
            PathSegment::new(PathCommand::HorizontalLineTo, true, vec![3.0]).unwrap(),
            PathSegment::new(PathCommand::VerticalLineTo, true, vec![4.0]).unwrap(),
            PathSegment::new(PathCommand::ClosePath, false, vec![]).unwrap(),
        ])
        .unwrap();
        assert_relative_eq!(path.measure().total_length(), 12.0, epsilon = 1e-4);
    }

    #[test]
    fn half_circle_arc_length() {
        let path = PathData::new(vec![
            PathSegment::move_to(0.0, 0.0),
            PathSegment::new(PathCommand::Arc, false, vec![10.0, 10.0, 0.0, 0.0, 1.0, 20.0, 0.0])
                .unwrap(),
        ])
        .unwrap();
        let len = path.measure().total_length();
        assert!((len - std::f32::consts::PI * 10.0).abs() < 0.2, "len={len}");
    }

    #[test]
    fn rejects_bad_arity_and_missing_moveto() {
        assert!(PathSegment::new(PathCommand::CurveTo, false, vec![1.0]).is_err());
        assert_eq!(
            PathData::new(vec![PathSegment::line_to(1.0, 1.0)]),
            Err(ValueError::PathWithoutMoveTo)
        );
    }

    #[test]
    fn deserialization_validates_segments() {
        let short_arc = r#"{"segments": [
            {"command": "MoveTo", "coords": [0, 0]},
            {"command": "Arc", "coords": [1, 2]}
        ]}"#;
        assert!(serde_json::from_str::<PathData>(short_arc).is_err());
        let no_move = r#"{"segments": [{"command": "LineTo", "coords": [1, 1]}]}"#;
        assert!(serde_json::from_str::<PathData>(no_move).is_err());

        let ok = r#"{"segments": [
            {"command": "MoveTo", "coords": [0, 0]},
            {"command": "LineTo", "relative": true, "coords": [3, 4]}
        ]}"#;
        let path: PathData = serde_json::from_str(ok).unwrap();
        assert_eq!(path.segments.len(), 2);
        assert!(serde_json::from_str::<PathData>("{}").unwrap().is_empty());
    }

    #[test]
    fn structure_comparison() {
        let a = PathData::from_points(&[[0.0, 0.0], [1.0, 1.0]]);
        let b = PathData::from_points(&[[5.0, 5.0], [2.0, 2.0]]);
        let c = PathData::from_points(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        assert!(a.same_structure(&b));
        assert!(!a.same_structure(&c));

        // hand-built segments that skip validation never match
        let short = PathSegment {
            command: PathCommand::Arc,
            relative: false,
            coords: vec![1.0, 2.0],
        };
        assert!(!short.same_shape(&short.clone()));
    }
}
