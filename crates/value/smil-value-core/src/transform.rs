//! 2D transform lists and affine matrices.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformType {
    Translate,
    Scale,
    Rotate,
    SkewX,
    SkewY,
    Matrix,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "lowercase")]
pub enum TransformOp {
    Translate([f32; 2]),
    Scale([f32; 2]),
    /// Angle in degrees around (cx, cy).
    Rotate([f32; 3]),
    SkewX(f32),
    SkewY(f32),
    Matrix([f32; 6]),
}

impl TransformOp {
    /// Build an operation from the loose parameter list used by `animateTransform` values.
    pub fn from_params(kind: TransformType, params: &[f32]) -> Result<Self, ValueError> {
        let arity_err = |expected| ValueError::TransformArity {
            kind,
            expected,
            actual: params.len(),
        };
        let get = |i: usize| params.get(i).copied();
        Ok(match kind {
            TransformType::Translate => match params.len() {
                1 | 2 => TransformOp::Translate([params[0], get(1).unwrap_or(0.0)]),
                _ => return Err(arity_err(2)),
            },
            TransformType::Scale => match params.len() {
                1 | 2 => TransformOp::Scale([params[0], get(1).unwrap_or(params[0])]),
                _ => return Err(arity_err(2)),
            },
            TransformType::Rotate => match params.len() {
                1 => TransformOp::Rotate([params[0], 0.0, 0.0]),
                3 => TransformOp::Rotate([params[0], params[1], params[2]]),
                _ => return Err(arity_err(3)),
            },
            TransformType::SkewX => match params.len() {
                1 => TransformOp::SkewX(params[0]),
                _ => return Err(arity_err(1)),
            },
            TransformType::SkewY => match params.len() {
                1 => TransformOp::SkewY(params[0]),
                _ => return Err(arity_err(1)),
            },
            TransformType::Matrix => match params.len() {
                6 => TransformOp::Matrix([
                    params[0], params[1], params[2], params[3], params[4], params[5],
                ]),
                _ => return Err(arity_err(6)),
            },
        })
    }

    pub fn kind(&self) -> TransformType {
        match self {
            TransformOp::Translate(_) => TransformType::Translate,
            TransformOp::Scale(_) => TransformType::Scale,
            TransformOp::Rotate(_) => TransformType::Rotate,
            TransformOp::SkewX(_) => TransformType::SkewX,
            TransformOp::SkewY(_) => TransformType::SkewY,
            TransformOp::Matrix(_) => TransformType::Matrix,
        }
    }

    /// Parameters as a flat slice, in declaration order.
    pub fn params(&self) -> Vec<f32> {
        match self {
            TransformOp::Translate(p) | TransformOp::Scale(p) => p.to_vec(),
            TransformOp::Rotate(p) => p.to_vec(),
            TransformOp::SkewX(a) | TransformOp::SkewY(a) => vec![*a],
            TransformOp::Matrix(m) => m.to_vec(),
        }
    }

    /// Rebuild an operation of the same kind from `params` (same length as [`Self::params`]).
    pub fn with_params(&self, params: &[f32]) -> Self {
        let p = |i: usize| params.get(i).copied().unwrap_or(0.0);
        match self {
            TransformOp::Translate(_) => TransformOp::Translate([p(0), p(1)]),
            TransformOp::Scale(_) => TransformOp::Scale([p(0), p(1)]),
            TransformOp::Rotate(_) => TransformOp::Rotate([p(0), p(1), p(2)]),
            TransformOp::SkewX(_) => TransformOp::SkewX(p(0)),
            TransformOp::SkewY(_) => TransformOp::SkewY(p(0)),
            TransformOp::Matrix(_) => TransformOp::Matrix([p(0), p(1), p(2), p(3), p(4), p(5)]),
        }
    }

    pub fn matrix(&self) -> Matrix {
        match *self {
            TransformOp::Translate([tx, ty]) => Matrix::translate(tx, ty),
            TransformOp::Scale([sx, sy]) => Matrix([sx, 0.0, 0.0, sy, 0.0, 0.0]),
            TransformOp::Rotate([angle, cx, cy]) => Matrix::translate(cx, cy)
                .multiply(&Matrix::rotate(angle.to_radians()))
                .multiply(&Matrix::translate(-cx, -cy)),
            TransformOp::SkewX(a) => Matrix([1.0, 0.0, a.to_radians().tan(), 1.0, 0.0, 0.0]),
            TransformOp::SkewY(a) => Matrix([1.0, a.to_radians().tan(), 0.0, 1.0, 0.0, 0.0]),
            TransformOp::Matrix(m) => Matrix(m),
        }
    }
}

/// Ordered transform list; composition is left-to-right (post-multiplication).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformList(pub Vec<TransformOp>);

impl TransformList {
    pub fn single(op: TransformOp) -> Self {
        Self(vec![op])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when both lists hold the same operation kinds in the same order.
    pub fn same_structure(&self, other: &TransformList) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.kind() == b.kind())
    }

    pub fn to_matrix(&self) -> Matrix {
        self.0
            .iter()
            .fold(Matrix::IDENTITY, |acc, op| acc.multiply(&op.matrix()))
    }
}

/// Affine matrix `[a b c d e f]`, mapping (x, y) to (a·x + c·y + e, b·x + d·y + f).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    pub fn rotate(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Matrix([c, s, -s, c, 0.0, 0.0])
    }

    /// `self × other`: `other` is applied first.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + c1 * b2,
            b1 * a2 + d1 * b2,
            a1 * c2 + c1 * d2,
            b1 * c2 + d1 * d2,
            a1 * e2 + c1 * f2 + e1,
            b1 * e2 + d1 * f2 + f1,
        ])
    }

    pub fn apply(&self, p: [f32; 2]) -> [f32; 2] {
        let [a, b, c, d, e, f] = self.0;
        [a * p[0] + c * p[1] + e, b * p[0] + d * p[1] + f]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn params_follow_svg_defaults() {
        assert_eq!(
            TransformOp::from_params(TransformType::Scale, &[2.0]).unwrap(),
            TransformOp::Scale([2.0, 2.0])
        );
        assert_eq!(
            TransformOp::from_params(TransformType::Translate, &[5.0]).unwrap(),
            TransformOp::Translate([5.0, 0.0])
        );
        assert!(TransformOp::from_params(TransformType::Rotate, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn rotate_about_center() {
        let m = TransformOp::Rotate([90.0, 10.0, 10.0]).matrix();
        let p = m.apply([20.0, 10.0]);
        assert_relative_eq!(p[0], 10.0, epsilon = 1e-4);
        assert_relative_eq!(p[1], 20.0, epsilon = 1e-4);
    }

    #[test]
    fn list_composes_left_to_right() {
        let list = TransformList(vec![
            TransformOp::Translate([10.0, 0.0]),
            TransformOp::Scale([2.0, 2.0]),
        ]);
        let p = list.to_matrix().apply([1.0, 1.0]);
        assert_relative_eq!(p[0], 12.0);
        assert_relative_eq!(p[1], 2.0);
    }
}
