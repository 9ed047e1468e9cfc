use std::fmt;

use serde::{Deserialize, Serialize};

/// Subset of the similarity class the optimizer is allowed to explore.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformFamily {
    /// Translation only.
    Translation,
    /// Rotation + translation.
    Rigid,
    /// Rotation + uniform scale + translation.
    #[default]
    Similarity,
}

impl TransformFamily {
    pub fn parameter_count(self) -> usize {
        match self {
            Self::Translation => 2,
            Self::Rigid => 3,
            Self::Similarity => 4,
        }
    }
}

impl fmt::Display for TransformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translation => write!(f, "Translation"),
            Self::Rigid => write!(f, "Rigid"),
            Self::Similarity => write!(f, "Similarity"),
        }
    }
}

/// 2-D similarity transform between a moving grid and a fixed grid.
///
/// Stored as its pull-back `p_moving = A * p_fixed + o`, with points written as
/// `(col, row)` and `A = [[a, -b], [b, a]]` (rotation times uniform scale).
/// `center` is the fixed-grid point that rotation and scaling parameters are
/// expressed about.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityTransform {
    a: f64,
    b: f64,
    offset_col: f64,
    offset_row: f64,
    center_row: f64,
    center_col: f64,
}

impl SimilarityTransform {
    /// Identity about the center of a `(height, width)` grid.
    pub fn identity(dim: (usize, usize)) -> Self {
        let (center_row, center_col) = grid_center(dim);
        Self {
            a: 1.0,
            b: 0.0,
            offset_col: 0.0,
            offset_row: 0.0,
            center_row,
            center_col,
        }
    }

    /// Build from the forward (moving -> fixed) mapping
    /// `p_fixed = scale * R(rotation) * (p_moving - center) + center + (dx, dy)`.
    pub fn from_forward(scale: f64, rotation: f64, dx: f64, dy: f64, dim: (usize, usize)) -> Self {
        let (center_row, center_col) = grid_center(dim);
        let (sin, cos) = (-rotation).sin_cos();
        let a = cos / scale;
        let b = sin / scale;
        // Pull-back: p_moving = A * (p_fixed - center - d) + center.
        let (rc, rr) = rotate(a, b, center_col + dx, center_row + dy);
        Self {
            a,
            b,
            offset_col: center_col - rc,
            offset_row: center_row - rr,
            center_row,
            center_col,
        }
    }

    /// Map a fixed-grid point `(row, col)` to the moving grid.
    pub fn pull_point(&self, row: f64, col: f64) -> (f64, f64) {
        let (c, r) = rotate(self.a, self.b, col, row);
        (r + self.offset_row, c + self.offset_col)
    }

    /// Map a moving-grid point `(row, col)` to the fixed grid.
    pub fn map_point(&self, row: f64, col: f64) -> (f64, f64) {
        self.inverse().pull_point(row, col)
    }

    /// The transform mapping the fixed grid back onto the moving grid.
    pub fn inverse(&self) -> Self {
        let n = self.a * self.a + self.b * self.b;
        let (ia, ib) = (self.a / n, -self.b / n);
        let (c, r) = rotate(ia, ib, self.offset_col, self.offset_row);
        Self {
            a: ia,
            b: ib,
            offset_col: -c,
            offset_row: -r,
            ..*self
        }
    }

    /// `self` followed by `next` on the fixed side: the result pulls through
    /// `next` first, then through `self`.
    pub fn then(&self, next: &Self) -> Self {
        let a = self.a * next.a - self.b * next.b;
        let b = self.a * next.b + self.b * next.a;
        let (c, r) = rotate(self.a, self.b, next.offset_col, next.offset_row);
        Self {
            a,
            b,
            offset_col: c + self.offset_col,
            offset_row: r + self.offset_row,
            center_row: next.center_row,
            center_col: next.center_col,
        }
    }

    /// Uniform scale of the forward (moving -> fixed) mapping.
    pub fn scale(&self) -> f64 {
        1.0 / self.a.hypot(self.b)
    }

    /// Rotation of the forward mapping, radians.
    pub fn rotation(&self) -> f64 {
        -self.b.atan2(self.a)
    }

    /// Forward translation `(dx, dy)` of the center point.
    pub fn translation(&self) -> (f64, f64) {
        let (row, col) = self.map_point(self.center_row, self.center_col);
        (col - self.center_col, row - self.center_row)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_row, self.center_col)
    }

    pub fn is_identity(&self, tol: f64) -> bool {
        (self.a - 1.0).abs() <= tol
            && self.b.abs() <= tol
            && self.offset_col.abs() <= tol
            && self.offset_row.abs() <= tol
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite()
            && self.b.is_finite()
            && self.offset_col.is_finite()
            && self.offset_row.is_finite()
    }

    /// Optimizer parameters for `family`. Rotation/scale components are
    /// multiplied by `radius` so a unit step moves pixels about as far as a
    /// unit translation step.
    pub(crate) fn to_params(&self, family: TransformFamily, radius: f64) -> Vec<f64> {
        // Translation about the center: o = c - A c + t.
        let (ac, ar) = rotate(self.a, self.b, self.center_col, self.center_row);
        let tx = self.offset_col - self.center_col + ac;
        let ty = self.offset_row - self.center_row + ar;
        match family {
            TransformFamily::Translation => vec![tx, ty],
            TransformFamily::Rigid => vec![self.b.atan2(self.a) * radius, tx, ty],
            TransformFamily::Similarity => vec![self.a * radius, self.b * radius, tx, ty],
        }
    }

    pub(crate) fn from_params(
        family: TransformFamily,
        params: &[f64],
        radius: f64,
        center: (f64, f64),
    ) -> Self {
        let (a, b, tx, ty) = match family {
            TransformFamily::Translation => (1.0, 0.0, params[0], params[1]),
            TransformFamily::Rigid => {
                let (sin, cos) = (params[0] / radius).sin_cos();
                (cos, sin, params[1], params[2])
            }
            TransformFamily::Similarity => {
                (params[0] / radius, params[1] / radius, params[2], params[3])
            }
        };
        let (center_row, center_col) = center;
        let (ac, ar) = rotate(a, b, center_col, center_row);
        Self {
            a,
            b,
            offset_col: center_col - ac + tx,
            offset_row: center_row - ar + ty,
            center_row,
            center_col,
        }
    }

    /// Derivatives of the pulled point `(col, row)` with respect to each
    /// parameter, at fixed-grid offset `(dcol, drow)` from the center.
    pub(crate) fn param_jacobian(
        &self,
        family: TransformFamily,
        radius: f64,
        dcol: f64,
        drow: f64,
        out: &mut [(f64, f64)],
    ) {
        match family {
            TransformFamily::Translation => {
                out[0] = (1.0, 0.0);
                out[1] = (0.0, 1.0);
            }
            TransformFamily::Rigid => {
                out[0] = (
                    (-self.b * dcol - self.a * drow) / radius,
                    (self.a * dcol - self.b * drow) / radius,
                );
                out[1] = (1.0, 0.0);
                out[2] = (0.0, 1.0);
            }
            TransformFamily::Similarity => {
                out[0] = (dcol / radius, drow / radius);
                out[1] = (-drow / radius, dcol / radius);
                out[2] = (1.0, 0.0);
                out[3] = (0.0, 1.0);
            }
        }
    }
}

impl fmt::Display for SimilarityTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (dx, dy) = self.translation();
        write!(
            f,
            "scale={:.4} rotation={:.3}deg dx={:.2} dy={:.2}",
            self.scale(),
            self.rotation().to_degrees(),
            dx,
            dy
        )
    }
}

/// Center of a `(height, width)` grid in pixel-center coordinates `(row, col)`.
pub fn grid_center((h, w): (usize, usize)) -> (f64, f64) {
    ((h as f64 - 1.0) / 2.0, (w as f64 - 1.0) / 2.0)
}

/// Multiply `(col, row)` by `A = [[a, -b], [b, a]]`.
fn rotate(a: f64, b: f64, col: f64, row: f64) -> (f64, f64) {
    (a * col - b * row, b * col + a * row)
}
