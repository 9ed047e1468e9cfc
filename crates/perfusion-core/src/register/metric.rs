use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::edges::gradients;
use crate::frame::Mask;

use super::resample::{bilinear_sample, in_bounds};
use super::transform::{SimilarityTransform, TransformFamily};

/// Value and parameter gradient of the metric at one parameter vector.
#[derive(Clone, Debug)]
pub(crate) struct Evaluation {
    pub value: f64,
    pub gradient: Vec<f64>,
    /// Fixed pixels whose pre-image landed inside the moving reference.
    pub overlap: usize,
}

/// Mean squared difference between a fixed reference and a moving reference
/// pulled onto the fixed grid, restricted to the overlap.
pub(crate) struct MeanSquares<'a> {
    fixed: &'a Array2<f32>,
    moving: &'a Array2<f32>,
    grad_x: Array2<f32>,
    grad_y: Array2<f32>,
    family: TransformFamily,
    radius: f64,
    center: (f64, f64),
    min_overlap: usize,
}

#[derive(Clone)]
struct Accum {
    sum: f64,
    gradient: Vec<f64>,
    count: usize,
}

impl Accum {
    fn new(n: usize) -> Self {
        Self {
            sum: 0.0,
            gradient: vec![0.0; n],
            count: 0,
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.sum += other.sum;
        self.count += other.count;
        for (g, o) in self.gradient.iter_mut().zip(&other.gradient) {
            *g += o;
        }
        self
    }
}

impl<'a> MeanSquares<'a> {
    pub fn new(
        fixed: &'a Array2<f32>,
        moving: &'a Array2<f32>,
        family: TransformFamily,
        radius: f64,
        center: (f64, f64),
        min_overlap: usize,
    ) -> Self {
        let (grad_x, grad_y) = gradients(moving);
        Self {
            fixed,
            moving,
            grad_x,
            grad_y,
            family,
            radius,
            center,
            min_overlap,
        }
    }

    pub fn transform(&self, params: &[f64]) -> SimilarityTransform {
        SimilarityTransform::from_params(self.family, params, self.radius, self.center)
    }

    /// `None` when the overlap is below the minimum or the value is not finite.
    pub fn evaluate(&self, params: &[f64]) -> Option<Evaluation> {
        let transform = self.transform(params);
        if !transform.is_finite() {
            return None;
        }
        let n = self.family.parameter_count();
        let (h, w) = self.fixed.dim();

        let row_terms = |row: usize| -> Accum {
            let mut acc = Accum::new(n);
            let mut jac = [(0.0f64, 0.0f64); 4];
            for col in 0..w {
                let (y, x) = transform.pull_point(row as f64, col as f64);
                if !in_bounds(self.moving.dim(), y, x) {
                    continue;
                }
                let residual =
                    f64::from(bilinear_sample(self.moving, y, x)) - f64::from(self.fixed[[row, col]]);
                let gx = f64::from(bilinear_sample(&self.grad_x, y, x));
                let gy = f64::from(bilinear_sample(&self.grad_y, y, x));

                transform.param_jacobian(
                    self.family,
                    self.radius,
                    col as f64 - self.center.1,
                    row as f64 - self.center.0,
                    &mut jac[..n],
                );
                for (g, (jc, jr)) in acc.gradient.iter_mut().zip(&jac[..n]) {
                    *g += 2.0 * residual * (gx * jc + gy * jr);
                }
                acc.sum += residual * residual;
                acc.count += 1;
            }
            acc
        };

        let total = if h * w >= PARALLEL_PIXEL_THRESHOLD {
            (0..h)
                .into_par_iter()
                .map(row_terms)
                .reduce(|| Accum::new(n), Accum::merge)
        } else {
            (0..h).map(row_terms).fold(Accum::new(n), Accum::merge)
        };

        if total.count < self.min_overlap.max(1) {
            return None;
        }
        let norm = total.count as f64;
        let value = total.sum / norm;
        let gradient: Vec<f64> = total.gradient.iter().map(|g| g / norm).collect();
        if !value.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
            return None;
        }
        Some(Evaluation {
            value,
            gradient,
            overlap: total.count,
        })
    }
}

/// Dice overlap `2|A and B| / (|A| + |B|)`. Two empty masks score 1.
pub fn dice(a: &Mask, b: &Mask) -> f64 {
    if a.dim() != b.dim() {
        return 0.0;
    }
    let mut both = 0usize;
    let mut total = 0usize;
    ndarray::Zip::from(a).and(b).for_each(|&x, &y| {
        if x && y {
            both += 1;
        }
        total += usize::from(x) + usize::from(y);
    });
    if total == 0 {
        1.0
    } else {
        2.0 * both as f64 / total as f64
    }
}

/// Intensity-weighted centroid `(row, col)`, or `None` for an all-zero image.
pub(crate) fn weighted_centroid(data: &Array2<f32>) -> Option<(f64, f64)> {
    let (mut sum, mut sr, mut sc) = (0.0f64, 0.0f64, 0.0f64);
    for ((row, col), &v) in data.indexed_iter() {
        let v = f64::from(v);
        if v > 0.0 {
            sum += v;
            sr += v * row as f64;
            sc += v * col as f64;
        }
    }
    if sum > 0.0 {
        Some((sr / sum, sc / sum))
    } else {
        None
    }
}
