use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::frame::Mask;

use super::transform::SimilarityTransform;

/// Bilinear sample at `(y, x)`. Neighbours outside the grid contribute 0.
pub fn bilinear_sample(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |r: i64, c: i64| -> f32 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    let v00 = sample(y0, x0);
    if fx == 0.0 && fy == 0.0 {
        return v00;
    }
    let v10 = sample(y0, x1);
    let v01 = sample(y1, x0);
    let v11 = sample(y1, x1);

    v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy
}

/// True when `(y, x)` lies within the sampled extent of a `(h, w)` grid.
pub fn in_bounds((h, w): (usize, usize), y: f64, x: f64) -> bool {
    y >= 0.0 && x >= 0.0 && y <= (h as f64 - 1.0) && x <= (w as f64 - 1.0)
}

/// Resample a moving image onto a fixed grid of shape `out_dim`. Fixed pixels
/// whose pre-image falls outside the moving image get 0.
pub fn warp(
    moving: &Array2<f32>,
    transform: &SimilarityTransform,
    out_dim: (usize, usize),
) -> Array2<f32> {
    let (h, w) = out_dim;
    let sample = |row: usize, col: usize| -> f32 {
        let (y, x) = transform.pull_point(row as f64, col as f64);
        if in_bounds(moving.dim(), y, x) {
            bilinear_sample(moving, y, x)
        } else {
            0.0
        }
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| (0..w).map(|col| sample(row, col)).collect())
            .collect();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((h, w), flat).unwrap_or_else(|_| Array2::zeros((h, w)))
    } else {
        Array2::from_shape_fn((h, w), |(row, col)| sample(row, col))
    }
}

/// Resample a binary reference. Interpolated coverage of at least one half
/// counts as inside.
pub fn warp_mask(
    moving: &Mask,
    transform: &SimilarityTransform,
    out_dim: (usize, usize),
) -> Mask {
    let as_image = moving.mapv(|b| if b { 1.0f32 } else { 0.0 });
    warp(&as_image, transform, out_dim).mapv(|v| v >= 0.5)
}
