use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Cols,
}

/// Apply Gaussian blur to an image using separable 1D convolution with
/// clamped borders. A non-positive sigma returns the input unchanged.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 || data.is_empty() {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve(data, &kernel, Axis::Rows);
    convolve(&row_pass, &kernel, Axis::Cols)
}

/// Normalized 1D Gaussian kernel truncated at 3 sigma.
pub fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil().max(1.0) as usize;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..2 * radius + 1)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

fn convolve(data: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;

    let sample = |row: usize, col: usize| -> f32 {
        kernel
            .iter()
            .enumerate()
            .map(|(ki, &kv)| {
                let offset = ki as isize - radius;
                let v = match axis {
                    Axis::Rows => {
                        let c = (col as isize + offset).clamp(0, w as isize - 1) as usize;
                        data[[row, c]]
                    }
                    Axis::Cols => {
                        let r = (row as isize + offset).clamp(0, h as isize - 1) as usize;
                        data[[r, col]]
                    }
                };
                v * kv
            })
            .sum()
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
