use ndarray::Array2;

use crate::consts::EPSILON;
use crate::filters::gaussian_blur_array;

pub(super) fn canny(image: &Array2<f32>, sigma: f32, low: f32, high: f32) -> Array2<bool> {
    let (h, w) = image.dim();
    let smoothed = gaussian_blur_array(image, sigma);
    let (gx, gy) = gradients(&smoothed);

    let mut magnitude = Array2::<f32>::zeros((h, w));
    ndarray::Zip::from(&mut magnitude)
        .and(&gx)
        .and(&gy)
        .for_each(|m, &x, &y| *m = (x * x + y * y).sqrt());

    let max = magnitude.iter().cloned().fold(0.0f32, f32::max);
    if max <= EPSILON {
        return Array2::from_elem((h, w), false);
    }
    magnitude.mapv_inplace(|m| m / max);

    let thin = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&magnitude, &thin, low, high)
}

/// Central-difference gradients `(d/dcol, d/drow)` with one-sided differences
/// at the borders.
pub fn gradients(data: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = data.dim();
    let mut gx = Array2::<f32>::zeros((h, w));
    let mut gy = Array2::<f32>::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            if w > 1 {
                let (l, r) = (col.saturating_sub(1), (col + 1).min(w - 1));
                gx[[row, col]] = (data[[row, r]] - data[[row, l]]) / (r - l) as f32;
            }
            if h > 1 {
                let (u, d) = (row.saturating_sub(1), (row + 1).min(h - 1));
                gy[[row, col]] = (data[[d, col]] - data[[u, col]]) / (d - u) as f32;
            }
        }
    }

    (gx, gy)
}

/// Keep pixels that are local maxima along the quantized gradient direction.
/// Border pixels are never edges.
fn non_maximum_suppression(
    magnitude: &Array2<f32>,
    gx: &Array2<f32>,
    gy: &Array2<f32>,
) -> Array2<bool> {
    let (h, w) = magnitude.dim();
    let mut keep = Array2::from_elem((h, w), false);
    if h < 3 || w < 3 {
        return keep;
    }

    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let m = magnitude[[row, col]];
            if m <= 0.0 {
                continue;
            }
            let mut angle = gy[[row, col]].atan2(gx[[row, col]]).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }
            // (drow, dcol) of the neighbour in the gradient direction.
            let (dr, dc): (isize, isize) = if !(22.5..157.5).contains(&angle) {
                (0, 1)
            } else if angle < 67.5 {
                (1, 1)
            } else if angle < 112.5 {
                (1, 0)
            } else {
                (1, -1)
            };
            let ahead = magnitude[[(row as isize + dr) as usize, (col as isize + dc) as usize]];
            let behind = magnitude[[(row as isize - dr) as usize, (col as isize - dc) as usize]];
            keep[[row, col]] = m >= ahead && m > behind;
        }
    }

    keep
}

/// Strong pixels (> high) seed an 8-connected flood over weak pixels (> low).
fn hysteresis(magnitude: &Array2<f32>, thin: &Array2<bool>, low: f32, high: f32) -> Array2<bool> {
    let (h, w) = magnitude.dim();
    let mut edges = Array2::from_elem((h, w), false);
    let mut stack = Vec::new();

    for row in 0..h {
        for col in 0..w {
            if thin[[row, col]] && magnitude[[row, col]] > high && !edges[[row, col]] {
                edges[[row, col]] = true;
                stack.push((row, col));

                while let Some((r, c)) = stack.pop() {
                    for nr in r.saturating_sub(1)..=(r + 1).min(h - 1) {
                        for nc in c.saturating_sub(1)..=(c + 1).min(w - 1) {
                            if !edges[[nr, nc]] && thin[[nr, nc]] && magnitude[[nr, nc]] > low {
                                edges[[nr, nc]] = true;
                                stack.push((nr, nc));
                            }
                        }
                    }
                }
            }
        }
    }

    edges
}
