//! Two-phase Chan-Vese active contour ("active contours without edges") on a
//! narrow-band signed distance level set. `phi <= 0` is inside.

use ndarray::Array2;
use tracing::debug;

use crate::consts::{CHAN_VESE_CFL, SUSSMAN_DT};
use crate::error::{PerfusionError, Result};

use super::distance::distance_to;

/// Consecutive unchanged iterations after which evolution stops early.
const STABLE_ITERATIONS: usize = 5;

/// Outcome of a contour evolution.
#[derive(Clone, Debug)]
pub struct ContourEvolution {
    pub mask: Array2<bool>,
    pub phi: Array2<f64>,
    pub iterations: usize,
}

/// Evolve `init` over `image` (normalized to [0, 1]) for at most
/// `max_iterations` steps.
pub fn evolve(
    image: &Array2<f32>,
    init: &Array2<bool>,
    max_iterations: usize,
    smooth_factor: f64,
    narrow_band: f64,
) -> Result<ContourEvolution> {
    if image.dim() != init.dim() {
        return Err(PerfusionError::InvalidArgument(format!(
            "initial contour shape {:?} does not match image shape {:?}",
            init.dim(),
            image.dim()
        )));
    }
    if !init.iter().any(|&b| b) {
        return Err(PerfusionError::Segmentation("initial contour is empty".into()));
    }

    let img = image.mapv(f64::from);
    let mut phi = mask_to_phi(init);
    let mut prev_mask = init.clone();
    let mut stable = 0usize;
    let mut iterations = 0usize;

    while iterations < max_iterations {
        let band: Vec<(usize, usize)> = phi
            .indexed_iter()
            .filter(|(_, &v)| v.abs() <= narrow_band)
            .map(|(idx, _)| idx)
            .collect();
        if band.is_empty() {
            break;
        }

        let (inside_mean, outside_mean) = region_means(&img, &phi);

        let force: Vec<f64> = band
            .iter()
            .map(|&idx| {
                let v = img[idx];
                (v - inside_mean).powi(2) - (v - outside_mean).powi(2)
            })
            .collect();
        let max_force = force.iter().fold(0.0f64, |acc, f| acc.max(f.abs()));
        let max_force = if max_force > 0.0 { max_force } else { 1.0 };

        let dphidt: Vec<f64> = band
            .iter()
            .zip(&force)
            .map(|(&idx, f)| f / max_force + smooth_factor * curvature(&phi, idx))
            .collect();

        let max_speed = dphidt.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));
        let dt = CHAN_VESE_CFL / (max_speed + f64::EPSILON);
        for (&idx, d) in band.iter().zip(&dphidt) {
            phi[idx] += dt * d;
        }

        phi = reinitialize(&phi, SUSSMAN_DT);
        if phi.iter().any(|v| !v.is_finite()) {
            return Err(PerfusionError::Segmentation(format!(
                "level set diverged at iteration {iterations}"
            )));
        }

        iterations += 1;
        let mask = phi.mapv(|v| v <= 0.0);
        if mask == prev_mask {
            stable += 1;
            if stable >= STABLE_ITERATIONS {
                break;
            }
        } else {
            stable = 0;
            prev_mask = mask;
        }
    }

    debug!(iterations, "contour evolution finished");

    let mask = phi.mapv(|v| v <= 0.0);
    Ok(ContourEvolution {
        mask,
        phi,
        iterations,
    })
}

/// Signed distance function of a mask: negative inside, positive outside,
/// with the zero level half a pixel outside the boundary pixels.
pub fn mask_to_phi(mask: &Array2<bool>) -> Array2<f64> {
    let inverse = mask.mapv(|b| !b);
    let dist_in = distance_to(mask);
    let dist_out = distance_to(&inverse);

    let mut phi = Array2::<f64>::zeros(mask.dim());
    ndarray::Zip::from(&mut phi)
        .and(mask)
        .and(&dist_in)
        .and(&dist_out)
        .for_each(|p, &m, &di, &d_o| {
            *p = di - d_o + if m { 1.0 } else { 0.0 } - 0.5;
        });
    phi
}

fn region_means(img: &Array2<f64>, phi: &Array2<f64>) -> (f64, f64) {
    let (mut sum_in, mut n_in, mut sum_out, mut n_out) = (0.0, 0usize, 0.0, 0usize);
    ndarray::Zip::from(img).and(phi).for_each(|&v, &p| {
        if p <= 0.0 {
            sum_in += v;
            n_in += 1;
        } else {
            sum_out += v;
            n_out += 1;
        }
    });
    (
        sum_in / (n_in as f64 + f64::EPSILON),
        sum_out / (n_out as f64 + f64::EPSILON),
    )
}

/// Mean curvature of the level set at one pixel, scaled by |grad phi|.
fn curvature(phi: &Array2<f64>, (row, col): (usize, usize)) -> f64 {
    let (h, w) = phi.dim();
    let up = row.saturating_sub(1);
    let down = (row + 1).min(h - 1);
    let left = col.saturating_sub(1);
    let right = (col + 1).min(w - 1);

    let c = phi[[row, col]];
    let phi_x = phi[[row, right]] - phi[[row, left]];
    let phi_y = phi[[down, col]] - phi[[up, col]];
    let phi_xx = phi[[row, left]] - 2.0 * c + phi[[row, right]];
    let phi_yy = phi[[up, col]] - 2.0 * c + phi[[down, col]];
    let phi_xy = 0.25
        * (phi[[down, right]] - phi[[down, left]] - phi[[up, right]] + phi[[up, left]]);

    let phi_x2 = phi_x * phi_x;
    let phi_y2 = phi_y * phi_y;
    let norm2 = phi_x2 + phi_y2;

    (phi_x2 * phi_yy + phi_y2 * phi_xx - 2.0 * phi_x * phi_y * phi_xy)
        / (norm2 + f64::EPSILON).powf(1.5)
        * norm2.sqrt()
}

/// One Sussman reinitialization step, pulling `phi` back towards a signed
/// distance function without moving its zero level.
fn reinitialize(phi: &Array2<f64>, dt: f64) -> Array2<f64> {
    let (h, w) = phi.dim();
    let mut out = phi.clone();

    for row in 0..h {
        for col in 0..w {
            let d = phi[[row, col]];
            if d == 0.0 {
                continue;
            }
            let left = phi[[row, col.saturating_sub(1)]];
            let right = phi[[row, (col + 1).min(w - 1)]];
            let up = phi[[row.saturating_sub(1), col]];
            let down = phi[[(row + 1).min(h - 1), col]];

            // Backward/forward differences along columns (a, b) and rows (c, d).
            let a = d - left;
            let b = right - d;
            let c = d - up;
            let e = down - d;

            let grad = if d > 0.0 {
                let ap = a.max(0.0).powi(2);
                let bn = b.min(0.0).powi(2);
                let cp = c.max(0.0).powi(2);
                let en = e.min(0.0).powi(2);
                (ap.max(bn) + cp.max(en)).sqrt() - 1.0
            } else {
                let an = a.min(0.0).powi(2);
                let bp = b.max(0.0).powi(2);
                let cn = c.min(0.0).powi(2);
                let ep = e.max(0.0).powi(2);
                (an.max(bp) + cn.max(ep)).sqrt() - 1.0
            };

            let sign = d / (d * d + 1.0).sqrt();
            out[[row, col]] = d - dt * sign * grad;
        }
    }

    out
}
