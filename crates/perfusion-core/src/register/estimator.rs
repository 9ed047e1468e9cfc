use tracing::debug;

use crate::consts::{MAX_SCALE, MIN_OVERLAP_FRACTION};
use crate::error::{PerfusionError, Result};
use crate::filters::{gaussian_blur_array, mask_to_image};
use crate::frame::{Image, Mask};

use super::config::RegistrationConfig;
use super::metric::{weighted_centroid, Evaluation, MeanSquares};
use super::optimizer::{minimize, StepSettings, StopReason};
use super::resample::{warp, warp_mask};
use super::transform::{grid_center, SimilarityTransform, TransformFamily};

/// A moving image and its reference resampled onto the fixed grid.
#[derive(Clone, Debug)]
pub struct Registered {
    pub image: Image,
    pub reference: Mask,
    pub transform: SimilarityTransform,
    /// Mean squared reference difference at `transform`.
    pub metric: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

/// Estimate a transform aligning `moving_reference` to `fixed_reference`, then
/// apply it to both `moving_image` and `moving_reference`.
///
/// Outputs have the fixed image's dimensions. Optimizer settings other than
/// the iteration budget come from `config`.
pub fn estimate_and_apply(
    moving_image: &Image,
    fixed_image: &Image,
    moving_reference: &Mask,
    fixed_reference: &Mask,
    max_iterations: usize,
    family: TransformFamily,
    config: &RegistrationConfig,
) -> Result<Registered> {
    if max_iterations == 0 {
        return Err(PerfusionError::InvalidArgument(
            "max_iterations must be greater than 0".into(),
        ));
    }
    config.validate()?;
    if moving_reference.dim() != moving_image.dim() {
        return Err(PerfusionError::InvalidArgument(format!(
            "moving reference shape {:?} does not match moving image shape {:?}",
            moving_reference.dim(),
            moving_image.dim()
        )));
    }
    if fixed_reference.dim() != fixed_image.dim() {
        return Err(PerfusionError::InvalidArgument(format!(
            "fixed reference shape {:?} does not match fixed image shape {:?}",
            fixed_reference.dim(),
            fixed_image.dim()
        )));
    }
    if moving_image.is_empty() || fixed_image.is_empty() {
        return Err(PerfusionError::InvalidArgument(
            "registration of an empty image".into(),
        ));
    }
    if !moving_reference.iter().any(|&b| b) {
        return Err(PerfusionError::registration("moving reference is empty"));
    }
    if !fixed_reference.iter().any(|&b| b) {
        return Err(PerfusionError::registration("fixed reference is empty"));
    }

    let fixed_dim = fixed_image.dim();
    let sigma = config.reference_blur_sigma;
    let fixed_ref = gaussian_blur_array(&mask_to_image(fixed_reference), sigma);
    let moving_ref = gaussian_blur_array(&mask_to_image(moving_reference), sigma);

    let (fh, fw) = fixed_dim;
    let radius = ((fh as f64).hypot(fw as f64) / 2.0).max(1.0);
    let center = grid_center(fixed_dim);
    let min_overlap = (MIN_OVERLAP_FRACTION * (fh * fw) as f64).ceil() as usize;
    let metric = MeanSquares::new(&fixed_ref, &moving_ref, family, radius, center, min_overlap);

    let (start, initial) = initial_estimate(&metric, &fixed_ref, &moving_ref, family, radius, fixed_dim)
        .ok_or_else(|| {
            PerfusionError::registration(format!(
                "references overlap on fewer than {min_overlap} pixels"
            ))
        })?;

    let settings = StepSettings {
        max_iterations,
        max_step: config.max_step,
        min_step: config.min_step,
        relaxation: config.relaxation,
        gradient_tolerance: config.gradient_tolerance,
    };
    let outcome = minimize(start, initial, &settings, |p| metric.evaluate(p));

    let transform = metric.transform(&outcome.params);
    if !transform.is_finite() || !outcome.value.is_finite() {
        return Err(PerfusionError::registration(
            "optimizer produced non-finite parameters",
        ));
    }
    let scale = transform.scale();
    if !(1.0 / MAX_SCALE..=MAX_SCALE).contains(&scale) {
        return Err(PerfusionError::registration(format!(
            "degenerate scale {scale:.4}"
        )));
    }

    debug!(
        %family,
        %transform,
        metric = outcome.value,
        iterations = outcome.iterations,
        reason = %outcome.stop_reason,
        "transform estimated"
    );

    Ok(Registered {
        image: warp(moving_image, &transform, fixed_dim),
        reference: warp_mask(moving_reference, &transform, fixed_dim),
        transform,
        metric: outcome.value,
        iterations: outcome.iterations,
        stop_reason: outcome.stop_reason,
    })
}

/// Best of the identity and a centroid-matching translation. The identity
/// wins ties.
fn initial_estimate(
    metric: &MeanSquares<'_>,
    fixed_ref: &Image,
    moving_ref: &Image,
    family: TransformFamily,
    radius: f64,
    fixed_dim: (usize, usize),
) -> Option<(Vec<f64>, Evaluation)> {
    let identity = SimilarityTransform::identity(fixed_dim).to_params(family, radius);
    let mut best = metric.evaluate(&identity).map(|e| (identity.clone(), e));

    if let (Some((fr, fc)), Some((mr, mc))) =
        (weighted_centroid(fixed_ref), weighted_centroid(moving_ref))
    {
        let mut shifted = identity;
        let n = shifted.len();
        shifted[n - 2] = mc - fc;
        shifted[n - 1] = mr - fr;
        if let Some(eval) = metric.evaluate(&shifted) {
            let better = best
                .as_ref()
                .map_or(true, |(_, current)| eval.value < current.value);
            if better {
                best = Some((shifted, eval));
            }
        }
    }

    if let Some((_, eval)) = &best {
        debug!(value = eval.value, overlap = eval.overlap, "initial estimate");
    }
    best
}
