use ndarray::Array2;

use crate::consts::EPSILON;

/// Min-max rescale to [0.0, 1.0].
///
/// A constant image maps to all zeros. Non-finite samples are treated as 0.
pub fn normalize(data: &Array2<f32>) -> Array2<f32> {
    let (min, max) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if !range.is_finite() || range <= EPSILON {
        return Array2::zeros(data.dim());
    }

    data.mapv(|v| {
        if v.is_finite() {
            ((v - min) / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    })
}

/// Zero every pixel outside `mask`.
pub fn apply_mask(data: &Array2<f32>, mask: &Array2<bool>) -> Array2<f32> {
    let mut out = data.clone();
    out.zip_mut_with(mask, |v, &inside| {
        if !inside {
            *v = 0.0;
        }
    });
    out
}

/// Convert a binary mask to a 0/1 float image.
pub fn mask_to_image(mask: &Array2<bool>) -> Array2<f32> {
    mask.mapv(|b| if b { 1.0 } else { 0.0 })
}
