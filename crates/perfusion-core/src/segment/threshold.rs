use ndarray::Array2;

use crate::consts::OTSU_HISTOGRAM_BINS;

/// Otsu's threshold on an image already normalized to [0, 1]: the histogram
/// split that maximizes between-class variance.
pub fn otsu_threshold(data: &Array2<f32>) -> f32 {
    let bins = OTSU_HISTOGRAM_BINS;
    let mut histogram = vec![0u64; bins];

    for &v in data.iter() {
        let bin = ((v.clamp(0.0, 1.0) * (bins - 1) as f32).round() as usize).min(bins - 1);
        histogram[bin] += 1;
    }

    let total = data.len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut weight_bg = 0.0f64;
    let mut sum_bg = 0.0f64;
    let mut best_variance = 0.0f64;
    let mut best_bin = 0usize;

    for (i, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += i as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);

        if between > best_variance {
            best_variance = between;
            best_bin = i;
        }
    }

    (best_bin as f32 + 0.5) / (bins - 1) as f32
}

/// Binarize: true where the sample lies strictly above `threshold`.
pub fn binarize(data: &Array2<f32>, threshold: f32) -> Array2<bool> {
    data.mapv(|v| v > threshold)
}
