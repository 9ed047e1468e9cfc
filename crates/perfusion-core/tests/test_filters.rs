use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};

use perfusion_core::filters::gaussian_blur::make_gaussian_kernel;
use perfusion_core::filters::{apply_mask, gaussian_blur_array, mask_to_image, normalize};

// ---------------------------------------------------------------------------
// Gaussian blur
// ---------------------------------------------------------------------------

#[test]
fn test_kernel_is_normalized_and_symmetric() {
    let kernel = make_gaussian_kernel(1.5);
    assert_eq!(kernel.len(), 2 * 5 + 1);
    assert_abs_diff_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
    for i in 0..kernel.len() / 2 {
        assert_abs_diff_eq!(kernel[i], kernel[kernel.len() - 1 - i], epsilon = 1e-7);
    }
}

#[test]
fn test_blur_preserves_constant() {
    let data = Array2::<f32>::from_elem((16, 16), 0.3);
    let blurred = gaussian_blur_array(&data, 2.0);
    for v in blurred.iter() {
        assert_abs_diff_eq!(*v, 0.3, epsilon = 1e-5);
    }
}

#[test]
fn test_blur_spreads_impulse() {
    let mut data = Array2::<f32>::zeros((21, 21));
    data[[10, 10]] = 1.0;
    let blurred = gaussian_blur_array(&data, 1.0);
    assert!(blurred[[10, 10]] < 1.0);
    assert!(blurred[[10, 11]] > 0.0);
    assert_abs_diff_eq!(blurred[[9, 10]], blurred[[11, 10]], epsilon = 1e-7);
    assert_abs_diff_eq!(blurred.sum(), 1.0, epsilon = 1e-5);
}

#[test]
fn test_zero_sigma_is_identity() {
    let data = array![[0.0f32, 1.0], [0.5, 0.25]];
    assert_eq!(gaussian_blur_array(&data, 0.0), data);
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

#[test]
fn test_normalize_min_max() {
    let data = array![[2.0f32, 4.0], [6.0, 10.0]];
    let out = normalize(&data);
    assert_abs_diff_eq!(out[[0, 0]], 0.0);
    assert_abs_diff_eq!(out[[0, 1]], 0.25);
    assert_abs_diff_eq!(out[[1, 1]], 1.0);
}

#[test]
fn test_normalize_constant_and_non_finite() {
    let constant = Array2::<f32>::from_elem((3, 3), 5.0);
    assert!(normalize(&constant).iter().all(|&v| v == 0.0));

    let data = array![[0.0f32, f32::NAN], [2.0, f32::INFINITY]];
    let out = normalize(&data);
    assert_abs_diff_eq!(out[[1, 0]], 1.0);
    assert_eq!(out[[0, 1]], 0.0);
    assert_eq!(out[[1, 1]], 0.0);
}

#[test]
fn test_apply_mask_and_mask_to_image() {
    let data = array![[0.2f32, 0.4], [0.6, 0.8]];
    let mask = array![[true, false], [false, true]];
    assert_eq!(apply_mask(&data, &mask), array![[0.2f32, 0.0], [0.0, 0.8]]);
    assert_eq!(mask_to_image(&mask), array![[1.0f32, 0.0], [0.0, 1.0]]);
}
