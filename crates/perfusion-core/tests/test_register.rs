mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use common::{disk_image, disk_mask, perfusion_image, perfusion_mask, SIZE};
use perfusion_core::edges::detect_edges;
use perfusion_core::error::{PerfusionError, RegistrationStage};
use perfusion_core::register::{
    bilinear_sample, dice, estimate_and_apply, register_pair, warp, warp_mask,
    RegistrationConfig, SimilarityTransform, TransformFamily,
};

// ---------------------------------------------------------------------------
// SimilarityTransform
// ---------------------------------------------------------------------------

#[test]
fn test_forward_parameters_roundtrip() {
    let t = SimilarityTransform::from_forward(1.2, 0.3, 4.0, -2.0, (64, 64));
    assert_abs_diff_eq!(t.scale(), 1.2, epsilon = 1e-12);
    assert_abs_diff_eq!(t.rotation(), 0.3, epsilon = 1e-12);
    let (dx, dy) = t.translation();
    assert_abs_diff_eq!(dx, 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(dy, -2.0, epsilon = 1e-9);
}

#[test]
fn test_map_and_pull_are_inverse() {
    let t = SimilarityTransform::from_forward(0.9, -0.2, 1.5, 3.0, (50, 70));
    let (r, c) = t.map_point(12.0, 40.0);
    let (r2, c2) = t.pull_point(r, c);
    assert_abs_diff_eq!(r2, 12.0, epsilon = 1e-9);
    assert_abs_diff_eq!(c2, 40.0, epsilon = 1e-9);

    let inv = t.inverse();
    let (r3, c3) = inv.map_point(r, c);
    assert_abs_diff_eq!(r3, 12.0, epsilon = 1e-9);
    assert_abs_diff_eq!(c3, 40.0, epsilon = 1e-9);
}

#[test]
fn test_center_maps_by_translation_only() {
    let dim = (64, 64);
    let t = SimilarityTransform::from_forward(1.1, 0.4, -3.0, 2.0, dim);
    let (cr, cc) = t.center();
    let (r, c) = t.map_point(cr, cc);
    assert_abs_diff_eq!(r, cr + 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(c, cc - 3.0, epsilon = 1e-9);
}

#[test]
fn test_composition() {
    let dim = (64, 64);
    let a = SimilarityTransform::from_forward(1.0, 0.0, 2.0, 1.0, dim);
    let b = SimilarityTransform::from_forward(1.0, 0.0, -0.5, 3.0, dim);
    let total = a.then(&b);
    let (dx, dy) = total.translation();
    assert_abs_diff_eq!(dx, 1.5, epsilon = 1e-9);
    assert_abs_diff_eq!(dy, 4.0, epsilon = 1e-9);

    assert!(a.then(&a.inverse()).is_identity(1e-9));
}

#[test]
fn test_identity() {
    let t = SimilarityTransform::identity((32, 48));
    assert!(t.is_identity(0.0));
    assert_eq!(t.pull_point(5.0, 7.0), (5.0, 7.0));
    assert_abs_diff_eq!(t.scale(), 1.0);
    assert_abs_diff_eq!(t.rotation(), 0.0);
}

#[test]
fn test_family_parameter_counts() {
    assert_eq!(TransformFamily::Translation.parameter_count(), 2);
    assert_eq!(TransformFamily::Rigid.parameter_count(), 3);
    assert_eq!(TransformFamily::Similarity.parameter_count(), 4);
    assert_eq!(TransformFamily::default(), TransformFamily::Similarity);
}

// ---------------------------------------------------------------------------
// Resampling
// ---------------------------------------------------------------------------

#[test]
fn test_bilinear_interpolation() {
    let mut data = Array2::<f32>::zeros((4, 4));
    data[[1, 1]] = 1.0;

    assert!((bilinear_sample(&data, 1.0, 1.0) - 1.0).abs() < 1e-6);
    assert!((bilinear_sample(&data, 1.0, 1.5) - 0.5).abs() < 1e-6);
    assert_eq!(bilinear_sample(&data, -5.0, 1.0), 0.0);
}

#[test]
fn test_identity_warp_is_exact() {
    let img = perfusion_image(1);
    let out = warp(&img, &SimilarityTransform::identity(img.dim()), img.dim());
    assert_eq!(out, img);
}

#[test]
fn test_warp_translation_moves_content() {
    let mut img = Array2::<f32>::zeros((20, 20));
    img[[10, 10]] = 1.0;
    let t = SimilarityTransform::from_forward(1.0, 0.0, 3.0, 2.0, img.dim());
    let out = warp(&img, &t, img.dim());
    assert!((out[[12, 13]] - 1.0).abs() < 1e-6);
    assert_eq!(out[[10, 10]], 0.0);
}

#[test]
fn test_warp_output_has_fixed_dimensions_and_zero_fill() {
    let img = Array2::<f32>::from_elem((10, 10), 1.0);
    let out = warp(&img, &SimilarityTransform::identity((16, 12)), (16, 12));
    assert_eq!(out.dim(), (16, 12));
    assert_eq!(out[[15, 11]], 0.0);
    assert_eq!(out[[2, 2]], 1.0);
}

#[test]
fn test_warp_mask_threshold() {
    let mask = disk_mask((32, 32), (15.5, 15.5), 8.0);
    let out = warp_mask(&mask, &SimilarityTransform::identity(mask.dim()), mask.dim());
    assert_eq!(out, mask);
}

// ---------------------------------------------------------------------------
// Dice
// ---------------------------------------------------------------------------

#[test]
fn test_dice() {
    let a = disk_mask((32, 32), (10.0, 10.0), 5.0);
    let b = disk_mask((32, 32), (22.0, 22.0), 5.0);
    assert_abs_diff_eq!(dice(&a, &a), 1.0);
    assert_abs_diff_eq!(dice(&a, &b), 0.0);
    let empty = Array2::from_elem((32, 32), false);
    assert_abs_diff_eq!(dice(&empty, &empty), 1.0);
}

// ---------------------------------------------------------------------------
// estimate_and_apply
// ---------------------------------------------------------------------------

#[test]
fn test_recovers_translation_between_masks() {
    let fixed_center = (31.5, 31.5);
    let moving_center = (29.5, 34.5);
    let fixed_mask = disk_mask((64, 64), fixed_center, 14.0);
    let fixed_image = disk_image((64, 64), fixed_center, 14.0, 1.0);
    // Moving grid has different dimensions from the fixed grid.
    let moving_mask = disk_mask((60, 70), moving_center, 14.0);
    let moving_image = disk_image((60, 70), moving_center, 14.0, 1.0);

    let config = RegistrationConfig::default();
    let result = estimate_and_apply(
        &moving_image,
        &fixed_image,
        &moving_mask,
        &fixed_mask,
        config.max_iterations,
        TransformFamily::Translation,
        &config,
    )
    .unwrap();

    assert_eq!(result.image.dim(), fixed_image.dim());
    assert_eq!(result.reference.dim(), fixed_mask.dim());

    // Forward (moving -> fixed) translation of a point.
    let (r, c) = result.transform.map_point(moving_center.0, moving_center.1);
    assert!((r - fixed_center.0).abs() < 0.5, "row {r}");
    assert!((c - fixed_center.1).abs() < 0.5, "col {c}");
    assert!(dice(&result.reference, &fixed_mask) > 0.95);
}

#[test]
fn test_similarity_recovers_shift_of_asymmetric_mask() {
    let frame = 0;
    let moving_image = perfusion_image(frame);
    let moving_mask = perfusion_mask(frame);
    let fixed_image = perfusion_image(1);
    let fixed_mask = perfusion_mask(1);

    let config = RegistrationConfig::default();
    let result = estimate_and_apply(
        &moving_image,
        &fixed_image,
        &moving_mask,
        &fixed_mask,
        config.max_iterations,
        TransformFamily::Similarity,
        &config,
    )
    .unwrap();

    let (dx, dy) = result.transform.translation();
    let (sy, sx) = common::SHIFTS[frame];
    assert_abs_diff_eq!(dx, -sx, epsilon = 0.5);
    assert_abs_diff_eq!(dy, -sy, epsilon = 0.5);
    assert_abs_diff_eq!(result.transform.scale(), 1.0, epsilon = 0.02);
    assert_abs_diff_eq!(result.transform.rotation(), 0.0, epsilon = 0.02);
}

#[test]
fn test_zero_iterations_rejected() {
    let mask = perfusion_mask(1);
    let image = perfusion_image(1);
    let result = estimate_and_apply(
        &image,
        &image,
        &mask,
        &mask,
        0,
        TransformFamily::Similarity,
        &RegistrationConfig::default(),
    );
    assert!(matches!(result, Err(PerfusionError::InvalidArgument(_))));
}

#[test]
fn test_empty_reference_is_registration_failure() {
    let image = perfusion_image(1);
    let mask = perfusion_mask(1);
    let empty = Array2::from_elem(mask.dim(), false);
    let result = estimate_and_apply(
        &image,
        &image,
        &empty,
        &mask,
        50,
        TransformFamily::Similarity,
        &RegistrationConfig::default(),
    );
    match result {
        Err(e @ PerfusionError::Registration { .. }) => assert_eq!(e.stage(), None),
        other => panic!("expected registration failure, got {other:?}"),
    }
}

#[test]
fn test_disjoint_references_fail() {
    // Tiny references in opposite corners never reach the overlap floor
    // because almost the whole fixed grid maps outside a 4x4 moving image.
    let fixed_image = Array2::<f32>::zeros((SIZE, SIZE));
    let mut fixed_mask = Array2::from_elem((SIZE, SIZE), false);
    fixed_mask[[60, 60]] = true;
    let moving_image = Array2::<f32>::zeros((4, 4));
    let mut moving_mask = Array2::from_elem((4, 4), false);
    moving_mask[[0, 0]] = true;

    let result = estimate_and_apply(
        &moving_image,
        &fixed_image,
        &moving_mask,
        &fixed_mask,
        50,
        TransformFamily::Similarity,
        &RegistrationConfig::default(),
    );
    assert!(matches!(result, Err(PerfusionError::Registration { .. })));
}

// ---------------------------------------------------------------------------
// Two-stage registration
// ---------------------------------------------------------------------------

#[test]
fn test_self_registration_is_identity() {
    let image = perfusion_image(1);
    let mask = perfusion_mask(1);
    let edges = detect_edges(&image, 0.1).unwrap();
    let config = RegistrationConfig::default();

    let result = register_pair(&image, &image, &mask, &mask, &edges, 100, &config).unwrap();

    assert!(result.transform().is_identity(1e-9));
    assert_eq!(result.image, image);
    assert_eq!(result.edges, edges);
    assert_abs_diff_eq!(result.fine_dice, 1.0);
}

#[test]
fn test_refinement_never_lowers_edge_overlap() {
    let fixed_image = perfusion_image(1);
    let fixed_mask = perfusion_mask(1);
    let fixed_edges = detect_edges(&fixed_image, 0.1).unwrap();

    // Known rotation + translation applied to the fixed frame.
    let offset = SimilarityTransform::from_forward(1.0, 0.06, 2.0, -1.5, fixed_image.dim());
    let moving_image = warp(&fixed_image, &offset, fixed_image.dim());
    let moving_mask = warp_mask(&fixed_mask, &offset, fixed_mask.dim());

    let config = RegistrationConfig {
        reject_worse_refinement: false,
        ..RegistrationConfig::default()
    };
    let result = register_pair(
        &moving_image,
        &fixed_image,
        &moving_mask,
        &fixed_mask,
        &fixed_edges,
        config.max_iterations,
        &config,
    )
    .unwrap();

    assert!(result.refinement_accepted);
    assert!(
        result.fine_dice >= result.coarse_dice,
        "stage 2 dice {} < stage 1 dice {}",
        result.fine_dice,
        result.coarse_dice
    );
    assert!(dice(&result.mask, &fixed_mask) > dice(&moving_mask, &fixed_mask));
}

/// Own edges plus a sparse copy offset 2..=4 px diagonally, so the edge stage
/// is pulled away from the exact overlap.
fn edges_with_offset_copy(edges: &Array2<bool>) -> Array2<bool> {
    let (h, w) = edges.dim();
    let mut out = edges.clone();
    for ((r, c), &e) in edges.indexed_iter() {
        if !e {
            continue;
        }
        for dr in 2..=4 {
            for dc in 2..=4 {
                let (nr, nc) = (r + dr, c + dc);
                if nr < h && nc < w && (nr + nc) % 2 == 0 {
                    out[[nr, nc]] = true;
                }
            }
        }
    }
    out
}

#[test]
fn test_stage_two_output_kept_by_default() {
    let image = perfusion_image(1);
    let mask = perfusion_mask(1);
    let fixed_edges = edges_with_offset_copy(&detect_edges(&image, 0.1).unwrap());
    let config = RegistrationConfig {
        family: TransformFamily::Translation,
        ..RegistrationConfig::default()
    };
    assert!(!config.reject_worse_refinement);

    let result = register_pair(&image, &image, &mask, &mask, &fixed_edges, 100, &config).unwrap();

    assert!(result.refinement_accepted);
    assert!(result.coarse.is_identity(1e-9));
    assert_abs_diff_eq!(result.fine_dice, dice(&result.edges, &fixed_edges));
    assert_eq!(result.image, warp(&image, &result.fine, image.dim()));
}

#[test]
fn test_worse_refinement_rejected_when_enabled() {
    let image = perfusion_image(1);
    let mask = perfusion_mask(1);
    let edges = detect_edges(&image, 0.1).unwrap();
    let fixed_edges = edges_with_offset_copy(&edges);
    let plain = RegistrationConfig {
        family: TransformFamily::Translation,
        ..RegistrationConfig::default()
    };
    let strict = RegistrationConfig {
        reject_worse_refinement: true,
        ..plain.clone()
    };

    let kept = register_pair(&image, &image, &mask, &mask, &fixed_edges, 100, &plain).unwrap();
    let guarded = register_pair(&image, &image, &mask, &mask, &fixed_edges, 100, &strict).unwrap();

    assert_eq!(guarded.coarse_dice, kept.coarse_dice);
    assert!(guarded.fine_dice >= guarded.coarse_dice);
    if kept.fine_dice < kept.coarse_dice {
        // Stage one is the identity here, so the rejected result is the input.
        assert!(!guarded.refinement_accepted);
        assert!(guarded.fine.is_identity(0.0));
        assert_eq!(guarded.image, image);
        assert_eq!(guarded.edges, edges);
        assert_eq!(guarded.fine_dice, guarded.coarse_dice);
    } else {
        assert!(guarded.refinement_accepted);
        assert_eq!(guarded.image, kept.image);
        assert_eq!(guarded.fine_dice, kept.fine_dice);
    }
}

#[test]
fn test_stage_one_failure_is_tagged() {
    let image = perfusion_image(1);
    let mask = perfusion_mask(1);
    let edges = detect_edges(&image, 0.1).unwrap();
    let empty = Array2::from_elem(mask.dim(), false);

    let err = register_pair(
        &image,
        &image,
        &empty,
        &mask,
        &edges,
        50,
        &RegistrationConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.stage(), Some(RegistrationStage::Coarse));
    assert!(err.to_string().contains("stage 1"), "{err}");
}

#[test]
fn test_stage_two_failure_is_tagged() {
    let image = perfusion_image(1);
    let mask = perfusion_mask(1);
    let no_edges = Array2::from_elem(mask.dim(), false);

    let err = register_pair(
        &image,
        &image,
        &mask,
        &mask,
        &no_edges,
        50,
        &RegistrationConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.stage(), Some(RegistrationStage::Fine));
}
