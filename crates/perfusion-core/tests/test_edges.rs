use ndarray::Array2;

use perfusion_core::edges::{detect_edges, detect_edges_with, EdgeConfig, EdgeThreshold};
use perfusion_core::error::PerfusionError;

fn square_image() -> Array2<f32> {
    let mut data = Array2::<f32>::zeros((40, 40));
    for r in 12..28 {
        for c in 12..28 {
            data[[r, c]] = 1.0;
        }
    }
    data
}

// ---------------------------------------------------------------------------
// Threshold validation
// ---------------------------------------------------------------------------

#[test]
fn test_single_threshold_derives_low() {
    let (low, high) = EdgeThreshold::Single(0.5).resolve(0.4).unwrap();
    assert!((high - 0.5).abs() < 1e-6);
    assert!((low - 0.2).abs() < 1e-6);
}

#[test]
fn test_threshold_out_of_range_rejected() {
    let img = square_image();
    assert!(matches!(
        detect_edges(&img, 1.5),
        Err(PerfusionError::InvalidArgument(_))
    ));
    assert!(matches!(
        detect_edges(&img, -0.1),
        Err(PerfusionError::InvalidArgument(_))
    ));
    assert!(matches!(
        detect_edges(&img, (0.2, 1.2)),
        Err(PerfusionError::InvalidArgument(_))
    ));
}

#[test]
fn test_unordered_pair_rejected() {
    let img = square_image();
    assert!(matches!(
        detect_edges(&img, (0.5, 0.2)),
        Err(PerfusionError::InvalidArgument(_))
    ));
    assert!(detect_edges(&img, (0.2, 0.5)).is_ok());
}

#[test]
fn test_equal_pair_accepted() {
    let (low, high) = EdgeThreshold::Pair { low: 0.3, high: 0.3 }
        .resolve(0.4)
        .unwrap();
    assert_eq!(low, high);

    let edges = detect_edges(&square_image(), (0.3, 0.3)).unwrap();
    assert!(edges.iter().any(|&b| b));
}

#[test]
fn test_empty_image_rejected() {
    let img = Array2::<f32>::zeros((0, 0));
    assert!(matches!(
        detect_edges(&img, 0.1),
        Err(PerfusionError::InvalidArgument(_))
    ));
}

#[test]
fn test_threshold_display() {
    assert_eq!(format!("{}", EdgeThreshold::Single(0.1)), "0.1");
    assert_eq!(
        format!("{}", EdgeThreshold::Pair { low: 0.1, high: 0.3 }),
        "[0.1, 0.3]"
    );
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[test]
fn test_square_edges_on_boundary_only() {
    let img = square_image();
    let edges = detect_edges(&img, 0.1).unwrap();
    assert_eq!(edges.dim(), img.dim());

    let count = edges.iter().filter(|&&b| b).count();
    assert!(count > 0, "a bright square must produce edges");

    // Flat interior and far background stay empty.
    for r in 16..24 {
        for c in 16..24 {
            assert!(!edges[[r, c]], "interior pixel ({r}, {c}) marked as edge");
        }
    }
    for r in 0..5 {
        for c in 0..5 {
            assert!(!edges[[r, c]], "background pixel ({r}, {c}) marked as edge");
        }
    }

    // Every edge pixel lies within a couple of pixels of the square outline.
    for ((r, c), &e) in edges.indexed_iter() {
        if e {
            let near_row = (9..=30).contains(&r);
            let near_col = (9..=30).contains(&c);
            assert!(near_row && near_col, "stray edge at ({r}, {c})");
        }
    }
}

#[test]
fn test_constant_image_has_no_edges() {
    let img = Array2::<f32>::from_elem((20, 20), 0.7);
    let edges = detect_edges(&img, 0.1).unwrap();
    assert!(edges.iter().all(|&b| !b));
}

#[test]
fn test_deterministic() {
    let img = square_image();
    let a = detect_edges(&img, 0.2).unwrap();
    let b = detect_edges(&img, 0.2).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_higher_threshold_never_adds_edges() {
    let mut img = square_image();
    // A faint second square.
    for r in 2..8 {
        for c in 30..36 {
            img[[r, c]] = 0.15;
        }
    }
    let low = detect_edges(&img, 0.05).unwrap();
    let high = detect_edges(&img, 0.5).unwrap();
    for (h, l) in high.iter().zip(low.iter()) {
        if *h {
            assert!(*l);
        }
    }
    assert!(
        high.iter().filter(|&&b| b).count() < low.iter().filter(|&&b| b).count(),
        "faint square edges should drop out at a high threshold"
    );
}

#[test]
fn test_custom_sigma() {
    let img = square_image();
    let config = EdgeConfig {
        sigma: 0.0,
        ..EdgeConfig::default()
    };
    let edges = detect_edges_with(&img, 0.1, &config).unwrap();
    assert!(edges.iter().any(|&b| b));
}

#[test]
fn test_invalid_edge_config_rejected() {
    let img = square_image();
    let config = EdgeConfig {
        low_ratio: 1.5,
        ..EdgeConfig::default()
    };
    assert!(detect_edges_with(&img, 0.1, &config).is_err());
}
