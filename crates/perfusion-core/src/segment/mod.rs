//! Automatic brain-region segmentation.
//!
//! Pipeline: normalize -> Otsu threshold -> small-region removal -> hole
//! filling -> largest component -> moment ellipse fit -> shrunken seed ->
//! Chan-Vese contour evolution.

pub mod chan_vese;
pub mod components;
pub mod config;
pub mod distance;
pub mod ellipse;
pub mod morphology;
pub mod threshold;

use ndarray::Array2;
use tracing::debug;

use crate::error::{PerfusionError, Result};
use crate::filters::{apply_mask, normalize};
use crate::frame::{Image, Mask};

pub use components::{label_components, ComponentStats, Connectivity, Labeling};
pub use config::SegmentationConfig;
pub use ellipse::EllipseFit;

use morphology::{fill_holes, remove_small_regions};
use threshold::{binarize, otsu_threshold};

/// Automatically derived initial contour.
#[derive(Clone, Debug)]
pub struct Seed {
    /// Ellipse fitted to the retained foreground region, before shrinking.
    pub region_fit: EllipseFit,
    /// Shrunken ellipse used as the initial contour.
    pub ellipse: EllipseFit,
    /// Rasterized `ellipse`.
    pub mask: Mask,
    /// Foreground region the ellipse was fitted to.
    pub region: Mask,
}

/// Result of segmenting one image.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub mask: Mask,
    /// Original image with every pixel outside `mask` set to zero.
    pub masked_image: Image,
    pub seed: Seed,
    /// Contour evolution steps actually taken.
    pub iterations: usize,
}

/// Derive the initial contour from the largest foreground region.
pub fn derive_seed(image: &Array2<f32>, config: &SegmentationConfig) -> Result<Seed> {
    config.validate()?;
    if image.is_empty() {
        return Err(PerfusionError::InvalidArgument(
            "segmentation of an empty image".into(),
        ));
    }

    let normalized = normalize(image);
    let threshold = otsu_threshold(&normalized);
    let binary = binarize(&normalized, threshold);
    let cleaned = fill_holes(&remove_small_regions(&binary, config.min_region_area));

    let labeling = label_components(&cleaned, Connectivity::Eight);
    let largest = labeling.largest().ok_or_else(|| {
        PerfusionError::Segmentation(format!(
            "no region of at least {} px after thresholding at {threshold:.3}",
            config.min_region_area
        ))
    })?;

    let region_fit = EllipseFit::from_component(largest);
    let ellipse = region_fit.scaled(config.seed_shrink_factor);
    let region = labeling.component_mask(largest.label);
    // Restricting to the region keeps the seed inside even for concave shapes.
    let mask = ellipse.rasterize(image.dim()) & &region;
    if !mask.iter().any(|&b| b) {
        return Err(PerfusionError::Segmentation(
            "seed ellipse does not cover any foreground pixel".into(),
        ));
    }

    debug!(
        threshold,
        area = largest.area,
        center_row = ellipse.center_row,
        center_col = ellipse.center_col,
        semi_major = ellipse.semi_major,
        semi_minor = ellipse.semi_minor,
        "seed ellipse fitted"
    );

    Ok(Seed {
        region_fit,
        ellipse,
        mask,
        region,
    })
}

/// Segment `image`, returning the evolved mask and the masked image.
pub fn segment(image: &Array2<f32>, config: &SegmentationConfig) -> Result<Segmentation> {
    let seed = derive_seed(image, config)?;
    let normalized = normalize(image);

    let evolution = chan_vese::evolve(
        &normalized,
        &seed.mask,
        config.iterations,
        config.smooth_factor,
        config.narrow_band,
    )?;

    let area = evolution.mask.iter().filter(|&&b| b).count();
    if area == 0 {
        return Err(PerfusionError::Segmentation(
            "contour collapsed to an empty region".into(),
        ));
    }
    if area == evolution.mask.len() {
        return Err(PerfusionError::Segmentation(
            "contour expanded over the whole image".into(),
        ));
    }

    let masked_image = apply_mask(image, &evolution.mask);
    Ok(Segmentation {
        mask: evolution.mask,
        masked_image,
        seed,
        iterations: evolution.iterations,
    })
}
