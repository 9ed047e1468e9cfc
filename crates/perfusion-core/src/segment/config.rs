use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CONTOUR_ITERATIONS, DEFAULT_CONTOUR_SMOOTH_FACTOR, DEFAULT_MIN_REGION_AREA,
    DEFAULT_NARROW_BAND, DEFAULT_SEED_SHRINK_FACTOR,
};
use crate::error::{PerfusionError, Result};

/// Configuration of the automatic active-contour segmentation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Contour evolution steps.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Connected components smaller than this (pixels) are discarded before
    /// the seed ellipse is fitted.
    #[serde(default = "default_min_region_area")]
    pub min_region_area: usize,
    /// Fraction of the fitted ellipse axes used for the initial contour.
    #[serde(default = "default_seed_shrink_factor")]
    pub seed_shrink_factor: f64,
    /// Weight of the curvature term in the contour update.
    #[serde(default = "default_smooth_factor")]
    pub smooth_factor: f64,
    /// Half-width of the level-set band updated each step.
    #[serde(default = "default_narrow_band")]
    pub narrow_band: f64,
}

fn default_iterations() -> usize {
    DEFAULT_CONTOUR_ITERATIONS
}
fn default_min_region_area() -> usize {
    DEFAULT_MIN_REGION_AREA
}
fn default_seed_shrink_factor() -> f64 {
    DEFAULT_SEED_SHRINK_FACTOR
}
fn default_smooth_factor() -> f64 {
    DEFAULT_CONTOUR_SMOOTH_FACTOR
}
fn default_narrow_band() -> f64 {
    DEFAULT_NARROW_BAND
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_CONTOUR_ITERATIONS,
            min_region_area: DEFAULT_MIN_REGION_AREA,
            seed_shrink_factor: DEFAULT_SEED_SHRINK_FACTOR,
            smooth_factor: DEFAULT_CONTOUR_SMOOTH_FACTOR,
            narrow_band: DEFAULT_NARROW_BAND,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(PerfusionError::InvalidArgument(
                "contour iterations must be positive".into(),
            ));
        }
        if !(self.seed_shrink_factor > 0.0 && self.seed_shrink_factor <= 1.0) {
            return Err(PerfusionError::InvalidArgument(format!(
                "seed shrink factor {} outside (0, 1]",
                self.seed_shrink_factor
            )));
        }
        if self.smooth_factor < 0.0 || !self.smooth_factor.is_finite() {
            return Err(PerfusionError::InvalidArgument(format!(
                "smooth factor {} must be a non-negative number",
                self.smooth_factor
            )));
        }
        if self.narrow_band <= 0.0 {
            return Err(PerfusionError::InvalidArgument(format!(
                "narrow band {} must be positive",
                self.narrow_band
            )));
        }
        Ok(())
    }
}
