//! Canny-style edge extraction.
//!
//! Gaussian smoothing, central-difference gradients, non-maximum suppression
//! and hysteresis thresholding. The gradient magnitude is normalized by its
//! maximum, so thresholds are sensitivities in [0, 1] independent of the
//! image's intensity scale.

mod canny;

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_EDGE_LOW_RATIO, DEFAULT_EDGE_SIGMA};
use crate::error::{PerfusionError, Result};
use crate::frame::Mask;

pub use canny::gradients;

/// Hysteresis sensitivity: either a single high threshold (the low one is
/// derived from it) or an explicit ordered pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EdgeThreshold {
    Single(f32),
    Pair { low: f32, high: f32 },
}

impl EdgeThreshold {
    /// Validate and resolve into `(low, high)`.
    pub fn resolve(&self, low_ratio: f32) -> Result<(f32, f32)> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        match *self {
            Self::Single(t) => {
                if !in_range(t) {
                    return Err(PerfusionError::InvalidArgument(format!(
                        "edge threshold {t} outside [0, 1]"
                    )));
                }
                Ok((t * low_ratio, t))
            }
            Self::Pair { low, high } => {
                if !in_range(low) || !in_range(high) {
                    return Err(PerfusionError::InvalidArgument(format!(
                        "edge thresholds ({low}, {high}) outside [0, 1]"
                    )));
                }
                if low > high {
                    return Err(PerfusionError::InvalidArgument(format!(
                        "low edge threshold {low} must not exceed high threshold {high}"
                    )));
                }
                Ok((low, high))
            }
        }
    }
}

impl From<f32> for EdgeThreshold {
    fn from(t: f32) -> Self {
        Self::Single(t)
    }
}

impl From<(f32, f32)> for EdgeThreshold {
    fn from((low, high): (f32, f32)) -> Self {
        Self::Pair { low, high }
    }
}

impl fmt::Display for EdgeThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(t) => write!(f, "{t}"),
            Self::Pair { low, high } => write!(f, "[{low}, {high}]"),
        }
    }
}

/// Parameters of the edge operator that are not per-call thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Gaussian smoothing sigma applied before differentiation.
    #[serde(default = "default_sigma")]
    pub sigma: f32,
    /// Low/high ratio used when a single threshold is given.
    #[serde(default = "default_low_ratio")]
    pub low_ratio: f32,
}

fn default_sigma() -> f32 {
    DEFAULT_EDGE_SIGMA
}
fn default_low_ratio() -> f32 {
    DEFAULT_EDGE_LOW_RATIO
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_EDGE_SIGMA,
            low_ratio: DEFAULT_EDGE_LOW_RATIO,
        }
    }
}

impl EdgeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma >= 0.0 && self.sigma.is_finite()) {
            return Err(PerfusionError::InvalidArgument(format!(
                "edge sigma must be non-negative, got {}",
                self.sigma
            )));
        }
        if !(self.low_ratio > 0.0 && self.low_ratio < 1.0) {
            return Err(PerfusionError::InvalidArgument(format!(
                "edge low_ratio must be in (0, 1), got {}",
                self.low_ratio
            )));
        }
        Ok(())
    }
}

/// Detect edges with the default operator parameters.
pub fn detect_edges(image: &Array2<f32>, threshold: impl Into<EdgeThreshold>) -> Result<Mask> {
    detect_edges_with(image, threshold, &EdgeConfig::default())
}

/// Detect edges, returning a boolean map of the same shape as `image`.
pub fn detect_edges_with(
    image: &Array2<f32>,
    threshold: impl Into<EdgeThreshold>,
    config: &EdgeConfig,
) -> Result<Mask> {
    config.validate()?;
    let threshold = threshold.into();
    let (low, high) = threshold.resolve(config.low_ratio)?;
    if image.is_empty() {
        return Err(PerfusionError::InvalidArgument(
            "edge detection on an empty image".into(),
        ));
    }
    Ok(canny::canny(image, config.sigma, low, high))
}
