use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_EDGE_THRESHOLD, DEFAULT_GRADIENT_TOLERANCE, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_STEP,
    DEFAULT_MIN_STEP, DEFAULT_REFERENCE_BLUR_SIGMA, DEFAULT_RELAXATION,
};
use crate::edges::EdgeConfig;
use crate::error::{PerfusionError, Result};

use super::transform::TransformFamily;

/// Regular-step gradient descent and two-stage registration settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub family: TransformFamily,
    /// Initial (and largest) optimizer step, in scaled parameter units.
    #[serde(default = "default_max_step")]
    pub max_step: f64,
    #[serde(default = "default_min_step")]
    pub min_step: f64,
    /// Step multiplier applied whenever the gradient direction reverses.
    #[serde(default = "default_relaxation")]
    pub relaxation: f64,
    #[serde(default = "default_gradient_tolerance")]
    pub gradient_tolerance: f64,
    /// Gaussian sigma applied to both references before measuring.
    #[serde(default = "default_reference_blur_sigma")]
    pub reference_blur_sigma: f32,
    /// Edge threshold for the stage-one registered image.
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f32,
    /// Keep the stage-one result when refinement lowers edge overlap.
    #[serde(default = "default_reject_worse_refinement")]
    pub reject_worse_refinement: bool,
    #[serde(default)]
    pub edges: EdgeConfig,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_max_step() -> f64 {
    DEFAULT_MAX_STEP
}
fn default_min_step() -> f64 {
    DEFAULT_MIN_STEP
}
fn default_relaxation() -> f64 {
    DEFAULT_RELAXATION
}
fn default_gradient_tolerance() -> f64 {
    DEFAULT_GRADIENT_TOLERANCE
}
fn default_reference_blur_sigma() -> f32 {
    DEFAULT_REFERENCE_BLUR_SIGMA
}
fn default_edge_threshold() -> f32 {
    DEFAULT_EDGE_THRESHOLD
}
fn default_reject_worse_refinement() -> bool {
    false
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            family: TransformFamily::default(),
            max_step: DEFAULT_MAX_STEP,
            min_step: DEFAULT_MIN_STEP,
            relaxation: DEFAULT_RELAXATION,
            gradient_tolerance: DEFAULT_GRADIENT_TOLERANCE,
            reference_blur_sigma: DEFAULT_REFERENCE_BLUR_SIGMA,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            reject_worse_refinement: false,
            edges: EdgeConfig::default(),
        }
    }
}

impl RegistrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(PerfusionError::InvalidArgument(
                "max_iterations must be greater than 0".into(),
            ));
        }
        if !(self.max_step > 0.0 && self.max_step.is_finite()) {
            return Err(PerfusionError::InvalidArgument(format!(
                "max_step must be positive, got {}",
                self.max_step
            )));
        }
        if !(self.min_step > 0.0 && self.min_step <= self.max_step) {
            return Err(PerfusionError::InvalidArgument(format!(
                "min_step must be in (0, max_step], got {}",
                self.min_step
            )));
        }
        if !(self.relaxation > 0.0 && self.relaxation < 1.0) {
            return Err(PerfusionError::InvalidArgument(format!(
                "relaxation must be in (0, 1), got {}",
                self.relaxation
            )));
        }
        if self.gradient_tolerance.is_nan() || self.gradient_tolerance < 0.0 {
            return Err(PerfusionError::InvalidArgument(format!(
                "gradient_tolerance must be non-negative, got {}",
                self.gradient_tolerance
            )));
        }
        if !(self.reference_blur_sigma >= 0.0 && self.reference_blur_sigma.is_finite()) {
            return Err(PerfusionError::InvalidArgument(format!(
                "reference_blur_sigma must be non-negative, got {}",
                self.reference_blur_sigma
            )));
        }
        self.edges.validate()?;
        crate::edges::EdgeThreshold::from(self.edge_threshold).resolve(self.edges.low_ratio)?;
        Ok(())
    }
}
