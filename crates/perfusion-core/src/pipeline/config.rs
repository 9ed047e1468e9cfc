use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_REFERENCE_FRAME;
use crate::error::{PerfusionError, Result};
use crate::register::RegistrationConfig;
use crate::segment::SegmentationConfig;
use crate::ttp::ColorizeConfig;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub series: SeriesConfig,
    #[serde(default)]
    pub colorize: ColorizeConfig,
}

/// What to do when a moving frame fails to register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Record the failure and leave the frame out of the series.
    #[default]
    Skip,
    /// Fail the whole series with the first frame error.
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "Skip"),
            Self::Abort => write!(f, "Abort"),
        }
    }
}

/// Where the fixed frame's edge map comes from during stage two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixedEdgeStrategy {
    /// Computed once per series and shared read-only by every frame.
    #[default]
    Shared,
    /// Recomputed from the fixed frame inside each frame's registration.
    PerFrame,
}

impl fmt::Display for FixedEdgeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "Shared"),
            Self::PerFrame => write!(f, "Per frame"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// 1-based ordinal of the fixed frame within a group.
    #[serde(default = "default_reference_frame_index")]
    pub reference_frame_index: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub fixed_edges: FixedEdgeStrategy,
}

fn default_reference_frame_index() -> usize {
    DEFAULT_REFERENCE_FRAME
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            reference_frame_index: DEFAULT_REFERENCE_FRAME,
            failure_policy: FailurePolicy::default(),
            fixed_edges: FixedEdgeStrategy::default(),
        }
    }
}

impl SeriesConfig {
    /// 0-based fixed frame index for a group of `len` frames.
    pub fn fixed_index(&self, len: usize) -> Result<usize> {
        if self.reference_frame_index == 0 {
            return Err(PerfusionError::InvalidArgument(
                "reference_frame_index is 1-based and must be at least 1".into(),
            ));
        }
        let index = self.reference_frame_index - 1;
        if index >= len {
            return Err(PerfusionError::FrameIndexOutOfRange { index, total: len });
        }
        Ok(index)
    }
}
