//! Time-to-peak colorization of a registered series.

pub mod colorize;
pub mod colormap;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_COLORMAP_LEVELS, DEFAULT_DILATION_RADIUS, DEFAULT_EDGE_THRESHOLD};

pub use colorize::{
    colorize, colorize_with, compute_ttp, compute_ttp_at, render, vessel_mask, TtpMap,
};
pub use colormap::{Colormap, ColormapKind, Inverted, Viridis};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColorizeConfig {
    /// Edge threshold applied to the composite image.
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f32,
    /// Disk radius the composite edges are dilated by.
    #[serde(default = "default_dilation_radius")]
    pub dilation_radius: usize,
    #[serde(default = "default_levels")]
    pub levels: usize,
    #[serde(default)]
    pub colormap: ColormapKind,
}

fn default_edge_threshold() -> f32 {
    DEFAULT_EDGE_THRESHOLD
}
fn default_dilation_radius() -> usize {
    DEFAULT_DILATION_RADIUS
}
fn default_levels() -> usize {
    DEFAULT_COLORMAP_LEVELS
}

impl Default for ColorizeConfig {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            dilation_radius: DEFAULT_DILATION_RADIUS,
            levels: DEFAULT_COLORMAP_LEVELS,
            colormap: ColormapKind::default(),
        }
    }
}
