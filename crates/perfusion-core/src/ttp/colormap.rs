use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PerfusionError, Result};

/// A discrete colormap of `levels()` RGB entries with channels in [0, 1].
pub trait Colormap: Send + Sync {
    fn levels(&self) -> usize;

    /// Color at `index`; indices past the end clamp to the last entry.
    fn color(&self, index: usize) -> [f32; 3];

    fn name(&self) -> String;
}

/// Viridis control points at evenly spaced positions.
const VIRIDIS_ANCHORS: [[f32; 3]; 9] = [
    [0.267_004, 0.004_874, 0.329_415],
    [0.282_623, 0.140_926, 0.457_517],
    [0.253_935, 0.265_254, 0.529_983],
    [0.206_756, 0.371_758, 0.553_117],
    [0.163_625, 0.471_133, 0.558_148],
    [0.127_568, 0.566_949, 0.550_556],
    [0.134_692, 0.658_636, 0.517_649],
    [0.266_941, 0.748_751, 0.440_573],
    [0.993_248, 0.906_157, 0.143_936],
];

/// Perceptually uniform dark-blue to yellow map, linearly interpolated between
/// anchor colors.
#[derive(Clone, Copy, Debug)]
pub struct Viridis {
    levels: usize,
}

impl Viridis {
    pub fn new(levels: usize) -> Result<Self> {
        if levels < 2 {
            return Err(PerfusionError::InvalidArgument(format!(
                "colormap needs at least 2 levels, got {levels}"
            )));
        }
        Ok(Self { levels })
    }
}

impl Colormap for Viridis {
    fn levels(&self) -> usize {
        self.levels
    }

    fn color(&self, index: usize) -> [f32; 3] {
        let index = index.min(self.levels - 1);
        let t = index as f32 / (self.levels - 1) as f32;
        let segments = (VIRIDIS_ANCHORS.len() - 1) as f32;
        let pos = t * segments;
        let lo = (pos.floor() as usize).min(VIRIDIS_ANCHORS.len() - 2);
        let frac = pos - lo as f32;
        let a = VIRIDIS_ANCHORS[lo];
        let b = VIRIDIS_ANCHORS[lo + 1];
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
            a[2] + (b[2] - a[2]) * frac,
        ]
    }

    fn name(&self) -> String {
        "viridis".into()
    }
}

/// Another colormap traversed back to front.
#[derive(Clone, Copy, Debug)]
pub struct Inverted<C>(pub C);

impl<C: Colormap> Colormap for Inverted<C> {
    fn levels(&self) -> usize {
        self.0.levels()
    }

    fn color(&self, index: usize) -> [f32; 3] {
        let last = self.0.levels() - 1;
        self.0.color(last - index.min(last))
    }

    fn name(&self) -> String {
        format!("inverted {}", self.0.name())
    }
}

/// Colormaps selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColormapKind {
    Viridis,
    #[default]
    InvertedViridis,
}

impl ColormapKind {
    pub fn build(self, levels: usize) -> Result<Box<dyn Colormap>> {
        let viridis = Viridis::new(levels)?;
        Ok(match self {
            Self::Viridis => Box::new(viridis),
            Self::InvertedViridis => Box::new(Inverted(viridis)),
        })
    }
}

impl fmt::Display for ColormapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Viridis => write!(f, "Viridis"),
            Self::InvertedViridis => write!(f, "Inverted Viridis"),
        }
    }
}
