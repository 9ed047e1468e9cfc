use std::borrow::Borrow;

use ndarray::{Array2, Array3};
use tracing::debug;

use crate::edges::{detect_edges_with, EdgeConfig};
use crate::error::{PerfusionError, Result};
use crate::filters::normalize;
use crate::frame::{ColorImage, Image, Mask};
use crate::segment::morphology::dilate_disk;

use super::colormap::Colormap;
use super::ColorizeConfig;

/// Per-pixel time-to-peak: the 1-based acquisition ordinal of the frame with
/// the highest normalized intensity. Ties resolve to the earliest frame.
#[derive(Clone, Debug)]
pub struct TtpMap {
    indices: Array2<u32>,
    frames: usize,
}

impl TtpMap {
    /// Peak index at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.indices.get((row, col)).copied()
    }

    pub fn indices(&self) -> &Array2<u32> {
        &self.indices
    }

    /// Number of acquisitions the peak ordinals count from.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn dim(&self) -> (usize, usize) {
        self.indices.dim()
    }
}

/// Time-to-peak over a registered series. Each frame is normalized to [0, 1]
/// independently first.
pub fn compute_ttp<I: Borrow<Image>>(series: &[I]) -> Result<TtpMap> {
    let ordinals: Vec<usize> = (1..=series.len()).collect();
    compute_ttp_at(series, &ordinals, series.len())
}

/// Time-to-peak over frames tagged with their 1-based acquisition ordinals,
/// out of `frames` acquisitions. Frames missing from `series` leave gaps in
/// the numbering; later peaks keep their own ordinal.
pub fn compute_ttp_at<I: Borrow<Image>>(
    series: &[I],
    ordinals: &[usize],
    frames: usize,
) -> Result<TtpMap> {
    let first: &Image = series.first().ok_or(PerfusionError::EmptySequence)?.borrow();
    if ordinals.len() != series.len() {
        return Err(PerfusionError::InvalidArgument(format!(
            "{} ordinals for {} frames",
            ordinals.len(),
            series.len()
        )));
    }
    let ascending = ordinals.windows(2).all(|w| w[0] < w[1]);
    if !ascending || ordinals[0] == 0 || ordinals[ordinals.len() - 1] > frames {
        return Err(PerfusionError::InvalidArgument(format!(
            "frame ordinals {ordinals:?} must increase within 1..={frames}"
        )));
    }

    let dim = first.dim();
    let mut normalized: Vec<Image> = Vec::with_capacity(series.len());
    for frame in series {
        let frame: &Image = frame.borrow();
        if frame.dim() != dim {
            return Err(PerfusionError::InvalidArgument(format!(
                "series frame shape {:?} differs from {:?}",
                frame.dim(),
                dim
            )));
        }
        normalized.push(normalize(frame));
    }

    let mut best = normalized[0].clone();
    let mut indices = Array2::<u32>::from_elem(dim, ordinals[0] as u32);
    for (frame, &ordinal) in normalized.iter().zip(ordinals).skip(1) {
        ndarray::Zip::from(&mut best)
            .and(&mut indices)
            .and(frame)
            .for_each(|b, i, &v| {
                if v > *b {
                    *b = v;
                    *i = ordinal as u32;
                }
            });
    }

    Ok(TtpMap { indices, frames })
}

/// Dilated edges of the composite image.
pub fn vessel_mask(
    composite: &Image,
    edge_threshold: f32,
    dilation_radius: usize,
    edges: &EdgeConfig,
) -> Result<Mask> {
    let edge_map = detect_edges_with(composite, edge_threshold, edges)?;
    Ok(dilate_disk(&edge_map, dilation_radius))
}

/// Paint `ttp` through `colormap` inside `mask`; everything else stays black.
pub fn render(ttp: &TtpMap, mask: &Mask, colormap: &dyn Colormap) -> Result<ColorImage> {
    if ttp.dim() != mask.dim() {
        return Err(PerfusionError::InvalidArgument(format!(
            "vessel mask shape {:?} differs from TTP shape {:?}",
            mask.dim(),
            ttp.dim()
        )));
    }
    let levels = colormap.levels();
    if levels == 0 {
        return Err(PerfusionError::InvalidArgument(
            "colormap has no levels".into(),
        ));
    }
    let (h, w) = ttp.dim();
    let frames = ttp.frames().max(1) as f64;
    let mut out = Array3::<f32>::zeros((h, w, 3));

    for ((row, col), &inside) in mask.indexed_iter() {
        if !inside {
            continue;
        }
        let peak = f64::from(ttp.indices[[row, col]]);
        let index = (peak * (levels - 1) as f64 / frames).round() as usize;
        let rgb = colormap.color(index.min(levels - 1));
        for (c, v) in rgb.iter().enumerate() {
            out[[row, col, c]] = *v;
        }
    }

    Ok(out)
}

/// Time-to-peak color image of a registered series over the vessel mask of
/// `composite`, using the default edge threshold.
pub fn colorize<I: Borrow<Image>>(
    series: &[I],
    composite: &Image,
    dilation_radius: usize,
    colormap: &dyn Colormap,
) -> Result<ColorImage> {
    let config = ColorizeConfig {
        dilation_radius,
        ..ColorizeConfig::default()
    };
    colorize_with(series, composite, &config, &EdgeConfig::default(), colormap)
}

pub fn colorize_with<I: Borrow<Image>>(
    series: &[I],
    composite: &Image,
    config: &ColorizeConfig,
    edges: &EdgeConfig,
    colormap: &dyn Colormap,
) -> Result<ColorImage> {
    let ttp = compute_ttp(series)?;
    if composite.dim() != ttp.dim() {
        return Err(PerfusionError::InvalidArgument(format!(
            "composite shape {:?} differs from series shape {:?}",
            composite.dim(),
            ttp.dim()
        )));
    }
    let mask = vessel_mask(composite, config.edge_threshold, config.dilation_radius, edges)?;
    debug!(
        frames = ttp.frames(),
        vessel_pixels = mask.iter().filter(|&&b| b).count(),
        colormap = %colormap.name(),
        "rendering time-to-peak"
    );
    render(&ttp, &mask, colormap)
}
