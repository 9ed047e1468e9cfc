use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{PerfusionError, Result};
use crate::frame::{ColorImage, Frame, FrameId, Group, Image, Mask, PositionMetadata};
use crate::segment::segment;
use crate::ttp::{compute_ttp_at, render, vessel_mask, TtpMap};

use super::config::{FailurePolicy, PipelineConfig};
use super::series::{align_series_with_progress, RegisteredSeries};
use super::types::{NoOpReporter, PipelineStage, ProgressReporter};

/// A segmented frame and, for a moving frame that failed, the reason.
type Segmented = (Frame, Option<String>);

/// Processed/failed counts for one group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupReport {
    pub group: usize,
    /// Frames in the registered series, fixed frame included.
    pub processed: usize,
    pub failed: usize,
    pub failures: BTreeMap<FrameId, String>,
}

impl fmt::Display for GroupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group {}: {} processed, {} failed",
            self.group, self.processed, self.failed
        )
    }
}

/// Everything produced for one group.
#[derive(Clone, Debug)]
pub struct GroupResult {
    pub series: RegisteredSeries,
    /// Normalized mean of the registered frames.
    pub composite: Image,
    pub vessel_mask: Mask,
    pub ttp: TtpMap,
    pub color: ColorImage,
    pub report: GroupReport,
}

/// Segment every image of a group. A moving frame whose segmentation fails
/// keeps an empty mask and is listed in `Group::segmentation_failures`; a
/// fixed frame that cannot be segmented fails the group.
pub fn segment_group(
    index: usize,
    images: Vec<(Image, PositionMetadata)>,
    fixed_index: usize,
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
) -> Result<Group> {
    reporter.begin_stage(PipelineStage::Segmentation, Some(images.len()));
    let counter = AtomicUsize::new(0);

    let build = |(i, (image, metadata)): (usize, (Image, PositionMetadata))| {
        let id = FrameId::new(index, i);
        let result = match segment(&image, &config.segmentation) {
            Ok(seg) => Frame::new(id, image, seg.mask).map(|f| (f, None)),
            Err(e) if i != fixed_index => {
                warn!(frame = %id, error = %e, "segmentation failed");
                let reason = match e {
                    PerfusionError::Segmentation(reason) => reason,
                    other => other.to_string(),
                };
                let empty = Mask::from_elem(image.dim(), false);
                Frame::new(id, image, empty).map(|f| (f, Some(reason)))
            }
            Err(e) => Err(e),
        };
        reporter.advance(counter.fetch_add(1, Ordering::Relaxed) + 1);
        result.map(|(f, failure): Segmented| (f.with_metadata(metadata), failure))
    };

    let segmented: Vec<Result<Segmented>> = if images.len() >= PARALLEL_FRAME_THRESHOLD {
        images.into_par_iter().enumerate().map(build).collect()
    } else {
        images.into_iter().enumerate().map(build).collect()
    };
    reporter.finish_stage();

    let mut frames = Vec::with_capacity(segmented.len());
    let mut failures = BTreeMap::new();
    for entry in segmented {
        let (frame, failure) = entry?;
        if let Some(reason) = failure {
            failures.insert(frame.id, reason);
        }
        frames.push(frame);
    }
    let mut group = Group::new(index, frames, fixed_index)?;
    group.segmentation_failures = failures;
    Ok(group)
}

/// Align, merge and colorize one group.
pub fn process_group(group: &Group, config: &PipelineConfig) -> Result<GroupResult> {
    process_group_reported(group, config, &NoOpReporter)
}

/// As [`process_group`], reporting stage progress to `reporter`.
pub fn process_group_reported(
    group: &Group,
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
) -> Result<GroupResult> {
    info!(
        group = group.index,
        frames = group.len(),
        fixed = group.fixed_index,
        "processing group"
    );

    if config.series.failure_policy == FailurePolicy::Abort {
        if let Some(reason) = group.segmentation_failures.values().next() {
            return Err(PerfusionError::Segmentation(reason.clone()));
        }
    }

    reporter.begin_stage(PipelineStage::Registration, Some(group.len()));
    let mut series = align_series_with_progress(
        &group.frames,
        group.fixed_index,
        config.registration.max_iterations,
        config,
        |done| reporter.advance(done),
    )?;
    reporter.finish_stage();
    for (id, reason) in &group.segmentation_failures {
        if let Some(entry) = series.failures.get_mut(id) {
            *entry = PerfusionError::Segmentation(reason.clone()).to_string();
        }
    }

    reporter.begin_stage(PipelineStage::Merging, None);
    let composite = series.merge()?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Colorizing, None);
    let colorize = &config.colorize;
    let colormap = colorize.colormap.build(colorize.levels)?;
    let ordinals: Vec<usize> = series.frames.iter().map(|f| f.id.index + 1).collect();
    let ttp = compute_ttp_at(&series.images(), &ordinals, group.len())?;
    let vessel_mask = vessel_mask(
        &composite,
        colorize.edge_threshold,
        colorize.dilation_radius,
        &config.registration.edges,
    )?;
    let color = render(&ttp, &vessel_mask, colormap.as_ref())?;
    reporter.finish_stage();

    let report = GroupReport {
        group: group.index,
        processed: series.len(),
        failed: series.failures.len(),
        failures: series.failures.clone(),
    };
    info!(
        group = report.group,
        processed = report.processed,
        failed = report.failed,
        "group complete"
    );

    Ok(GroupResult {
        series,
        composite,
        vessel_mask,
        ttp,
        color,
        report,
    })
}
