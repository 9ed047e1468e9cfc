use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::edges::detect_edges_with;
use crate::error::{PerfusionError, Result};
use crate::filters::normalize;
use crate::frame::{Frame, FrameId, Image, Mask};
use crate::register::{register_pair, RegistrationConfig, SimilarityTransform};

use super::config::{FailurePolicy, FixedEdgeStrategy, PipelineConfig};

/// Edge-overlap scores of a moving frame's registration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegistrationQuality {
    pub coarse_dice: f64,
    pub fine_dice: f64,
    pub refinement_accepted: bool,
}

/// One frame of a registered series, on the fixed frame's grid.
#[derive(Clone, Debug)]
pub struct RegisteredFrame {
    pub id: FrameId,
    pub image: Image,
    pub mask: Mask,
    pub edges: Mask,
    /// Total moving -> fixed transform; identity for the fixed frame.
    pub transform: SimilarityTransform,
    /// `None` for the fixed frame.
    pub quality: Option<RegistrationQuality>,
}

/// All frames of a group that registered, in acquisition order, plus the
/// reasons the others did not.
#[derive(Clone, Debug)]
pub struct RegisteredSeries {
    pub group: usize,
    pub fixed: FrameId,
    pub frames: Vec<RegisteredFrame>,
    pub failures: BTreeMap<FrameId, String>,
}

impl RegisteredSeries {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, id: FrameId) -> Option<&RegisteredFrame> {
        self.frames.iter().find(|f| f.id == id)
    }

    pub fn images(&self) -> Vec<&Image> {
        self.frames.iter().map(|f| &f.image).collect()
    }

    /// Registered moving frames, excluding the fixed frame.
    pub fn registered_moving(&self) -> usize {
        self.frames.iter().filter(|f| f.id != self.fixed).count()
    }

    /// Mean of all registered frames, normalized to [0, 1].
    pub fn merge(&self) -> Result<Image> {
        let first = self.frames.first().ok_or(PerfusionError::EmptySequence)?;
        let mut sum = Array2::<f32>::zeros(first.image.dim());
        for frame in &self.frames {
            sum += &frame.image;
        }
        sum /= self.frames.len() as f32;
        Ok(normalize(&sum))
    }
}

/// Register every frame of a series to `frames[fixed_index]`.
pub fn align_series(
    frames: &[Frame],
    fixed_index: usize,
    max_iterations: usize,
    config: &PipelineConfig,
) -> Result<RegisteredSeries> {
    align_series_with_progress(frames, fixed_index, max_iterations, config, |_| {})
}

/// As [`align_series`], calling `on_frame_done` with the number of frames
/// finished so far.
pub fn align_series_with_progress<F>(
    frames: &[Frame],
    fixed_index: usize,
    max_iterations: usize,
    config: &PipelineConfig,
    on_frame_done: F,
) -> Result<RegisteredSeries>
where
    F: Fn(usize) + Send + Sync,
{
    if frames.is_empty() {
        return Err(PerfusionError::EmptySequence);
    }
    if fixed_index >= frames.len() {
        return Err(PerfusionError::FrameIndexOutOfRange {
            index: fixed_index,
            total: frames.len(),
        });
    }
    if max_iterations == 0 {
        return Err(PerfusionError::InvalidArgument(
            "max_iterations must be greater than 0".into(),
        ));
    }
    let registration = &config.registration;
    registration.validate()?;

    let fixed = &frames[fixed_index];
    let group = fixed.id.group;
    let shared_edges = match config.series.fixed_edges {
        FixedEdgeStrategy::Shared => Some(fixed_edge_map(fixed, registration)?),
        FixedEdgeStrategy::PerFrame => None,
    };

    let counter = AtomicUsize::new(0);
    let process = |(i, frame): (usize, &Frame)| -> Result<RegisteredFrame> {
        let result = if i == fixed_index {
            copy_fixed(fixed, shared_edges.as_ref(), registration)
        } else {
            register_frame(
                frame,
                fixed,
                shared_edges.as_ref(),
                max_iterations,
                registration,
            )
        };
        let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
        on_frame_done(done);
        result
    };

    let results: Vec<Result<RegisteredFrame>> = if frames.len() >= PARALLEL_FRAME_THRESHOLD {
        frames.par_iter().enumerate().map(process).collect()
    } else {
        frames.iter().enumerate().map(process).collect()
    };

    let mut registered = Vec::with_capacity(frames.len());
    let mut failures = BTreeMap::new();
    for (frame, result) in frames.iter().zip(results) {
        match result {
            Ok(r) => registered.push(r),
            Err(e) if frame.id == fixed.id => return Err(e),
            Err(e) => match config.series.failure_policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Skip => {
                    warn!(frame = %frame.id, error = %e, "frame registration failed");
                    failures.insert(frame.id, e.to_string());
                }
            },
        }
    }

    let series = RegisteredSeries {
        group,
        fixed: fixed.id,
        frames: registered,
        failures,
    };

    let moving = frames.len() - 1;
    if moving > 0 && series.registered_moving() == 0 {
        return Err(PerfusionError::GroupFailure {
            group,
            failed: series.failures.len(),
        });
    }

    info!(
        group,
        frames = frames.len(),
        registered = series.len(),
        failed = series.failures.len(),
        "series aligned"
    );
    Ok(series)
}

fn fixed_edge_map(fixed: &Frame, config: &RegistrationConfig) -> Result<Mask> {
    detect_edges_with(&fixed.image, config.edge_threshold, &config.edges)
}

fn copy_fixed(
    fixed: &Frame,
    shared_edges: Option<&Mask>,
    config: &RegistrationConfig,
) -> Result<RegisteredFrame> {
    let edges = match shared_edges {
        Some(edges) => edges.clone(),
        None => fixed_edge_map(fixed, config)?,
    };
    Ok(RegisteredFrame {
        id: fixed.id,
        image: fixed.image.clone(),
        mask: fixed.mask.clone(),
        edges,
        transform: SimilarityTransform::identity(fixed.image.dim()),
        quality: None,
    })
}

fn register_frame(
    frame: &Frame,
    fixed: &Frame,
    shared_edges: Option<&Mask>,
    max_iterations: usize,
    config: &RegistrationConfig,
) -> Result<RegisteredFrame> {
    let per_frame;
    let fixed_edges = match shared_edges {
        Some(edges) => edges,
        None => {
            per_frame = fixed_edge_map(fixed, config)?;
            &per_frame
        }
    };

    let pair = register_pair(
        &frame.image,
        &fixed.image,
        &frame.mask,
        &fixed.mask,
        fixed_edges,
        max_iterations,
        config,
    )?;
    let transform = pair.transform();
    debug!(
        frame = %frame.id,
        %transform,
        coarse_dice = pair.coarse_dice,
        fine_dice = pair.fine_dice,
        "frame registered"
    );

    Ok(RegisteredFrame {
        id: frame.id,
        image: pair.image,
        mask: pair.mask,
        edges: pair.edges,
        transform,
        quality: Some(RegistrationQuality {
            coarse_dice: pair.coarse_dice,
            fine_dice: pair.fine_dice,
            refinement_accepted: pair.refinement_accepted,
        }),
    })
}
