mod common;

use std::sync::Mutex;

use tempfile::TempDir;

use ndarray::Array2;

use common::{
    in_disk, perfusion_frames, perfusion_image, perfusion_mask, vessel_center, BOLUS, SIZE,
    VESSEL_RADIUS,
};
use perfusion_core::error::PerfusionError;
use perfusion_core::frame::{Frame, FrameId, Group, Image, PositionMetadata};
use perfusion_core::io::{load_image, save_color_image, save_image, ImageSource, RasterImageSource};
use perfusion_core::pipeline::{
    process_group, process_group_reported, segment_group, FailurePolicy, NoOpReporter,
    PipelineConfig, PipelineStage, ProgressReporter, SeriesConfig,
};
use perfusion_core::ttp::TtpMap;

const FIXED: usize = 1;

fn phantom_config() -> PipelineConfig {
    PipelineConfig {
        series: SeriesConfig {
            reference_frame_index: FIXED + 1,
            ..SeriesConfig::default()
        },
        ..PipelineConfig::default()
    }
}

/// The bolus peaks in acquisition 2 over the whole fixed-frame vessel disk.
fn assert_vessel_peaks_at_frame_two(ttp: &TtpMap) {
    let vessel = vessel_center(FIXED);
    let mut checked = 0;
    for r in 0..SIZE {
        for c in 0..SIZE {
            if in_disk(r as f64, c as f64, vessel, VESSEL_RADIUS) {
                assert_eq!(ttp.get(r, c), Some(2), "ttp at ({r}, {c})");
                checked += 1;
            }
        }
    }
    assert!(checked > 100);
}

fn phantom_images() -> Vec<(Image, PositionMetadata)> {
    (0..BOLUS.len())
        .map(|t| (perfusion_image(t), PositionMetadata::default()))
        .collect()
}

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<PipelineStage>>,
    advanced: Mutex<usize>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }

    fn advance(&self, _items_done: usize) {
        *self.advanced.lock().unwrap() += 1;
    }
}

#[test]
fn test_group_from_ground_truth_masks() {
    let frames = perfusion_frames(0);
    let config = phantom_config();
    let fixed = config.series.fixed_index(frames.len()).unwrap();
    let group = Group::new(0, frames, fixed).unwrap();

    let result = process_group(&group, &config).unwrap();

    assert_eq!(result.report.processed, BOLUS.len());
    assert_eq!(result.report.failed, 0);
    assert_eq!(result.report.to_string(), "group 0: 4 processed, 0 failed");
    assert_eq!(result.composite.dim(), group.fixed().image.dim());
    assert_eq!(result.color.dim(), (common::SIZE, common::SIZE, 3));
    assert!(result.vessel_mask.iter().any(|&b| b));

    assert_vessel_peaks_at_frame_two(&result.ttp);

    // Background outside the vessel mask stays black.
    for ((r, c), &inside) in result.vessel_mask.indexed_iter() {
        if !inside {
            assert!((0..3).all(|k| result.color[[r, c, k]] == 0.0));
        }
    }
}

#[test]
fn test_segmented_group_end_to_end() {
    let config = phantom_config();
    let group = segment_group(3, phantom_images(), FIXED, &config, &NoOpReporter).unwrap();
    assert_eq!(group.index, 3);
    assert_eq!(group.len(), BOLUS.len());
    assert!(group.segmentation_failures.is_empty());
    assert!(group.frames.iter().all(|f| f.mask.iter().any(|&b| b)));

    let result = process_group(&group, &config).unwrap();
    assert_eq!(result.report.processed, BOLUS.len());
    assert_eq!(result.report.failed, 0);
    assert_eq!(result.ttp.frames(), BOLUS.len());
    assert_eq!(result.ttp.dim(), result.composite.dim());
    assert_vessel_peaks_at_frame_two(&result.ttp);
}

#[test]
fn test_skipped_frame_keeps_acquisition_numbering() {
    // Acquisition 1 has no usable mask and is skipped.
    let frames: Vec<Frame> = (0..BOLUS.len())
        .map(|t| {
            let mask = if t == 0 {
                Array2::from_elem((SIZE, SIZE), false)
            } else {
                perfusion_mask(t)
            };
            Frame::new(FrameId::new(0, t), perfusion_image(t), mask).unwrap()
        })
        .collect();
    let config = phantom_config();
    let group = Group::new(0, frames, FIXED).unwrap();

    let result = process_group(&group, &config).unwrap();

    assert_eq!(result.report.processed, BOLUS.len() - 1);
    assert!(result.report.failures.contains_key(&FrameId::new(0, 0)));
    assert_eq!(result.ttp.frames(), BOLUS.len());
    assert_vessel_peaks_at_frame_two(&result.ttp);
    assert!(result.ttp.indices().iter().all(|&i| i >= 2));
}

#[test]
fn test_segmentation_failure_recorded_as_cause() {
    let config = phantom_config();
    let mut images = phantom_images();
    images[3].0.fill(0.0);

    let group = segment_group(0, images, FIXED, &config, &NoOpReporter).unwrap();
    let blank = FrameId::new(0, 3);
    assert!(group.segmentation_failures.contains_key(&blank));
    assert!(!group.frames[3].mask.iter().any(|&b| b));

    let result = process_group(&group, &config).unwrap();
    assert_eq!(result.report.failed, 1);
    let reason = &result.report.failures[&blank];
    assert!(reason.starts_with("Segmentation failed"), "{reason}");
    assert_vessel_peaks_at_frame_two(&result.ttp);

    let mut abort = config.clone();
    abort.series.failure_policy = FailurePolicy::Abort;
    assert!(matches!(
        process_group(&group, &abort),
        Err(PerfusionError::Segmentation(_))
    ));
}

#[test]
fn test_reporter_sees_every_stage() {
    let frames = perfusion_frames(1);
    let config = phantom_config();
    let group = Group::new(1, frames, FIXED).unwrap();
    let reporter = RecordingReporter::default();

    process_group_reported(&group, &config, &reporter).unwrap();

    let stages = reporter.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Registration,
            PipelineStage::Merging,
            PipelineStage::Colorizing
        ]
    );
    assert_eq!(*reporter.advanced.lock().unwrap(), BOLUS.len());
}

#[test]
fn test_outputs_written_and_reloaded() {
    let frames = perfusion_frames(0);
    let config = phantom_config();
    let group = Group::new(0, frames, FIXED).unwrap();
    let result = process_group(&group, &config).unwrap();

    let dir = TempDir::new().unwrap();
    let composite_path = dir.path().join("composite.tiff");
    let color_path = dir.path().join("ttp.png");
    save_image(&result.composite, &composite_path).unwrap();
    save_color_image(&result.color, &color_path).unwrap();

    let composite = load_image(&composite_path).unwrap();
    assert_eq!(composite.dim(), result.composite.dim());
    assert!(composite.iter().cloned().fold(0.0f32, f32::max) > 0.99);

    for (i, frame) in result.series.frames.iter().enumerate() {
        let path = dir.path().join(format!("registered_{i:03}.png"));
        save_image(&frame.image, &path).unwrap();
        let (_, meta) = RasterImageSource::default().load(&path).unwrap();
        assert_eq!(meta.slice_location, i as f64);
    }
}

#[test]
fn test_group_construction_errors() {
    assert!(matches!(
        Group::new(0, Vec::new(), 0),
        Err(PerfusionError::EmptySequence)
    ));
    assert!(matches!(
        Group::new(0, perfusion_frames(0), 4),
        Err(PerfusionError::FrameIndexOutOfRange { index: 4, total: 4 })
    ));
}

#[test]
fn test_unsegmentable_fixed_frame_fails_group() {
    let config = phantom_config();
    let mut images = phantom_images();
    images[FIXED].0.fill(0.0);

    let err = segment_group(0, images, FIXED, &config, &NoOpReporter).unwrap_err();
    assert!(matches!(err, PerfusionError::Segmentation(_)));
}
