use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::MultiProgress;
use perfusion_core::io::{save_color_image, save_image, save_mask, ImageSource, RasterImageSource};
use perfusion_core::pipeline::{
    process_group_reported, segment_group, FailurePolicy, GroupReport, GroupResult,
    PipelineConfig, PipelineStage, ProgressReporter,
};
use rayon::prelude::*;
use tracing::info;

use crate::progress::BarReporter;
use crate::summary::{print_group_reports, print_run_summary, GroupOutcome};

use super::{image_files, load_config};

#[derive(Args)]
pub struct RunArgs {
    /// Directory with one subdirectory of frames per group
    pub input: PathBuf,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "perfusion_out")]
    pub output: PathBuf,

    /// Fixed frame as a 1-based ordinal within each group
    #[arg(long)]
    pub reference: Option<usize>,

    /// Optimizer iteration cap per registration stage
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Fail a group on its first frame registration error
    #[arg(long)]
    pub abort_on_failure: bool,

    /// Slice spacing used to derive slice locations from file names
    #[arg(long, default_value = "1.0")]
    pub slice_spacing: f64,

    /// Also write each registered frame's mask
    #[arg(long)]
    pub save_masks: bool,
}

/// One group directory and its frame files.
struct GroupInput {
    index: usize,
    name: String,
    files: Vec<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(reference) = args.reference {
        config.series.reference_frame_index = reference;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.registration.max_iterations = max_iterations;
    }
    if args.abort_on_failure {
        config.series.failure_policy = FailurePolicy::Abort;
    }
    config
        .registration
        .validate()
        .context("Invalid registration settings")?;

    let groups = discover_groups(&args.input)?;
    if groups.is_empty() {
        bail!("No image groups found under {}", args.input.display());
    }
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    print_run_summary(&config, &args.input, &args.output, groups.len());

    let source = RasterImageSource {
        slice_spacing: args.slice_spacing,
        ..RasterImageSource::default()
    };
    let multi = MultiProgress::new();
    let outcomes: Vec<GroupOutcome> = groups
        .par_iter()
        .map(|group| {
            let reporter = BarReporter::new(&multi, &group.name);
            let result = run_group(group, &source, &config, &args.output, args.save_masks, &reporter);
            reporter.finish(if result.is_ok() { "done" } else { "failed" });
            GroupOutcome {
                name: group.name.clone(),
                result: result.map_err(|e| format!("{e:#}")),
            }
        })
        .collect();

    print_group_reports(&outcomes, &args.output);

    if outcomes.iter().all(|o| o.result.is_err()) {
        bail!("No group could be processed");
    }
    Ok(())
}

/// Subdirectories of `input` are groups; a directory holding images directly
/// is a single group.
fn discover_groups(input: &Path) -> Result<Vec<GroupInput>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(input)
        .with_context(|| format!("Failed to read input directory {}", input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    if dirs.is_empty() {
        dirs.push(input.to_path_buf());
    }

    let mut groups = Vec::new();
    for dir in dirs {
        let files = image_files(&dir)?;
        if files.is_empty() {
            continue;
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("group{}", groups.len()));
        groups.push(GroupInput {
            index: groups.len(),
            name,
            files,
        });
    }
    Ok(groups)
}

fn run_group(
    group: &GroupInput,
    source: &RasterImageSource,
    config: &PipelineConfig,
    output: &Path,
    save_masks: bool,
    reporter: &BarReporter,
) -> Result<GroupReport> {
    reporter.begin_stage(PipelineStage::Loading, Some(group.files.len()));
    let mut images = Vec::with_capacity(group.files.len());
    for (i, path) in group.files.iter().enumerate() {
        let loaded = source
            .load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        images.push(loaded);
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    let fixed_index = config.series.fixed_index(images.len())?;
    let group_data = segment_group(group.index, images, fixed_index, config, reporter)?;
    let result = process_group_reported(&group_data, config, reporter)?;

    write_outputs(group, &result, output, save_masks, reporter)?;
    info!(group = %reporter.label(), "{}", result.report);
    Ok(result.report)
}

fn write_outputs(
    group: &GroupInput,
    result: &GroupResult,
    output: &Path,
    save_masks: bool,
    reporter: &BarReporter,
) -> Result<()> {
    let dir = output.join(&group.name);
    let registered = dir.join("registered");
    std::fs::create_dir_all(&registered)
        .with_context(|| format!("Failed to create {}", registered.display()))?;

    reporter.begin_stage(PipelineStage::Writing, Some(result.series.len()));
    for (i, frame) in result.series.frames.iter().enumerate() {
        let stem = group.files[frame.id.index]
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("frame_{:03}", frame.id.index));
        let path = registered.join(format!("{stem}.tiff"));
        save_image(&frame.image, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if save_masks {
            let mask_path = registered.join(format!("{stem}_mask.png"));
            save_mask(&frame.mask, &mask_path)
                .with_context(|| format!("Failed to write {}", mask_path.display()))?;
        }
        reporter.advance(i + 1);
    }

    let composite = dir.join("composite.tiff");
    save_image(&result.composite, &composite)
        .with_context(|| format!("Failed to write {}", composite.display()))?;
    let vessels = dir.join("vessel_mask.png");
    save_mask(&result.vessel_mask, &vessels)
        .with_context(|| format!("Failed to write {}", vessels.display()))?;
    let ttp = dir.join("ttp.png");
    save_color_image(&result.color, &ttp)
        .with_context(|| format!("Failed to write {}", ttp.display()))?;
    reporter.finish_stage();
    Ok(())
}
