use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use perfusion_core::edges::detect_edges_with;
use perfusion_core::filters::normalize;
use perfusion_core::frame::{Image, Mask};
use perfusion_core::io::{load_image, load_mask, save_image, save_mask};
use perfusion_core::register::register_pair;
use perfusion_core::segment::{segment, SegmentationConfig};

use crate::summary::print_registration_result;

use super::load_config;

#[derive(Args)]
pub struct RegisterArgs {
    /// Moving image
    pub moving: PathBuf,

    /// Fixed (reference) image
    pub fixed: PathBuf,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Mask of the moving image; segmented automatically when omitted
    #[arg(long)]
    pub moving_mask: Option<PathBuf>,

    /// Mask of the fixed image; segmented automatically when omitted
    #[arg(long)]
    pub fixed_mask: Option<PathBuf>,

    /// Optimizer iteration cap per stage
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Output path for the registered moving image
    #[arg(short, long, default_value = "registered.tiff")]
    pub output: PathBuf,

    /// Also write the registered moving edge map
    #[arg(long)]
    pub edges: Option<PathBuf>,
}

fn load_frame(
    image_path: &Path,
    mask_path: Option<&Path>,
    config: &SegmentationConfig,
) -> Result<(Image, Mask)> {
    let image = load_image(image_path)
        .with_context(|| format!("Failed to load {}", image_path.display()))?;
    let mask = match mask_path {
        Some(path) => {
            load_mask(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => {
            segment(&image, config)
                .with_context(|| format!("Failed to segment {}", image_path.display()))?
                .mask
        }
    };
    Ok((normalize(&image), mask))
}

pub fn run(args: &RegisterArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let registration = &config.registration;
    let max_iterations = args.max_iterations.unwrap_or(registration.max_iterations);

    let (moving, moving_mask) =
        load_frame(&args.moving, args.moving_mask.as_deref(), &config.segmentation)?;
    let (fixed, fixed_mask) =
        load_frame(&args.fixed, args.fixed_mask.as_deref(), &config.segmentation)?;
    println!(
        "Registering {} onto {}",
        args.moving.display(),
        args.fixed.display()
    );

    let fixed_edges = detect_edges_with(&fixed, registration.edge_threshold, &registration.edges)?;
    let pair = register_pair(
        &moving,
        &fixed,
        &moving_mask,
        &fixed_mask,
        &fixed_edges,
        max_iterations,
        registration,
    )?;
    print_registration_result(&pair);

    save_image(&pair.image, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Registered image saved to {}", args.output.display());

    if let Some(ref path) = args.edges {
        save_mask(&pair.edges, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Edge map saved to {}", path.display());
    }

    Ok(())
}
