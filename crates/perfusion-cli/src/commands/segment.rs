use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use perfusion_core::io::{load_image, save_image, save_mask};
use perfusion_core::segment::segment;

use super::load_config;

#[derive(Args)]
pub struct SegmentArgs {
    /// Input image
    pub file: PathBuf,

    /// Pipeline config file (TOML); only its segmentation section is used
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Contour evolution steps
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Output mask path
    #[arg(short, long, default_value = "mask.png")]
    pub output: PathBuf,

    /// Also write the image with everything outside the mask zeroed
    #[arg(long)]
    pub masked: Option<PathBuf>,
}

pub fn run(args: &SegmentArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?.segmentation;
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }

    let image = load_image(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    println!(
        "Segmenting {} ({}x{})",
        args.file.display(),
        image.ncols(),
        image.nrows()
    );

    let result = segment(&image, &config)?;
    let area = result.mask.iter().filter(|&&b| b).count();
    println!(
        "Region: {} px ({:.1}% of the image) after {} iterations",
        area,
        100.0 * area as f64 / result.mask.len() as f64,
        result.iterations
    );

    save_mask(&result.mask, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Mask saved to {}", args.output.display());

    if let Some(ref path) = args.masked {
        save_image(&result.masked_image, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Masked image saved to {}", path.display());
    }

    Ok(())
}
