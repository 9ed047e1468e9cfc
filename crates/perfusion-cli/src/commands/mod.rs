pub mod config;
pub mod register;
pub mod run;
pub mod segment;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use perfusion_core::pipeline::PipelineConfig;

/// Pipeline configuration from a TOML file, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&contents).context("Invalid pipeline config")
        }
        None => Ok(PipelineConfig::default()),
    }
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "tif", "tiff", "jpg", "jpeg", "bmp"];

/// Raster files directly inside `dir`, sorted by name.
pub fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && supported {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
