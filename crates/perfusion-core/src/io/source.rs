use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::frame::{Image, PositionMetadata};

use super::image_io::load_image;

/// Loads one image together with the positional metadata it carries.
pub trait ImageSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<(Image, PositionMetadata)>;
}

/// Plain raster files (PNG, TIFF, ...) decoded with `image`.
///
/// Raster formats carry no slice position, so the trailing number of the file
/// stem (`slice_012.png` -> 12) is taken as the slice location, scaled by
/// `slice_spacing`. Files without one sit at location 0.
#[derive(Clone, Debug)]
pub struct RasterImageSource {
    pub slice_spacing: f64,
    pub pixel_spacing: Option<(f64, f64)>,
}

impl Default for RasterImageSource {
    fn default() -> Self {
        Self {
            slice_spacing: 1.0,
            pixel_spacing: None,
        }
    }
}

impl ImageSource for RasterImageSource {
    fn load(&self, path: &Path) -> Result<(Image, PositionMetadata)> {
        let image = load_image(path)?;
        let ordinal = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(trailing_number)
            .unwrap_or(0);
        let metadata = PositionMetadata {
            slice_location: ordinal as f64 * self.slice_spacing,
            acquisition_time: None,
            pixel_spacing: self.pixel_spacing,
        };
        debug!(
            path = %path.display(),
            width = image.ncols(),
            height = image.nrows(),
            slice_location = metadata.slice_location,
            "image loaded"
        );
        Ok((image, metadata))
    }
}

fn trailing_number(stem: &str) -> Option<u64> {
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    stem[stem.len() - digits..].parse().ok()
}
