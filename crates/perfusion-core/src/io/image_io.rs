use std::path::Path;

use image::{GrayImage, ImageFormat, Luma, Rgb};
use ndarray::Array2;

use crate::error::{PerfusionError, Result};
use crate::frame::{ColorImage, Image, Mask};

fn buffer_mismatch(w: usize, h: usize) -> PerfusionError {
    PerfusionError::InvalidArgument(format!("pixel buffer does not match {w}x{h}"))
}

/// Save an image as 16-bit grayscale TIFF.
pub fn save_tiff(image: &Image, path: &Path) -> Result<()> {
    let (h, w) = image.dim();
    let pixels: Vec<u16> = image
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| buffer_mismatch(w, h))?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save an image as 8-bit grayscale PNG.
pub fn save_png(image: &Image, path: &Path) -> Result<()> {
    let (h, w) = image.dim();

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), v) in image.indexed_iter() {
        let val = (v.clamp(0.0, 1.0) * 255.0) as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save an image, choosing format from file extension.
pub fn save_image(image: &Image, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(image, path),
        _ => save_tiff(image, path),
    }
}

/// Save a mask as a black/white 8-bit PNG.
pub fn save_mask(mask: &Mask, path: &Path) -> Result<()> {
    let (h, w) = mask.dim();

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &inside) in mask.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([if inside { 255 } else { 0 }]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a color image as 16-bit RGB TIFF.
pub fn save_color_tiff(color: &ColorImage, path: &Path) -> Result<()> {
    let (h, w, _) = color.dim();
    let pixels: Vec<u16> = color
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();

    let img = image::ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| buffer_mismatch(w, h))?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a color image as 8-bit RGB PNG.
pub fn save_color_png(color: &ColorImage, path: &Path) -> Result<()> {
    let (h, w, _) = color.dim();

    let mut img = image::RgbImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let channel = |c: usize| (color[[row, col, c]].clamp(0.0, 1.0) * 255.0) as u8;
            img.put_pixel(col as u32, row as u32, Rgb([channel(0), channel(1), channel(2)]));
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a color image, choosing format from file extension.
pub fn save_color_image(color: &ColorImage, path: &Path) -> Result<()> {
    if color.dim().2 != 3 {
        return Err(PerfusionError::InvalidArgument(format!(
            "color image must have 3 channels, got {}",
            color.dim().2
        )));
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_color_png(color, path),
        _ => save_color_tiff(color, path),
    }
}

/// Load any supported raster file as a grayscale image in [0, 1].
pub fn load_image(path: &Path) -> Result<Image> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in gray.enumerate_pixels() {
        data[[row as usize, col as usize]] = pixel.0[0] as f32 / 65535.0;
    }

    Ok(data)
}

/// Load a mask; any non-zero pixel is inside.
pub fn load_mask(path: &Path) -> Result<Mask> {
    let img = image::open(path)?;
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    let mut mask = Mask::from_elem((h as usize, w as usize), false);

    for (col, row, pixel) in gray.enumerate_pixels() {
        mask[[row as usize, col as usize]] = pixel.0[0] > 0;
    }

    Ok(mask)
}
