pub mod image_io;
pub mod source;

pub use image_io::{
    load_image, load_mask, save_color_image, save_image, save_mask,
};
pub use source::{ImageSource, RasterImageSource};
