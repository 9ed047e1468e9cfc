pub mod gaussian_blur;
pub mod levels;

pub use gaussian_blur::gaussian_blur_array;
pub use levels::{apply_mask, mask_to_image, normalize};
