//! Similarity registration of a moving frame onto a fixed frame.
//!
//! A transform is estimated on binary references (masks or edge maps) by
//! regular-step gradient descent on their mean squared difference, then
//! applied to the moving image with bilinear resampling.

pub mod config;
pub mod estimator;
pub mod metric;
mod optimizer;
pub mod resample;
pub mod transform;
pub mod two_stage;

pub use config::RegistrationConfig;
pub use estimator::{estimate_and_apply, Registered};
pub use metric::dice;
pub use optimizer::StopReason;
pub use resample::{bilinear_sample, warp, warp_mask};
pub use transform::{SimilarityTransform, TransformFamily};
pub use two_stage::{register_pair, PairRegistration};
