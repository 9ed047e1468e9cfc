use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array2, Array3};

use crate::error::{PerfusionError, Result};
use crate::filters::normalize;
use crate::segment::{segment, SegmentationConfig};

/// Grayscale image, row-major, shape = (height, width).
/// Pixel values are f32, normalized to [0.0, 1.0] once they enter the pipeline.
pub type Image = Array2<f32>;

/// Binary region of interest or edge map, same shape as its source image.
pub type Mask = Array2<bool>;

/// RGB image, shape = (height, width, 3), channel values in [0.0, 1.0].
pub type ColorImage = Array3<f32>;

/// Identity of a frame: (group index, time/slice index within the group).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId {
    pub group: usize,
    pub index: usize,
}

impl FrameId {
    pub fn new(group: usize, index: usize) -> Self {
        Self { group, index }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.index)
    }
}

/// Positional metadata resolved once when an image is loaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionMetadata {
    /// Spatial location along the slice axis, used upstream for grouping.
    pub slice_location: f64,
    /// Acquisition time in seconds, when the source carries one.
    pub acquisition_time: Option<f64>,
    /// Pixel spacing (row, column) in millimetres.
    pub pixel_spacing: Option<(f64, f64)>,
}

/// A single frame of a group: normalized image plus its segmentation mask.
#[derive(Clone, Debug)]
pub struct Frame {
    pub id: FrameId,
    pub image: Image,
    pub mask: Mask,
    pub metadata: PositionMetadata,
}

impl Frame {
    /// Build a frame from an image and an externally derived mask.
    ///
    /// The image is normalized to [0, 1]; the mask must match its shape.
    pub fn new(id: FrameId, image: Image, mask: Mask) -> Result<Self> {
        if image.dim() != mask.dim() {
            return Err(PerfusionError::InvalidArgument(format!(
                "frame {id}: mask shape {:?} does not match image shape {:?}",
                mask.dim(),
                image.dim()
            )));
        }
        if image.is_empty() {
            return Err(PerfusionError::InvalidArgument(format!(
                "frame {id}: empty image"
            )));
        }
        Ok(Self {
            id,
            image: normalize(&image),
            mask,
            metadata: PositionMetadata::default(),
        })
    }

    /// Build a frame by running the segmenter on `image`.
    pub fn segmented(id: FrameId, image: Image, config: &SegmentationConfig) -> Result<Self> {
        let segmentation = segment(&image, config)?;
        Self::new(id, image, segmentation.mask)
    }

    pub fn with_metadata(mut self, metadata: PositionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn width(&self) -> usize {
        self.image.ncols()
    }

    pub fn height(&self) -> usize {
        self.image.nrows()
    }
}

/// Ordered frames sharing one region, plus the fixed (reference) frame index.
#[derive(Clone, Debug)]
pub struct Group {
    pub index: usize,
    pub frames: Vec<Frame>,
    pub fixed_index: usize,
    /// Moving frames whose segmentation failed, with the reason. They carry
    /// an empty mask.
    pub segmentation_failures: BTreeMap<FrameId, String>,
}

impl Group {
    pub fn new(index: usize, frames: Vec<Frame>, fixed_index: usize) -> Result<Self> {
        if frames.is_empty() {
            return Err(PerfusionError::EmptySequence);
        }
        if fixed_index >= frames.len() {
            return Err(PerfusionError::FrameIndexOutOfRange {
                index: fixed_index,
                total: frames.len(),
            });
        }
        Ok(Self {
            index,
            frames,
            fixed_index,
            segmentation_failures: BTreeMap::new(),
        })
    }

    pub fn fixed(&self) -> &Frame {
        &self.frames[self.fixed_index]
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
