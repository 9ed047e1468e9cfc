/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;

/// Number of histogram bins for Otsu's thresholding.
pub const OTSU_HISTOGRAM_BINS: usize = 256;

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Default number of Chan-Vese contour evolution steps.
pub const DEFAULT_CONTOUR_ITERATIONS: usize = 300;

/// Connected components smaller than this (pixels) are removed before the
/// ellipse fit.
pub const DEFAULT_MIN_REGION_AREA: usize = 1000;

/// Fraction of the fitted ellipse axes kept for the initial contour.
pub const DEFAULT_SEED_SHRINK_FACTOR: f64 = 0.45;

/// Weight of the curvature (smoothing) term in the Chan-Vese update.
pub const DEFAULT_CONTOUR_SMOOTH_FACTOR: f64 = 0.2;

/// Half-width of the level-set narrow band updated each iteration.
pub const DEFAULT_NARROW_BAND: f64 = 1.2;

/// CFL factor bounding the per-iteration level-set update.
pub const CHAN_VESE_CFL: f64 = 0.45;

/// Time step of the Sussman level-set reinitialization.
pub const SUSSMAN_DT: f64 = 0.5;

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Gaussian sigma applied before gradient computation (Canny).
pub const DEFAULT_EDGE_SIGMA: f32 = std::f32::consts::SQRT_2;

/// Low hysteresis threshold as a fraction of the high one, when only a single
/// sensitivity is given.
pub const DEFAULT_EDGE_LOW_RATIO: f32 = 0.4;

/// Edge sensitivity used for the fine registration pass.
pub const DEFAULT_EDGE_THRESHOLD: f32 = 0.1;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Default optimizer iteration cap per registration stage.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Initial (largest) step length of the regular-step gradient descent.
pub const DEFAULT_MAX_STEP: f64 = 0.25;

/// Step length below which the optimizer stops.
pub const DEFAULT_MIN_STEP: f64 = 1e-5;

/// Step reduction applied whenever the gradient direction reverses.
pub const DEFAULT_RELAXATION: f64 = 0.5;

/// Gradient magnitude below which the optimizer stops.
pub const DEFAULT_GRADIENT_TOLERANCE: f64 = 1e-4;

/// Gaussian sigma applied to reference images before the metric is evaluated.
pub const DEFAULT_REFERENCE_BLUR_SIGMA: f32 = 1.0;

/// Minimum fraction of fixed-grid pixels that must map inside the moving
/// image for a metric evaluation to count.
pub const MIN_OVERLAP_FRACTION: f64 = 0.1;

/// Scales outside [1/MAX_SCALE, MAX_SCALE] are treated as a diverged optimizer.
pub const MAX_SCALE: f64 = 4.0;

// ---------------------------------------------------------------------------
// Series / colorization
// ---------------------------------------------------------------------------

/// Default fixed frame, as a 1-based ordinal within each group.
pub const DEFAULT_REFERENCE_FRAME: usize = 15;

/// Default radius of the disk used to dilate composite edges into a vessel mask.
pub const DEFAULT_DILATION_RADIUS: usize = 2;

/// Default number of colormap levels.
pub const DEFAULT_COLORMAP_LEVELS: usize = 256;
