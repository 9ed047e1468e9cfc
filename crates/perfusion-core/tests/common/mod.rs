#![allow(dead_code)]

use ndarray::Array2;

use perfusion_core::frame::{Frame, FrameId, Image, Mask};

pub const SIZE: usize = 64;

/// Head ellipse semi-axes (columns, rows).
pub const HEAD_SEMI_COL: f64 = 24.0;
pub const HEAD_SEMI_ROW: f64 = 19.0;
pub const HEAD_LEVEL: f32 = 0.4;

/// Vessel disk, relative to the head center.
pub const VESSEL_OFFSET: (f64, f64) = (-5.0, 8.0);
pub const VESSEL_RADIUS: f64 = 6.0;

/// Static 5x5 fiducial at full intensity, relative to the head center. It
/// pins every frame's maximum to 1 so per-frame normalization keeps the
/// vessel contrast.
pub const FIDUCIAL_OFFSET: (isize, isize) = (8, -10);

/// Vessel intensity per frame: peaks in frame 2 (1-based).
pub const BOLUS: [f32; 4] = [0.5, 0.9, 0.7, 0.6];

/// Per-frame content shift `(drow, dcol)`. Frame 2 is the fixed frame and is
/// not shifted.
pub const SHIFTS: [(f64, f64); 4] = [(-2.0, 3.0), (0.0, 0.0), (2.0, -1.0), (3.0, 2.0)];

pub fn center() -> (f64, f64) {
    ((SIZE as f64 - 1.0) / 2.0, (SIZE as f64 - 1.0) / 2.0)
}

pub fn in_ellipse(row: f64, col: f64, center: (f64, f64), semi_row: f64, semi_col: f64) -> bool {
    let dr = (row - center.0) / semi_row;
    let dc = (col - center.1) / semi_col;
    dr * dr + dc * dc <= 1.0
}

pub fn in_disk(row: f64, col: f64, center: (f64, f64), radius: f64) -> bool {
    let dr = row - center.0;
    let dc = col - center.1;
    dr * dr + dc * dc <= radius * radius
}

/// Filled disk of `value` on a zero background.
pub fn disk_image(dim: (usize, usize), center: (f64, f64), radius: f64, value: f32) -> Image {
    Array2::from_shape_fn(dim, |(r, c)| {
        if in_disk(r as f64, c as f64, center, radius) {
            value
        } else {
            0.0
        }
    })
}

pub fn disk_mask(dim: (usize, usize), center: (f64, f64), radius: f64) -> Mask {
    Array2::from_shape_fn(dim, |(r, c)| in_disk(r as f64, c as f64, center, radius))
}

/// Filled axis-aligned ellipse of `value` on a zero background.
pub fn ellipse_image(
    dim: (usize, usize),
    center: (f64, f64),
    semi_row: f64,
    semi_col: f64,
    value: f32,
) -> Image {
    Array2::from_shape_fn(dim, |(r, c)| {
        if in_ellipse(r as f64, c as f64, center, semi_row, semi_col) {
            value
        } else {
            0.0
        }
    })
}

/// Head center of frame `t` (0-based).
pub fn head_center(t: usize) -> (f64, f64) {
    let (cr, cc) = center();
    (cr + SHIFTS[t].0, cc + SHIFTS[t].1)
}

pub fn vessel_center(t: usize) -> (f64, f64) {
    let (hr, hc) = head_center(t);
    (hr + VESSEL_OFFSET.0, hc + VESSEL_OFFSET.1)
}

/// Perfusion phantom for frame `t`: head ellipse, bolus-modulated vessel and
/// a static fiducial, all shifted by `SHIFTS[t]`.
pub fn perfusion_image(t: usize) -> Image {
    let head = head_center(t);
    let vessel = vessel_center(t);
    let fid_row = (head.0.round() as isize + FIDUCIAL_OFFSET.0) as usize;
    let fid_col = (head.1.round() as isize + FIDUCIAL_OFFSET.1) as usize;

    Array2::from_shape_fn((SIZE, SIZE), |(r, c)| {
        let (rf, cf) = (r as f64, c as f64);
        if r.abs_diff(fid_row) <= 2 && c.abs_diff(fid_col) <= 2 {
            1.0
        } else if in_disk(rf, cf, vessel, VESSEL_RADIUS) {
            BOLUS[t]
        } else if in_ellipse(rf, cf, head, HEAD_SEMI_ROW, HEAD_SEMI_COL) {
            HEAD_LEVEL
        } else {
            0.0
        }
    })
}

/// Ground-truth head mask of frame `t`.
pub fn perfusion_mask(t: usize) -> Mask {
    let head = head_center(t);
    Array2::from_shape_fn((SIZE, SIZE), |(r, c)| {
        in_ellipse(r as f64, c as f64, head, HEAD_SEMI_ROW, HEAD_SEMI_COL)
    })
}

/// Four-frame perfusion group with ground-truth masks.
pub fn perfusion_frames(group: usize) -> Vec<Frame> {
    (0..BOLUS.len())
        .map(|t| {
            Frame::new(FrameId::new(group, t), perfusion_image(t), perfusion_mask(t))
                .expect("valid phantom frame")
        })
        .collect()
}

pub fn count(mask: &Mask) -> usize {
    mask.iter().filter(|&&b| b).count()
}
