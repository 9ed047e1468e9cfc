use ndarray::Array2;

use super::components::ComponentStats;

/// Ellipse with the same normalized second central moments as a region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EllipseFit {
    pub center_row: f64,
    pub center_col: f64,
    /// Semi-axis along `orientation`.
    pub semi_major: f64,
    pub semi_minor: f64,
    /// Angle of the major axis from the column (x) axis towards the row (y)
    /// axis, in radians.
    pub orientation: f64,
}

impl EllipseFit {
    /// Moment-based fit. Each pixel is treated as a unit square, which adds
    /// 1/12 to both axis variances.
    pub fn from_component(stats: &ComponentStats) -> Self {
        let (center_row, center_col) = stats.centroid();
        let (mu_cc, mu_rr, mu_rc) = stats.central_moments();
        let uxx = mu_cc + 1.0 / 12.0;
        let uyy = mu_rr + 1.0 / 12.0;
        let uxy = mu_rc;

        let common = ((uxx - uyy).powi(2) + 4.0 * uxy * uxy).sqrt();
        let semi_major = (2.0 * (uxx + uyy + common)).sqrt();
        let semi_minor = (2.0 * (uxx + uyy - common).max(0.0)).sqrt();
        let orientation = 0.5 * (2.0 * uxy).atan2(uxx - uyy);

        Self {
            center_row,
            center_col,
            semi_major,
            semi_minor,
            orientation,
        }
    }

    /// Same center and orientation, both axes multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            semi_major: self.semi_major * factor,
            semi_minor: self.semi_minor * factor,
            ..*self
        }
    }

    pub fn contains(&self, row: f64, col: f64) -> bool {
        if self.semi_major <= 0.0 || self.semi_minor <= 0.0 {
            return false;
        }
        let dx = col - self.center_col;
        let dy = row - self.center_row;
        let (sin, cos) = self.orientation.sin_cos();
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        (u / self.semi_major).powi(2) + (v / self.semi_minor).powi(2) <= 1.0
    }

    /// Rasterize onto a `(height, width)` grid, sampling pixel centers.
    pub fn rasterize(&self, dim: (usize, usize)) -> Array2<bool> {
        Array2::from_shape_fn(dim, |(row, col)| self.contains(row as f64, col as f64))
    }
}
