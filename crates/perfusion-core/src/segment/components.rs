use std::collections::HashMap;

use ndarray::Array2;

/// Pixel adjacency used for connected component labeling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Four,
    Eight,
}

/// Statistics for a single connected component.
#[derive(Clone, Debug)]
pub struct ComponentStats {
    /// Label of this component in [`Labeling::labels`].
    pub label: u32,
    /// Number of pixels in the component.
    pub area: usize,
    /// Bounding box: (min_row, max_row, min_col, max_col).
    pub bbox: (usize, usize, usize, usize),
    sum_row: f64,
    sum_col: f64,
    sum_row2: f64,
    sum_col2: f64,
    sum_row_col: f64,
}

impl ComponentStats {
    fn new(label: u32, row: usize, col: usize) -> Self {
        Self {
            label,
            area: 0,
            bbox: (row, row, col, col),
            sum_row: 0.0,
            sum_col: 0.0,
            sum_row2: 0.0,
            sum_col2: 0.0,
            sum_row_col: 0.0,
        }
    }

    fn add(&mut self, row: usize, col: usize) {
        let (r, c) = (row as f64, col as f64);
        self.area += 1;
        self.sum_row += r;
        self.sum_col += c;
        self.sum_row2 += r * r;
        self.sum_col2 += c * c;
        self.sum_row_col += r * c;
        self.bbox.0 = self.bbox.0.min(row);
        self.bbox.1 = self.bbox.1.max(row);
        self.bbox.2 = self.bbox.2.min(col);
        self.bbox.3 = self.bbox.3.max(col);
    }

    /// Centroid as `(row, col)`.
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.area as f64;
        (self.sum_row / n, self.sum_col / n)
    }

    /// Normalized second central moments `(mu_cc, mu_rr, mu_rc)`, i.e. the
    /// variance along columns (x), along rows (y), and the covariance.
    pub fn central_moments(&self) -> (f64, f64, f64) {
        let n = self.area as f64;
        let (cr, cc) = self.centroid();
        let mu_cc = self.sum_col2 / n - cc * cc;
        let mu_rr = self.sum_row2 / n - cr * cr;
        let mu_rc = self.sum_row_col / n - cr * cc;
        (mu_cc, mu_rr, mu_rc)
    }
}

/// Label map plus per-component statistics.
#[derive(Clone, Debug)]
pub struct Labeling {
    /// 0 = background; other values match `ComponentStats::label`.
    pub labels: Array2<u32>,
    /// Components sorted by area descending (largest first).
    pub components: Vec<ComponentStats>,
}

impl Labeling {
    /// Mask of a single component.
    pub fn component_mask(&self, label: u32) -> Array2<bool> {
        self.labels.mapv(|l| l == label)
    }

    /// The largest component, if any.
    pub fn largest(&self) -> Option<&ComponentStats> {
        self.components.first()
    }
}

/// Two-pass connected component labeling with union-find.
pub fn label_components(mask: &Array2<bool>, connectivity: Connectivity) -> Labeling {
    let (h, w) = mask.dim();
    let mut labels = Array2::<u32>::zeros((h, w));
    if h == 0 || w == 0 {
        return Labeling {
            labels,
            components: Vec::new(),
        };
    }

    let mut next_label: u32 = 1;
    // Union-find parent array. Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0; h * w / 2 + 2];

    // Pass 1: provisional labels from already-visited neighbours.
    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            let mut neighbours = [0u32; 4];
            neighbours[0] = if col > 0 { labels[[row, col - 1]] } else { 0 };
            if row > 0 {
                neighbours[1] = labels[[row - 1, col]];
                if connectivity == Connectivity::Eight {
                    neighbours[2] = if col > 0 { labels[[row - 1, col - 1]] } else { 0 };
                    neighbours[3] = if col + 1 < w { labels[[row - 1, col + 1]] } else { 0 };
                }
            }

            let smallest = neighbours.iter().copied().filter(|&l| l > 0).min();
            match smallest {
                None => {
                    if next_label as usize >= parent.len() {
                        parent.resize(parent.len() * 2, 0);
                    }
                    parent[next_label as usize] = next_label;
                    labels[[row, col]] = next_label;
                    next_label += 1;
                }
                Some(smallest) => {
                    labels[[row, col]] = smallest;
                    for &other in neighbours.iter().filter(|&&l| l > 0 && l != smallest) {
                        union(&mut parent, smallest, other);
                    }
                }
            }
        }
    }

    for i in 1..next_label as usize {
        parent[i] = find(&parent, i as u32);
    }

    // Pass 2: resolve labels and accumulate stats.
    let mut stats = HashMap::<u32, ComponentStats>::new();
    for row in 0..h {
        for col in 0..w {
            let lbl = labels[[row, col]];
            if lbl == 0 {
                continue;
            }
            let root = parent[lbl as usize];
            labels[[row, col]] = root;
            stats
                .entry(root)
                .or_insert_with(|| ComponentStats::new(root, row, col))
                .add(row, col);
        }
    }

    let mut components: Vec<ComponentStats> = stats.into_values().collect();
    components.sort_unstable_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));
    Labeling { labels, components }
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // Merge larger root into smaller root to keep labels consistent.
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}
