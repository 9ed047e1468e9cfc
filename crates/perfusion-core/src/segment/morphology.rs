use ndarray::Array2;

use super::components::{label_components, Connectivity};

/// Drop 8-connected components with fewer than `min_area` pixels.
pub fn remove_small_regions(mask: &Array2<bool>, min_area: usize) -> Array2<bool> {
    let labeling = label_components(mask, Connectivity::Eight);
    let keep: Vec<u32> = labeling
        .components
        .iter()
        .filter(|c| c.area >= min_area)
        .map(|c| c.label)
        .collect();
    labeling.labels.mapv(|l| l != 0 && keep.contains(&l))
}

/// Fill background regions that are not 4-connected to the image border.
pub fn fill_holes(mask: &Array2<bool>) -> Array2<bool> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return mask.clone();
    }

    let mut outside = Array2::from_elem((h, w), false);
    let mut stack: Vec<(usize, usize)> = Vec::new();

    let seed = |r: usize, c: usize, outside: &mut Array2<bool>, stack: &mut Vec<(usize, usize)>| {
        if !mask[[r, c]] && !outside[[r, c]] {
            outside[[r, c]] = true;
            stack.push((r, c));
        }
    };
    for col in 0..w {
        seed(0, col, &mut outside, &mut stack);
        seed(h - 1, col, &mut outside, &mut stack);
    }
    for row in 0..h {
        seed(row, 0, &mut outside, &mut stack);
        seed(row, w - 1, &mut outside, &mut stack);
    }

    while let Some((r, c)) = stack.pop() {
        let neighbours = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbours {
            if nr < h && nc < w && !mask[[nr, nc]] && !outside[[nr, nc]] {
                outside[[nr, nc]] = true;
                stack.push((nr, nc));
            }
        }
    }

    outside.mapv(|o| !o)
}

/// Offsets `(drow, dcol)` of a disk-shaped structuring element.
pub fn disk_offsets(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut offsets = Vec::new();
    for dr in -r..=r {
        for dc in -r..=r {
            if dr * dr + dc * dc <= r * r {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

/// Binary dilation with a disk of the given radius. Radius 0 is the identity.
pub fn dilate_disk(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    let (h, w) = mask.dim();
    let offsets = disk_offsets(radius);
    let mut result = Array2::from_elem((h, w), false);

    for ((row, col), &set) in mask.indexed_iter() {
        if !set {
            continue;
        }
        for &(dr, dc) in &offsets {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr >= 0 && nr < h as isize && nc >= 0 && nc < w as isize {
                result[[nr as usize, nc as usize]] = true;
            }
        }
    }

    result
}
