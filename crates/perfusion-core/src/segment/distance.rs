//! Exact Euclidean distance transform (Felzenszwalb & Huttenlocher), used to
//! turn binary contours into signed distance level sets.

use ndarray::Array2;

/// Stand-in for "infinitely far"; finite so the parabola intersections stay
/// well defined.
const FAR: f64 = 1e20;

/// Squared Euclidean distance from every pixel to the nearest `true` pixel.
/// Pixels of a mask with no foreground all receive [`FAR`].
pub fn squared_distance_to(mask: &Array2<bool>) -> Array2<f64> {
    let (h, w) = mask.dim();
    let mut grid = mask.mapv(|b| if b { 0.0 } else { FAR });
    let mut buf_in = vec![0.0f64; h.max(w)];
    let mut buf_out = vec![0.0f64; h.max(w)];

    for col in 0..w {
        for row in 0..h {
            buf_in[row] = grid[[row, col]];
        }
        edt_1d(&buf_in[..h], &mut buf_out[..h]);
        for row in 0..h {
            grid[[row, col]] = buf_out[row];
        }
    }
    for row in 0..h {
        for col in 0..w {
            buf_in[col] = grid[[row, col]];
        }
        edt_1d(&buf_in[..w], &mut buf_out[..w]);
        for col in 0..w {
            grid[[row, col]] = buf_out[col];
        }
    }

    grid
}

/// Euclidean distance from every pixel to the nearest `true` pixel.
pub fn distance_to(mask: &Array2<bool>) -> Array2<f64> {
    squared_distance_to(mask).mapv(f64::sqrt)
}

/// Lower envelope of parabolas rooted at each sample of `f`.
fn edt_1d(f: &[f64], d: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let qf = q as f64;
        loop {
            let p = v[k];
            let pf = p as f64;
            let s = ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf));
            if s <= z[k] && k > 0 {
                k -= 1;
                continue;
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = f64::INFINITY;
            break;
        }
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        let qf = q as f64;
        while z[k + 1] < qf {
            k += 1;
        }
        let p = v[k] as f64;
        *out = (qf - p) * (qf - p) + f[v[k]];
    }
}
