use ndarray::ArrayView2;

use crate::consts::EPSILON;

/// Global structural similarity between two planes, in [-1, 1].
///
/// Single-window SSIM over the whole plane; the dynamic range is taken
/// from the data since microscopy intensities are not normalized.
pub fn ssim(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> f64 {
    let n = a.len() as f64;
    debug_assert_eq!(a.dim(), b.dim());

    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;

    let mut var_a = 0.0;
    let mut var_b = 0.0;
    let mut cov = 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        var_a += da * da;
        var_b += db * db;
        cov += da * db;
        lo = lo.min(x.min(y));
        hi = hi.max(x.max(y));
    }
    var_a /= n;
    var_b /= n;
    cov /= n;

    let range = if hi - lo > EPSILON { hi - lo } else { 1.0 };
    let c1 = (0.01 * range).powi(2);
    let c2 = (0.03 * range).powi(2);

    ((2.0 * mean_a * mean_b + c1) * (2.0 * cov + c2))
        / ((mean_a * mean_a + mean_b * mean_b + c1) * (var_a + var_b + c2))
}

/// Mutual information of the joint intensity histogram, in nats.
///
/// Each plane is binned over its own [min, max]; a constant plane carries
/// no information and yields 0.
pub fn mutual_information(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>, bins: usize) -> f64 {
    debug_assert_eq!(a.dim(), b.dim());
    debug_assert!(bins >= 2);

    let bin_of = |v: f64, lo: f64, hi: f64| -> Option<usize> {
        if hi - lo < EPSILON {
            return None;
        }
        let t = ((v - lo) / (hi - lo) * bins as f64) as usize;
        Some(t.min(bins - 1))
    };

    let (a_lo, a_hi) = min_max(a);
    let (b_lo, b_hi) = min_max(b);

    let mut joint = vec![0.0f64; bins * bins];
    let mut marg_a = vec![0.0f64; bins];
    let mut marg_b = vec![0.0f64; bins];
    let mut count = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (Some(i), Some(j)) = (bin_of(x, a_lo, a_hi), bin_of(y, b_lo, b_hi)) else {
            return 0.0;
        };
        joint[i * bins + j] += 1.0;
        marg_a[i] += 1.0;
        marg_b[j] += 1.0;
        count += 1.0;
    }

    if count == 0.0 {
        return 0.0;
    }

    let mut mi = 0.0;
    for i in 0..bins {
        for j in 0..bins {
            let p_xy = joint[i * bins + j] / count;
            if p_xy > 0.0 {
                let p_x = marg_a[i] / count;
                let p_y = marg_b[j] / count;
                mi += p_xy * (p_xy / (p_x * p_y)).ln();
            }
        }
    }
    mi
}

fn min_max(plane: ArrayView2<'_, f64>) -> (f64, f64) {
    plane.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn noise_plane(seed: u64, h: usize, w: usize) -> Array2<f64> {
        // Small xorshift so tests stay deterministic without a rand dep.
        let mut state = seed.max(1);
        Array2::from_shape_fn((h, w), |_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as f64 / 1000.0
        })
    }

    #[test]
    fn test_ssim_identical_planes_is_one() {
        let a = noise_plane(7, 16, 16);
        assert_relative_eq!(ssim(a.view(), a.view()), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ssim_lower_for_unrelated_planes() {
        let a = noise_plane(7, 16, 16);
        let b = noise_plane(1234, 16, 16);
        assert!(ssim(a.view(), b.view()) < 0.99);
    }

    #[test]
    fn test_mi_identical_exceeds_independent() {
        let a = noise_plane(7, 32, 32);
        let b = noise_plane(99, 32, 32);
        let mi_self = mutual_information(a.view(), a.view(), 16);
        let mi_cross = mutual_information(a.view(), b.view(), 16);
        assert!(mi_self > mi_cross);
        assert!(mi_cross >= 0.0);
    }

    #[test]
    fn test_mi_constant_plane_is_zero() {
        let a = Array2::from_elem((8, 8), 3.0);
        let b = noise_plane(5, 8, 8);
        assert_eq!(mutual_information(a.view(), b.view(), 16), 0.0);
    }
}
