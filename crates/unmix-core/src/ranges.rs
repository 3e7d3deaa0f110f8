use ndarray::ArrayView3;

use crate::consts::{RANGE_HIGH_PERCENTILE, RANGE_LOW_PERCENTILE};
use crate::error::{Result, UnmixError};

/// Percentile of `values` with linear interpolation between data points.
///
/// `q` is in [0, 100]. For sorted values `v[0..n]`, the percentile sits at
/// fractional rank `q/100 * (n-1)` and interpolates between the two
/// surrounding samples. An empty slice has no percentiles and yields NaN.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    debug_assert!((0.0..=100.0).contains(&q));

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = q / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;

    if lo + 1 >= n {
        sorted[n - 1]
    } else {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    }
}

/// Per-channel `[2nd, 98th]` percentile display ranges.
///
/// Computed on the raw selected region, before drift correction and
/// background removal: display windows track acquired intensities, not
/// algorithmically adjusted ones. Output order matches channel index order,
/// the same ordering the mixing matrix uses. A region with no pixels has
/// no ranges and is rejected.
pub fn channel_ranges(raw_region: ArrayView3<'_, f64>) -> Result<Vec<[f64; 2]>> {
    let (h, w, nch) = raw_region.dim();
    if h == 0 || w == 0 {
        return Err(UnmixError::ShapeMismatch(
            "Cannot summarize ranges of an empty region".into(),
        ));
    }

    Ok((0..nch)
        .map(|ch| {
            let plane: Vec<f64> = raw_region
                .index_axis(ndarray::Axis(2), ch)
                .iter()
                .copied()
                .collect();
            [
                percentile(&plane, RANGE_LOW_PERCENTILE),
                percentile(&plane, RANGE_HIGH_PERCENTILE),
            ]
        })
        .collect())
}
