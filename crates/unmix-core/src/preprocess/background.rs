use ndarray::{Array3, Axis};

use crate::consts::BACKGROUND_PERCENTILE;
use crate::ranges::percentile;

/// Subtract each channel's baseline and clamp at zero.
///
/// The baseline is the channel plane's low percentile rather than its
/// minimum, so isolated dead pixels do not pin the background estimate.
pub fn remove_background(mut image: Array3<f64>) -> Array3<f64> {
    let nch = image.len_of(Axis(2));

    for ch in 0..nch {
        let mut plane = image.index_axis_mut(Axis(2), ch);
        let values: Vec<f64> = plane.iter().copied().collect();
        let baseline = percentile(&values, BACKGROUND_PERCENTILE);
        plane.mapv_inplace(|v| (v - baseline).max(0.0));
    }

    image
}
