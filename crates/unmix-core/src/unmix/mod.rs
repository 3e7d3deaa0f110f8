pub mod metrics;
pub mod picasso;

use ndarray::{Array2, Array3};

use crate::config::UnmixParams;
use crate::error::Result;

pub use picasso::PicassoEngine;

/// Linear unmixing of a preprocessed multi-channel region.
///
/// Returns the unmixed image (same shape as the input) and the square
/// `nch x nch` unmixing matrix relating mixed and unmixed channels. The
/// iteration is bounded by `params.cycles`; callers only see the final
/// matrix. Failures (unsupported mode, degenerate input) abort the run
/// before any sidecar write.
pub trait UnmixEngine {
    fn unmix(&self, image: &Array3<f64>, params: &UnmixParams)
        -> Result<(Array3<f64>, Array2<f64>)>;
}
