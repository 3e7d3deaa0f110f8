pub mod background;
pub mod drift;

use ndarray::Array3;

use crate::error::Result;

/// Preprocessing applied to the working copy of the selected region before
/// unmixing. Both steps preserve shape and channel count; the raw region is
/// kept aside untouched for range summarization.
pub trait Preprocessor {
    fn drift_correct(&self, image: Array3<f64>) -> Result<Array3<f64>>;
    fn remove_background(&self, image: Array3<f64>) -> Result<Array3<f64>>;
}

/// Default preprocessor: per-channel phase-correlation drift correction
/// against channel 0, then per-channel baseline subtraction.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelPreprocessor;

impl Preprocessor for ChannelPreprocessor {
    fn drift_correct(&self, image: Array3<f64>) -> Result<Array3<f64>> {
        drift::correct_drift(&image)
    }

    fn remove_background(&self, image: Array3<f64>) -> Result<Array3<f64>> {
        Ok(background::remove_background(image))
    }
}
