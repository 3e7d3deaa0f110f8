use ndarray::{s, Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UnmixError};

/// A rectangle in image coordinates for cropping, `x` along columns and
/// `y` along rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CropRect {
    /// Validate the crop rect against source dimensions.
    pub fn validated(&self, src_w: usize, src_h: usize) -> Result<CropRect> {
        if self.width == 0 || self.height == 0 {
            return Err(UnmixError::InvalidCrop(
                "Crop width and height must be > 0".into(),
            ));
        }

        if self.x + self.width > src_w || self.y + self.height > src_h {
            return Err(UnmixError::InvalidCrop(format!(
                "Crop region ({},{} {}x{}) exceeds source dimensions ({}x{})",
                self.x, self.y, self.width, self.height, src_w, src_h
            )));
        }

        Ok(self.clone())
    }
}

/// Select the sub-array to process from a `(row, col, channel)` image.
///
/// With a crop, returns `image[y..y+height, x..x+width, ..]`; without one,
/// the whole image. Either way the result is an owned, standard-layout copy
/// so downstream preprocessing can mutate it freely.
pub fn select_region(image: ArrayView3<'_, f64>, crop: Option<&CropRect>) -> Result<Array3<f64>> {
    let (h, w, _) = image.dim();

    match crop {
        Some(rect) => {
            let rect = rect.validated(w, h)?;
            let view = image.slice(s![
                rect.y..rect.y + rect.height,
                rect.x..rect.x + rect.width,
                ..
            ]);
            Ok(view.to_owned())
        }
        None => Ok(image.to_owned()),
    }
}
