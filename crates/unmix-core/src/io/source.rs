use ndarray::Array3;

use crate::error::Result;
use crate::region::{select_region, CropRect};

/// A multi-channel image that can materialize rectangular regions.
///
/// Implementations are expected to keep peak memory proportional to the
/// requested region, not the whole image; whole-slide sources decode lazily.
pub trait ImageSource {
    /// `(height, width, channels)` of the underlying image.
    fn shape(&self) -> (usize, usize, usize);

    /// Materialize the given region (or the whole image) as an owned
    /// `(row, col, channel)` f64 array.
    fn read_region(&mut self, crop: Option<&CropRect>) -> Result<Array3<f64>>;
}

/// An image already resident in memory. Used by tests and by library
/// callers that decode through some other path.
pub struct InMemorySource {
    data: Array3<f64>,
}

impl InMemorySource {
    pub fn new(data: Array3<f64>) -> Self {
        Self { data }
    }
}

impl ImageSource for InMemorySource {
    fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    fn read_region(&mut self, crop: Option<&CropRect>) -> Result<Array3<f64>> {
        select_region(self.data.view(), crop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_in_memory_source_full_read() {
        let data = Array3::from_shape_fn((2, 3, 2), |(r, c, ch)| (r + c + ch) as f64);
        let mut source = InMemorySource::new(data.clone());
        assert_eq!(source.shape(), (2, 3, 2));
        assert_eq!(source.read_region(None).unwrap(), data);
    }

    #[test]
    fn test_in_memory_source_crop_read() {
        let data = Array3::from_shape_fn((4, 4, 1), |(r, c, _)| (r * 4 + c) as f64);
        let mut source = InMemorySource::new(data);
        let crop = CropRect {
            x: 1,
            y: 2,
            width: 2,
            height: 1,
        };
        let region = source.read_region(Some(&crop)).unwrap();
        assert_eq!(region.dim(), (1, 2, 1));
        assert_eq!(region[[0, 0, 0]], 9.0);
        assert_eq!(region[[0, 1, 0]], 10.0);
    }
}
