pub mod source;
pub mod tiff;

pub use source::{ImageSource, InMemorySource};
pub use tiff::TiffSource;
