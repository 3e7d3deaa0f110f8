use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnmixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Malformed sidecar file {path}: {source}")]
    MalformedSidecar {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid crop region: {0}")]
    InvalidCrop(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Unsupported unmixing mode: {0}")]
    UnsupportedMode(String),

    #[error("Sidecar encoding error: {0}")]
    SidecarEncode(#[from] serde_json::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

pub type Result<T> = std::result::Result<T, UnmixError>;
