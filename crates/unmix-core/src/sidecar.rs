use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::consts::SIDECAR_SUFFIX;
use crate::error::{Result, UnmixError};
use crate::region::CropRect;

/// In-memory working copy of the sidecar metadata file.
///
/// Known keys get typed fields; everything else lands in `extra` and is
/// written back verbatim, so a run only ever adds or replaces `p_matrix`
/// and `output_channel_ranges`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRect>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Linear unmixing coefficients, `nch x nch`, written after a run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_matrix: Option<Vec<Vec<f64>>>,

    /// Per-channel `[low, high]` display ranges, written after a run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_channel_ranges: Option<Vec<[f64; 2]>>,

    /// Keys this tool does not interpret, preserved across runs.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SidecarRecord {
    /// Read a record from disk. A missing file yields an empty record;
    /// a file that exists but does not parse is a fatal error.
    pub fn load(path: &Path) -> Result<SidecarRecord> {
        if !path.exists() {
            debug!(path = %path.display(), "No sidecar file, starting empty");
            return Ok(SidecarRecord::default());
        }

        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| UnmixError::MalformedSidecar {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the full record back, pretty-printed. This is the pipeline's
    /// single terminal write; nothing is persisted before it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        debug!(path = %path.display(), "Sidecar written");
        Ok(())
    }

    /// Merge a run's outputs into the record.
    pub fn set_results(&mut self, p_matrix: &Array2<f64>, ranges: Vec<[f64; 2]>) {
        self.p_matrix = Some(
            p_matrix
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        );
        self.output_channel_ranges = Some(ranges);
    }
}

/// Derive the default sidecar path by appending [`SIDECAR_SUFFIX`] to the
/// image path. Callers that want a different convention pass an explicit
/// path instead.
pub fn default_sidecar_path(image_path: &Path) -> PathBuf {
    let mut os = image_path.as_os_str().to_os_string();
    os.push(SIDECAR_SUFFIX);
    PathBuf::from(os)
}
