use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};
use tracing::info;

use crate::config::UnmixParams;
use crate::error::Result;
use crate::io::{ImageSource, TiffSource};
use crate::preprocess::{ChannelPreprocessor, Preprocessor};
use crate::ranges::channel_ranges;
use crate::sidecar::{default_sidecar_path, SidecarRecord};
use crate::unmix::{PicassoEngine, UnmixEngine};

/// Everything a finished run produced, beyond what went into the sidecar.
#[derive(Debug)]
pub struct DemuxOutput {
    pub sidecar_path: PathBuf,
    pub params: UnmixParams,
    pub p_matrix: Array2<f64>,
    pub channel_ranges: Vec<[f64; 2]>,
    pub unmixed: Array3<f64>,
}

/// The demultiplexing pipeline with its two numerical collaborators.
///
/// Both seams take trait objects so tests can run the orchestration against
/// stubs without touching FFTs or the real engine.
pub struct Demux {
    preprocessor: Box<dyn Preprocessor>,
    engine: Box<dyn UnmixEngine>,
}

impl Default for Demux {
    fn default() -> Self {
        Self {
            preprocessor: Box::new(ChannelPreprocessor),
            engine: Box::new(PicassoEngine),
        }
    }
}

impl Demux {
    pub fn new(preprocessor: Box<dyn Preprocessor>, engine: Box<dyn UnmixEngine>) -> Self {
        Self {
            preprocessor,
            engine,
        }
    }

    /// Run the full pipeline against an opened source, persisting into
    /// `sidecar_path`.
    ///
    /// Strictly sequential: read record, select region, resolve params,
    /// drift-correct, remove background, unmix, summarize ranges, save.
    /// Any failure propagates before the terminal save, so an existing
    /// sidecar file is never left half-written.
    pub fn run(&self, source: &mut dyn ImageSource, sidecar_path: &Path) -> Result<DemuxOutput> {
        let (height, width, nch) = source.shape();
        info!(height, width, channels = nch, "Image opened");

        let mut record = SidecarRecord::load(sidecar_path)?;

        // Raw region is kept for range summarization; preprocessing only
        // ever sees the working copy.
        let raw = source.read_region(record.crop.as_ref())?;
        let working = raw.clone();
        info!(
            rows = raw.dim().0,
            cols = raw.dim().1,
            cropped = record.crop.is_some(),
            "Region selected"
        );

        let params = UnmixParams::resolve(nch, &record);
        info!(
            bins = params.bins,
            cycles = params.cycles,
            mode = %params.mode,
            "Parameters resolved"
        );

        let working = self.preprocessor.drift_correct(working)?;
        let working = self.preprocessor.remove_background(working)?;

        let (unmixed, p_matrix) = self.engine.unmix(&working, &params)?;

        let ranges = channel_ranges(raw.view())?;

        record.set_results(&p_matrix, ranges.clone());
        record.save(sidecar_path)?;
        info!(path = %sidecar_path.display(), "Run complete");

        Ok(DemuxOutput {
            sidecar_path: sidecar_path.to_path_buf(),
            params,
            p_matrix,
            channel_ranges: ranges,
            unmixed,
        })
    }
}

/// Two-argument entry point: open `image_path` as a TIFF, derive the
/// sidecar path by suffix when none is given, run the default pipeline.
pub fn demux(image_path: &Path, sidecar_path: Option<&Path>) -> Result<DemuxOutput> {
    let sidecar = match sidecar_path {
        Some(path) => path.to_path_buf(),
        None => default_sidecar_path(image_path),
    };

    let mut source = TiffSource::open(image_path)?;
    Demux::default().run(&mut source, &sidecar)
}
