mod orchestrator;

pub use orchestrator::{demux, Demux, DemuxOutput};
