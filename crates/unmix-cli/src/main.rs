mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "unmix", about = "Microscopy channel demultiplexing tool")]
#[command(version)]
struct Cli {
    /// Multi-channel (OME-)TIFF image to process
    image: PathBuf,

    /// Sidecar metadata file (default: image path + ".umxjson")
    sidecar: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let output = unmix_core::pipeline::demux(&cli.image, cli.sidecar.as_deref())
        .with_context(|| format!("Failed to demux {}", cli.image.display()))?;

    summary::print_run_summary(&cli.image, &output);
    Ok(())
}
