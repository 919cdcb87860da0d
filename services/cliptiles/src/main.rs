//! cliptiles
//!
//! Reads one multi-band or three single-band rasters and writes an XYZ
//! tile pyramid for the requested zoom range.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use cliptiles::{exit_code, init_tracing, Args};
use pyramid::PyramidBuilder;

fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    if let Err(err) = run(args) {
        error!(error = %format!("{:#}", err), "Tiling failed");
        std::process::exit(exit_code(&err));
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.into_config()?;
    info!(
        inputs = config.inputs.len(),
        output = %config.output.display(),
        zoom_min = config.zoom_min,
        zoom_max = config.zoom_max,
        crs = %config.target_crs,
        tile_size = config.tile_size,
        "Starting cliptiles"
    );

    let builder = PyramidBuilder::new(config).context("invalid configuration")?;
    let report = builder.run().context("building tile pyramid")?;

    info!(
        zooms = report.zooms.len(),
        tiles = report.tiles_written(),
        skipped = report.tiles_skipped(),
        workers = report.workers,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Pyramid complete"
    );
    Ok(())
}
