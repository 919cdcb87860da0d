//! Command line front end for the tile pyramid builder.
//!
//! Exposed as a library so argument handling can be tested without
//! spawning the binary.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use normalization::Sensor;
use pyramid::PyramidConfig;
use renderer::TileFormat;
use tile_common::{Crs, TilerError};

/// Cut georeferenced satellite imagery into `{z}/{x}/{y}` web map tiles.
#[derive(Parser, Debug)]
#[command(name = "cliptiles")]
#[command(about = "Build an XYZ tile pyramid from GeoTIFF imagery")]
#[command(version)]
pub struct Args {
    /// Input files, then zoom_min, zoom_max and the output directory.
    ///
    /// Pass one multi-band file or three single-band files (R, G, B).
    #[arg(
        required = true,
        num_args = 4..,
        value_name = "FILES... ZOOM_MIN ZOOM_MAX OUTPUT"
    )]
    pub positional: Vec<String>,

    /// Target coordinate system (EPSG code)
    #[arg(long = "epsg", alias = "epsg_dsc")]
    pub epsg: Option<u32>,

    /// Tile edge length in pixels
    #[arg(long = "tile-size", alias = "tile_size")]
    pub tile_size: Option<usize>,

    /// Sensor id (K3, K3A, K5, S1, S2, L8); detected from the file name when omitted
    #[arg(long)]
    pub sensor: Option<String>,

    /// Tile image format
    #[arg(long)]
    pub format: Option<String>,

    /// Do not write fully transparent tiles
    #[arg(long)]
    pub skip_empty: bool,

    /// Maximum number of zoom levels processed concurrently
    #[arg(long, env = "CLIPTILES_MAX_WORKERS")]
    pub max_workers: Option<usize>,

    /// Memory budget in megabytes
    #[arg(long, env = "CLIPTILES_MEMORY_LIMIT_MB")]
    pub memory_limit_mb: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info", env = "CLIPTILES_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

/// Positional arguments after splitting off the trailing three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Positional {
    pub files: Vec<PathBuf>,
    pub zoom_min: u8,
    pub zoom_max: u8,
    pub output: PathBuf,
}

impl Args {
    pub fn positional(&self) -> Result<Positional> {
        let [files @ .., zoom_min, zoom_max, output] = self.positional.as_slice() else {
            bail!("expected FILES... ZOOM_MIN ZOOM_MAX OUTPUT");
        };
        if files.is_empty() {
            bail!("at least one input file is required");
        }

        Ok(Positional {
            files: files.iter().map(PathBuf::from).collect(),
            zoom_min: parse_zoom(zoom_min).context("invalid ZOOM_MIN")?,
            zoom_max: parse_zoom(zoom_max).context("invalid ZOOM_MAX")?,
            output: PathBuf::from(output),
        })
    }

    /// Build the run configuration: environment defaults, then arguments.
    pub fn into_config(self) -> Result<PyramidConfig> {
        let positional = self.positional()?;
        let mut config = PyramidConfig::from_env()?;

        config.inputs = positional.files;
        config.output = positional.output;
        config.zoom_min = positional.zoom_min;
        config.zoom_max = positional.zoom_max;

        if let Some(code) = self.epsg {
            config.target_crs = Crs::from_epsg(code)?;
        }
        if let Some(size) = self.tile_size {
            config.tile_size = size;
        }
        if let Some(sensor) = self.sensor {
            config.sensor = Some(sensor.parse::<Sensor>()?);
        }
        if let Some(format) = self.format {
            config.format = format.parse::<TileFormat>()?;
        }
        if self.skip_empty {
            config.skip_empty = true;
        }
        if self.max_workers.is_some() {
            config.max_workers = self.max_workers;
        }
        if self.memory_limit_mb.is_some() {
            config.memory_limit_mb = self.memory_limit_mb;
        }

        Ok(config)
    }
}

fn parse_zoom(value: &str) -> std::result::Result<u8, TilerError> {
    value
        .parse()
        .map_err(|_| TilerError::configuration(format!("zoom must be an integer in 0..=20, got '{}'", value)))
}

/// Install the global tracing subscriber. `RUST_LOG` overrides `log_level`.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Process exit code for a failed run.
///
/// Library errors keep their class code; anything else (argument errors
/// raised here) counts as a configuration problem.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<TilerError>())
        .map(TilerError::exit_code)
        .unwrap_or(2)
}
