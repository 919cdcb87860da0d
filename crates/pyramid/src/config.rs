//! Configuration for a pyramid run.

use std::path::PathBuf;

use normalization::Sensor;
use renderer::TileFormat;
use serde::{Deserialize, Serialize};
use tile_common::{Crs, TilerError, TilerResult, ZoomLevel};

pub const MIN_TILE_SIZE: usize = 64;
pub const MAX_TILE_SIZE: usize = 4096;

/// Everything needed to turn input rasters into a tile pyramid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PyramidConfig {
    /// One multi-band file, or three single-band files in R, G, B order.
    pub inputs: Vec<PathBuf>,

    /// Pyramid root directory.
    pub output: PathBuf,

    /// Sensor of the imagery. Detected from the first input's file name when unset.
    pub sensor: Option<Sensor>,

    pub zoom_min: u8,
    pub zoom_max: u8,

    /// Tile edge length in pixels.
    pub tile_size: usize,

    pub format: TileFormat,

    /// Coordinate system the source is warped into before tiling.
    pub target_crs: Crs,

    /// Skip writing tiles whose pixels are all transparent.
    pub skip_empty: bool,

    /// Upper bound on zoom levels processed concurrently (None = CPU count).
    pub max_workers: Option<usize>,

    /// Memory budget in megabytes (None = detect from cgroup or system).
    pub memory_limit_mb: Option<u64>,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("tiles"),
            sensor: None,
            zoom_min: 0,
            zoom_max: 0,
            tile_size: 256,
            format: TileFormat::Png,
            target_crs: Crs::web_mercator(),
            skip_empty: false,
            max_workers: None,
            memory_limit_mb: None,
        }
    }
}

impl PyramidConfig {
    /// Defaults overlaid with `CLIPTILES_*` environment variables.
    ///
    /// A variable that is set but does not parse is a configuration error.
    /// Inputs, output and zoom range always come from the caller.
    pub fn from_env() -> TilerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TilerResult<Self> {
        let mut config = Self::default();

        if let Some(size) =
            parse_var(&lookup, "CLIPTILES_TILE_SIZE", |v| v.parse::<usize>().ok())?
        {
            config.tile_size = size;
        }
        if let Some(format) =
            parse_var(&lookup, "CLIPTILES_FORMAT", |v| v.parse::<TileFormat>().ok())?
        {
            config.format = format;
        }
        if let Some(crs) = parse_var(&lookup, "CLIPTILES_EPSG", |v| Crs::parse(v).ok())? {
            config.target_crs = crs;
        }
        if let Some(sensor) =
            parse_var(&lookup, "CLIPTILES_SENSOR", |v| v.parse::<Sensor>().ok())?
        {
            config.sensor = Some(sensor);
        }
        if let Some(skip) = parse_var(&lookup, "CLIPTILES_SKIP_EMPTY", parse_flag)? {
            config.skip_empty = skip;
        }
        if let Some(n) =
            parse_var(&lookup, "CLIPTILES_MAX_WORKERS", |v| v.parse::<usize>().ok())?
        {
            config.max_workers = Some(n);
        }
        if let Some(mb) =
            parse_var(&lookup, "CLIPTILES_MEMORY_LIMIT_MB", |v| v.parse::<u64>().ok())?
        {
            config.memory_limit_mb = Some(mb);
        }

        Ok(config)
    }

    /// Check the configuration before any raster is opened.
    pub fn validate(&self) -> TilerResult<()> {
        if self.inputs.len() != 1 && self.inputs.len() != 3 {
            return Err(TilerError::configuration(format!(
                "expected 1 input file or 3 single-band files (R, G, B), got {}",
                self.inputs.len()
            )));
        }
        if let Some(missing) = self.inputs.iter().find(|p| !p.is_file()) {
            return Err(TilerError::configuration(format!(
                "input file does not exist: {}",
                missing.display()
            )));
        }

        self.zoom_levels()?;

        if !self.tile_size.is_power_of_two()
            || !(MIN_TILE_SIZE..=MAX_TILE_SIZE).contains(&self.tile_size)
        {
            return Err(TilerError::configuration(format!(
                "tile size must be a power of two between {} and {}, got {}",
                MIN_TILE_SIZE, MAX_TILE_SIZE, self.tile_size
            )));
        }

        if self.max_workers == Some(0) {
            return Err(TilerError::configuration("max_workers must be > 0"));
        }
        if self.memory_limit_mb == Some(0) {
            return Err(TilerError::configuration("memory_limit_mb must be > 0"));
        }

        self.resolved_sensor()?;
        Ok(())
    }

    /// Zoom levels from `zoom_min` to `zoom_max`, inclusive.
    pub fn zoom_levels(&self) -> TilerResult<Vec<ZoomLevel>> {
        let min = ZoomLevel::new(self.zoom_min)?;
        let max = ZoomLevel::new(self.zoom_max)?;
        if min > max {
            return Err(TilerError::configuration(format!(
                "minimum zoom level {} is greater than maximum zoom level {}",
                min, max
            )));
        }
        Ok(ZoomLevel::range_inclusive(min, max).collect())
    }

    /// The configured sensor, or the one named in the first input's file name.
    pub fn resolved_sensor(&self) -> TilerResult<Sensor> {
        if let Some(sensor) = self.sensor {
            return Ok(sensor);
        }
        let first = self
            .inputs
            .first()
            .ok_or_else(|| TilerError::configuration("no input files"))?;
        Sensor::from_file_name(first).ok_or_else(|| {
            TilerError::configuration(format!(
                "cannot detect the sensor from file name '{}', set it explicitly",
                first.display()
            ))
        })
    }

    pub fn memory_limit_bytes(&self) -> Option<u64> {
        self.memory_limit_mb.map(|mb| mb * 1024 * 1024)
    }
}

fn parse_var<T>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> TilerResult<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    parse(raw.trim())
        .map(Some)
        .ok_or_else(|| TilerError::configuration(format!("invalid value for {}: '{}'", key, raw)))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
