//! Loading and preparing the shared source raster.

use std::time::Instant;

use normalization::normalize;
use raster::{merge_bands, open, reproject, Raster};
use tile_common::{TilerError, TilerResult};
use tracing::info;

use crate::config::PyramidConfig;

/// Open the configured inputs, normalize them to 8-bit display values and
/// warp the result into the target CRS.
///
/// One input is read as is (its visual bands are used); three inputs are
/// merged as R, G, B.
pub fn prepare_source(config: &PyramidConfig) -> TilerResult<Raster> {
    let start = Instant::now();
    let sensor = config.resolved_sensor()?;

    let raster = match config.inputs.as_slice() {
        [single] => open(single)?,
        [_, _, _] => merge_bands(config.inputs.as_slice())?,
        inputs => {
            return Err(TilerError::configuration(format!(
                "expected 1 or 3 input files, got {}",
                inputs.len()
            )))
        }
    };

    let source_crs = raster.crs();
    let normalized = normalize(raster, sensor);
    let warped = reproject(&normalized, config.target_crs)?;
    drop(normalized);

    info!(
        sensor = %sensor,
        source_crs = %source_crs,
        target_crs = %config.target_crs,
        width = warped.width(),
        height = warped.height(),
        bands = warped.band_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Prepared source raster"
    );

    Ok(warped)
}
