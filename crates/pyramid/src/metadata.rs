//! `metadata.json` manifest written at the pyramid root.

use std::fs;
use std::path::Path;

use normalization::Sensor;
use renderer::TileFormat;
use serde::{Deserialize, Serialize};
use tile_common::{BoundingBox, Crs, TileIndexRange, TilerError, TilerResult};

use crate::orchestrator::PyramidReport;

pub const MANIFEST_FILE: &str = "metadata.json";

/// Description of a finished pyramid for tile consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyramidManifest {
    pub generator: String,
    /// `[lon_min, lat_min, lon_max, lat_max]` of the source, degrees.
    pub bounds: [f64; 4],
    pub zoom_min: u8,
    pub zoom_max: u8,
    pub tile_size: usize,
    pub format: TileFormat,
    pub crs: Crs,
    pub sensor: Sensor,
    pub scheme: String,
    pub zooms: Vec<ZoomEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomEntry {
    pub zoom: u8,
    pub tile_range: TileIndexRange,
    pub tiles_written: u64,
}

impl PyramidManifest {
    pub fn new(
        report: &PyramidReport,
        lonlat_bounds: BoundingBox,
        tile_size: usize,
        format: TileFormat,
        crs: Crs,
        sensor: Sensor,
    ) -> Self {
        let zooms: Vec<ZoomEntry> = report
            .zooms
            .iter()
            .map(|z| ZoomEntry {
                zoom: z.zoom,
                tile_range: z.tile_range,
                tiles_written: z.tiles_written,
            })
            .collect();

        Self {
            generator: concat!("cliptiles ", env!("CARGO_PKG_VERSION")).to_string(),
            bounds: lonlat_bounds.to_array(),
            zoom_min: zooms.first().map_or(0, |z| z.zoom),
            zoom_max: zooms.last().map_or(0, |z| z.zoom),
            tile_size,
            format,
            crs,
            sensor,
            scheme: "xyz".to_string(),
            zooms,
        }
    }

    pub fn write(&self, root: &Path) -> TilerResult<()> {
        let path = root.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(&path, json).map_err(|e| TilerError::io(&path, e))
    }

    pub fn read(root: &Path) -> TilerResult<Self> {
        let path = root.join(MANIFEST_FILE);
        let json = fs::read(&path).map_err(|e| TilerError::io(&path, e))?;
        serde_json::from_slice(&json)
            .map_err(|e| TilerError::format(format!("invalid {}: {}", path.display(), e)))
    }
}
