//! Web Mercator (XYZ / slippy map) tile grid math.
//!
//! Formulas follow the OpenStreetMap slippy map tile naming scheme
//! (<https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>).

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::zoom::ZoomLevel;

/// Inward nudge applied to the max-longitude and min-latitude tile edges,
/// so re-deriving a tile index from its own bounds lands inside the tile.
pub const EDGE_EPSILON_DEG: f64 = 1e-8;

/// Latitude limit of the Web Mercator grid in degrees.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Address of one tile file in the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: i64,
    pub y: i64,
}

impl TileCoord {
    pub fn new(z: ZoomLevel, x: i64, y: i64) -> Self {
        Self { z: z.get(), x, y }
    }

    /// Path of this tile's image under a pyramid root: `{root}/{z}/{x}/{y}.{ext}`.
    pub fn path_in(&self, root: &Path, ext: &str) -> PathBuf {
        root.join(self.z.to_string())
            .join(self.x.to_string())
            .join(format!("{}.{}", self.y, ext))
    }
}

/// Inclusive range of tile indices covering an extent at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileIndexRange {
    pub zoom: u8,
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

impl TileIndexRange {
    /// Build the range spanned by a top-left and a bottom-right tile index.
    pub fn from_corners(zoom: ZoomLevel, top_left: (i64, i64), bottom_right: (i64, i64)) -> Self {
        Self {
            zoom: zoom.get(),
            x_min: top_left.0,
            y_min: top_left.1,
            x_max: bottom_right.0,
            y_max: bottom_right.1,
        }
    }

    /// Number of tile columns (0 if the range is inverted).
    pub fn columns(&self) -> u64 {
        (self.x_max - self.x_min + 1).max(0) as u64
    }

    /// Number of tile rows (0 if the range is inverted).
    pub fn rows(&self) -> u64 {
        (self.y_max - self.y_min + 1).max(0) as u64
    }

    pub fn len(&self) -> u64 {
        self.columns() * self.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Clamp a latitude into the Web Mercator range.
pub fn clamp_latitude(lat: f64) -> f64 {
    lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT)
}

/// Convert longitude/latitude (degrees) to the index of the tile containing it.
///
/// Latitudes outside the Web Mercator range produce indices outside the
/// `[0, 2^zoom)` grid rather than an error; range checks belong to the caller.
pub fn lonlat_to_tile(lon: f64, lat: f64, zoom: ZoomLevel) -> (i64, i64) {
    let n = zoom.tiles_per_side() as f64;
    let lat_rad = lat.to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor() as i64;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as i64;

    (x, y)
}

/// Convert a tile index to its lon/lat bounds `(lon_min, lat_min, lon_max, lat_max)`.
///
/// Indices wrap modulo `2^zoom`, so tiles past the antimeridian map back
/// onto the grid. The max-longitude and min-latitude edges are pulled
/// inward by [`EDGE_EPSILON_DEG`].
pub fn tile_to_lonlat_bounds(x: i64, y: i64, zoom: ZoomLevel) -> (f64, f64, f64, f64) {
    let n_tiles = zoom.tiles_per_side();
    let n = n_tiles as f64;

    let x = x.rem_euclid(n_tiles);
    let y = y.rem_euclid(n_tiles);
    let x2 = x + 1;
    let y2 = y + 1;

    let lon_min = x as f64 / n * 360.0 - 180.0;
    let lat_max = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();

    let lon_max = x2 as f64 / n * 360.0 - 180.0 - EDGE_EPSILON_DEG;
    let lat_min = (PI * (1.0 - 2.0 * y2 as f64 / n)).sinh().atan().to_degrees() + EDGE_EPSILON_DEG;

    (lon_min, lat_min, lon_max, lat_max)
}
