//! Common types and utilities shared across the cliptiles crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod tile;
pub mod zoom;

pub use bbox::BoundingBox;
pub use crs::Crs;
pub use error::{TilerError, TilerResult};
pub use tile::{
    clamp_latitude, lonlat_to_tile, tile_to_lonlat_bounds, TileCoord, TileIndexRange,
    EDGE_EPSILON_DEG, WEB_MERCATOR_MAX_LAT,
};
pub use zoom::{zoom_resolution, ZoomLevel, ZOOM_RESOLUTIONS};
