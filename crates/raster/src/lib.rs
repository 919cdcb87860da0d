//! Georeferenced raster access for the tile pyramid builder.
//!
//! Rasters are held fully in memory as band-separated `f32` buffers. This
//! crate covers everything the pyramid needs from a raster library:
//!
//! - reading and writing GeoTIFF ([`open`], [`write_geotiff`], [`probe`])
//! - merging three single-band files into an RGB raster ([`merge_bands`])
//! - point and extent transforms between coordinate systems
//!   ([`transform_point`], [`transformed_bounds`])
//! - nearest-neighbour warping ([`reproject`], [`resample_to_resolution`])
//! - block reads and writes ([`Raster::read_block`], [`Raster::write_block`])

pub mod geotiff;
pub mod merge;
pub mod raster;
pub mod transform;
pub mod warp;

pub use geotiff::{open, probe, write_geotiff, RasterInfo};
pub use merge::merge_bands;
pub use raster::{GeoTransform, PixelType, Raster};
pub use transform::{transform_point, transformed_bounds, PointTransformer};
pub use warp::{reproject, resample_to_resolution};
