//! XYZ tile pyramid builder.
//!
//! Pipeline per zoom level:
//!
//! 1. [`raster::resample_to_resolution`] to the zoom's ground resolution
//! 2. [`base::build_base_raster`]: empty raster aligned to the tile grid
//! 3. [`composite::composite`]: copy the resampled pixels into the base
//! 4. [`cutter::TileCutter`]: write `{z}/{x}/{y}.png` tiles
//!
//! [`PyramidBuilder`] drives the levels on a worker pool and writes a
//! [`metadata::PyramidManifest`] at the end.

pub mod base;
pub mod cancel;
pub mod composite;
pub mod config;
pub mod cutter;
pub mod metadata;
pub mod orchestrator;
pub mod pool;
pub mod source;

pub use base::{build_base_raster, tile_range_for};
pub use cancel::CancellationToken;
pub use composite::{block_offset, composite, Placement};
pub use config::PyramidConfig;
pub use cutter::{CutReport, TileCutter};
pub use metadata::{PyramidManifest, MANIFEST_FILE};
pub use orchestrator::{PyramidBuilder, PyramidReport, ZoomReport};
pub use source::prepare_source;
