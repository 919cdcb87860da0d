//! Tile image rendering.
//!
//! Turns blocks of normalized band values into RGBA pixels and encodes them
//! for disk:
//! - [`rgba`]: gray/RGB band blocks to RGBA with no-data transparency
//! - [`png`]: indexed or truecolor PNG encoder
//! - [`format`]: the tile formats a pyramid can be written in
//! - [`buffer_pool`]: per-thread scratch buffers reused across tiles

pub mod buffer_pool;
pub mod format;
pub mod png;
pub mod rgba;

pub use format::TileFormat;
pub use rgba::{fill_rgba, is_fully_transparent, sample_to_u8};
