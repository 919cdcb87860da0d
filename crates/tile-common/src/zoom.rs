//! Zoom levels and their ground resolutions.
//!
//! Resolutions follow the OpenStreetMap zoom level table
//! (<https://wiki.openstreetmap.org/wiki/Zoom_levels>), in meters per pixel
//! at the equator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TilerError, TilerResult};

/// Ground resolution in meters/pixel, indexed by zoom level.
pub const ZOOM_RESOLUTIONS: [f64; 21] = [
    156543.0, 78272.0, 39136.0, 19568.0, 9784.0, 4892.0, 2446.0, 1223.0, 611.496, 305.748,
    152.874, 76.437, 38.219, 19.109, 9.555, 4.777, 2.389, 1.194, 0.597, 0.299, 0.149,
];

/// A web-map zoom level in `[0, 20]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 20;

    /// Create a zoom level, rejecting values outside `[0, 20]`.
    pub fn new(zoom: u8) -> TilerResult<Self> {
        if zoom > Self::MAX {
            return Err(TilerError::configuration(format!(
                "zoom level must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                zoom
            )));
        }
        Ok(Self(zoom))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Ground resolution for this zoom level in meters/pixel.
    pub fn resolution(self) -> f64 {
        ZOOM_RESOLUTIONS[self.0 as usize]
    }

    /// Number of tiles along one side of the global grid (2^zoom).
    pub fn tiles_per_side(self) -> i64 {
        1i64 << self.0
    }

    /// All zoom levels in `[min, max]`, inclusive.
    pub fn range_inclusive(min: ZoomLevel, max: ZoomLevel) -> impl Iterator<Item = ZoomLevel> {
        (min.0..=max.0).map(ZoomLevel)
    }
}

impl TryFrom<u8> for ZoomLevel {
    type Error = TilerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ZoomLevel::new(value)
    }
}

impl From<ZoomLevel> for u8 {
    fn from(zoom: ZoomLevel) -> Self {
        zoom.0
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ground resolution in meters/pixel for a zoom level.
pub fn zoom_resolution(zoom: ZoomLevel) -> f64 {
    zoom.resolution()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_bounds() {
        assert!(ZoomLevel::new(0).is_ok());
        assert!(ZoomLevel::new(20).is_ok());
        assert!(matches!(
            ZoomLevel::new(21),
            Err(TilerError::Configuration(_))
        ));
    }

    #[test]
    fn test_zoom_table_halves_each_level() {
        for z in 1..ZOOM_RESOLUTIONS.len() {
            let expected = ZOOM_RESOLUTIONS[z - 1] / 2.0;
            let actual = ZOOM_RESOLUTIONS[z];
            let rel = (actual - expected).abs() / expected;
            assert!(rel < 0.01, "zoom {} resolution {} not half of {}", z, actual, expected);
        }
    }

    #[test]
    fn test_zoom_table_strictly_decreasing() {
        for pair in ZOOM_RESOLUTIONS.windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    #[test]
    fn test_resolution_lookup() {
        assert_eq!(ZoomLevel::new(10).unwrap().resolution(), 152.874);
        assert_eq!(zoom_resolution(ZoomLevel::new(0).unwrap()), 156543.0);
    }

    #[test]
    fn test_range_inclusive() {
        let min = ZoomLevel::new(3).unwrap();
        let max = ZoomLevel::new(5).unwrap();
        let zooms: Vec<u8> = ZoomLevel::range_inclusive(min, max).map(|z| z.get()).collect();
        assert_eq!(zooms, vec![3, 4, 5]);
    }

    #[test]
    fn test_tiles_per_side() {
        assert_eq!(ZoomLevel::new(0).unwrap().tiles_per_side(), 1);
        assert_eq!(ZoomLevel::new(20).unwrap().tiles_per_side(), 1 << 20);
    }
}
