//! Radiometric normalization of satellite imagery to the 0-255 display range.
//!
//! Every supported sensor maps to one stretch algorithm:
//!
//! | Sensor | Algorithm |
//! |---|---|
//! | K3, K3A, S2, L8 (optical) | [`percentile_eo`] |
//! | K5, S1 (radar) | [`percentile_sar`] |

pub mod median;
pub mod sensor;
pub mod stretch;

pub use median::median_filter_3x3;
pub use sensor::{Algorithm, Sensor};
pub use stretch::{percentile, percentile_eo, percentile_sar, Stretch};

use raster::{PixelType, Raster};
use tracing::info;

/// Normalize a raster's visual bands with the stretch for `sensor`.
///
/// Bands are reduced to one or three first, the result is tagged `U8`.
pub fn normalize(raster: Raster, sensor: Sensor) -> Raster {
    let mut raster = raster.visual_bands();
    let width = raster.width();
    let height = raster.height();

    let stretch = match sensor.algorithm() {
        Algorithm::PercentileEo => percentile_eo(raster.bands_mut()),
        Algorithm::PercentileSar => percentile_sar(raster.bands_mut(), width, height),
    };

    info!(
        sensor = %sensor,
        algorithm = ?sensor.algorithm(),
        stretch = ?stretch,
        bands = raster.band_count(),
        "Normalized raster"
    );

    raster.with_pixel_type(PixelType::U8)
}
