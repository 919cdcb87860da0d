//! Placing a resampled raster into its base raster.
//!
//! The zoom table rounds each level's resolution, so a base of whole tiles
//! can end a few pixels before the resampled raster does at deep zooms
//! (about half a pixel per tile column at zoom 20). Pixels past the base's
//! right or bottom edge lie outside the tile range and are dropped.

use raster::{GeoTransform, Raster};
use tile_common::{TilerError, TilerResult};
use tracing::debug;

/// Where a source block landed in the base raster, after clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset_x: usize,
    pub offset_y: usize,
    pub width: usize,
    pub height: usize,
}

/// Pixel offset of `source`'s origin relative to `base`'s origin, in
/// `source` pixels, rounded to the nearest pixel.
pub fn block_offset(source: &GeoTransform, base: &GeoTransform) -> TilerResult<(i64, i64)> {
    let dx = ((source.origin_x - base.origin_x) / source.pixel_size_x).round();
    let dy = ((base.origin_y - source.origin_y) / -source.pixel_size_y).round();

    if !dx.is_finite() || !dy.is_finite() {
        return Err(TilerError::consistency(format!(
            "cannot place raster: offset ({}, {}) is not finite",
            dx, dy
        )));
    }
    Ok((dx as i64, dy as i64))
}

fn clipped_extent(axis: &str, offset: usize, size: usize, limit: usize) -> TilerResult<usize> {
    if offset >= limit {
        return Err(TilerError::consistency(format!(
            "raster block starts at {} along {}, past the base raster edge at {}",
            offset, axis, limit
        )));
    }
    Ok(size.min(limit - offset))
}

/// Copy every band of `source` into `base` at the georeferenced offset.
///
/// A negative offset means the base does not start at or before the
/// source and fails with a consistency error; nothing is clamped. Overflow
/// past the right or bottom edge is clipped.
pub fn composite(source: &Raster, base: &mut Raster) -> TilerResult<Placement> {
    if source.band_count() != base.band_count() {
        return Err(TilerError::consistency(format!(
            "band count mismatch: source has {}, base has {}",
            source.band_count(),
            base.band_count()
        )));
    }

    let (dx, dy) = block_offset(source.geo_transform(), base.geo_transform())?;
    if dx < 0 || dy < 0 {
        return Err(TilerError::consistency(format!(
            "negative block offset ({}, {}): raster starts outside its base raster",
            dx, dy
        )));
    }
    let (offset_x, offset_y) = (dx as usize, dy as usize);

    let width = clipped_extent("x", offset_x, source.width(), base.width())?;
    let height = clipped_extent("y", offset_y, source.height(), base.height())?;
    let placement = Placement {
        offset_x,
        offset_y,
        width,
        height,
    };

    debug!(
        offset_x,
        offset_y,
        width,
        height,
        clipped_x = source.width() - width,
        clipped_y = source.height() - height,
        "Compositing raster into base"
    );

    let full = width == source.width() && height == source.height();
    for band in 0..source.band_count() {
        if full {
            base.write_block(band, offset_x, offset_y, width, height, source.band(band))?;
        } else {
            let block = source.read_block(band, 0, 0, width, height)?;
            base.write_block(band, offset_x, offset_y, width, height, &block)?;
        }
    }
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::build_base_raster;
    use raster::PixelType;
    use tile_common::{Crs, ZoomLevel};

    fn raster(width: usize, height: usize, origin: (f64, f64), fill: f32) -> Raster {
        let bands = vec![vec![fill; width * height]];
        Raster::from_bands(
            width,
            height,
            bands,
            GeoTransform::new(origin.0, origin.1, 10.0, -10.0),
            Crs::web_mercator(),
            PixelType::U8,
        )
        .unwrap()
    }

    #[test]
    fn test_offset_rounds_to_nearest() {
        let base = GeoTransform::new(0.0, 1000.0, 10.0, -10.0);
        let src = GeoTransform::new(36.0, 944.0, 10.0, -10.0);
        assert_eq!(block_offset(&src, &base).unwrap(), (4, 6));
    }

    #[test]
    fn test_composite_copies_block() {
        let src = raster(4, 3, (20.0, 970.0), 7.0);
        let mut base = raster(16, 16, (0.0, 1000.0), 0.0);

        let placement = composite(&src, &mut base).unwrap();
        assert_eq!(
            placement,
            Placement {
                offset_x: 2,
                offset_y: 3,
                width: 4,
                height: 3
            }
        );

        let band = base.band(0);
        assert_eq!(band[3 * 16 + 2], 7.0);
        assert_eq!(band[5 * 16 + 5], 7.0);
        assert_eq!(band[3 * 16 + 1], 0.0);
        assert_eq!(band[6 * 16 + 2], 0.0);
        assert_eq!(band.iter().filter(|&&v| v == 7.0).count(), 12);
    }

    #[test]
    fn test_negative_offset_fails() {
        let src = raster(4, 4, (-30.0, 1000.0), 1.0);
        let mut base = raster(16, 16, (0.0, 1000.0), 0.0);
        let err = composite(&src, &mut base).unwrap_err();
        assert!(matches!(err, TilerError::Consistency(_)));
        assert!(base.band(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_pixel_overflow_is_clipped() {
        // ends one pixel past the right edge
        let src = raster(5, 4, (120.0, 1000.0), 3.0);
        let mut base = raster(16, 16, (0.0, 1000.0), 0.0);
        let placement = composite(&src, &mut base).unwrap();
        assert_eq!(placement.width, 4);
        assert_eq!(placement.height, 4);
        assert_eq!(base.band(0)[15], 3.0);
    }

    #[test]
    fn test_wide_overflow_is_clipped() {
        let src = raster(8, 20, (120.0, 1000.0), 3.0);
        let mut base = raster(16, 16, (0.0, 1000.0), 0.0);
        let placement = composite(&src, &mut base).unwrap();
        assert_eq!((placement.width, placement.height), (4, 16));
        assert_eq!(base.band(0)[15 * 16 + 15], 3.0);
        assert_eq!(base.band(0)[15 * 16 + 11], 0.0);
    }

    #[test]
    fn test_block_starting_past_base_fails() {
        let src = raster(4, 4, (170.0, 1000.0), 3.0);
        let mut base = raster(16, 16, (0.0, 1000.0), 0.0);
        assert!(matches!(
            composite(&src, &mut base),
            Err(TilerError::Consistency(_))
        ));
    }

    const WORLD: f64 = 2.0 * 20_037_508.342_789_244;

    /// Scene starting 0.1 px inside a tile corner and ending just short of
    /// `tiles` true tile spans, at the zoom's table resolution.
    fn tile_aligned_scene(zoom: ZoomLevel, tiles: usize) -> Raster {
        let res = zoom.resolution();
        let n = 1i64 << zoom.get();
        let span = WORLD / n as f64;
        let (tx, ty) = (n / 2 + 1000, n / 2 - 5000);
        let origin = (
            -WORLD / 2.0 + tx as f64 * span + 0.1 * res,
            WORLD / 2.0 - ty as f64 * span - 0.1 * res,
        );
        let size = (tiles as f64 * span / res).floor() as usize - 2;
        Raster::from_bands(
            size,
            size,
            vec![vec![1.0; size * size]],
            GeoTransform::new(origin.0, origin.1, res, -res),
            Crs::web_mercator(),
            PixelType::U8,
        )
        .unwrap()
    }

    #[test]
    fn test_deep_zoom_scene_fits_its_tiles() {
        for (level, expected_width) in [(18u8, 2558usize), (20, 2560)] {
            let zoom = ZoomLevel::new(level).unwrap();
            let src = tile_aligned_scene(zoom, 10);
            let (mut base, range) = build_base_raster(&src, zoom, 256).unwrap();
            assert_eq!((range.columns(), range.rows()), (10, 10), "zoom {}", level);
            assert_eq!(base.width(), 2560);

            let placement = composite(&src, &mut base).unwrap();
            assert_eq!((placement.offset_x, placement.offset_y), (0, 0));
            assert_eq!(placement.width, expected_width, "zoom {}", level);
            assert_eq!(placement.height, expected_width, "zoom {}", level);
        }

        // at zoom 20 the last base column and row still receive data
        let zoom = ZoomLevel::new(20).unwrap();
        let src = tile_aligned_scene(zoom, 10);
        assert!(src.width() > 2560);
        let (mut base, _) = build_base_raster(&src, zoom, 256).unwrap();
        composite(&src, &mut base).unwrap();
        assert_eq!(base.band(0)[2559], 1.0);
        assert_eq!(base.band(0)[2560 * 2560 - 1], 1.0);
    }

    #[test]
    fn test_band_count_mismatch() {
        let src = raster(2, 2, (0.0, 1000.0), 1.0);
        let mut base = Raster::new(
            16,
            16,
            3,
            GeoTransform::new(0.0, 1000.0, 10.0, -10.0),
            Crs::web_mercator(),
            PixelType::U8,
        )
        .unwrap();
        assert!(composite(&src, &mut base).is_err());
    }
}
