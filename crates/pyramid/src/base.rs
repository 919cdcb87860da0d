//! Tile-aligned base rasters.
//!
//! A base raster covers exactly the tiles a resampled raster touches at one
//! zoom level. It lives in the resampled raster's CRS and resolution, its
//! origin is the top-left corner of the top-left tile, and its size is a
//! whole number of tiles in both directions.

use raster::{transform_point, transformed_bounds, GeoTransform, Raster};
use tile_common::{
    clamp_latitude, lonlat_to_tile, tile_to_lonlat_bounds, Crs, TilerError, TilerResult,
    TileIndexRange, ZoomLevel,
};
use tracing::debug;

/// Tiles at `zoom` covering the extent of `raster`.
///
/// Latitudes beyond the Web Mercator limit are clamped, so polar scenes
/// stop at the first or last tile row.
pub fn tile_range_for(raster: &Raster, zoom: ZoomLevel) -> TilerResult<TileIndexRange> {
    let lonlat = transformed_bounds(raster, Crs::wgs84())?;
    let (lon_tl, lat_tl) = lonlat.top_left();
    let (lon_br, lat_br) = lonlat.bottom_right();
    let (lat_tl, lat_br) = (clamp_latitude(lat_tl), clamp_latitude(lat_br));

    let top_left = lonlat_to_tile(lon_tl, lat_tl, zoom);
    let bottom_right = lonlat_to_tile(lon_br, lat_br, zoom);
    let range = TileIndexRange::from_corners(zoom, top_left, bottom_right);

    if range.is_empty() {
        return Err(TilerError::consistency(format!(
            "degenerate tile range at zoom {}: top-left {:?}, bottom-right {:?}",
            zoom, top_left, bottom_right
        )));
    }
    Ok(range)
}

/// Allocate the empty base raster for `resampled` at `zoom`.
///
/// Returns the base (all bands zero) and the tile range it covers.
pub fn build_base_raster(
    resampled: &Raster,
    zoom: ZoomLevel,
    tile_size: usize,
) -> TilerResult<(Raster, TileIndexRange)> {
    let range = tile_range_for(resampled, zoom)?;

    let width = range.columns() as usize * tile_size;
    let height = range.rows() as usize * tile_size;

    let (lon_min, _, _, lat_max) = tile_to_lonlat_bounds(range.x_min, range.y_min, zoom);
    let (origin_x, origin_y) = transform_point(lon_min, lat_max, Crs::wgs84(), resampled.crs())?;

    let source_gt = resampled.geo_transform();
    let geo_transform = GeoTransform::new(
        origin_x,
        origin_y,
        source_gt.pixel_size_x,
        source_gt.pixel_size_y,
    );

    debug!(
        zoom = zoom.get(),
        x_min = range.x_min,
        y_min = range.y_min,
        x_max = range.x_max,
        y_max = range.y_max,
        width,
        height,
        origin_x,
        origin_y,
        "Allocating base raster"
    );

    let base = Raster::new(
        width,
        height,
        resampled.band_count(),
        geo_transform,
        resampled.crs(),
        resampled.pixel_type(),
    )?;
    Ok((base, range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster::PixelType;

    fn z(level: u8) -> ZoomLevel {
        ZoomLevel::new(level).unwrap()
    }

    fn mercator_raster(origin_x: f64, origin_y: f64, res: f64, size: usize) -> Raster {
        Raster::new(
            size,
            size,
            1,
            GeoTransform::new(origin_x, origin_y, res, -res),
            Crs::web_mercator(),
            PixelType::U8,
        )
        .unwrap()
    }

    #[test]
    fn test_base_covers_whole_tiles() {
        let zoom = z(10);
        let res = zoom.resolution();
        // A little north-east of (0, 0), 600 pixels wide.
        let src = mercator_raster(10_000.0, 120_000.0, res, 600);

        let (base, range) = build_base_raster(&src, zoom, 256).unwrap();
        assert_eq!(base.width() % 256, 0);
        assert_eq!(base.height() % 256, 0);
        assert_eq!(base.width(), range.columns() as usize * 256);
        assert_eq!(base.height(), range.rows() as usize * 256);
        assert!(range.columns() >= 3);
        assert!(base.band(0).iter().all(|&v| v == 0.0));
        assert_eq!(base.crs(), src.crs());
        assert_eq!(base.geo_transform().pixel_size_x, res);
    }

    #[test]
    fn test_base_origin_is_tile_corner() {
        let zoom = z(10);
        let src = mercator_raster(10_000.0, 120_000.0, zoom.resolution(), 600);
        let (base, range) = build_base_raster(&src, zoom, 256).unwrap();

        // Tile edges in Web Mercator are multiples of the world width / 2^z.
        let world = 2.0 * 20_037_508.342_789_244;
        let tile_span = world / 1024.0;
        let gt = base.geo_transform();
        let expected_x = -world / 2.0 + range.x_min as f64 * tile_span;
        let expected_y = world / 2.0 - range.y_min as f64 * tile_span;
        assert!((gt.origin_x - expected_x).abs() < 1e-3);
        assert!((gt.origin_y - expected_y).abs() < 1e-3);

        // The source starts at or after the base origin.
        assert!(src.geo_transform().origin_x >= gt.origin_x);
        assert!(src.geo_transform().origin_y <= gt.origin_y);
    }

    #[test]
    fn test_single_tile_at_zoom_zero() {
        let zoom = z(0);
        let src = mercator_raster(-1_000_000.0, 1_000_000.0, zoom.resolution(), 1);
        let (base, range) = build_base_raster(&src, zoom, 256).unwrap();
        assert_eq!((range.x_min, range.y_min, range.x_max, range.y_max), (0, 0, 0, 0));
        assert_eq!((base.width(), base.height()), (256, 256));
    }
}
