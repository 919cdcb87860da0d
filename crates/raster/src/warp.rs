//! Nearest-neighbour reprojection and resampling.

use rayon::prelude::*;
use tile_common::{Crs, TilerError, TilerResult};
use tracing::debug;

use crate::raster::{GeoTransform, Raster};
use crate::transform::{transformed_bounds, PointTransformer};

/// Warp a raster into another coordinate system.
///
/// The output covers the transformed extent of the source, with a square
/// pixel size chosen so the diagonal keeps the source pixel count. Each
/// output pixel center is mapped back into the source and takes the nearest
/// source pixel; pixels that land outside the source stay 0 (no-data).
pub fn reproject(raster: &Raster, target: Crs) -> TilerResult<Raster> {
    if raster.crs() == target {
        return Ok(raster.clone());
    }

    let bounds = transformed_bounds(raster, target)?;

    let src_diagonal = ((raster.width().pow(2) + raster.height().pow(2)) as f64).sqrt();
    let resolution = bounds.width().hypot(bounds.height()) / src_diagonal;
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(TilerError::consistency(format!(
            "degenerate extent {:?} after transform to {}",
            bounds, target
        )));
    }

    let width = ((bounds.width() / resolution).ceil() as usize).max(1);
    let height = ((bounds.height() / resolution).ceil() as usize).max(1);
    let geo_transform = GeoTransform::new(bounds.min_x, bounds.max_y, resolution, -resolution);

    // Fail before the parallel loop if the definitions don't parse.
    PointTransformer::new(target, raster.crs())?;

    debug!(
        from = %raster.crs(),
        to = %target,
        width,
        height,
        resolution,
        "Reprojecting raster"
    );

    let band_count = raster.band_count();
    let rows: Vec<Vec<Vec<f32>>> = (0..height)
        .into_par_iter()
        .map_init(
            || PointTransformer::new(target, raster.crs()).ok(),
            |transformer, row| {
                let mut out = vec![vec![0.0f32; width]; band_count];
                let Some(transformer) = transformer.as_ref() else {
                    return out;
                };
                for col in 0..width {
                    let (x, y) = geo_transform.pixel_center(col, row);
                    let Ok((sx, sy)) = transformer.transform(x, y) else {
                        continue;
                    };
                    if let Some(idx) = raster.pixel_index(sx, sy) {
                        for (band, dst) in out.iter_mut().enumerate() {
                            dst[col] = raster.band(band)[idx];
                        }
                    }
                }
                out
            },
        )
        .collect();

    let mut bands = vec![Vec::with_capacity(width * height); band_count];
    for row in rows {
        for (dst, src) in bands.iter_mut().zip(row) {
            dst.extend_from_slice(&src);
        }
    }

    Raster::from_bands(
        width,
        height,
        bands,
        geo_transform,
        target,
        raster.pixel_type(),
    )
}

/// Resample a raster to a square pixel size, keeping its CRS and origin.
///
/// The new size is `round(extent / resolution)` per axis (at least 1 pixel).
/// Values are taken from the nearest source pixel at each output pixel center.
pub fn resample_to_resolution(raster: &Raster, resolution: f64) -> TilerResult<Raster> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(TilerError::configuration(format!(
            "resolution must be a positive number, got {}",
            resolution
        )));
    }

    let gt = raster.geo_transform();
    let src_px = gt.pixel_size_x.abs();
    let src_py = gt.pixel_size_y.abs();

    let extent_x = raster.width() as f64 * src_px;
    let extent_y = raster.height() as f64 * src_py;
    let width = ((extent_x / resolution).round() as usize).max(1);
    let height = ((extent_y / resolution).round() as usize).max(1);

    let geo_transform = GeoTransform::new(
        gt.origin_x,
        gt.origin_y,
        resolution.copysign(gt.pixel_size_x),
        resolution.copysign(gt.pixel_size_y),
    );

    let col_map = nearest_index_map(width, resolution, src_px, raster.width());
    let row_map = nearest_index_map(height, resolution, src_py, raster.height());

    debug!(
        src_width = raster.width(),
        src_height = raster.height(),
        width,
        height,
        resolution,
        "Resampling raster"
    );

    let src_width = raster.width();
    let bands = raster
        .bands()
        .iter()
        .map(|src| {
            let mut dst = vec![0.0f32; width * height];
            dst.par_chunks_mut(width)
                .zip(row_map.par_iter())
                .for_each(|(dst_row, &src_row)| {
                    let src_row = &src[src_row * src_width..(src_row + 1) * src_width];
                    for (value, &src_col) in dst_row.iter_mut().zip(&col_map) {
                        *value = src_row[src_col];
                    }
                });
            dst
        })
        .collect();

    Raster::from_bands(
        width,
        height,
        bands,
        geo_transform,
        raster.crs(),
        raster.pixel_type(),
    )
}

/// Source index of the pixel nearest to each destination pixel center.
fn nearest_index_map(dst_len: usize, dst_size: f64, src_size: f64, src_len: usize) -> Vec<usize> {
    (0..dst_len)
        .map(|i| {
            let pos = (i as f64 + 0.5) * dst_size / src_size;
            (pos.floor() as usize).min(src_len - 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelType;

    fn mercator_raster(width: usize, height: usize, pixel: f64) -> Raster {
        let data = vec![(0..width * height).map(|i| (i % 251 + 1) as f32).collect()];
        Raster::from_bands(
            width,
            height,
            data,
            GeoTransform::new(1_000_000.0, 5_000_000.0, pixel, -pixel),
            Crs::web_mercator(),
            PixelType::U8,
        )
        .unwrap()
    }

    #[test]
    fn test_resample_size_and_origin() {
        let raster = mercator_raster(600, 400, 30.0);
        let out = resample_to_resolution(&raster, 152.874).unwrap();

        assert_eq!(out.width(), (600.0 * 30.0 / 152.874f64).round() as usize);
        assert_eq!(out.height(), (400.0 * 30.0 / 152.874f64).round() as usize);
        assert_eq!(out.geo_transform().origin_x, 1_000_000.0);
        assert_eq!(out.geo_transform().origin_y, 5_000_000.0);
        assert_eq!(out.geo_transform().pixel_size_x, 152.874);
        assert_eq!(out.geo_transform().pixel_size_y, -152.874);
        assert_eq!(out.crs(), raster.crs());
    }

    #[test]
    fn test_resample_identity_resolution() {
        let raster = mercator_raster(17, 9, 10.0);
        let out = resample_to_resolution(&raster, 10.0).unwrap();
        assert_eq!(out.band(0), raster.band(0));
    }

    #[test]
    fn test_resample_upsample_duplicates_pixels() {
        let raster = Raster::from_bands(
            2,
            1,
            vec![vec![1.0, 2.0]],
            GeoTransform::new(0.0, 0.0, 10.0, -10.0),
            Crs::web_mercator(),
            PixelType::U8,
        )
        .unwrap();
        let out = resample_to_resolution(&raster, 5.0).unwrap();
        assert_eq!((out.width(), out.height()), (4, 2));
        assert_eq!(out.band(0), &[1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_resample_never_empty() {
        let raster = mercator_raster(4, 4, 1.0);
        let out = resample_to_resolution(&raster, 1_000.0).unwrap();
        assert_eq!((out.width(), out.height()), (1, 1));
    }

    #[test]
    fn test_resample_rejects_bad_resolution() {
        let raster = mercator_raster(4, 4, 1.0);
        assert!(matches!(
            resample_to_resolution(&raster, 0.0),
            Err(TilerError::Configuration(_))
        ));
        assert!(resample_to_resolution(&raster, f64::NAN).is_err());
    }

    #[test]
    fn test_reproject_same_crs_is_clone() {
        let raster = mercator_raster(8, 8, 10.0);
        let out = reproject(&raster, Crs::web_mercator()).unwrap();
        assert_eq!(out.band(0), raster.band(0));
        assert_eq!(out.geo_transform(), raster.geo_transform());
    }

    #[test]
    fn test_reproject_wgs84_to_mercator() {
        let raster = Raster::from_bands(
            50,
            50,
            vec![vec![7.0; 2500]],
            GeoTransform::new(10.0, 50.0, 0.01, -0.01),
            Crs::wgs84(),
            PixelType::U8,
        )
        .unwrap();

        let out = reproject(&raster, Crs::web_mercator()).unwrap();
        assert_eq!(out.crs(), Crs::web_mercator());
        assert!(out.width() > 0 && out.height() > 0);

        // Pixel count stays in the same ballpark.
        let ratio = (out.width() * out.height()) as f64 / 2500.0;
        assert!((0.5..2.0).contains(&ratio), "ratio {}", ratio);

        // The center of the output lies inside the source, so it carries data.
        let center = (out.height() / 2) * out.width() + out.width() / 2;
        assert_eq!(out.band(0)[center], 7.0);

        let (lon, lat) = crate::transform::transform_point(
            out.geo_transform().origin_x,
            out.geo_transform().origin_y,
            Crs::web_mercator(),
            Crs::wgs84(),
        )
        .unwrap();
        assert!((lon - 10.0).abs() < 1e-6);
        assert!((lat - 50.0).abs() < 1e-6);
    }
}
