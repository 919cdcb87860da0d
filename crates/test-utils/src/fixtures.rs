//! Raster and GeoTIFF fixtures for pyramid tests.

use std::fs;
use std::path::{Path, PathBuf};

use raster::{write_geotiff, GeoTransform, PixelType, Raster};
use tile_common::{Crs, ZoomLevel};

/// Common scene locations in Web Mercator meters (top-left corners).
pub mod origins {
    /// Seoul, a little north-west of the city center.
    pub const SEOUL: (f64, f64) = (14_133_000.0, 4_520_000.0);

    /// Just north-east of (0, 0).
    pub const NULL_ISLAND: (f64, f64) = (10_000.0, 120_000.0);

    /// Straddles the equator south of Quito.
    pub const QUITO: (f64, f64) = (-8_750_000.0, 10_000.0);
}

/// UTM zone 52N (Korea) scene origin, meters.
pub const UTM_52N_EPSG: u32 = 32652;
pub const UTM_52N_ORIGIN: (f64, f64) = (320_000.0, 4_160_000.0);

/// North-up geotransform at `origin` with square `pixel_size` pixels.
pub fn north_up(origin: (f64, f64), pixel_size: f64) -> GeoTransform {
    GeoTransform::new(origin.0, origin.1, pixel_size, -pixel_size)
}

/// Web Mercator raster at `origin`, pixel size equal to `zoom`'s resolution.
pub fn mercator_raster_at_zoom(
    bands: Vec<Vec<f32>>,
    width: usize,
    height: usize,
    origin: (f64, f64),
    zoom: u8,
) -> Raster {
    let zoom = ZoomLevel::new(zoom).expect("valid zoom");
    Raster::from_bands(
        width,
        height,
        bands,
        north_up(origin, zoom.resolution()),
        Crs::web_mercator(),
        PixelType::U8,
    )
    .expect("valid raster")
}

/// Write a raster as GeoTIFF into `dir` and return its path.
pub fn write_fixture(dir: &Path, name: &str, raster: &Raster) -> PathBuf {
    let path = dir.join(name);
    write_geotiff(raster, &path).expect("write GeoTIFF fixture");
    path
}

/// Single-band 16-bit GeoTIFF in Web Mercator.
pub fn single_band_geotiff(
    dir: &Path,
    name: &str,
    band: Vec<f32>,
    width: usize,
    height: usize,
    gt: GeoTransform,
) -> PathBuf {
    let raster =
        Raster::from_bands(width, height, vec![band], gt, Crs::web_mercator(), PixelType::U16)
            .expect("valid raster");
    write_fixture(dir, name, &raster)
}

/// Three single-band GeoTIFFs sharing one grid, named `{prefix}_R.tif` etc.
pub fn rgb_geotiffs(
    dir: &Path,
    prefix: &str,
    bands: [Vec<f32>; 3],
    width: usize,
    height: usize,
    gt: GeoTransform,
) -> Vec<PathBuf> {
    bands
        .into_iter()
        .zip(["R", "G", "B"])
        .map(|(band, channel)| {
            single_band_geotiff(dir, &format!("{}_{}.tif", prefix, channel), band, width, height, gt)
        })
        .collect()
}

/// Every `{z}/{x}/{y}.{ext}` file below a pyramid root, sorted.
pub fn list_tiles(root: &Path, ext: &str) -> Vec<(u8, i64, i64)> {
    let mut tiles = Vec::new();
    for (z, z_dir) in numeric_entries(root) {
        let Ok(z) = u8::try_from(z) else { continue };
        for (x, x_dir) in numeric_entries(&z_dir) {
            let Ok(files) = fs::read_dir(&x_dir) else { continue };
            for file in files.flatten() {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                    continue;
                }
                if let Some(y) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse().ok())
                {
                    tiles.push((z, x, y));
                }
            }
        }
    }
    tiles.sort_unstable();
    tiles
}

/// Number of tile files below a pyramid root.
pub fn count_tiles(root: &Path, ext: &str) -> usize {
    list_tiles(root, ext).len()
}

fn numeric_entries(dir: &Path) -> Vec<(i64, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let n = e.file_name().to_str()?.parse().ok()?;
            Some((n, e.path()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_tiles_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("3/4")).unwrap();
        fs::write(root.join("3/4/5.png"), b"x").unwrap();
        fs::write(root.join("3/4/6.png"), b"x").unwrap();
        fs::write(root.join("3/4/notes.txt"), b"x").unwrap();
        fs::write(root.join("metadata.json"), b"{}").unwrap();

        assert_eq!(list_tiles(root, "png"), vec![(3, 4, 5), (3, 4, 6)]);
        assert_eq!(count_tiles(root, "png"), 2);
    }

    #[test]
    fn test_rgb_geotiffs_names() {
        let dir = tempfile::tempdir().unwrap();
        let gt = north_up(origins::SEOUL, 10.0);
        let paths = rgb_geotiffs(
            dir.path(),
            "K3A_scene",
            [vec![1.0; 16], vec![2.0; 16], vec![3.0; 16]],
            4,
            4,
            gt,
        );
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("K3A_scene_R.tif"));
        assert!(paths.iter().all(|p| p.is_file()));
    }
}
