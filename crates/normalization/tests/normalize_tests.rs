use normalization::{normalize, Sensor};
use raster::{GeoTransform, PixelType, Raster};
use tile_common::Crs;

fn raster(bands: Vec<Vec<f32>>, width: usize, height: usize) -> Raster {
    Raster::from_bands(
        width,
        height,
        bands,
        GeoTransform::new(0.0, 0.0, 10.0, -10.0),
        Crs::web_mercator(),
        PixelType::U16,
    )
    .unwrap()
}

#[test]
fn test_eo_normalization_marks_u8() {
    let band: Vec<f32> = (0..64).map(|i| (i * 100) as f32).collect();
    let out = normalize(raster(vec![band], 8, 8), Sensor::K3A);
    assert_eq!(out.pixel_type(), PixelType::U8);
    assert!(out.band(0).iter().all(|&v| (0.0..=255.0).contains(&v)));
    assert_eq!(out.band(0)[0], 0.0);
    assert_eq!(out.band(0)[63], 255.0);
}

#[test]
fn test_two_band_input_keeps_first_band() {
    let first = vec![100.0; 16];
    let second = vec![5_000.0; 16];
    let out = normalize(raster(vec![first, second], 4, 4), Sensor::S2);
    assert_eq!(out.band_count(), 1);
}

#[test]
fn test_four_band_input_keeps_rgb() {
    let bands = (1..=4).map(|b| vec![b as f32 * 10.0; 16]).collect();
    let out = normalize(raster(bands, 4, 4), Sensor::L8);
    assert_eq!(out.band_count(), 3);
}

#[test]
fn test_sar_normalization_preserves_georeferencing() {
    let band: Vec<f32> = (0..100).map(|i| ((i * 7919) % 500) as f32).collect();
    let input = raster(vec![band], 10, 10);
    let gt = *input.geo_transform();
    let out = normalize(input, Sensor::S1);
    assert_eq!(out.geo_transform(), &gt);
    assert_eq!(out.crs(), Crs::web_mercator());
    assert!(out.band(0).iter().all(|&v| v.fract() == 0.0 && v <= 255.0));
}
