//! In-memory raster type.

use std::fmt;

use tile_common::{BoundingBox, Crs, TilerError, TilerResult};
use tracing::warn;

/// Affine georeferencing without rotation terms.
///
/// `origin_x`/`origin_y` is the outer corner of the top-left pixel.
/// `pixel_size_y` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_size_x: f64, pixel_size_y: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_size_x,
            pixel_size_y,
        }
    }

    /// World coordinate of the top-left corner of a pixel.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_size_x,
            self.origin_y + row * self.pixel_size_y,
        )
    }

    /// World coordinate of the center of a pixel.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel position of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_size_x,
            (y - self.origin_y) / self.pixel_size_y,
        )
    }

    /// Extent covered by a `width` x `height` pixel grid.
    pub fn extent(&self, width: usize, height: usize) -> BoundingBox {
        let (x0, y0) = self.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self.pixel_to_world(width as f64, height as f64);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// Sample type of the source data a raster was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl PixelType {
    /// Size of one sample of this type in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            PixelType::U8 => 1,
            PixelType::U16 | PixelType::I16 => 2,
            PixelType::U32 | PixelType::I32 | PixelType::F32 => 4,
            PixelType::F64 => 8,
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelType::U8 => "u8",
            PixelType::U16 => "u16",
            PixelType::I16 => "i16",
            PixelType::U32 => "u32",
            PixelType::I32 => "i32",
            PixelType::F32 => "f32",
            PixelType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A georeferenced multi-band raster.
///
/// Band buffers are row-major, top-to-bottom, one `Vec<f32>` per band.
/// Zero is the no-data value throughout the pipeline.
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    bands: Vec<Vec<f32>>,
    geo_transform: GeoTransform,
    crs: Crs,
    pixel_type: PixelType,
}

impl Raster {
    /// Allocate a raster with every band filled with the no-data value 0.
    pub fn new(
        width: usize,
        height: usize,
        band_count: usize,
        geo_transform: GeoTransform,
        crs: Crs,
        pixel_type: PixelType,
    ) -> TilerResult<Self> {
        if width == 0 || height == 0 || band_count == 0 {
            return Err(TilerError::consistency(format!(
                "raster must have non-zero size, got {}x{} with {} bands",
                width, height, band_count
            )));
        }
        Ok(Self {
            width,
            height,
            bands: vec![vec![0.0; width * height]; band_count],
            geo_transform,
            crs,
            pixel_type,
        })
    }

    /// Wrap existing band buffers, checking that each holds `width * height` samples.
    pub fn from_bands(
        width: usize,
        height: usize,
        bands: Vec<Vec<f32>>,
        geo_transform: GeoTransform,
        crs: Crs,
        pixel_type: PixelType,
    ) -> TilerResult<Self> {
        if width == 0 || height == 0 || bands.is_empty() {
            return Err(TilerError::consistency(format!(
                "raster must have non-zero size, got {}x{} with {} bands",
                width,
                height,
                bands.len()
            )));
        }
        let expected = width * height;
        if let Some((i, band)) = bands.iter().enumerate().find(|(_, b)| b.len() != expected) {
            return Err(TilerError::consistency(format!(
                "band {} holds {} samples, expected {} for {}x{}",
                i,
                band.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            bands,
            geo_transform,
            crs,
            pixel_type,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Pixel data of one band.
    ///
    /// # Panics
    /// Panics if `index >= band_count()`.
    pub fn band(&self, index: usize) -> &[f32] {
        &self.bands[index]
    }

    /// Mutable pixel data of one band.
    ///
    /// # Panics
    /// Panics if `index >= band_count()`.
    pub fn band_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.bands[index]
    }

    pub fn bands(&self) -> &[Vec<f32>] {
        &self.bands
    }

    pub fn bands_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.bands
    }

    pub fn into_bands(self) -> Vec<Vec<f32>> {
        self.bands
    }

    /// Replace the recorded source sample type, e.g. after a stretch to 8 bits.
    pub fn with_pixel_type(mut self, pixel_type: PixelType) -> Self {
        self.pixel_type = pixel_type;
        self
    }

    /// Extent of the raster in its own CRS.
    pub fn bounds(&self) -> BoundingBox {
        self.geo_transform.extent(self.width, self.height)
    }

    /// Bytes held by the band buffers.
    pub fn footprint_bytes(&self) -> usize {
        self.width * self.height * self.bands.len() * std::mem::size_of::<f32>()
    }

    /// Index into a band buffer of the pixel containing a world coordinate.
    pub fn pixel_index(&self, x: f64, y: f64) -> Option<usize> {
        let (col, row) = self.geo_transform.world_to_pixel(x, y);
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (col, row) = (col.floor() as usize, row.floor() as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(row * self.width + col)
    }

    fn check_window(
        &self,
        band: usize,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
    ) -> TilerResult<()> {
        if band >= self.bands.len() {
            return Err(TilerError::consistency(format!(
                "band {} out of range, raster has {} bands",
                band,
                self.bands.len()
            )));
        }
        if x_off + width > self.width || y_off + height > self.height {
            return Err(TilerError::consistency(format!(
                "window {}x{} at ({}, {}) exceeds raster size {}x{}",
                width, height, x_off, y_off, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Read a `width` x `height` block of one band, row-major.
    pub fn read_block(
        &self,
        band: usize,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
    ) -> TilerResult<Vec<f32>> {
        self.check_window(band, x_off, y_off, width, height)?;

        let src = &self.bands[band];
        let mut out = Vec::with_capacity(width * height);
        for row in y_off..y_off + height {
            let start = row * self.width + x_off;
            out.extend_from_slice(&src[start..start + width]);
        }
        Ok(out)
    }

    /// Write a `width` x `height` row-major block into one band.
    pub fn write_block(
        &mut self,
        band: usize,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
        data: &[f32],
    ) -> TilerResult<()> {
        self.check_window(band, x_off, y_off, width, height)?;
        if data.len() != width * height {
            return Err(TilerError::consistency(format!(
                "block holds {} samples, expected {} for {}x{}",
                data.len(),
                width * height,
                width,
                height
            )));
        }

        let stride = self.width;
        let dst = &mut self.bands[band];
        for (i, src_row) in data.chunks_exact(width).enumerate() {
            let start = (y_off + i) * stride + x_off;
            dst[start..start + width].copy_from_slice(src_row);
        }
        Ok(())
    }

    /// Reduce to the bands used for display: one (grayscale) or three (RGB).
    ///
    /// Two bands keep only the first; more than three keep the first three.
    pub fn visual_bands(mut self) -> Self {
        let keep = match self.bands.len() {
            1 | 2 => 1,
            _ => 3,
        };
        if self.bands.len() != keep {
            warn!(
                bands = self.bands.len(),
                kept = keep,
                "Truncating raster to its visual bands"
            );
            self.bands.truncate(keep);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(width: usize, height: usize, bands: usize) -> Raster {
        let data = (0..bands)
            .map(|b| {
                (0..width * height)
                    .map(|i| (b * 1000 + i) as f32)
                    .collect()
            })
            .collect();
        Raster::from_bands(
            width,
            height,
            data,
            GeoTransform::new(100.0, 200.0, 10.0, -10.0),
            Crs::web_mercator(),
            PixelType::U16,
        )
        .unwrap()
    }

    #[test]
    fn test_new_is_zero_filled() {
        let r = Raster::new(
            4,
            3,
            2,
            GeoTransform::new(0.0, 0.0, 1.0, -1.0),
            Crs::wgs84(),
            PixelType::U8,
        )
        .unwrap();
        assert_eq!(r.band_count(), 2);
        assert!(r.bands().iter().all(|b| b.len() == 12 && b.iter().all(|&v| v == 0.0)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let gt = GeoTransform::new(0.0, 0.0, 1.0, -1.0);
        assert!(Raster::new(0, 3, 1, gt, Crs::wgs84(), PixelType::U8).is_err());
        assert!(Raster::from_bands(2, 2, vec![vec![0.0; 3]], gt, Crs::wgs84(), PixelType::U8)
            .is_err());
    }

    #[test]
    fn test_bounds() {
        let r = sample(5, 4, 1);
        assert_eq!(r.bounds(), BoundingBox::new(100.0, 160.0, 150.0, 200.0));
    }

    #[test]
    fn test_pixel_index() {
        let r = sample(5, 4, 1);
        assert_eq!(r.pixel_index(100.5, 199.5), Some(0));
        assert_eq!(r.pixel_index(125.0, 185.0), Some(7));
        assert_eq!(r.pixel_index(99.9, 199.5), None);
        assert_eq!(r.pixel_index(150.0, 199.5), None);
        assert_eq!(r.pixel_index(f64::NAN, 199.5), None);
    }

    #[test]
    fn test_read_block() {
        let r = sample(5, 4, 2);
        let block = r.read_block(1, 1, 2, 3, 2).unwrap();
        assert_eq!(block, vec![1011.0, 1012.0, 1013.0, 1016.0, 1017.0, 1018.0]);
    }

    #[test]
    fn test_write_block() {
        let mut r = sample(5, 4, 1);
        r.write_block(0, 3, 1, 2, 2, &[-1.0, -2.0, -3.0, -4.0]).unwrap();
        assert_eq!(&r.band(0)[5..10], &[5.0, 6.0, 7.0, -1.0, -2.0]);
        assert_eq!(&r.band(0)[10..15], &[10.0, 11.0, 12.0, -3.0, -4.0]);
    }

    #[test]
    fn test_out_of_bounds_window_is_consistency_error() {
        let mut r = sample(5, 4, 1);
        assert!(matches!(
            r.read_block(0, 4, 0, 2, 1),
            Err(TilerError::Consistency(_))
        ));
        assert!(matches!(
            r.write_block(0, 0, 3, 1, 2, &[0.0, 0.0]),
            Err(TilerError::Consistency(_))
        ));
        assert!(matches!(
            r.read_block(3, 0, 0, 1, 1),
            Err(TilerError::Consistency(_))
        ));
    }

    #[test]
    fn test_visual_bands() {
        assert_eq!(sample(2, 2, 1).visual_bands().band_count(), 1);
        let two = sample(2, 2, 2).visual_bands();
        assert_eq!(two.band_count(), 1);
        assert_eq!(two.band(0)[0], 0.0);
        assert_eq!(sample(2, 2, 3).visual_bands().band_count(), 3);
        assert_eq!(sample(2, 2, 5).visual_bands().band_count(), 3);
    }
}
