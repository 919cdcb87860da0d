//! Cutting a base raster into tile images on disk.

use std::fs;
use std::path::Path;

use raster::Raster;
use rayon::prelude::*;
use renderer::buffer_pool::with_pixel_buffer;
use renderer::{fill_rgba, is_fully_transparent, TileFormat};
use tile_common::{TileCoord, TileIndexRange, TilerError, TilerResult};

use crate::cancel::CancellationToken;

/// Tiles produced by one cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutReport {
    pub written: u64,
    pub skipped_empty: u64,
}

impl CutReport {
    fn merge(self, other: CutReport) -> CutReport {
        CutReport {
            written: self.written + other.written,
            skipped_empty: self.skipped_empty + other.skipped_empty,
        }
    }
}

/// Writes the tiles of a base raster.
#[derive(Debug, Clone, Copy)]
pub struct TileCutter {
    pub tile_size: usize,
    pub format: TileFormat,
    pub skip_empty: bool,
}

impl TileCutter {
    pub fn new(tile_size: usize, format: TileFormat) -> Self {
        Self {
            tile_size,
            format,
            skip_empty: false,
        }
    }

    pub fn skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }

    /// Number of whole tiles along x and y; trailing partial tiles are dropped.
    pub fn grid_size(&self, base: &Raster) -> (usize, usize) {
        (base.width() / self.tile_size, base.height() / self.tile_size)
    }

    /// Cut `base` into tiles under `root/{z}/{x}/{y}.{ext}`.
    ///
    /// Block (tx, ty) of the base becomes tile
    /// `(range.x_min + tx, range.y_min + ty)` at `range.zoom`. Columns are
    /// processed in parallel; `cancel` is checked before each column.
    pub fn cut(
        &self,
        base: &Raster,
        range: &TileIndexRange,
        root: &Path,
        cancel: &CancellationToken,
    ) -> TilerResult<CutReport> {
        let (size_x, size_y) = self.grid_size(base);

        (0..size_x)
            .into_par_iter()
            .map(|tx| {
                cancel.check()?;
                self.cut_column(base, range, root, tx, size_y)
            })
            .try_reduce(CutReport::default, |a, b| Ok(a.merge(b)))
    }

    fn cut_column(
        &self,
        base: &Raster,
        range: &TileIndexRange,
        root: &Path,
        tx: usize,
        size_y: usize,
    ) -> TilerResult<CutReport> {
        let ts = self.tile_size;
        let ext = self.format.extension();
        let mut report = CutReport::default();
        let mut column_dir_ready = false;

        for ty in 0..size_y {
            let blocks = (0..base.band_count())
                .map(|band| base.read_block(band, tx * ts, ty * ts, ts, ts))
                .collect::<TilerResult<Vec<_>>>()?;
            let bands: Vec<&[f32]> = blocks.iter().map(Vec::as_slice).collect();

            let encoded = with_pixel_buffer(ts, ts, |pixels| -> TilerResult<Option<Vec<u8>>> {
                fill_rgba(&bands, pixels)?;
                if self.skip_empty && is_fully_transparent(pixels) {
                    return Ok(None);
                }
                self.format.encode(pixels, ts, ts).map(Some)
            })?;

            let Some(bytes) = encoded else {
                report.skipped_empty += 1;
                continue;
            };

            let coord = TileCoord {
                z: range.zoom,
                x: range.x_min + tx as i64,
                y: range.y_min + ty as i64,
            };
            let path = coord.path_in(root, ext);

            if !column_dir_ready {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir).map_err(|e| TilerError::io(dir, e))?;
                }
                column_dir_ready = true;
            }
            fs::write(&path, bytes).map_err(|e| TilerError::io(&path, e))?;
            report.written += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster::{GeoTransform, PixelType};
    use tile_common::Crs;

    fn base(width: usize, height: usize, bands: usize) -> Raster {
        Raster::new(
            width,
            height,
            bands,
            GeoTransform::new(0.0, 0.0, 1.0, -1.0),
            Crs::web_mercator(),
            PixelType::U8,
        )
        .unwrap()
    }

    fn range(zoom: u8, x_min: i64, y_min: i64) -> TileIndexRange {
        TileIndexRange {
            zoom,
            x_min,
            y_min,
            x_max: x_min + 10,
            y_max: y_min + 10,
        }
    }

    #[test]
    fn test_grid_size_drops_partial_tiles() {
        let cutter = TileCutter::new(64, TileFormat::Png);
        assert_eq!(cutter.grid_size(&base(200, 130, 1)), (3, 2));
    }

    #[test]
    fn test_writes_tiles_at_offset_indices() {
        let dir = tempfile::tempdir().unwrap();
        let cutter = TileCutter::new(64, TileFormat::Png);
        let report = cutter
            .cut(&base(128, 64, 1), &range(5, 10, 20), dir.path(), &CancellationToken::new())
            .unwrap();

        assert_eq!(report, CutReport { written: 2, skipped_empty: 0 });
        assert!(dir.path().join("5/10/20.png").is_file());
        assert!(dir.path().join("5/11/20.png").is_file());
    }

    #[test]
    fn test_skip_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut raster = base(128, 64, 1);
        raster.band_mut(0)[0] = 50.0;

        let cutter = TileCutter::new(64, TileFormat::Png).skip_empty(true);
        let report = cutter
            .cut(&raster, &range(3, 0, 0), dir.path(), &CancellationToken::new())
            .unwrap();

        assert_eq!(report, CutReport { written: 1, skipped_empty: 1 });
        assert!(dir.path().join("3/0/0.png").is_file());
        assert!(!dir.path().join("3/1").exists());
    }

    #[test]
    fn test_cancelled_before_first_column() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let cutter = TileCutter::new(64, TileFormat::Png);
        let result = cutter.cut(&base(128, 128, 1), &range(3, 0, 0), dir.path(), &token);
        assert!(matches!(result, Err(TilerError::Cancelled)));
        assert!(!dir.path().join("3").exists());
    }

    #[test]
    fn test_two_band_base_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cutter = TileCutter::new(64, TileFormat::Png);
        let result = cutter.cut(&base(64, 64, 2), &range(3, 0, 0), dir.path(), &CancellationToken::new());
        assert!(matches!(result, Err(TilerError::Consistency(_))));
    }
}
