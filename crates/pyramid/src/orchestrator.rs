//! Zoom-level orchestration.
//!
//! For every zoom level the shared source raster is resampled to the zoom's
//! ground resolution, placed into a tile-aligned base raster and cut into
//! tiles. Zoom levels run concurrently on a dedicated pool sized by
//! [`plan_workers`]; the intermediate rasters of a level are owned by its
//! worker and dropped when the level finishes or fails.

use std::fs;
use std::time::{Duration, Instant};

use raster::{resample_to_resolution, transformed_bounds, Raster};
use rayon::prelude::*;
use serde::Serialize;
use tile_common::{Crs, TileIndexRange, TilerError, TilerResult, ZoomLevel};
use tracing::{debug, info};

use crate::base::build_base_raster;
use crate::cancel::CancellationToken;
use crate::composite::composite;
use crate::config::PyramidConfig;
use crate::cutter::TileCutter;
use crate::metadata::PyramidManifest;
use crate::pool::{build_pool, plan_workers, zoom_footprint_bytes};
use crate::source::prepare_source;

/// Outcome of one zoom level.
#[derive(Debug, Clone, Serialize)]
pub struct ZoomReport {
    pub zoom: u8,
    pub tile_range: TileIndexRange,
    /// Base raster size in pixels (width, height).
    pub base_size: (usize, usize),
    pub tiles_written: u64,
    pub tiles_skipped: u64,
    pub elapsed: Duration,
}

/// Outcome of a whole run, zoom levels in ascending order.
#[derive(Debug, Clone, Serialize)]
pub struct PyramidReport {
    pub zooms: Vec<ZoomReport>,
    pub workers: usize,
    pub elapsed: Duration,
}

impl PyramidReport {
    pub fn tiles_written(&self) -> u64 {
        self.zooms.iter().map(|z| z.tiles_written).sum()
    }

    pub fn tiles_skipped(&self) -> u64 {
        self.zooms.iter().map(|z| z.tiles_skipped).sum()
    }
}

/// Builds a tile pyramid from a validated [`PyramidConfig`].
#[derive(Debug)]
pub struct PyramidBuilder {
    config: PyramidConfig,
    zooms: Vec<ZoomLevel>,
    cancel: CancellationToken,
}

impl PyramidBuilder {
    /// Validate `config` and set up a builder.
    pub fn new(config: PyramidConfig) -> TilerResult<Self> {
        config.validate()?;
        let zooms = config.zoom_levels()?;
        Ok(Self {
            config,
            zooms,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    /// Full run: prepare the source, build every zoom level, write the manifest.
    ///
    /// The first failing zoom level aborts the run. Levels already written
    /// are left on disk.
    pub fn run(&self) -> TilerResult<PyramidReport> {
        let sensor = self.config.resolved_sensor()?;
        let source = prepare_source(&self.config)?;
        let report = self.build_from_source(&source)?;

        let lonlat = transformed_bounds(&source, Crs::wgs84())?;
        PyramidManifest::new(
            &report,
            lonlat,
            self.config.tile_size,
            self.config.format,
            self.config.target_crs,
            sensor,
        )
        .write(&self.config.output)?;

        Ok(report)
    }

    /// Build all zoom levels from an already normalized source in the target CRS.
    pub fn build_from_source(&self, source: &Raster) -> TilerResult<PyramidReport> {
        let start = Instant::now();
        let output = &self.config.output;
        fs::create_dir_all(output).map_err(|e| TilerError::io(output, e))?;

        let finest = self
            .zooms
            .iter()
            .copied()
            .max()
            .ok_or_else(|| TilerError::configuration("no zoom levels requested"))?;
        let extent = source.bounds();
        let per_zoom = zoom_footprint_bytes(
            extent.width(),
            extent.height(),
            source.band_count(),
            finest,
        );
        let plan = plan_workers(
            self.config.max_workers,
            self.config.memory_limit_bytes(),
            self.zooms.len(),
            per_zoom,
        );
        let pool = build_pool(plan.workers)?;

        info!(
            zoom_min = self.config.zoom_min,
            zoom_max = self.config.zoom_max,
            workers = plan.workers,
            output = %output.display(),
            "Building tile pyramid"
        );

        let zooms = pool.install(|| {
            self.zooms
                .par_iter()
                .map(|&zoom| self.build_zoom(source, zoom))
                .collect::<TilerResult<Vec<_>>>()
        })?;

        let report = PyramidReport {
            zooms,
            workers: plan.workers,
            elapsed: start.elapsed(),
        };

        info!(
            tiles = report.tiles_written(),
            skipped = report.tiles_skipped(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Tile pyramid complete"
        );
        Ok(report)
    }

    /// Resample, build the base raster, composite and cut one zoom level.
    pub fn build_zoom(&self, source: &Raster, zoom: ZoomLevel) -> TilerResult<ZoomReport> {
        self.cancel.check()?;
        let start = Instant::now();
        info!(zoom = zoom.get(), resolution = zoom.resolution(), "Zoom level started");

        let zoom_dir = self.config.output.join(zoom.get().to_string());
        fs::create_dir_all(&zoom_dir).map_err(|e| TilerError::io(&zoom_dir, e))?;

        let resampled = resample_to_resolution(source, zoom.resolution())?;
        let (mut base, tile_range) = build_base_raster(&resampled, zoom, self.config.tile_size)?;
        let placement = composite(&resampled, &mut base)?;
        drop(resampled);

        debug!(
            zoom = zoom.get(),
            offset_x = placement.offset_x,
            offset_y = placement.offset_y,
            tiles = tile_range.len(),
            "Base raster composited"
        );

        let cutter =
            TileCutter::new(self.config.tile_size, self.config.format).skip_empty(self.config.skip_empty);
        let cut = cutter.cut(&base, &tile_range, &self.config.output, &self.cancel)?;

        let report = ZoomReport {
            zoom: zoom.get(),
            tile_range,
            base_size: (base.width(), base.height()),
            tiles_written: cut.written,
            tiles_skipped: cut.skipped_empty,
            elapsed: start.elapsed(),
        };

        info!(
            zoom = report.zoom,
            tiles = report.tiles_written,
            skipped = report.tiles_skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Zoom level complete"
        );
        Ok(report)
    }
}
