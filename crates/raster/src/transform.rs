//! Coordinate transforms between reference systems via proj4rs.
//!
//! Geographic coordinates are degrees at this API; proj4rs works in
//! radians, the conversion happens here.

use proj4rs::proj::Proj;
use tile_common::{BoundingBox, Crs, TilerError, TilerResult};

use crate::raster::Raster;

/// Points sampled along each edge when transforming an extent.
const EDGE_SAMPLES: usize = 21;

/// A reusable source → destination transform.
///
/// Parsing the projection definitions is done once; `transform` can then be
/// called per pixel.
pub struct PointTransformer {
    src: Proj,
    dst: Proj,
    src_crs: Crs,
    dst_crs: Crs,
}

impl PointTransformer {
    pub fn new(src_crs: Crs, dst_crs: Crs) -> TilerResult<Self> {
        Ok(Self {
            src: parse_proj(src_crs)?,
            dst: parse_proj(dst_crs)?,
            src_crs,
            dst_crs,
        })
    }

    pub fn src_crs(&self) -> Crs {
        self.src_crs
    }

    pub fn dst_crs(&self) -> Crs {
        self.dst_crs
    }

    /// Transform one point. Points outside the projection domain are errors.
    pub fn transform(&self, x: f64, y: f64) -> TilerResult<(f64, f64)> {
        if self.src_crs == self.dst_crs {
            return Ok((x, y));
        }

        let mut point = if self.src_crs.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.src, &self.dst, &mut point).map_err(|e| {
            TilerError::consistency(format!(
                "transform of ({}, {}) from {} to {} failed: {:?}",
                x, y, self.src_crs, self.dst_crs, e
            ))
        })?;

        let out = if self.dst_crs.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out.0.is_finite() || !out.1.is_finite() {
            return Err(TilerError::consistency(format!(
                "transform of ({}, {}) from {} to {} is not finite",
                x, y, self.src_crs, self.dst_crs
            )));
        }
        Ok(out)
    }
}

fn parse_proj(crs: Crs) -> TilerResult<Proj> {
    Proj::from_proj_string(crs.proj4()).map_err(|e| {
        TilerError::configuration(format!("coordinate system {} is not usable: {:?}", crs, e))
    })
}

/// Transform a single point between coordinate systems.
pub fn transform_point(x: f64, y: f64, src_crs: Crs, dst_crs: Crs) -> TilerResult<(f64, f64)> {
    PointTransformer::new(src_crs, dst_crs)?.transform(x, y)
}

/// Extent of `raster` expressed in `dst_crs`.
///
/// The four edges are sampled so that curved edges in the target system
/// are bounded, not just the corners. Sample points that fail to transform
/// are skipped.
pub fn transformed_bounds(raster: &Raster, dst_crs: Crs) -> TilerResult<BoundingBox> {
    let bounds = raster.bounds();
    if raster.crs() == dst_crs {
        return Ok(bounds);
    }

    let transformer = PointTransformer::new(raster.crs(), dst_crs)?;

    let steps = (EDGE_SAMPLES - 1) as f64;
    let mut samples = Vec::with_capacity(EDGE_SAMPLES * 4);
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / steps;
        let x = bounds.min_x + t * bounds.width();
        let y = bounds.min_y + t * bounds.height();
        samples.push((x, bounds.max_y));
        samples.push((x, bounds.min_y));
        samples.push((bounds.min_x, y));
        samples.push((bounds.max_x, y));
    }

    let projected = samples
        .into_iter()
        .filter_map(|(x, y)| transformer.transform(x, y).ok());

    BoundingBox::from_points(projected).ok_or_else(|| {
        TilerError::consistency(format!(
            "raster extent {:?} in {} has no valid points in {}",
            bounds,
            raster.crs(),
            dst_crs
        ))
    })
}
