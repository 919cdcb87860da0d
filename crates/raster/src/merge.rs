//! Merge three single-band files into one RGB raster.

use std::path::Path;

use tile_common::{TilerError, TilerResult};
use tracing::info;

use crate::geotiff::{open, probe, RasterInfo};
use crate::raster::Raster;

/// Build an RGB raster from three files, red/green/blue in that order.
///
/// Each input contributes its first band. All three must share projection,
/// geotransform and pixel dimensions; every check runs on the file headers
/// before any pixel data is read or the merged raster is allocated.
pub fn merge_bands<P: AsRef<Path>>(paths: &[P]) -> TilerResult<Raster> {
    if paths.len() != 3 {
        return Err(TilerError::configuration(format!(
            "band merge needs exactly 3 inputs (red, green, blue), got {}",
            paths.len()
        )));
    }

    let infos = paths
        .iter()
        .map(|p| probe(p.as_ref()))
        .collect::<TilerResult<Vec<_>>>()?;

    let reference = &infos[0];
    for (path, info) in paths.iter().zip(&infos).skip(1) {
        check_matches(reference, info, paths[0].as_ref(), path.as_ref())?;
    }

    let mut bands = Vec::with_capacity(3);
    for path in paths {
        let mut raster = open(path.as_ref())?;
        bands.push(std::mem::take(&mut raster.bands_mut()[0]));
    }

    info!(
        width = reference.width,
        height = reference.height,
        crs = %reference.crs,
        "Merged three bands into an RGB raster"
    );

    Raster::from_bands(
        reference.width,
        reference.height,
        bands,
        reference.geo_transform,
        reference.crs,
        reference.pixel_type,
    )
}

fn check_matches(
    reference: &RasterInfo,
    other: &RasterInfo,
    reference_path: &Path,
    other_path: &Path,
) -> TilerResult<()> {
    if reference.crs != other.crs {
        return Err(TilerError::consistency(format!(
            "projection mismatch: {} is {}, {} is {}",
            reference_path.display(),
            reference.crs,
            other_path.display(),
            other.crs
        )));
    }
    if reference.geo_transform != other.geo_transform {
        return Err(TilerError::consistency(format!(
            "geotransform mismatch: {} has {:?}, {} has {:?}",
            reference_path.display(),
            reference.geo_transform,
            other_path.display(),
            other.geo_transform
        )));
    }
    if (reference.width, reference.height) != (other.width, other.height) {
        return Err(TilerError::consistency(format!(
            "size mismatch: {} is {}x{}, {} is {}x{}",
            reference_path.display(),
            reference.width,
            reference.height,
            other_path.display(),
            other.width,
            other.height
        )));
    }
    Ok(())
}
