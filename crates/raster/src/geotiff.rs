//! GeoTIFF reading and writing.
//!
//! Only what the pyramid needs is interpreted: image samples, the
//! `ModelPixelScale` + `ModelTiepoint` pair (or `ModelTransformation`) for
//! georeferencing, and the EPSG code from the GeoKey directory.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{Gray32Float, Gray8, RGB32Float, RGB8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tiff::TiffError;
use tile_common::{Crs, TilerError, TilerResult};
use tracing::debug;

use crate::raster::{GeoTransform, PixelType, Raster};

// GeoTIFF tag IDs
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

// GeoKey values
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

fn geo_tag(id: u16) -> Tag {
    Tag::from_u16_exhaustive(id)
}

/// Header-level description of a GeoTIFF, read without decoding pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub geo_transform: GeoTransform,
    pub crs: Crs,
    pub pixel_type: PixelType,
}

/// Read the header, georeferencing and CRS of a GeoTIFF.
pub fn probe(path: impl AsRef<Path>) -> TilerResult<RasterInfo> {
    let path = path.as_ref();
    let mut decoder = open_decoder(path)?;
    read_info(&mut decoder, path)
}

/// Read a whole GeoTIFF into memory.
pub fn open(path: impl AsRef<Path>) -> TilerResult<Raster> {
    let path = path.as_ref();
    let mut decoder = open_decoder(path)?;
    let info = read_info(&mut decoder, path)?;

    let image = decoder.read_image().map_err(|e| decode_error(path, e))?;
    let samples = samples_to_f32(image)
        .ok_or_else(|| TilerError::format(format!("{}: unsupported sample type", path.display())))?;

    let pixels = info.width * info.height;
    if samples.len() != pixels * info.band_count {
        return Err(TilerError::format(format!(
            "{}: decoded {} samples, expected {} ({}x{} with {} bands)",
            path.display(),
            samples.len(),
            pixels * info.band_count,
            info.width,
            info.height,
            info.band_count
        )));
    }

    let bands = deinterleave(&samples, info.band_count);

    debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        bands = info.band_count,
        pixel_type = %info.pixel_type,
        crs = %info.crs,
        "Opened GeoTIFF"
    );

    Raster::from_bands(
        info.width,
        info.height,
        bands,
        info.geo_transform,
        info.crs,
        info.pixel_type,
    )
}

fn check_extension(path: &Path) -> TilerResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("tif") | Some("tiff") => Ok(()),
        Some("h5") | Some("hdf5") | Some("he5") => Err(TilerError::format(format!(
            "{}: HDF5 is not supported yet",
            path.display()
        ))),
        _ => Err(TilerError::format(format!(
            "{}: unrecognized raster format, expected a GeoTIFF (.tif/.tiff)",
            path.display()
        ))),
    }
}

fn open_decoder(path: &Path) -> TilerResult<Decoder<BufReader<File>>> {
    check_extension(path)?;

    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TilerError::configuration(format!("input file not found: {}", path.display()))
        } else {
            TilerError::io(path, e)
        }
    })?;

    Decoder::new(BufReader::new(file))
        .map(|d| d.with_limits(Limits::unlimited()))
        .map_err(|e| decode_error(path, e))
}

fn decode_error(path: &Path, err: TiffError) -> TilerError {
    match err {
        TiffError::IoError(e) => TilerError::io(path, e),
        other => TilerError::format(format!("{}: {}", path.display(), other)),
    }
}

fn read_info<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> TilerResult<RasterInfo> {
    let (width, height) = decoder.dimensions().map_err(|e| decode_error(path, e))?;

    let band_count = match find_u16_vec(decoder, Tag::SamplesPerPixel, path)? {
        Some(v) => v.first().copied().unwrap_or(1) as usize,
        None => 1,
    };
    let bits = find_u16_vec(decoder, Tag::BitsPerSample, path)?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let sample_format = find_u16_vec(decoder, Tag::SampleFormat, path)?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);

    let pixel_type = match (sample_format, bits) {
        (1, 8) => PixelType::U8,
        (1, 16) => PixelType::U16,
        (2, 16) => PixelType::I16,
        (1, 32) => PixelType::U32,
        (2, 32) => PixelType::I32,
        (3, 32) => PixelType::F32,
        (3, 64) => PixelType::F64,
        _ => {
            return Err(TilerError::format(format!(
                "{}: unsupported sample layout ({} bits, sample format {})",
                path.display(),
                bits,
                sample_format
            )))
        }
    };

    let geo_transform = read_geo_transform(decoder, path)?;
    let crs = read_crs(decoder, path)?;

    Ok(RasterInfo {
        width: width as usize,
        height: height as usize,
        band_count,
        geo_transform,
        crs,
        pixel_type,
    })
}

fn find_u16_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
    path: &Path,
) -> TilerResult<Option<Vec<u16>>> {
    decoder
        .find_tag(tag)
        .and_then(|v| v.map(|v| v.into_u16_vec()).transpose())
        .map_err(|e| decode_error(path, e))
}

fn find_f64_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
    path: &Path,
) -> TilerResult<Option<Vec<f64>>> {
    decoder
        .find_tag(tag)
        .and_then(|v| v.map(|v| v.into_f64_vec()).transpose())
        .map_err(|e| decode_error(path, e))
}

fn read_geo_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> TilerResult<GeoTransform> {
    let scale = find_f64_vec(decoder, geo_tag(MODEL_PIXEL_SCALE), path)?;
    let tiepoint = find_f64_vec(decoder, geo_tag(MODEL_TIEPOINT), path)?;

    if let (Some(scale), Some(tie)) = (scale, tiepoint) {
        if scale.len() >= 2 && tie.len() >= 6 {
            // Tiepoint ties raster (I, J) to model (X, Y).
            let (sx, sy) = (scale[0], scale[1]);
            return Ok(GeoTransform::new(
                tie[3] - tie[0] * sx,
                tie[4] + tie[1] * sy,
                sx,
                -sy,
            ));
        }
    }

    if let Some(m) = find_f64_vec(decoder, geo_tag(MODEL_TRANSFORMATION), path)? {
        if m.len() >= 8 {
            if m[1] != 0.0 || m[4] != 0.0 {
                return Err(TilerError::format(format!(
                    "{}: rotated rasters are not supported",
                    path.display()
                )));
            }
            return Ok(GeoTransform::new(m[3], m[7], m[0], m[5]));
        }
    }

    Err(TilerError::format(format!(
        "{}: missing georeferencing (no ModelPixelScale/ModelTiepoint or ModelTransformation)",
        path.display()
    )))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> TilerResult<Crs> {
    let keys = find_u16_vec(decoder, geo_tag(GEO_KEY_DIRECTORY), path)?.ok_or_else(|| {
        TilerError::format(format!("{}: missing GeoKey directory", path.display()))
    })?;

    // Header: version, revision, minor revision, key count; then 4 shorts per key.
    let count = keys.get(3).copied().unwrap_or(0) as usize;
    let entries: Vec<&[u16]> = keys
        .get(4..)
        .unwrap_or(&[])
        .chunks_exact(4)
        .take(count)
        .collect();

    // Only inline values (TIFFTagLocation 0) carry a code.
    let lookup = |id: u16| {
        entries
            .iter()
            .find(|e| e[0] == id && e[1] == 0)
            .map(|e| e[3])
    };

    let code = lookup(PROJECTED_CS_TYPE_GEO_KEY)
        .or_else(|| lookup(GEOGRAPHIC_TYPE_GEO_KEY))
        .ok_or_else(|| {
            TilerError::format(format!(
                "{}: GeoKey directory has no EPSG code",
                path.display()
            ))
        })?;

    if code == USER_DEFINED {
        return Err(TilerError::configuration(format!(
            "{}: user-defined coordinate systems are not supported",
            path.display()
        )));
    }

    Crs::from_epsg(code as u32)
}

fn samples_to_f32(image: DecodingResult) -> Option<Vec<f32>> {
    let samples = match image {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        _ => return None,
    };
    Some(samples)
}

fn deinterleave(samples: &[f32], band_count: usize) -> Vec<Vec<f32>> {
    if band_count == 1 {
        return vec![samples.to_vec()];
    }
    let pixels = samples.len() / band_count;
    let mut bands = vec![Vec::with_capacity(pixels); band_count];
    for pixel in samples.chunks_exact(band_count) {
        for (band, &value) in bands.iter_mut().zip(pixel) {
            band.push(value);
        }
    }
    bands
}

fn interleave(raster: &Raster) -> Vec<f32> {
    let bands = raster.bands();
    let pixels = raster.width() * raster.height();
    let mut out = Vec::with_capacity(pixels * bands.len());
    for i in 0..pixels {
        out.extend(bands.iter().map(|b| b[i]));
    }
    out
}

fn to_u8(samples: &[f32]) -> Vec<u8> {
    samples.iter().map(|&v| v.clamp(0.0, 255.0) as u8).collect()
}

/// Write a raster as a georeferenced GeoTIFF.
///
/// `U8` rasters with one or three bands are written as 8-bit gray/RGB,
/// everything else as 32-bit float.
pub fn write_geotiff(raster: &Raster, path: impl AsRef<Path>) -> TilerResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| TilerError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    write_geotiff_to(raster, &mut writer).map_err(|e| encode_error(path, e))?;
    writer.flush().map_err(|e| TilerError::io(path, e))?;

    debug!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        bands = raster.band_count(),
        "Wrote GeoTIFF"
    );
    Ok(())
}

fn encode_error(path: &Path, err: TiffError) -> TilerError {
    match err {
        TiffError::IoError(e) => TilerError::io(path, e),
        other => TilerError::Encode(format!("{}: {}", path.display(), other)),
    }
}

fn write_geotiff_to<W: Write + Seek>(raster: &Raster, writer: W) -> Result<(), TiffError> {
    let mut encoder = TiffEncoder::new(writer)?;
    let width = raster.width() as u32;
    let height = raster.height() as u32;
    let as_bytes = raster.pixel_type() == PixelType::U8;

    match (raster.band_count(), as_bytes) {
        (1, true) => {
            let mut image = encoder.new_image::<Gray8>(width, height)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(&to_u8(raster.band(0)))?;
        }
        (1, false) => {
            let mut image = encoder.new_image::<Gray32Float>(width, height)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(raster.band(0))?;
        }
        (3, true) => {
            let mut image = encoder.new_image::<RGB8>(width, height)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(&to_u8(&interleave(raster)))?;
        }
        (3, false) => {
            let mut image = encoder.new_image::<RGB32Float>(width, height)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(&interleave(raster))?;
        }
        (bands, _) => {
            let mut dir = encoder.new_directory()?;
            dir.write_tag(Tag::ImageWidth, width)?;
            dir.write_tag(Tag::ImageLength, height)?;
            dir.write_tag(Tag::BitsPerSample, vec![32u16; bands].as_slice())?;
            dir.write_tag(Tag::Compression, 1u16)?;
            dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
            dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
            dir.write_tag(Tag::SampleFormat, vec![3u16; bands].as_slice())?;
            dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
            dir.write_tag(Tag::RowsPerStrip, height)?;
            dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
            write_geo_tags(&mut dir, raster)?;

            let bytes: Vec<u8> = interleave(raster)
                .iter()
                .flat_map(|v| v.to_le_bytes())
                .collect();
            let offset = dir.write_data(bytes.as_slice())?;
            let offset = u32::try_from(offset).map_err(|_| TiffError::LimitsExceeded)?;
            dir.write_tag(Tag::StripOffsets, offset)?;
            dir.write_tag(Tag::StripByteCounts, bytes.len() as u32)?;
            dir.finish()?;
        }
    }
    Ok(())
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    raster: &Raster,
) -> Result<(), TiffError> {
    let gt = raster.geo_transform();

    let pixel_scale = [gt.pixel_size_x, -gt.pixel_size_y, 0.0];
    dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), pixel_scale.as_slice())?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    dir.write_tag(geo_tag(MODEL_TIEPOINT), tiepoint.as_slice())?;

    let crs = raster.crs();
    let (model_type, crs_key) = if crs.is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_GEO_KEY)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY)
    };
    #[rustfmt::skip]
    let keys: [u16; 16] = [
        1, 1, 0, 3,
        GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
        crs_key, 0, 1, crs.epsg(),
    ];
    dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), keys.as_slice())?;

    Ok(())
}
