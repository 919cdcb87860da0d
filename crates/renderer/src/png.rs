//! PNG encoding for RGBA tiles.
//!
//! Two output modes:
//! - **Indexed (color type 3)** when the tile has at most 256 distinct RGBA
//!   values. Every grayscale tile qualifies: 255 opaque grays plus the
//!   transparent no-data color.
//! - **Truecolor with alpha (color type 6)** otherwise, typical for RGB tiles.
//!
//! [`encode_png_auto`] picks the mode; [`encode_png_rgba`] and
//! [`encode_png_indexed`] force one.

use std::collections::HashMap;
use std::io::Write;

use rayon::prelude::*;
use tile_common::{TilerError, TilerResult};

use crate::buffer_pool::with_scanline_buffer;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_RGBA: u8 = 6;

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 512 * 512;

/// An RGBA palette entry.
pub type PaletteColor = (u8, u8, u8, u8);

/// Encode an RGBA tile, choosing indexed mode whenever the colors fit.
pub fn encode_png_auto(pixels: &[u8], width: usize, height: usize) -> TilerResult<Vec<u8>> {
    check_rgba_len(pixels, width, height)?;

    let palette = if width * height >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette {
        Some((palette, indices)) => encode_png_indexed(width, height, &palette, &indices),
        None => encode_png_rgba(pixels, width, height),
    }
}

/// Encode an RGBA tile as truecolor with alpha.
pub fn encode_png_rgba(pixels: &[u8], width: usize, height: usize) -> TilerResult<Vec<u8>> {
    check_rgba_len(pixels, width, height)?;

    let mut png = Vec::with_capacity(pixels.len() / 4 + 64);
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, COLOR_TYPE_RGBA));
    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width, height, 4)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Encode a palette + index image.
///
/// A tRNS chunk is written only if some palette entry is not fully opaque.
pub fn encode_png_indexed(
    width: usize,
    height: usize,
    palette: &[PaletteColor],
    indices: &[u8],
) -> TilerResult<Vec<u8>> {
    if palette.is_empty() || palette.len() > MAX_PALETTE_SIZE {
        return Err(TilerError::Encode(format!(
            "palette must hold 1 to {} colors, got {}",
            MAX_PALETTE_SIZE,
            palette.len()
        )));
    }
    if indices.len() != width * height {
        return Err(TilerError::Encode(format!(
            "expected {} palette indices for {}x{}, got {}",
            width * height,
            width,
            height,
            indices.len()
        )));
    }

    let mut png = Vec::with_capacity(indices.len() / 4 + palette.len() * 4 + 64);
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, COLOR_TYPE_INDEXED));

    let plte: Vec<u8> = palette.iter().flat_map(|&(r, g, b, _)| [r, g, b]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|&(_, _, _, a)| a < 255) {
        let trns: Vec<u8> = palette.iter().map(|&(_, _, _, a)| a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(indices, width, height, 1)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn check_rgba_len(pixels: &[u8], width: usize, height: usize) -> TilerResult<()> {
    if width == 0 || height == 0 {
        return Err(TilerError::Encode(format!(
            "cannot encode an empty {}x{} image",
            width, height
        )));
    }
    if pixels.len() != width * height * 4 {
        return Err(TilerError::Encode(format!(
            "expected {} RGBA bytes for {}x{}, got {}",
            width * height * 4,
            width,
            height,
            pixels.len()
        )));
    }
    Ok(())
}

fn ihdr(width: usize, height: usize, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&(width as u32).to_be_bytes());
    data[4..8].copy_from_slice(&(height as u32).to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods stay 0
    data
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

#[inline(always)]
fn unpack_color(packed: u32) -> PaletteColor {
    let [r, g, b, a] = packed.to_le_bytes();
    (r, g, b, a)
}

/// Palette and per-pixel indices, or `None` past 256 colors.
fn extract_palette_sequential(pixels: &[u8]) -> Option<(Vec<PaletteColor>, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<PaletteColor> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let packed = pack_color(px[0], px[1], px[2], px[3]);
        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push(unpack_color(packed));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel variant for large tiles: distinct colors per row band first,
/// then a merged palette, then a parallel index pass.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Vec<PaletteColor>, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(4096);

    let local_sets: Vec<Option<Vec<u32>>> = pixels
        .par_chunks(chunk_pixels * 4)
        .map(|chunk| {
            let mut seen: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for px in chunk.chunks_exact(4) {
                seen.insert(pack_color(px[0], px[1], px[2], px[3]), ());
                if seen.len() > MAX_PALETTE_SIZE {
                    return None;
                }
            }
            Some(seen.into_keys().collect())
        })
        .collect();

    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<PaletteColor> = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in local_sets.into_iter().collect::<Option<Vec<_>>>()?.into_iter().flatten() {
        if !color_to_index.contains_key(&packed) {
            if palette.len() >= MAX_PALETTE_SIZE {
                return None;
            }
            color_to_index.insert(packed, palette.len() as u8);
            palette.push(unpack_color(packed));
        }
    }

    let indices: Vec<u8> = pixels
        .par_chunks_exact(4)
        .map(|px| {
            color_to_index
                .get(&pack_color(px[0], px[1], px[2], px[3]))
                .copied()
                .unwrap_or(0)
        })
        .collect();

    Some((palette, indices))
}

/// Prefix each row with filter type 0 (None) and zlib-compress.
fn deflate_scanlines(
    data: &[u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> TilerResult<Vec<u8>> {
    let row_bytes = width * bytes_per_pixel;

    with_scanline_buffer(width, height, bytes_per_pixel, |scanlines| {
        for row in data.chunks_exact(row_bytes).take(height) {
            scanlines.push(0);
            scanlines.extend_from_slice(row);
        }

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder
            .write_all(scanlines)
            .and_then(|_| encoder.finish())
            .map_err(|e| TilerError::Encode(format!("IDAT compression failed: {}", e)))
    })
}

/// Append a chunk: length, type, data, CRC over type + data.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_gray_tile() {
        // transparent no-data, then two grays, then no-data again
        let pixels = [
            0, 0, 0, 0, //
            40, 40, 40, 255, //
            200, 200, 200, 255, //
            0, 0, 0, 0,
        ];

        let (palette, indices) = extract_palette_sequential(&pixels).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(indices, vec![0, 1, 2, 0]);
        assert_eq!(palette[0], (0, 0, 0, 0));
    }

    #[test]
    fn test_full_gray_range_fits_palette() {
        // 255 opaque grays + transparent black = 256 colors
        let mut pixels = vec![0u8; 4];
        for v in 1..=255u8 {
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
        let (palette, _) = extract_palette_sequential(&pixels).unwrap();
        assert_eq!(palette.len(), 256);
    }

    #[test]
    fn test_too_many_colors() {
        let pixels: Vec<u8> = (0..300u32)
            .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 7, 255])
            .collect();
        assert!(extract_palette_sequential(&pixels).is_none());
        assert!(extract_palette_parallel(&pixels).is_none());
    }

    #[test]
    fn test_parallel_matches_sequential_indices() {
        let size = 600;
        let pixels: Vec<u8> = (0..size * size)
            .flat_map(|i| {
                let v = ((i / size + i % size) % 40) as u8 * 5;
                [v, v, v, if v == 0 { 0 } else { 255 }]
            })
            .collect();

        let (seq_palette, seq_indices) = extract_palette_sequential(&pixels).unwrap();
        let (par_palette, par_indices) = extract_palette_parallel(&pixels).unwrap();
        assert_eq!(seq_palette.len(), par_palette.len());

        // Palette order may differ; the colors each pixel maps to may not.
        for (s, p) in seq_indices.iter().zip(&par_indices).step_by(97) {
            assert_eq!(seq_palette[*s as usize], par_palette[*p as usize]);
        }
    }

    #[test]
    fn test_ihdr_layout() {
        let data = ihdr(256, 128, COLOR_TYPE_RGBA);
        assert_eq!(&data[0..4], &[0, 0, 1, 0]);
        assert_eq!(&data[4..8], &[0, 0, 0, 128]);
        assert_eq!(data[8], 8);
        assert_eq!(data[9], 6);
    }

    #[test]
    fn test_rejects_wrong_buffer_length() {
        assert!(matches!(
            encode_png_auto(&[0; 15], 2, 2),
            Err(TilerError::Encode(_))
        ));
        assert!(matches!(
            encode_png_indexed(2, 2, &[(0, 0, 0, 0)], &[0; 3]),
            Err(TilerError::Encode(_))
        ));
        assert!(encode_png_rgba(&[], 0, 0).is_err());
    }
}
