//! Conversion of normalized raster samples into RGBA tile pixels.
//!
//! A pixel is opaque only when every source channel is nonzero; zero in any
//! channel marks no-data.

use tile_common::{TilerError, TilerResult};

/// Convert a normalized sample to a byte: clamp to `[0, 255]`, then truncate.
///
/// NaN becomes 0.
#[inline]
pub fn sample_to_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.max(0.0).min(255.0) as u8
}

#[inline]
fn is_valid(value: f32) -> bool {
    value != 0.0 && !value.is_nan()
}

/// Fill `out` (RGBA, 4 bytes per pixel) from 1 or 3 bands of equal length.
///
/// A single band is replicated into R, G and B. Alpha is 255 when all
/// channel samples of the pixel are nonzero, 0 otherwise. The test runs on
/// the raw samples, so a value in `(0, 1)` is opaque even though it
/// truncates to 0.
pub fn fill_rgba(bands: &[&[f32]], out: &mut [u8]) -> TilerResult<()> {
    let pixels = out.len() / 4;
    if out.len() % 4 != 0 {
        return Err(TilerError::consistency(format!(
            "RGBA buffer length {} is not a multiple of 4",
            out.len()
        )));
    }
    if let Some(band) = bands.iter().find(|b| b.len() != pixels) {
        return Err(TilerError::consistency(format!(
            "band holds {} samples, tile holds {} pixels",
            band.len(),
            pixels
        )));
    }

    match bands {
        [gray] => {
            for (px, &v) in out.chunks_exact_mut(4).zip(gray.iter()) {
                let g = sample_to_u8(v);
                px[0] = g;
                px[1] = g;
                px[2] = g;
                px[3] = if is_valid(v) { 255 } else { 0 };
            }
        }
        [r, g, b] => {
            for (i, px) in out.chunks_exact_mut(4).enumerate() {
                let (rv, gv, bv) = (r[i], g[i], b[i]);
                px[0] = sample_to_u8(rv);
                px[1] = sample_to_u8(gv);
                px[2] = sample_to_u8(bv);
                px[3] = if is_valid(rv) && is_valid(gv) && is_valid(bv) {
                    255
                } else {
                    0
                };
            }
        }
        _ => {
            return Err(TilerError::consistency(format!(
                "tiles are rendered from 1 or 3 bands, got {}",
                bands.len()
            )))
        }
    }
    Ok(())
}

/// True when every pixel of an RGBA buffer has alpha 0.
pub fn is_fully_transparent(rgba: &[u8]) -> bool {
    rgba.chunks_exact(4).all(|px| px[3] == 0)
}
