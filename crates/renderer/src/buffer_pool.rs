//! Thread-local buffer pools for tile encoding.
//!
//! Cutting a zoom level renders thousands of same-sized tiles on the rayon
//! pool. Each worker thread keeps one RGBA pixel buffer and one PNG scanline
//! buffer and reuses them for every tile it handles, instead of allocating
//! fresh `Vec`s per tile.
//!
//! ```ignore
//! use renderer::buffer_pool::with_pixel_buffer;
//!
//! let png = with_pixel_buffer(256, 256, |pixels| {
//!     fill_rgba(&[gray], pixels)?;
//!     TileFormat::Png.encode(pixels, 256, 256)
//! })?;
//! ```

use std::cell::RefCell;

/// Standard tile sizes for pre-allocated buffers
const TILE_256: usize = 256 * 256;
const TILE_512: usize = 512 * 512;
const TILE_1024: usize = 1024 * 1024;

thread_local! {
    // RGBA, 4 bytes per pixel
    static PIXEL_BUFFER: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(TILE_256 * 4));

    // Filtered scanlines awaiting deflate: 1 filter byte + row bytes, per row
    static SCANLINE_BUFFER: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(TILE_256 * 4 + 256));
}

/// Run `f` with a zeroed (fully transparent) RGBA buffer of `width * height * 4` bytes.
///
/// A nested call on the same thread, e.g. from a rayon job stolen while the
/// buffer is in use, gets a fresh allocation instead.
#[inline]
pub fn with_pixel_buffer<F, R>(width: usize, height: usize, f: F) -> R
where
    F: FnOnce(&mut [u8]) -> R,
{
    let size = width * height * 4;
    PIXEL_BUFFER.with(|cell| match cell.try_borrow_mut() {
        Ok(mut buf) => {
            let len = buf.len();
            if len < size {
                let target = optimal_capacity(size);
                buf.reserve(target.saturating_sub(len));
                buf.resize(size, 0);
            }
            buf[..size].fill(0);

            f(&mut buf[..size])
        }
        Err(_) => f(&mut vec![0u8; size]),
    })
}

/// Run `f` with an empty scanline buffer with room for `height` rows of
/// `width * bytes_per_pixel` bytes plus a filter byte each.
#[inline]
pub fn with_scanline_buffer<F, R>(width: usize, height: usize, bytes_per_pixel: usize, f: F) -> R
where
    F: FnOnce(&mut Vec<u8>) -> R,
{
    let size = height * (1 + width * bytes_per_pixel);
    SCANLINE_BUFFER.with(|cell| match cell.try_borrow_mut() {
        Ok(mut buf) => {
            buf.clear();
            if buf.capacity() < size {
                buf.reserve(size);
            }

            f(&mut buf)
        }
        Err(_) => f(&mut Vec::with_capacity(size)),
    })
}

/// Round a buffer size up to the next common tile size.
#[inline]
fn optimal_capacity(size: usize) -> usize {
    if size <= TILE_256 * 4 {
        TILE_256 * 4
    } else if size <= TILE_512 * 4 {
        TILE_512 * 4
    } else if size <= TILE_1024 * 4 {
        TILE_1024 * 4
    } else {
        size.next_power_of_two()
    }
}

/// Capacities of this thread's buffers, for debugging.
#[derive(Debug, Default, Clone)]
pub struct PoolStats {
    pub pixel_buffer_capacity: usize,
    pub scanline_buffer_capacity: usize,
}

/// Get current buffer pool statistics for this thread.
pub fn get_pool_stats() -> PoolStats {
    PoolStats {
        pixel_buffer_capacity: PIXEL_BUFFER.with(|b| b.borrow().capacity()),
        scanline_buffer_capacity: SCANLINE_BUFFER.with(|b| b.borrow().capacity()),
    }
}
