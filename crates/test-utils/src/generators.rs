//! Synthetic band data with predictable, verifiable patterns.
//!
//! All generators return row-major `Vec<f32>` buffers of `width * height`
//! samples.

/// Diagonal gradient from `min` (top-left) to `max` (bottom-right).
pub fn gradient_band(width: usize, height: usize, min: f32, max: f32) -> Vec<f32> {
    let span = (width + height).saturating_sub(2).max(1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let t = (row + col) as f32 / span;
            data.push(min + t * (max - min));
        }
    }
    data
}

/// Checkerboard of `cell`-pixel squares alternating between `low` and `high`.
pub fn checkerboard_band(width: usize, height: usize, cell: usize, low: f32, high: f32) -> Vec<f32> {
    let cell = cell.max(1);
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let even = (row / cell + col / cell) % 2 == 0;
            data.push(if even { low } else { high });
        }
    }
    data
}

/// Zero a `border`-pixel frame around a band, as scene edges come as no-data.
pub fn with_nodata_border(mut band: Vec<f32>, width: usize, height: usize, border: usize) -> Vec<f32> {
    for row in 0..height {
        for col in 0..width {
            if row < border || col < border || row + border >= height || col + border >= width {
                band[row * width + col] = 0.0;
            }
        }
    }
    band
}

/// Radar-like backscatter: a smooth base with deterministic multiplicative speckle.
///
/// Uses a fixed linear congruential sequence so runs are reproducible.
pub fn speckle_band(width: usize, height: usize, seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((state >> 33) as f32 / (1u64 << 31) as f32) * 1.5 + 0.25;
            let base = 100.0 + (row + col) as f32;
            data.push(base * noise);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_endpoints() {
        let band = gradient_band(10, 5, 1.0, 100.0);
        assert_eq!(band[0], 1.0);
        assert!((band[49] - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_checkerboard() {
        let band = checkerboard_band(4, 4, 2, 0.0, 9.0);
        assert_eq!(band[0], 0.0);
        assert_eq!(band[2], 9.0);
        assert_eq!(band[8], 9.0);
        assert_eq!(band[10], 0.0);
    }

    #[test]
    fn test_nodata_border() {
        let band = with_nodata_border(vec![5.0; 25], 5, 5, 1);
        assert_eq!(band.iter().filter(|&&v| v == 5.0).count(), 9);
        assert_eq!(band[0], 0.0);
        assert_eq!(band[12], 5.0);
    }

    #[test]
    fn test_speckle_is_reproducible_and_positive() {
        let a = speckle_band(8, 8, 42);
        let b = speckle_band(8, 8, 42);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| v > 0.0));
        assert_ne!(a, speckle_band(8, 8, 7));
    }
}
