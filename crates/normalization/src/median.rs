//! 3x3 median filter.

use rayon::prelude::*;

/// Median of each pixel's 3x3 neighbourhood, borders padded with zeros.
pub fn median_filter_3x3(band: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; width * height];
    if width == 0 || height == 0 {
        return out;
    }

    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out_row)| {
            let mut window = [0.0f32; 9];
            for (col, value) in out_row.iter_mut().enumerate() {
                let mut n = 0;
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let y = row as i64 + dy;
                        let x = col as i64 + dx;
                        window[n] = if y < 0 || x < 0 || y >= height as i64 || x >= width as i64 {
                            0.0
                        } else {
                            band[y as usize * width + x as usize]
                        };
                        n += 1;
                    }
                }
                let (_, median, _) = window.select_nth_unstable_by(4, f32::total_cmp);
                *value = *median;
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_interior() {
        let band = vec![5.0; 25];
        let out = median_filter_3x3(&band, 5, 5);
        assert_eq!(out[12], 5.0);
        // Corners see 5 padding zeros out of 9.
        assert_eq!(out[0], 0.0);
        // Edges see 3 padding zeros out of 9.
        assert_eq!(out[2], 5.0);
    }

    #[test]
    fn test_removes_isolated_spike() {
        let mut band = vec![1.0; 9];
        band[4] = 255.0;
        let out = median_filter_3x3(&band, 3, 3);
        assert_eq!(out[4], 1.0);
    }

    #[test]
    fn test_single_pixel() {
        assert_eq!(median_filter_3x3(&[9.0], 1, 1), vec![0.0]);
    }
}
