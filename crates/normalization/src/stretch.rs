//! Percentile stretches.
//!
//! Stretch limits are computed jointly over all bands of an image so that
//! RGB composites keep their color balance.

use rayon::prelude::*;
use tracing::warn;

use crate::median::median_filter_3x3;

/// Optical stretch percentiles.
pub const EO_LOW_PERCENTILE: f64 = 0.1;
pub const EO_HIGH_PERCENTILE: f64 = 99.9;

/// Radar clip percentiles.
pub const SAR_LOW_PERCENTILE: f64 = 2.0;
pub const SAR_HIGH_PERCENTILE: f64 = 98.0;

/// A linear map of `[low, high]` onto `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stretch {
    pub low: f32,
    pub high: f32,
}

impl Stretch {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Scale a value, clamped to `[0, 255]`.
    ///
    /// A degenerate range (`high <= low`) maps every value above zero to 255.
    pub fn apply(&self, value: f32) -> f32 {
        let range = self.high - self.low;
        if range <= 0.0 {
            return if value > 0.0 { 255.0 } else { 0.0 };
        }
        ((value - self.low) / range * 255.0).clamp(0.0, 255.0)
    }
}

/// Percentile `p` (0-100) of `values`, linear interpolation between closest ranks.
///
/// `values` is reordered. NaN must be filtered out beforehand. Returns `None`
/// for an empty slice.
pub fn percentile(values: &mut [f32], p: f64) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    let rank = (p / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let index = rank.floor() as usize;
    let fraction = rank - index as f64;

    let (_, &mut lower, upper) = values.select_nth_unstable_by(index, f32::total_cmp);
    if fraction == 0.0 || upper.is_empty() {
        return Some(lower);
    }

    let next = upper.iter().copied().fold(f32::INFINITY, f32::min);
    Some((lower as f64 + (next - lower) as f64 * fraction) as f32)
}

fn collect_samples(bands: &[Vec<f32>], keep: impl Fn(f32) -> bool + Sync) -> Vec<f32> {
    bands
        .par_iter()
        .flat_map_iter(|band| band.iter().copied().filter(|&v| !v.is_nan() && keep(v)))
        .collect()
}

/// Optical stretch, in place.
///
/// Limits are the 0.1 and 99.9 percentiles of the nonzero pixels across all
/// bands. Zero pixels stay zero. Returns `None` when no pixel is nonzero.
pub fn percentile_eo(bands: &mut [Vec<f32>]) -> Option<Stretch> {
    let mut samples = collect_samples(bands, |v| v != 0.0);
    let low = percentile(&mut samples, EO_LOW_PERCENTILE);
    let high = percentile(&mut samples, EO_HIGH_PERCENTILE);
    drop(samples);

    let (Some(low), Some(high)) = (low, high) else {
        warn!("Image has no nonzero pixels, leaving it blank");
        return None;
    };

    let stretch = Stretch::new(low, high);
    for band in bands.iter_mut() {
        band.par_iter_mut().for_each(|v| {
            *v = if v.is_nan() { 0.0 } else { stretch.apply(*v) };
        });
    }
    Some(stretch)
}

/// Radar stretch, in place.
///
/// Values are clipped to the 2nd and 98th percentiles of all pixels,
/// min-max scaled to `[0, 255]` and truncated to integers, then each band
/// goes through a zero-padded 3x3 median filter.
pub fn percentile_sar(bands: &mut [Vec<f32>], width: usize, height: usize) -> Option<Stretch> {
    let mut samples = collect_samples(bands, |_| true);
    let low = percentile(&mut samples, SAR_LOW_PERCENTILE);
    let high = percentile(&mut samples, SAR_HIGH_PERCENTILE);
    drop(samples);

    let (Some(low), Some(high)) = (low, high) else {
        warn!("Image has no valid pixels, leaving it blank");
        for band in bands.iter_mut() {
            band.fill(0.0);
        }
        return None;
    };

    // After clipping, the min and max of the image are the clip limits.
    let stretch = Stretch::new(low, high);
    for band in bands.iter_mut() {
        band.par_iter_mut().for_each(|v| {
            *v = if v.is_nan() {
                0.0
            } else {
                stretch.apply(v.max(low).min(high)).trunc()
            };
        });
        let filtered = median_filter_3x3(band, width, height);
        *band = filtered;
    }
    Some(stretch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let mut v: Vec<f32> = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert_eq!(percentile(&mut v, 0.0), Some(1.0));
        assert_eq!(percentile(&mut v, 100.0), Some(5.0));
        assert_eq!(percentile(&mut v, 50.0), Some(3.0));
        // rank 0.1 * 4 = 0.4 -> 1 + 0.4
        assert!(approx(percentile(&mut v, 10.0).unwrap(), 1.4));
        // rank 0.98 * 4 = 3.92 -> 4 + 0.92
        assert!(approx(percentile(&mut v, 98.0).unwrap(), 4.92));
    }

    #[test]
    fn test_percentile_empty_and_single() {
        assert_eq!(percentile(&mut [], 50.0), None);
        assert_eq!(percentile(&mut [7.0], 99.9), Some(7.0));
    }

    #[test]
    fn test_stretch_apply() {
        let s = Stretch::new(10.0, 110.0);
        assert_eq!(s.apply(10.0), 0.0);
        assert_eq!(s.apply(110.0), 255.0);
        assert!(approx(s.apply(60.0), 127.5));
        assert_eq!(s.apply(-50.0), 0.0);
        assert_eq!(s.apply(1e6), 255.0);
    }

    #[test]
    fn test_degenerate_stretch() {
        let s = Stretch::new(7.0, 7.0);
        assert_eq!(s.apply(7.0), 255.0);
        assert_eq!(s.apply(0.0), 0.0);
    }

    #[test]
    fn test_eo_keeps_zero_as_no_data() {
        let mut bands = vec![(0..1000).map(|i| i as f32).collect::<Vec<_>>()];
        let stretch = percentile_eo(&mut bands).unwrap();

        assert_eq!(bands[0][0], 0.0);
        assert!(bands[0].iter().all(|&v| (0.0..=255.0).contains(&v)));
        assert_eq!(bands[0][999], 255.0);
        assert!(stretch.low > 0.0 && stretch.low < 2.0);
        assert!(stretch.high > 998.0 && stretch.high < 999.0);
    }

    #[test]
    fn test_eo_limits_are_joint_across_bands() {
        let mut bands = vec![vec![10.0; 100], vec![20.0; 100], vec![30.0; 100]];
        let stretch = percentile_eo(&mut bands).unwrap();
        assert_eq!(stretch.low, 10.0);
        assert_eq!(stretch.high, 30.0);
        assert_eq!(bands[0][0], 0.0);
        assert!(approx(bands[1][0], 127.5));
        assert_eq!(bands[2][0], 255.0);
    }

    #[test]
    fn test_eo_all_zero_image() {
        let mut bands = vec![vec![0.0; 16]];
        assert!(percentile_eo(&mut bands).is_none());
        assert!(bands[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sar_output_is_integer_and_bounded() {
        let width = 20;
        let height = 20;
        let band: Vec<f32> = (0..width * height).map(|i| (i * 37 % 1000) as f32).collect();
        let mut bands = vec![band];
        percentile_sar(&mut bands, width, height).unwrap();
        assert!(bands[0]
            .iter()
            .all(|&v| v.fract() == 0.0 && (0.0..=255.0).contains(&v)));
    }

    #[test]
    fn test_sar_median_removes_speckle() {
        let width = 5;
        let height = 5;
        let mut band = vec![100.0; 25];
        band[12] = 10_000.0;
        band[0] = 50.0;
        let mut bands = vec![band];
        percentile_sar(&mut bands, width, height).unwrap();
        // The isolated bright pixel is gone after the median.
        assert_eq!(bands[0][12], bands[0][6]);
    }
}
