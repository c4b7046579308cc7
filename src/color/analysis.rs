//! Surface statistics over a masked object region
//!
//! Summarizes the texture of the analysis region with:
//! - Gray-level spread (population standard deviation)
//! - Median gray level and the gap between median and a low percentile
//! - Spread of the Lab green-red channel
//!
//! Percentiles use linear interpolation between the closest ranks.

use image::{GrayImage, RgbImage};

use crate::color::ColorConverter;

/// Texture and tone statistics of a masked region
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceStatistics {
    /// Population standard deviation of gray values
    pub texture_stddev: f64,
    /// Median gray value
    pub median_intensity: f64,
    /// Median minus the configured low percentile of gray values
    pub dark_delta: f64,
    /// Population standard deviation of the Lab `a` channel
    pub lab_stddev: f64,
    /// Number of pixels analyzed
    pub pixel_count: usize,
}

/// Color analyzer computing surface statistics
#[derive(Debug, Clone)]
pub struct ColorAnalyzer {
    converter: ColorConverter,
    dark_percentile: f64,
}

impl Default for ColorAnalyzer {
    fn default() -> Self {
        Self::new(crate::constants::spot::DARK_PERCENTILE)
    }
}

impl ColorAnalyzer {
    /// Create an analyzer using `dark_percentile` (0-100) for the dark delta
    pub fn new(dark_percentile: f64) -> Self {
        Self {
            converter: ColorConverter::new(),
            dark_percentile,
        }
    }

    /// Compute statistics of `image` inside `mask`
    ///
    /// # Arguments
    ///
    /// * `image` - RGB object crop
    /// * `gray` - Gray plane of the same crop
    /// * `mask` - Analysis region (non-zero = included)
    ///
    /// # Returns
    ///
    /// All-zero statistics when the mask selects no pixel
    pub fn analyze(&self, image: &RgbImage, gray: &GrayImage, mask: &GrayImage) -> SurfaceStatistics {
        let mut values: Vec<f64> = gray
            .enumerate_pixels()
            .filter(|(x, y, _)| mask.get_pixel(*x, *y)[0] > 0)
            .map(|(_, _, p)| p[0] as f64)
            .collect();
        if values.is_empty() {
            return SurfaceStatistics::default();
        }

        let texture_stddev = population_stddev(&values);
        values.sort_by(f64::total_cmp);
        let median_intensity = percentile(&values, 50.0);
        let dark_delta = median_intensity - percentile(&values, self.dark_percentile);

        let lab_a = self.converter.masked_lab_a(image, mask);

        SurfaceStatistics {
            texture_stddev,
            median_intensity,
            dark_delta,
            lab_stddev: population_stddev(&lab_a),
            pixel_count: values.len(),
        }
    }
}

/// Population standard deviation, 0 for an empty slice
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    variance.sqrt()
}

/// Percentile (0-100) of an ascending slice with linear interpolation
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (pct.clamp(0.0, 100.0) / 100.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Luma, Rgb};

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&values, 50.0), 2.5);
        assert_relative_eq!(percentile(&values, 0.0), 1.0);
        assert_relative_eq!(percentile(&values, 100.0), 4.0);
        assert_relative_eq!(percentile(&values, 25.0), 1.75);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_population_stddev() {
        assert_relative_eq!(population_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(population_stddev(&[]), 0.0);
    }

    #[test]
    fn test_uniform_surface_has_no_texture() {
        let image = RgbImage::from_pixel(10, 10, Rgb([180, 150, 90]));
        let gray = ColorConverter::new().to_gray(&image);
        let mask = GrayImage::from_pixel(10, 10, Luma([255]));

        let stats = ColorAnalyzer::default().analyze(&image, &gray, &mask);
        assert_eq!(stats.pixel_count, 100);
        assert_relative_eq!(stats.texture_stddev, 0.0);
        assert_relative_eq!(stats.dark_delta, 0.0);
        assert!(stats.lab_stddev < 1e-4);
        assert_relative_eq!(stats.median_intensity, gray.get_pixel(0, 0)[0] as f64);
    }

    #[test]
    fn test_dark_pixels_raise_dark_delta() {
        let image = RgbImage::from_fn(10, 10, |x, _| {
            if x == 0 {
                Rgb([20, 20, 20])
            } else {
                Rgb([200, 200, 200])
            }
        });
        let gray = ColorConverter::new().to_gray(&image);
        let mask = GrayImage::from_pixel(10, 10, Luma([255]));

        let stats = ColorAnalyzer::new(5.0).analyze(&image, &gray, &mask);
        assert_relative_eq!(stats.median_intensity, 200.0);
        assert_relative_eq!(stats.dark_delta, 180.0);
        assert!(stats.texture_stddev > 50.0);
    }

    #[test]
    fn test_empty_mask_yields_zero_statistics() {
        let image = RgbImage::from_pixel(5, 5, Rgb([10, 200, 10]));
        let gray = ColorConverter::new().to_gray(&image);
        let stats = ColorAnalyzer::default().analyze(&image, &gray, &GrayImage::new(5, 5));
        assert_eq!(stats, SurfaceStatistics::default());
    }
}
