//! Dark spot and surface defect detection
//!
//! Small dark blemishes are emphasized with a black-hat filter, thresholded
//! by contrast and restricted to an inward-eroded analysis region that
//! excludes the unreliable object rim. A detection must clear three tests:
//! enough defect pixels, enough of them relative to the analyzed area, and
//! enough of them inside a further eroded inner region. When the primary
//! check fails, a second pass with a finer erosion looks for defects close
//! to the rim and is accepted only against its own thresholds.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{ColorAnalyzer, ColorConverter};
use crate::config::SpotConfig;
use crate::morphology::{self, StructuringElement};

/// Color and surface descriptors of one object
///
/// `Default` is the zero state reported for images that are not eligible
/// for color analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorFeatures {
    pub detection_flag: bool,
    pub spot_area: u32,
    pub texture_stddev: f64,
    pub lab_stddev: f64,
    pub dark_delta: f64,
    pub median_intensity: f64,
}

/// Defect pixels found for one analysis region
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpotMeasurement {
    /// Defect pixels inside the region
    spot_area: u32,
    /// Pixels of the region itself
    region_area: u32,
    /// Defect pixels inside the inner region
    inner_spot_area: u32,
}

impl SpotMeasurement {
    fn ratio(&self) -> f64 {
        self.spot_area as f64 / self.region_area.max(1) as f64
    }

    fn inner_ratio(&self) -> f64 {
        if self.spot_area == 0 {
            return 0.0;
        }
        self.inner_spot_area as f64 / self.spot_area as f64
    }

    fn meets_ratio(&self, limit: f64) -> bool {
        limit <= 0.0 || self.ratio() >= limit
    }

    fn meets_inner_ratio(&self, limit: f64) -> bool {
        self.spot_area > 0 && self.inner_ratio() >= limit
    }
}

/// Black-hat based spot detector
#[derive(Debug, Clone)]
pub struct SpotDetector {
    config: SpotConfig,
    erosion_kernel: StructuringElement,
    blackhat_kernel: StructuringElement,
    noise_kernel: StructuringElement,
    converter: ColorConverter,
    analyzer: ColorAnalyzer,
}

impl Default for SpotDetector {
    fn default() -> Self {
        Self::with_config(SpotConfig::default())
    }
}

impl SpotDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SpotConfig) -> Self {
        let [ew, eh] = config.erosion_kernel_size;
        let [bw, bh] = config.blackhat_kernel_size;
        let [nw, nh] = config.noise_kernel_size;
        Self {
            erosion_kernel: StructuringElement::rect(ew, eh),
            blackhat_kernel: StructuringElement::ellipse(bw, bh),
            noise_kernel: StructuringElement::rect(nw, nh),
            converter: ColorConverter::new(),
            analyzer: ColorAnalyzer::new(config.dark_percentile),
            config,
        }
    }

    pub fn config(&self) -> &SpotConfig {
        &self.config
    }

    /// Detect surface defects on `image` inside `object_mask`
    ///
    /// # Arguments
    ///
    /// * `image` - RGB object crop
    /// * `object_mask` - Binary object mask of the same size
    ///
    /// # Returns
    ///
    /// Color features with `detection_flag` set when either the primary
    /// check or the fine-erosion retry accepts the defect pixels
    pub fn detect(&self, image: &RgbImage, object_mask: &GrayImage) -> ColorFeatures {
        let gray = self.converter.to_gray(image);
        let analysis_mask = morphology::erode(
            object_mask,
            &self.erosion_kernel,
            self.config.erosion_iterations,
        );

        let hat = morphology::black_hat(&gray, &self.blackhat_kernel);
        let defects = morphology::threshold(&hat, self.config.blackhat_contrast_threshold);

        let primary = self.measure(&defects, &analysis_mask);
        let stats = self.analyzer.analyze(image, &gray, &analysis_mask);

        let mut features = ColorFeatures {
            detection_flag: self.primary_check(&primary),
            spot_area: primary.spot_area,
            texture_stddev: stats.texture_stddev,
            lab_stddev: stats.lab_stddev,
            dark_delta: stats.dark_delta,
            median_intensity: stats.median_intensity,
        };

        if !features.detection_flag {
            if let Some(fine_area) = self.refine_with_fine_erosion(object_mask, &defects) {
                features.detection_flag = true;
                features.spot_area = fine_area;
            }
        }

        debug!(
            spot_area = features.spot_area,
            flag = features.detection_flag,
            texture = features.texture_stddev,
            "color features extracted"
        );
        features
    }

    /// Count defect pixels inside `region` and inside its inner erosion
    fn measure(&self, defects: &GrayImage, region: &GrayImage) -> SpotMeasurement {
        let valid = morphology::open(
            &morphology::intersect(defects, region),
            &self.noise_kernel,
            1,
        );
        let inner_spot_area = if self.config.inner_erosion_iterations > 0 {
            let inner = morphology::erode(
                region,
                &self.erosion_kernel,
                self.config.inner_erosion_iterations,
            );
            morphology::count_nonzero(&morphology::intersect(&valid, &inner))
        } else {
            morphology::count_nonzero(&valid)
        };

        SpotMeasurement {
            spot_area: morphology::count_nonzero(&valid),
            region_area: morphology::count_nonzero(region),
            inner_spot_area,
        }
    }

    /// Primary acceptance: minimum area, area ratio and inner ratio
    fn primary_check(&self, measurement: &SpotMeasurement) -> bool {
        measurement.spot_area >= self.config.minimum_spot_area
            && measurement.meets_ratio(self.config.spot_area_ratio)
            && measurement.meets_inner_ratio(self.config.inner_spot_ratio)
    }

    /// Retry on a less eroded region; returns the fine spot area on success
    fn refine_with_fine_erosion(&self, object_mask: &GrayImage, defects: &GrayImage) -> Option<u32> {
        if self.config.fine_erosion_iterations == 0 {
            return None;
        }
        let fine_region = morphology::erode(
            object_mask,
            &self.erosion_kernel,
            self.config.fine_erosion_iterations,
        );
        let fine = self.measure(defects, &fine_region);

        let passes = fine.spot_area > self.config.fine_spot_area
            && fine.meets_ratio(self.config.fine_spot_ratio)
            && fine.meets_inner_ratio(self.config.inner_spot_ratio);
        if passes {
            debug!(fine_area = fine.spot_area, "defect accepted by fine erosion retry");
            Some(fine.spot_area)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn blotched_image(size: u32, x0: u32, y0: u32, side: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
                Rgb([60, 60, 60])
            } else {
                Rgb([200, 200, 200])
            }
        })
    }

    fn blotch_config() -> SpotConfig {
        SpotConfig {
            erosion_kernel_size: [3, 3],
            erosion_iterations: 2,
            blackhat_kernel_size: [15, 15],
            blackhat_contrast_threshold: 30,
            minimum_spot_area: 64,
            inner_erosion_iterations: 3,
            inner_spot_ratio: 0.5,
            ..SpotConfig::default()
        }
    }

    #[test]
    fn test_blotch_of_minimum_area_is_detected() {
        let image = blotched_image(100, 46, 46, 8);
        let mask = GrayImage::from_pixel(100, 100, Luma([255]));

        let features = SpotDetector::with_config(blotch_config()).detect(&image, &mask);
        assert!(features.detection_flag);
        assert_eq!(features.spot_area, 64);
        assert!(features.dark_delta >= 0.0);
        assert!(features.texture_stddev > 0.0);
    }

    #[test]
    fn test_clean_surface_is_not_flagged() {
        let image = RgbImage::from_pixel(80, 80, Rgb([190, 160, 110]));
        let mask = GrayImage::from_pixel(80, 80, Luma([255]));

        let features = SpotDetector::new().detect(&image, &mask);
        assert!(!features.detection_flag);
        assert_eq!(features.spot_area, 0);
        assert_eq!(features.texture_stddev, 0.0);
    }

    #[test]
    fn test_small_blotch_below_minimum() {
        let image = blotched_image(100, 46, 46, 4);
        let mask = GrayImage::from_pixel(100, 100, Luma([255]));
        let config = SpotConfig {
            fine_erosion_iterations: 0,
            ..blotch_config()
        };

        let features = SpotDetector::with_config(config).detect(&image, &mask);
        assert!(!features.detection_flag);
        assert_eq!(features.spot_area, 16);
    }

    #[test]
    fn test_fine_retry_recovers_rim_defect() {
        // blotch just inside the rim: outside the inner region of the coarse
        // pass, inside the inner region of the fine pass
        let image = blotched_image(100, 8, 46, 8);
        let mask = GrayImage::from_pixel(100, 100, Luma([255]));
        let config = SpotConfig {
            erosion_iterations: 6,
            fine_erosion_iterations: 1,
            inner_erosion_iterations: 4,
            inner_spot_ratio: 0.9,
            fine_spot_area: 25,
            fine_spot_ratio: 0.0,
            ..blotch_config()
        };
        let detector = SpotDetector::with_config(config);

        let features = detector.detect(&image, &mask);
        assert!(features.detection_flag);
        assert_eq!(features.spot_area, 64);

        let no_retry = SpotDetector::with_config(SpotConfig {
            fine_erosion_iterations: 0,
            ..detector.config().clone()
        });
        assert!(!no_retry.detect(&image, &mask).detection_flag);
    }

    #[test]
    fn test_empty_mask_yields_zero_features() {
        let image = blotched_image(50, 20, 20, 8);
        let features = SpotDetector::new().detect(&image, &GrayImage::new(50, 50));
        assert_eq!(features, ColorFeatures::default());
    }
}
