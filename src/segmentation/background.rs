//! Background removal and cropping
//!
//! Pipeline per frame:
//! 1. Gaussian blur
//! 2. Raw foreground mask (HSV color key or Otsu on Lab lightness)
//! 3. Median filter on the mask
//! 4. Elliptical closing and opening, in the configured order
//! 5. Largest connected component
//! 6. Tight crop with background pixels blacked out

use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use tracing::debug;

use super::{keep_largest_component, remove_small_components, SegmentationResult};
use crate::color::ColorConverter;
use crate::config::{MaskStrategy, MorphOrder, SegmentationConfig};
use crate::morphology::{self, StructuringElement, FOREGROUND};

/// Gaussian sigma matching a `size × size` kernel with automatic sigma
pub(crate) fn sigma_for_kernel(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Background segmenter for single-object frames
#[derive(Debug, Clone)]
pub struct BackgroundSegmenter {
    config: SegmentationConfig,
    kernel: StructuringElement,
    converter: ColorConverter,
}

impl Default for BackgroundSegmenter {
    fn default() -> Self {
        Self::with_config(SegmentationConfig::default())
    }
}

impl BackgroundSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SegmentationConfig) -> Self {
        let size = config.morph_kernel_size;
        Self {
            kernel: StructuringElement::ellipse(size, size),
            converter: ColorConverter::new(),
            config,
        }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Segment the product in `image`
    ///
    /// A frame without any foreground yields an empty mask and a full-frame
    /// crop; callers detect that case through geometry analysis.
    pub fn segment(&self, image: &RgbImage) -> SegmentationResult {
        let blurred = self.blur(image);
        let raw_mask = self.raw_mask(&blurred);
        let cleaned = self.clean(&raw_mask);

        let mask = if self.config.keep_largest_object {
            keep_largest_component(&cleaned, self.config.min_object_area)
        } else {
            remove_small_components(&cleaned, self.config.min_object_area)
        };

        let result = SegmentationResult::from_mask(image, mask, raw_mask);
        debug!(
            area_ratio = result.area_ratio,
            width = result.bounding_box.width(),
            height = result.bounding_box.height(),
            "segmentation complete"
        );
        result
    }

    pub(crate) fn blur(&self, image: &RgbImage) -> RgbImage {
        if self.config.blur_size <= 1 {
            return image.clone();
        }
        gaussian_blur_f32(image, sigma_for_kernel(self.config.blur_size))
    }

    /// Foreground mask straight from the configured strategy
    pub(crate) fn raw_mask(&self, image: &RgbImage) -> GrayImage {
        match &self.config.strategy {
            MaskStrategy::ColorKey { background } => {
                let mut mask = GrayImage::new(image.width(), image.height());
                for (x, y, pixel) in image.enumerate_pixels() {
                    let [r, g, b] = pixel.0;
                    let (h, s, v) = self.converter.rgb_to_hsv(r, g, b);
                    if !background.contains(h, s, v) {
                        mask.put_pixel(x, y, Luma([FOREGROUND]));
                    }
                }
                mask
            }
            MaskStrategy::LightnessOtsu { invert_mean_threshold } => {
                let lightness = self.converter.lightness_plane(image);
                let level = otsu_level(&lightness);
                let mut mask = morphology::threshold(&lightness, level);
                let pixels = (mask.width() as f64 * mask.height() as f64).max(1.0);
                let mean = mask.pixels().map(|p| p[0] as f64).sum::<f64>() / pixels;
                if mean > *invert_mean_threshold {
                    debug!(mean, "inverting lightness mask");
                    for pixel in mask.pixels_mut() {
                        pixel[0] = FOREGROUND - pixel[0];
                    }
                }
                mask
            }
        }
    }

    /// Median filter, then closing and opening
    fn clean(&self, raw_mask: &GrayImage) -> GrayImage {
        let mut mask = if self.config.median_kernel_size > 1 {
            let radius = self.config.median_kernel_size / 2;
            median_filter(raw_mask, radius, radius)
        } else {
            raw_mask.clone()
        };

        let iterations = self.config.morph_iterations;
        match self.config.morph_order {
            MorphOrder::CloseThenOpen => {
                mask = morphology::close(&mask, &self.kernel, iterations);
                mask = morphology::open(&mask, &self.kernel, iterations);
            }
            MorphOrder::OpenThenClose => {
                mask = morphology::open(&mask, &self.kernel, iterations);
                mask = morphology::close(&mask, &self.kernel, iterations);
            }
        }
        mask
    }
}
