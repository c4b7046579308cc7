//! Color space conversion utilities
//!
//! Provides the per-pixel conversions the pipeline relies on:
//! - RGB to gray (ITU-R BT.601 luma, as used by the classic vision toolkits)
//! - RGB to CIE Lab (D65) and an 8-bit lightness plane
//! - RGB to HSV for background keying

use image::{GrayImage, Luma, RgbImage};
use palette::{FromColor, Hsv, Lab, Srgb};

/// Color converter between the image planes used by the pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConverter;

impl ColorConverter {
    pub fn new() -> Self {
        Self
    }

    fn srgb(r: u8, g: u8, b: u8) -> Srgb {
        Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Convert RGB (0-255) to Lab color space
    ///
    /// # Arguments
    ///
    /// * `r`, `g`, `b` - RGB values in range [0, 255]
    ///
    /// # Returns
    ///
    /// Lab color under D65, `l` in [0, 100]
    pub fn rgb_to_lab(&self, r: u8, g: u8, b: u8) -> Lab {
        Lab::from_color(Self::srgb(r, g, b))
    }

    /// Convert RGB (0-255) to `(hue°, saturation, value)`
    ///
    /// Hue is in [0, 360), saturation and value in [0, 1]. Achromatic
    /// pixels report hue 0.
    pub fn rgb_to_hsv(&self, r: u8, g: u8, b: u8) -> (f32, f32, f32) {
        let hsv = Hsv::from_color(Self::srgb(r, g, b));
        (hsv.hue.into_positive_degrees(), hsv.saturation, hsv.value)
    }

    /// BT.601 luma, rounded
    pub fn rgb_to_gray(&self, r: u8, g: u8, b: u8) -> u8 {
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        luma.round().clamp(0.0, 255.0) as u8
    }

    /// Gray plane of an RGB image
    pub fn to_gray(&self, image: &RgbImage) -> GrayImage {
        let mut gray = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            gray.put_pixel(x, y, Luma([self.rgb_to_gray(r, g, b)]));
        }
        gray
    }

    /// Lab lightness scaled to 0-255
    pub fn lightness_plane(&self, image: &RgbImage) -> GrayImage {
        let mut plane = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let lightness = self.rgb_to_lab(r, g, b).l * 255.0 / 100.0;
            plane.put_pixel(x, y, Luma([lightness.round().clamp(0.0, 255.0) as u8]));
        }
        plane
    }

    /// Lab `a` (green-red) values of the pixels selected by `mask`
    pub fn masked_lab_a(&self, image: &RgbImage, mask: &GrayImage) -> Vec<f64> {
        image
            .enumerate_pixels()
            .filter(|(x, y, _)| mask.get_pixel(*x, *y)[0] > 0)
            .map(|(_, _, pixel)| {
                let [r, g, b] = pixel.0;
                self.rgb_to_lab(r, g, b).a as f64
            })
            .collect()
    }
}
