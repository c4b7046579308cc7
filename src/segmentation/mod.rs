//! Foreground segmentation module
//!
//! This module separates the product from the background, either by
//! cropping the largest foreground component ([`BackgroundSegmenter`]) or by
//! warping every large rotated object into a canonical frame
//! ([`PerspectiveNormalizer`]). Both produce [`SegmentationResult`] values.

pub mod background;
pub mod perspective;

pub use background::BackgroundSegmenter;
pub use perspective::PerspectiveNormalizer;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::warn;

/// Axis-aligned box with exclusive upper bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BoundingBox {
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self { x0: 0, y0: 0, x1: width, y1: height }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Tight box around the non-zero pixels of `mask`
    pub fn of_mask(mask: &GrayImage) -> Option<Self> {
        let mut bbox: Option<Self> = None;
        for (x, y, pixel) in mask.enumerate_pixels() {
            if pixel[0] == 0 {
                continue;
            }
            let b = bbox.get_or_insert(Self { x0: x, y0: y, x1: x + 1, y1: y + 1 });
            b.x0 = b.x0.min(x);
            b.y0 = b.y0.min(y);
            b.x1 = b.x1.max(x + 1);
            b.y1 = b.y1.max(y + 1);
        }
        bbox
    }
}

/// Products of segmenting one image
///
/// `cropped_image` and `cropped_mask` always have the same size;
/// `area_ratio` is measured on the full frame before cropping.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Cleaned full-frame foreground mask
    pub mask: GrayImage,
    /// Object crop with background pixels set to black
    pub cropped_image: RgbImage,
    pub cropped_mask: GrayImage,
    pub bounding_box: BoundingBox,
    /// Foreground pixels over frame pixels
    pub area_ratio: f64,
    /// Threshold output before any cleanup
    pub raw_mask: GrayImage,
}

impl SegmentationResult {
    /// Crop `image` to the object in `mask`
    ///
    /// A degenerate box (empty mask, or width or height of at most one
    /// pixel) falls back to the full frame.
    pub fn from_mask(image: &RgbImage, mask: GrayImage, raw_mask: GrayImage) -> Self {
        let (width, height) = mask.dimensions();
        let foreground = mask.pixels().filter(|p| p[0] > 0).count();
        let area_ratio = if width == 0 || height == 0 {
            0.0
        } else {
            foreground as f64 / (width as f64 * height as f64)
        };

        let bounding_box = match BoundingBox::of_mask(&mask) {
            Some(b) if b.width() > 1 && b.height() > 1 => b,
            Some(b) => {
                warn!(?b, "degenerate object box, using full frame");
                BoundingBox::full_frame(width, height)
            }
            None => BoundingBox::full_frame(width, height),
        };

        let cropped_mask = image::imageops::crop_imm(
            &mask,
            bounding_box.x0,
            bounding_box.y0,
            bounding_box.width(),
            bounding_box.height(),
        )
        .to_image();
        let mut cropped_image = image::imageops::crop_imm(
            image,
            bounding_box.x0,
            bounding_box.y0,
            bounding_box.width(),
            bounding_box.height(),
        )
        .to_image();
        for (x, y, pixel) in cropped_image.enumerate_pixels_mut() {
            if cropped_mask.get_pixel(x, y)[0] == 0 {
                *pixel = Rgb([0, 0, 0]);
            }
        }

        Self {
            mask,
            cropped_image,
            cropped_mask,
            bounding_box,
            area_ratio,
            raw_mask,
        }
    }
}

/// Pixel count per component; index `i` holds label `i + 1`
fn component_sizes(labels: &ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<u32> {
    let mut sizes: Vec<u32> = Vec::new();
    for pixel in labels.pixels() {
        let label = pixel[0] as usize;
        if label == 0 {
            continue;
        }
        if sizes.len() < label {
            sizes.resize(label, 0);
        }
        sizes[label - 1] += 1;
    }
    sizes
}

/// Keep the largest 8-connected component of `mask`
///
/// Ties go to the component discovered first in raster order. Returns an
/// empty mask when the largest component has fewer than `min_area` pixels.
pub(crate) fn keep_largest_component(mask: &GrayImage, min_area: u32) -> GrayImage {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let sizes = component_sizes(&labels);

    let mut best: Option<(usize, u32)> = None;
    for (idx, &size) in sizes.iter().enumerate() {
        if best.map_or(true, |(_, s)| size > s) {
            best = Some((idx + 1, size));
        }
    }

    let mut out = GrayImage::new(mask.width(), mask.height());
    let Some((label, size)) = best else {
        return out;
    };
    if size < min_area {
        return out;
    }
    for (x, y, pixel) in labels.enumerate_pixels() {
        if pixel[0] as usize == label {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

/// Drop 8-connected components with fewer than `min_area` pixels
pub(crate) fn remove_small_components(mask: &GrayImage, min_area: u32) -> GrayImage {
    if min_area <= 1 {
        return mask.clone();
    }
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let sizes = component_sizes(&labels);
    let mut out = GrayImage::new(mask.width(), mask.height());
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0] as usize;
        if label > 0 && sizes[label - 1] >= min_area {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_bounding_box_of_mask() {
        let mut mask = GrayImage::new(50, 40);
        draw_filled_rect_mut(&mut mask, Rect::at(10, 5).of_size(20, 8), Luma([255]));
        let bbox = BoundingBox::of_mask(&mask).unwrap();
        assert_eq!(bbox, BoundingBox { x0: 10, y0: 5, x1: 30, y1: 13 });
        assert_eq!(BoundingBox::of_mask(&GrayImage::new(5, 5)), None);
    }

    #[test]
    fn test_from_mask_crops_and_blacks_out_background() {
        let image = RgbImage::from_pixel(60, 60, Rgb([10, 200, 10]));
        let mut mask = GrayImage::new(60, 60);
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(10, 10), Luma([255]));
        mask.put_pixel(20, 20, Luma([0]));

        let result = SegmentationResult::from_mask(&image, mask.clone(), mask);
        assert_eq!(result.cropped_image.dimensions(), result.cropped_mask.dimensions());
        assert_eq!(result.cropped_image.dimensions(), (10, 10));
        assert_eq!(result.cropped_image.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(result.cropped_image.get_pixel(5, 5), &Rgb([10, 200, 10]));
        assert!((result.area_ratio - 99.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_box_uses_full_frame() {
        let image = RgbImage::new(30, 20);
        let mut mask = GrayImage::new(30, 20);
        draw_filled_rect_mut(&mut mask, Rect::at(3, 3).of_size(10, 1), Luma([255]));

        let result = SegmentationResult::from_mask(&image, mask.clone(), mask);
        assert_eq!(result.bounding_box, BoundingBox::full_frame(30, 20));
        assert_eq!(result.cropped_mask.dimensions(), (30, 20));
    }

    #[test]
    fn test_keep_largest_component() {
        let mut mask = GrayImage::new(40, 40);
        draw_filled_rect_mut(&mut mask, Rect::at(2, 2).of_size(5, 5), Luma([255]));
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(10, 10), Luma([255]));

        let largest = keep_largest_component(&mask, 0);
        assert_eq!(largest.get_pixel(3, 3)[0], 0);
        assert_eq!(largest.get_pixel(25, 25)[0], 255);
        assert_eq!(largest.pixels().filter(|p| p[0] > 0).count(), 100);

        let rejected = keep_largest_component(&mask, 101);
        assert!(rejected.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_remove_small_components() {
        let mut mask = GrayImage::new(40, 40);
        draw_filled_rect_mut(&mut mask, Rect::at(2, 2).of_size(5, 5), Luma([255]));
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(10, 10), Luma([255]));

        let kept = remove_small_components(&mask, 26);
        assert_eq!(kept.pixels().filter(|p| p[0] > 0).count(), 100);
        let all = remove_small_components(&mask, 25);
        assert_eq!(all.pixels().filter(|p| p[0] > 0).count(), 125);
    }
}
