//! Binary morphology on `GrayImage` masks, built on `imageproc::morphology`
//!
//! Structuring elements follow the rectangular / elliptical kernels of the
//! classic vision toolkits: a `w × h` footprint anchored at `(w/2, h/2)`.
//! Binary masks use 0 for background and 255 for foreground.
//!
//! Binary [`erode`] treats pixels outside the image as background, so an
//! object touching the frame edge is eroded from that edge too. Dilation
//! and the grayscale filters only consider in-bounds neighbours.

use image::{imageops, GrayImage, Luma};
use imageproc::contrast::{self, ThresholdType};
use imageproc::map::map_colors2;
use imageproc::morphology::{grayscale_close, grayscale_dilate, grayscale_erode, Mask};

/// Foreground value of a binary mask
pub const FOREGROUND: u8 = 255;

/// Largest footprint side accepted by `Mask::from_image`
const MAX_KERNEL_SIDE: u32 = 511;

/// Structuring element shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    Rect,
    Ellipse,
}

/// Structuring element with its footprint extent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    mask: Mask,
    width: u32,
    height: u32,
}

impl StructuringElement {
    /// Build a `width × height` structuring element
    ///
    /// Sizes are clamped to `1..=511`; a 1×1 element is the identity.
    pub fn new(shape: KernelShape, width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_KERNEL_SIDE);
        let height = height.clamp(1, MAX_KERNEL_SIDE);
        let (ax, ay) = (width / 2, height / 2);
        let rx = width as f64 / 2.0;
        let ry = height as f64 / 2.0;

        let footprint = GrayImage::from_fn(width, height, |x, y| {
            let inside = match shape {
                KernelShape::Rect => true,
                KernelShape::Ellipse => {
                    let nx = (x as f64 - ax as f64) / rx;
                    let ny = (y as f64 - ay as f64) / ry;
                    nx * nx + ny * ny <= 1.0
                }
            };
            Luma([if inside { FOREGROUND } else { 0 }])
        });

        // anchors fit in u8 since sides are at most 511
        Self {
            mask: Mask::from_image(&footprint, ax as u8, ay as u8),
            width,
            height,
        }
    }

    pub fn rect(width: u32, height: u32) -> Self {
        Self::new(KernelShape::Rect, width, height)
    }

    pub fn ellipse(width: u32, height: u32) -> Self {
        Self::new(KernelShape::Ellipse, width, height)
    }

    /// Border that covers every offset of the footprint
    fn reach(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Binary erosion; out-of-bounds pixels count as background
pub fn erode(mask: &GrayImage, kernel: &StructuringElement, iterations: u32) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    let (width, height) = mask.dimensions();
    let pad = kernel.reach();
    let mut padded = GrayImage::new(width + 2 * pad, height + 2 * pad);
    imageops::replace(&mut padded, &threshold(mask, 0), pad as i64, pad as i64);

    for _ in 0..iterations {
        padded = grayscale_erode(&padded, &kernel.mask);
    }
    imageops::crop_imm(&padded, pad, pad, width, height).to_image()
}

/// Binary dilation
pub fn dilate(mask: &GrayImage, kernel: &StructuringElement, iterations: u32) -> GrayImage {
    let mut current = threshold(mask, 0);
    for _ in 0..iterations {
        current = grayscale_dilate(&current, &kernel.mask);
    }
    current
}

/// Binary opening (erode, then dilate)
pub fn open(mask: &GrayImage, kernel: &StructuringElement, iterations: u32) -> GrayImage {
    dilate(&erode(mask, kernel, iterations), kernel, iterations)
}

/// Binary closing (dilate, then erode)
///
/// The erosion step here ignores the frame border, otherwise closing would
/// strip a rim off any object touching the image edge.
pub fn close(mask: &GrayImage, kernel: &StructuringElement, iterations: u32) -> GrayImage {
    let mut current = dilate(mask, kernel, iterations);
    for _ in 0..iterations {
        current = grayscale_erode(&current, &kernel.mask);
    }
    current
}

/// Black-hat transform: grayscale closing minus original
///
/// Highlights dark features narrower than the kernel while flattening
/// slow illumination gradients.
pub fn black_hat(image: &GrayImage, kernel: &StructuringElement) -> GrayImage {
    let closed = grayscale_close(image, &kernel.mask);
    map_colors2(&closed, image, |c, o| Luma([c[0].saturating_sub(o[0])]))
}

/// Pixel-wise AND of two masks of equal size
pub fn intersect(a: &GrayImage, b: &GrayImage) -> GrayImage {
    map_colors2(a, b, |p, q| {
        Luma([if p[0] > 0 && q[0] > 0 { FOREGROUND } else { 0 }])
    })
}

/// Binary threshold: values strictly above `thresh` become foreground
pub fn threshold(image: &GrayImage, thresh: u8) -> GrayImage {
    contrast::threshold(image, thresh, ThresholdType::Binary)
}

/// Number of foreground pixels
pub fn count_nonzero(mask: &GrayImage) -> u32 {
    mask.pixels().filter(|p| p[0] > 0).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_mask(size: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        })
    }

    /// Footprint of `kernel` stamped around the center of a 31×31 image
    fn footprint(kernel: &StructuringElement) -> GrayImage {
        let mut dot = GrayImage::new(31, 31);
        dot.put_pixel(15, 15, Luma([FOREGROUND]));
        dilate(&dot, kernel, 1)
    }

    #[test]
    fn test_rect_element_size() {
        assert_eq!(count_nonzero(&footprint(&StructuringElement::rect(3, 3))), 9);
        assert_eq!(count_nonzero(&footprint(&StructuringElement::rect(0, 0))), 1);
    }

    #[test]
    fn test_ellipse_element_is_subset_of_rect() {
        let ellipse = footprint(&StructuringElement::ellipse(11, 11));
        let rect = footprint(&StructuringElement::rect(11, 11));
        assert!(count_nonzero(&ellipse) < count_nonzero(&rect));
        assert_eq!(ellipse.get_pixel(15, 15)[0], FOREGROUND);
        assert_eq!(ellipse.get_pixel(20, 15)[0], FOREGROUND);
        assert_eq!(ellipse.get_pixel(20, 20)[0], 0);
    }

    #[test]
    fn test_oversized_kernel_is_clamped() {
        let kernel = StructuringElement::rect(2_000, 3);
        assert_eq!(kernel.width, MAX_KERNEL_SIDE);
        assert_eq!(count_nonzero(&footprint(&kernel)), 31 * 3);
    }

    #[test]
    fn test_erode_shrinks_square() {
        let mask = square_mask(20, 5, 5, 10);
        let eroded = erode(&mask, &StructuringElement::rect(3, 3), 1);
        assert_eq!(count_nonzero(&eroded), 64);
        let eroded_twice = erode(&mask, &StructuringElement::rect(3, 3), 2);
        assert_eq!(count_nonzero(&eroded_twice), 36);
    }

    #[test]
    fn test_erode_treats_border_as_background() {
        let full = GrayImage::from_pixel(10, 10, Luma([FOREGROUND]));
        let eroded = erode(&full, &StructuringElement::rect(3, 3), 1);
        assert_eq!(eroded.dimensions(), (10, 10));
        assert_eq!(count_nonzero(&eroded), 64);
        assert_eq!(eroded.get_pixel(0, 5)[0], 0);
        assert_eq!(eroded.get_pixel(1, 5)[0], FOREGROUND);
    }

    #[test]
    fn test_open_removes_speckle() {
        let mut mask = square_mask(20, 5, 5, 10);
        mask.put_pixel(0, 0, Luma([FOREGROUND]));
        let opened = open(&mask, &StructuringElement::rect(3, 3), 1);
        assert_eq!(opened.get_pixel(0, 0)[0], 0);
        assert_eq!(count_nonzero(&opened), 100);
    }

    #[test]
    fn test_close_fills_pinhole() {
        let mut mask = square_mask(20, 5, 5, 10);
        mask.put_pixel(10, 10, Luma([0]));
        let closed = close(&mask, &StructuringElement::rect(3, 3), 1);
        assert_eq!(closed.get_pixel(10, 10)[0], FOREGROUND);
        assert_eq!(count_nonzero(&closed), 100);
    }

    #[test]
    fn test_close_keeps_object_touching_frame() {
        let full = GrayImage::from_pixel(12, 12, Luma([FOREGROUND]));
        let closed = close(&full, &StructuringElement::ellipse(5, 5), 2);
        assert_eq!(count_nonzero(&closed), 144);
    }

    #[test]
    fn test_black_hat_highlights_small_dark_spot() {
        let mut gray = GrayImage::from_pixel(40, 40, Luma([200]));
        for y in 18..22 {
            for x in 18..22 {
                gray.put_pixel(x, y, Luma([50]));
            }
        }
        let hat = black_hat(&gray, &StructuringElement::ellipse(9, 9));
        assert_eq!(hat.get_pixel(19, 19)[0], 150);
        assert_eq!(hat.get_pixel(2, 2)[0], 0);
        assert_eq!(count_nonzero(&threshold(&hat, 30)), 16);
    }

    #[test]
    fn test_black_hat_ignores_uniform_gradient() {
        let gray = GrayImage::from_fn(30, 30, |x, _| Luma([100 + x as u8]));
        let hat = black_hat(&gray, &StructuringElement::ellipse(7, 7));
        // only the left border, where the window is clipped, deviates slightly
        assert_eq!(count_nonzero(&threshold(&hat, 10)), 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[29u8, 30, 31][x as usize]]));
        let binary = threshold(&gray, 30);
        assert_eq!(binary.as_raw(), &vec![0, 0, FOREGROUND]);
    }

    #[test]
    fn test_intersect() {
        let a = square_mask(10, 0, 0, 5);
        let b = square_mask(10, 3, 3, 5);
        assert_eq!(count_nonzero(&intersect(&a, &b)), 4);
    }
}
