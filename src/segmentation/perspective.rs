//! Perspective normalization for arbitrarily rotated objects
//!
//! Every large outer contour is fitted with a minimum-area rectangle, forced
//! to landscape orientation and warped into a fixed canonical frame, which
//! is then resized to the output size. Pixels outside the object are black
//! before warping, so each result holds exactly one object.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::{debug, warn};

use super::{BackgroundSegmenter, SegmentationResult};
use crate::color::ColorConverter;
use crate::config::{PerspectiveConfig, SegmentationConfig};
use crate::geometry::contour::{min_area_rect, polygon_area};
use crate::morphology;

/// Warps each qualifying object of a frame into a canonical view
#[derive(Debug, Clone, Default)]
pub struct PerspectiveNormalizer {
    segmenter: BackgroundSegmenter,
    config: PerspectiveConfig,
    converter: ColorConverter,
}

impl PerspectiveNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalizer; the background strategy comes from `segmentation`
    pub fn with_config(segmentation: SegmentationConfig, config: PerspectiveConfig) -> Self {
        Self {
            segmenter: BackgroundSegmenter::with_config(segmentation),
            config,
            converter: ColorConverter::new(),
        }
    }

    pub fn config(&self) -> &PerspectiveConfig {
        &self.config
    }

    /// Normalize every object whose contour area exceeds the minimum
    ///
    /// Returns one result per qualifying contour, in contour discovery
    /// order; an empty vector when nothing qualifies.
    pub fn normalize(&self, image: &RgbImage) -> Vec<SegmentationResult> {
        let key_mask = self.segmenter.raw_mask(image);
        let mut keyed = image.clone();
        for (x, y, pixel) in keyed.enumerate_pixels_mut() {
            if key_mask.get_pixel(x, y)[0] == 0 {
                *pixel = Rgb([0, 0, 0]);
            }
        }
        let objects = morphology::threshold(&self.converter.to_gray(&keyed), self.config.object_threshold);
        let labels = connected_components(&objects, Connectivity::Eight, Luma([0u8]));

        let mut results = Vec::new();
        for contour in traced_contours(&objects) {
            if contour.parent.is_some() || contour.border_type != BorderType::Outer {
                continue;
            }
            let area = polygon_area(&contour.points);
            if area <= self.config.min_object_area {
                continue;
            }
            let Some(first) = contour.points.first() else {
                continue;
            };
            let label = labels.get_pixel(first.x as u32, first.y as u32)[0];

            let mut isolated = keyed.clone();
            for (x, y, pixel) in isolated.enumerate_pixels_mut() {
                if labels.get_pixel(x, y)[0] != label {
                    *pixel = Rgb([0, 0, 0]);
                }
            }

            match self.warp_object(&isolated, &contour.points) {
                Some(result) => {
                    debug!(area, area_ratio = result.area_ratio, "object normalized");
                    results.push(result);
                }
                None => warn!(area, "degenerate object rectangle, skipped"),
            }
        }
        results
    }

    fn warp_object(&self, isolated: &RgbImage, points: &[Point<i32>]) -> Option<SegmentationResult> {
        let rect = min_area_rect(points).landscape();
        let corners = rect.corners();

        let (cw, ch) = (self.config.canonical_width, self.config.canonical_height);
        let (right, bottom) = ((cw - 1) as f32, (ch - 1) as f32);
        let from = corners.map(|(x, y)| (x as f32, y as f32));
        let to = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];
        let projection = Projection::from_control_points(from, to)?;

        let mut warped = RgbImage::new(cw, ch);
        warp_into(isolated, &projection, Interpolation::Bicubic, Rgb([0, 0, 0]), &mut warped);
        let resized = imageops::resize(
            &warped,
            self.config.output_width,
            self.config.output_height,
            FilterType::CatmullRom,
        );

        let mask = morphology::threshold(&self.converter.to_gray(&resized), self.config.object_threshold);
        Some(SegmentationResult::from_mask(&resized, mask.clone(), mask))
    }
}

/// Contours of `mask` in image coordinates, traced on a zero-framed copy
fn traced_contours(mask: &GrayImage) -> Vec<imageproc::contours::Contour<i32>> {
    let (width, height) = mask.dimensions();
    let mut framed = GrayImage::new(width + 2, height + 2);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] > 0 {
            framed.put_pixel(x + 1, y + 1, Luma([255]));
        }
    }
    let mut contours = find_contours::<i32>(&framed);
    for contour in &mut contours {
        for point in &mut contour.points {
            point.x -= 1;
            point.y -= 1;
        }
    }
    contours
}
