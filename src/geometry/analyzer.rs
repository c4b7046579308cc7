//! Shape features from the contour hierarchy of a binary object mask
//!
//! The primary object is the largest contour. Its direct children are the
//! holes; each hole is simplified to a polygon and classified by corner
//! count and area as a window (3-5 corners) or the center hole (more than 5
//! corners). Other top-level contours above the fragment threshold are
//! broken-off pieces.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::contour::{approximate_polygon, arc_length, convex_hull, polygon_area};
use crate::config::GeometryConfig;

/// Shape descriptors of one segmented object
///
/// Areas are in px², perimeters in px. Without a primary object every
/// field keeps its zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryFeatures {
    pub has_primary_object: bool,
    pub area: f64,
    pub perimeter: f64,
    pub convex_area: f64,
    pub convex_perimeter: f64,
    pub edge_damage_ratio: f64,
    pub edge_segment_count: usize,
    pub window_count: usize,
    pub window_areas: Vec<f64>,
    pub has_center_hole: bool,
    pub center_hole_area: f64,
    pub fragment_count: usize,
    pub outer_contour_count: usize,
}

impl GeometryFeatures {
    /// Windows plus the center hole
    pub fn total_hole_count(&self) -> usize {
        self.window_count + usize::from(self.has_center_hole)
    }

    /// Convex hull area over contour area, 0 without an object
    pub fn hull_ratio(&self) -> f64 {
        if self.area > 0.0 {
            self.convex_area / self.area
        } else {
            0.0
        }
    }
}

/// Hole shapes recognized inside the primary object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoleKind {
    Window,
    Center,
    Unclassified,
}

/// Contour hierarchy analyzer
#[derive(Debug, Clone, Default)]
pub struct GeometryAnalyzer {
    config: GeometryConfig,
}

impl GeometryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeometryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    /// Extract geometry features from a binary mask (non-zero = object)
    ///
    /// The mask is framed by a one pixel background border before tracing,
    /// so objects touching the image edge still yield closed outer contours.
    pub fn analyze_mask(&self, mask: &GrayImage) -> GeometryFeatures {
        let (width, height) = mask.dimensions();
        let mut framed = GrayImage::new(width + 2, height + 2);
        for (x, y, pixel) in mask.enumerate_pixels() {
            if pixel[0] > 0 {
                framed.put_pixel(x + 1, y + 1, Luma([255]));
            }
        }
        let contours = find_contours::<i32>(&framed);
        self.analyze_contours(&contours)
    }

    /// Extract geometry features from an already traced contour hierarchy
    pub fn analyze_contours(&self, contours: &[Contour<i32>]) -> GeometryFeatures {
        let mut features = GeometryFeatures::default();

        let areas: Vec<f64> = contours.iter().map(|c| polygon_area(&c.points)).collect();
        let Some(main_idx) = largest_index(&areas) else {
            debug!("no contours found, object absent");
            return features;
        };
        let main = &contours[main_idx];

        features.has_primary_object = true;
        features.area = areas[main_idx];
        features.perimeter = arc_length(&main.points, true);

        let hull = convex_hull(&main.points);
        features.convex_area = polygon_area(&hull);
        features.convex_perimeter = arc_length(&hull, true);
        features.edge_damage_ratio = if features.perimeter > 0.0 {
            features.convex_perimeter / features.perimeter.max(1.0)
        } else {
            0.0
        };

        let epsilon = self.config.polygon_epsilon_factor * features.perimeter;
        features.edge_segment_count = approximate_polygon(&main.points, epsilon, true).len();

        for (idx, contour) in contours.iter().enumerate() {
            let area = areas[idx];
            if contour.parent.is_none() {
                features.outer_contour_count += 1;
                if idx != main_idx && area > self.config.minimum_fragment_area {
                    features.fragment_count += 1;
                }
                continue;
            }
            if contour.parent != Some(main_idx) || contour.border_type != BorderType::Hole {
                continue;
            }
            if area < self.config.minimum_hole_area {
                continue;
            }
            match self.classify_hole(contour, area) {
                HoleKind::Window => features.window_areas.push(area),
                HoleKind::Center => {
                    features.has_center_hole = true;
                    features.center_hole_area = area;
                }
                HoleKind::Unclassified => {}
            }
        }

        self.recover_center_hole(&mut features);
        features.window_count = features.window_areas.len();

        debug!(
            area = features.area,
            windows = features.window_count,
            center = features.has_center_hole,
            fragments = features.fragment_count,
            "geometry extracted"
        );
        features
    }

    fn classify_hole(&self, contour: &Contour<i32>, area: f64) -> HoleKind {
        let perimeter = arc_length(&contour.points, true);
        let epsilon = self.config.polygon_epsilon_factor * perimeter;
        let corners = approximate_polygon(&contour.points, epsilon, true).len();

        if (3..=5).contains(&corners) && area > self.config.minimum_window_area {
            HoleKind::Window
        } else if corners > 5 && area < self.config.maximum_center_area {
            HoleKind::Center
        } else {
            HoleKind::Unclassified
        }
    }

    /// Reinterpret the smallest window as the center hole
    ///
    /// Applies only when no center hole was found, at least
    /// `center_recovery_min_windows` windows exist and the smallest one is
    /// within the center area bound. On ties the first smallest is taken.
    pub fn recover_center_hole(&self, features: &mut GeometryFeatures) {
        if features.has_center_hole
            || features.window_areas.len() < self.config.center_recovery_min_windows
        {
            return;
        }
        let Some(smallest) = smallest_index(&features.window_areas) else {
            return;
        };
        let area = features.window_areas[smallest];
        if area > self.config.maximum_center_area {
            return;
        }
        features.window_areas.remove(smallest);
        features.window_count = features.window_areas.len();
        features.has_center_hole = true;
        features.center_hole_area = area;
        debug!(area, "smallest window recovered as center hole");
    }
}

/// Index of the largest value, first one on ties
fn largest_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some(b) if value <= values[b] => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Index of the smallest value, first one on ties
fn smallest_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some(b) if value >= values[b] => {}
            _ => best = Some(idx),
        }
    }
    best
}
