//! Symmetry scores on a 0-100 scale
//!
//! Two variants are provided:
//! - [`window_score`] reduces the window areas found by geometry analysis
//!   through their coefficient of variation;
//! - [`rotational_score`] overlaps the object mask with equally spaced
//!   rotations about its centroid and does not need any window detection.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate, Interpolation};
use tracing::trace;

use crate::color::analysis::population_stddev;
use crate::config::SymmetryConfig;
use crate::morphology::{self, FOREGROUND};

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Window-area uniformity score
///
/// `clamp(100 · (1 − cv · sensitivity), 0, 100)` rounded to one decimal,
/// where `cv` is the population coefficient of variation of `areas`.
/// Empty lists and lists with a non-positive mean score 0.
pub fn window_score(areas: &[f64], sensitivity: f64) -> f64 {
    if areas.is_empty() {
        return 0.0;
    }
    let mean = areas.iter().sum::<f64>() / areas.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let cv = population_stddev(areas) / mean;
    round_to(100.0 * (1.0 - cv * sensitivity), 1).clamp(0.0, 100.0)
}

/// Rotational self-overlap score of a binary mask
///
/// The mask is intersected with its rotations by `k · 360° / rotations`
/// (k = 1 .. rotations-1) about the integer centroid. The share of object
/// pixels outside that common core is the error term; the score is
/// `100 · (1 − error)` rounded to two decimals. An empty mask scores 0.
pub fn rotational_score(mask: &GrayImage, rotations: u32) -> f64 {
    let mut total = 0u64;
    let (mut sum_x, mut sum_y) = (0u64, 0u64);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] > 0 {
            total += 1;
            sum_x += x as u64;
            sum_y += y as u64;
        }
    }
    if total == 0 {
        return 0.0;
    }

    let binary = morphology::threshold(mask, 0);
    let center = ((sum_x / total) as f32, (sum_y / total) as f32);
    let step = std::f32::consts::TAU / rotations.max(1) as f32;

    let mut core = binary.clone();
    for k in 1..rotations {
        let rotated = rotate(&binary, center, step * k as f32, Interpolation::Nearest, Luma([0]));
        core = morphology::intersect(&core, &rotated);
    }

    let asymmetric = binary
        .pixels()
        .zip(core.pixels())
        .filter(|(m, c)| m[0] == FOREGROUND && c[0] == 0)
        .count();
    let error = asymmetric as f64 / total as f64;
    trace!(asymmetric, total, "rotational overlap");
    round_to((1.0 - error) * 100.0, 2).clamp(0.0, 100.0)
}

/// Symmetry scorer bound to a configuration
#[derive(Debug, Clone, Default)]
pub struct SymmetryScorer {
    config: SymmetryConfig,
}

impl SymmetryScorer {
    pub fn with_config(config: SymmetryConfig) -> Self {
        Self { config }
    }

    pub fn window_score(&self, areas: &[f64]) -> f64 {
        window_score(areas, self.config.sensitivity)
    }

    pub fn rotational_score(&self, mask: &GrayImage) -> f64 {
        rotational_score(mask, self.config.rotations)
    }
}
