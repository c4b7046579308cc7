//! Default thresholds and reference values for the inspection pipeline
//!
//! Values are tuned for 400×400 px pellet crops photographed on a green
//! background. Every constant here seeds a field of the corresponding
//! configuration section in [`crate::config`]; the pipeline itself only
//! reads configuration values.

/// Background segmentation defaults
pub mod segmentation {
    /// Gaussian blur kernel size (odd, pixels)
    pub const BLUR_SIZE: u32 = 5;

    /// Median filter kernel size applied to the raw mask (odd, 0 disables)
    pub const MEDIAN_KERNEL_SIZE: u32 = 5;

    /// Elliptical morphology kernel size
    pub const MORPH_KERNEL_SIZE: u32 = 11;

    /// Iterations for each morphological step
    pub const MORPH_ITERATIONS: u32 = 1;

    /// Mean mask value (0-255) above which the Otsu mask is inverted
    pub const INVERT_MEAN_THRESHOLD: f64 = 200.0;

    /// Background hue band in degrees (green)
    pub const BACKGROUND_HUE_MIN: f32 = 70.0;
    pub const BACKGROUND_HUE_MAX: f32 = 170.0;

    /// Minimum saturation and value for a pixel to count as background
    pub const BACKGROUND_SATURATION_MIN: f32 = 0.16;
    pub const BACKGROUND_VALUE_MIN: f32 = 0.12;
}

/// Perspective normalization defaults
pub mod perspective {
    /// Minimum contour area (px²) for an object to be normalized
    pub const MIN_OBJECT_AREA: f64 = 30_000.0;

    /// Canonical landscape frame the rotated rectangle is warped into
    pub const CANONICAL_WIDTH: u32 = 600;
    pub const CANONICAL_HEIGHT: u32 = 400;

    /// Final output size after resizing the canonical frame
    pub const OUTPUT_WIDTH: u32 = 400;
    pub const OUTPUT_HEIGHT: u32 = 400;

    /// Gray level above which a warped pixel counts as object
    pub const OBJECT_THRESHOLD: u8 = 10;
}

/// Geometry analysis defaults
pub mod geometry {
    /// Douglas-Peucker epsilon as fraction of the contour perimeter
    pub const POLYGON_EPSILON_FACTOR: f64 = 0.03;

    /// Holes smaller than this are ignored (px²)
    pub const MINIMUM_HOLE_AREA: f64 = 30.0;

    /// Minimum area for a 3-5 cornered hole to count as a window (px²)
    pub const MINIMUM_WINDOW_AREA: f64 = 150.0;

    /// Upper bound for the center hole area (px²)
    pub const MAXIMUM_CENTER_AREA: f64 = 2_500.0;

    /// Top-level contours above this area count as fragments (px²)
    pub const MINIMUM_FRAGMENT_AREA: f64 = 500.0;

    /// Window count at which the smallest window may be the center hole
    pub const CENTER_RECOVERY_MIN_WINDOWS: usize = 6;
}

/// Color spot detection defaults
pub mod spot {
    pub const EROSION_KERNEL_SIZE: [u32; 2] = [3, 3];
    pub const EROSION_ITERATIONS: u32 = 4;
    pub const BLACKHAT_KERNEL_SIZE: [u32; 2] = [15, 15];
    pub const BLACKHAT_CONTRAST_THRESHOLD: u8 = 25;
    pub const NOISE_KERNEL_SIZE: [u32; 2] = [3, 3];
    pub const MINIMUM_SPOT_AREA: u32 = 40;
    pub const SPOT_AREA_RATIO: f64 = 0.001;
    pub const FINE_EROSION_ITERATIONS: u32 = 2;
    pub const INNER_EROSION_ITERATIONS: u32 = 3;
    pub const INNER_SPOT_RATIO: f64 = 0.3;
    pub const FINE_SPOT_RATIO: f64 = 0.0005;
    pub const FINE_SPOT_AREA: u32 = 25;

    /// Low percentile for the dark-delta statistic
    pub const DARK_PERCENTILE: f64 = 5.0;
}

/// Symmetry scoring defaults
pub mod symmetry {
    /// Multiplier applied to the window-area coefficient of variation
    pub const SENSITIVITY: f64 = 1.0;

    /// Number of equally spaced rotations for the rotational variant
    pub const ROTATIONS: u32 = 6;
}

/// Classification defaults
pub mod classification {
    /// Rank used for classes missing from the priority table
    pub const DEFAULT_PRIORITY: i32 = 100;

    /// Reason recorded on fallback decisions
    pub const FALLBACK_REASON: &str = "Fallback";

    /// Detail used when a firing rule has neither rendered reasons nor a fallback reason
    pub const RULE_SATISFIED_REASON: &str = "Rule satisfied";

    /// Thresholds that raise `color_issue_detected` on their own
    pub const ISSUE_SPOT_AREA: f64 = 40.0;
    pub const ISSUE_TEXTURE_STDDEV: f64 = 12.0;
    pub const ISSUE_LAB_STDDEV: f64 = 5.0;
    pub const ISSUE_DARK_DELTA: f64 = 18.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_ranges() {
        assert!(geometry::MINIMUM_HOLE_AREA < geometry::MINIMUM_WINDOW_AREA);
        assert!(geometry::MINIMUM_WINDOW_AREA < geometry::MAXIMUM_CENTER_AREA);
        assert!(geometry::POLYGON_EPSILON_FACTOR > 0.0);
    }

    #[test]
    fn test_kernel_sizes_are_odd() {
        assert_eq!(segmentation::BLUR_SIZE % 2, 1);
        assert_eq!(segmentation::MEDIAN_KERNEL_SIZE % 2, 1);
        assert_eq!(spot::BLACKHAT_KERNEL_SIZE[0] % 2, 1);
    }

    #[test]
    fn test_spot_thresholds() {
        assert!(spot::FINE_SPOT_AREA <= spot::MINIMUM_SPOT_AREA);
        assert!(spot::FINE_SPOT_RATIO <= spot::SPOT_AREA_RATIO);
        assert!((0.0..=100.0).contains(&spot::DARK_PERCENTILE));
    }
}
