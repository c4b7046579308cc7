//! Configuration structures for the fryum_inspect pipeline.
//!
//! This module defines all tunable parameters of the inspection stages,
//! organized into one section per stage.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use fryum_inspect::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("inspection.json"))?;
//!
//! // Or use defaults
//! let config = PipelineConfig::default();
//! # Ok::<(), fryum_inspect::AnalysisError>(())
//! ```
//!
//! Missing sections and fields fall back to the defaults in
//! [`crate::constants`]. A loaded configuration is validated once by
//! [`PipelineConfig::validate`], which [`crate::Inspector::new`] calls, so a
//! malformed value is reported before the first image is processed.
//!
//! # Configuration Sections
//!
//! - [`SegmentationConfig`]: blur, mask strategy, morphology
//! - [`PerspectiveConfig`]: rotated-rectangle warp for multi-object frames
//! - [`GeometryConfig`]: hole / window / fragment thresholds
//! - [`SpotConfig`]: black-hat color defect detection
//! - [`SymmetryConfig`]: symmetry score sensitivity
//! - [`ClassificationConfig`]: rule set and derived metric thresholds

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{geometry, perspective, segmentation, spot, symmetry};
use crate::features::ColorIssueThresholds;
use crate::rules::RuleSet;
use crate::{AnalysisError, Result};

/// Complete pipeline configuration.
///
/// Immutable once built; an [`crate::Inspector`] owns one and shares it
/// read-only across worker threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationConfig,
    pub perspective: PerspectiveConfig,
    pub geometry: GeometryConfig,
    pub spot: SpotConfig,
    pub symmetry: SymmetryConfig,
    pub classification: ClassificationConfig,
}

/// Order of the two mask cleanup steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphOrder {
    CloseThenOpen,
    OpenThenClose,
}

/// HSV box describing the background color
///
/// Hue in degrees [0, 360), saturation and value in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub hue_min: f32,
    pub hue_max: f32,
    pub saturation_min: f32,
    pub saturation_max: f32,
    pub value_min: f32,
    pub value_max: f32,
}

impl HsvRange {
    /// Default green screen band
    pub fn green() -> Self {
        Self {
            hue_min: segmentation::BACKGROUND_HUE_MIN,
            hue_max: segmentation::BACKGROUND_HUE_MAX,
            saturation_min: segmentation::BACKGROUND_SATURATION_MIN,
            saturation_max: 1.0,
            value_min: segmentation::BACKGROUND_VALUE_MIN,
            value_max: 1.0,
        }
    }

    pub fn contains(&self, hue: f32, saturation: f32, value: f32) -> bool {
        (self.hue_min..=self.hue_max).contains(&hue)
            && (self.saturation_min..=self.saturation_max).contains(&saturation)
            && (self.value_min..=self.value_max).contains(&value)
    }
}

/// How the raw foreground mask is produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Pixels inside the background HSV range are background
    ColorKey { background: HsvRange },
    /// Otsu threshold on Lab lightness, inverted when the mask mean
    /// (0-255) exceeds `invert_mean_threshold`
    LightnessOtsu { invert_mean_threshold: f64 },
}

impl Default for MaskStrategy {
    fn default() -> Self {
        MaskStrategy::ColorKey {
            background: HsvRange::green(),
        }
    }
}

/// Background segmentation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Gaussian blur kernel size (odd; 0 or 1 disables)
    pub blur_size: u32,

    /// Median filter kernel size on the raw mask (odd; 0 or 1 disables)
    pub median_kernel_size: u32,

    /// Elliptical morphology kernel size
    pub morph_kernel_size: u32,

    /// Iterations per morphology step
    pub morph_iterations: u32,

    pub morph_order: MorphOrder,

    /// Keep only the largest connected component
    pub keep_largest_object: bool,

    /// Components below this pixel count are rejected as noise
    pub min_object_area: u32,

    pub strategy: MaskStrategy,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            blur_size: segmentation::BLUR_SIZE,
            median_kernel_size: segmentation::MEDIAN_KERNEL_SIZE,
            morph_kernel_size: segmentation::MORPH_KERNEL_SIZE,
            morph_iterations: segmentation::MORPH_ITERATIONS,
            morph_order: MorphOrder::CloseThenOpen,
            keep_largest_object: true,
            min_object_area: 0,
            strategy: MaskStrategy::default(),
        }
    }
}

/// Perspective normalization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Minimum contour area (px²) of an object to normalize
    pub min_object_area: f64,
    pub canonical_width: u32,
    pub canonical_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    /// Gray level above which a warped pixel belongs to the object
    pub object_threshold: u8,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            min_object_area: perspective::MIN_OBJECT_AREA,
            canonical_width: perspective::CANONICAL_WIDTH,
            canonical_height: perspective::CANONICAL_HEIGHT,
            output_width: perspective::OUTPUT_WIDTH,
            output_height: perspective::OUTPUT_HEIGHT,
            object_threshold: perspective::OBJECT_THRESHOLD,
        }
    }
}

/// Geometry analysis thresholds (areas in px²).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub polygon_epsilon_factor: f64,
    pub minimum_hole_area: f64,
    pub minimum_window_area: f64,
    pub maximum_center_area: f64,
    pub minimum_fragment_area: f64,
    pub center_recovery_min_windows: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            polygon_epsilon_factor: geometry::POLYGON_EPSILON_FACTOR,
            minimum_hole_area: geometry::MINIMUM_HOLE_AREA,
            minimum_window_area: geometry::MINIMUM_WINDOW_AREA,
            maximum_center_area: geometry::MAXIMUM_CENTER_AREA,
            minimum_fragment_area: geometry::MINIMUM_FRAGMENT_AREA,
            center_recovery_min_windows: geometry::CENTER_RECOVERY_MIN_WINDOWS,
        }
    }
}

/// Color spot detection parameters.
///
/// Kernel sizes are `[width, height]`. Ratios compare defect pixels with
/// the eroded object area (`*_spot_ratio`) or with the defect area itself
/// (`inner_spot_ratio`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotConfig {
    pub erosion_kernel_size: [u32; 2],
    pub erosion_iterations: u32,
    pub blackhat_kernel_size: [u32; 2],
    pub blackhat_contrast_threshold: u8,
    pub noise_kernel_size: [u32; 2],
    pub minimum_spot_area: u32,
    pub spot_area_ratio: f64,
    pub fine_erosion_iterations: u32,
    pub inner_erosion_iterations: u32,
    pub inner_spot_ratio: f64,
    pub fine_spot_ratio: f64,
    pub fine_spot_area: u32,
    pub dark_percentile: f64,
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self {
            erosion_kernel_size: spot::EROSION_KERNEL_SIZE,
            erosion_iterations: spot::EROSION_ITERATIONS,
            blackhat_kernel_size: spot::BLACKHAT_KERNEL_SIZE,
            blackhat_contrast_threshold: spot::BLACKHAT_CONTRAST_THRESHOLD,
            noise_kernel_size: spot::NOISE_KERNEL_SIZE,
            minimum_spot_area: spot::MINIMUM_SPOT_AREA,
            spot_area_ratio: spot::SPOT_AREA_RATIO,
            fine_erosion_iterations: spot::FINE_EROSION_ITERATIONS,
            inner_erosion_iterations: spot::INNER_EROSION_ITERATIONS,
            inner_spot_ratio: spot::INNER_SPOT_RATIO,
            fine_spot_ratio: spot::FINE_SPOT_RATIO,
            fine_spot_area: spot::FINE_SPOT_AREA,
            dark_percentile: spot::DARK_PERCENTILE,
        }
    }
}

/// Symmetry scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymmetryConfig {
    /// Multiplier on the window-area coefficient of variation
    pub sensitivity: f64,
    /// Rotations used by the mask-based variant
    pub rotations: u32,
}

impl Default for SymmetryConfig {
    fn default() -> Self {
        Self {
            sensitivity: symmetry::SENSITIVITY,
            rotations: symmetry::ROTATIONS,
        }
    }
}

/// Rule set plus thresholds for derived classification metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub color_issue: ColorIssueThresholds,
    #[serde(flatten)]
    pub rule_set: RuleSet,
}

fn require_positive(parameter: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(AnalysisError::invalid_parameter(parameter, value));
    }
    Ok(())
}

fn require_kernel(parameter: &str, size: [u32; 2]) -> Result<()> {
    if size[0] == 0 || size[1] == 0 {
        return Err(AnalysisError::invalid_parameter(
            parameter,
            format!("{}x{}", size[0], size[1]),
        ));
    }
    Ok(())
}

fn require_non_negative(parameter: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalysisError::invalid_parameter(parameter, value));
    }
    Ok(())
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("segmentation.morph_kernel_size", self.morph_kernel_size)?;
        if let MaskStrategy::LightnessOtsu { invert_mean_threshold } = &self.strategy {
            if !(0.0..=255.0).contains(invert_mean_threshold) {
                return Err(AnalysisError::invalid_parameter(
                    "segmentation.strategy.invert_mean_threshold",
                    invert_mean_threshold,
                ));
            }
        }
        if let MaskStrategy::ColorKey { background } = &self.strategy {
            if background.hue_min > background.hue_max
                || background.saturation_min > background.saturation_max
                || background.value_min > background.value_max
            {
                return Err(AnalysisError::invalid_parameter(
                    "segmentation.strategy.background",
                    format!("{:?}", background),
                ));
            }
        }
        Ok(())
    }
}

impl PerspectiveConfig {
    pub fn validate(&self) -> Result<()> {
        require_non_negative("perspective.min_object_area", self.min_object_area)?;
        require_positive("perspective.canonical_width", self.canonical_width)?;
        require_positive("perspective.canonical_height", self.canonical_height)?;
        require_positive("perspective.output_width", self.output_width)?;
        require_positive("perspective.output_height", self.output_height)?;
        Ok(())
    }
}

impl GeometryConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.polygon_epsilon_factor.is_finite() || self.polygon_epsilon_factor <= 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "geometry.polygon_epsilon_factor",
                self.polygon_epsilon_factor,
            ));
        }
        require_non_negative("geometry.minimum_hole_area", self.minimum_hole_area)?;
        require_non_negative("geometry.minimum_window_area", self.minimum_window_area)?;
        require_non_negative("geometry.maximum_center_area", self.maximum_center_area)?;
        require_non_negative("geometry.minimum_fragment_area", self.minimum_fragment_area)?;
        Ok(())
    }
}

impl SpotConfig {
    pub fn validate(&self) -> Result<()> {
        require_kernel("spot.erosion_kernel_size", self.erosion_kernel_size)?;
        require_kernel("spot.blackhat_kernel_size", self.blackhat_kernel_size)?;
        require_kernel("spot.noise_kernel_size", self.noise_kernel_size)?;
        require_non_negative("spot.spot_area_ratio", self.spot_area_ratio)?;
        require_non_negative("spot.inner_spot_ratio", self.inner_spot_ratio)?;
        require_non_negative("spot.fine_spot_ratio", self.fine_spot_ratio)?;
        if !(0.0..=100.0).contains(&self.dark_percentile) {
            return Err(AnalysisError::invalid_parameter(
                "spot.dark_percentile",
                self.dark_percentile,
            ));
        }
        Ok(())
    }
}

impl SymmetryConfig {
    pub fn validate(&self) -> Result<()> {
        require_non_negative("symmetry.sensitivity", self.sensitivity)?;
        require_positive("symmetry.rotations", self.rotations)?;
        Ok(())
    }
}

impl ClassificationConfig {
    pub fn validate(&self) -> Result<()> {
        self.color_issue.validate()?;
        self.rule_set.validate()
    }
}

impl PipelineConfig {
    /// Validate every section, failing on the first malformed value
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        self.perspective.validate()?;
        self.geometry.validate()?;
        self.spot.validate()?;
        self.symmetry.validate()?;
        self.classification.validate()
    }

    /// Parse configuration from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| AnalysisError::config("Invalid configuration JSON", e))
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::config(format!("Failed to read {}", path.display()), e)
        })?;
        Self::from_json_str(&content)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::config("Failed to serialize configuration", e))?;
        std::fs::write(path, json).map_err(|e| {
            AnalysisError::config(format!("Failed to write {}", path.display()), e)
        })
    }
}
