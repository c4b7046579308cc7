//! Merged per-image feature vector
//!
//! [`FeatureVector`] is the only input of the rule engine. Besides the raw
//! geometry and color features it carries the derived classification
//! metrics (hole totals, window area statistics, hull ratio, color issue
//! flag) as typed values, addressable by [`Metric`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::ColorFeatures;
use crate::constants::classification;
use crate::geometry::GeometryFeatures;
use crate::image_loader::is_defect_candidate;
use crate::rules::Metric;
use crate::{AnalysisError, Result};

/// Where an image came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_path: Option<PathBuf>,
    pub filename: String,
    /// Image was known on input to be a potential defect
    pub has_anomaly_flag: bool,
}

impl Provenance {
    /// Provenance of a file; the anomaly flag follows the directory layout
    pub fn from_path(path: &Path) -> Self {
        Self {
            source_path: Some(path.to_path_buf()),
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            has_anomaly_flag: is_defect_candidate(path),
        }
    }

    /// Provenance of an in-memory image
    pub fn in_memory(filename: impl Into<String>, has_anomaly_flag: bool) -> Self {
        Self {
            source_path: None,
            filename: filename.into(),
            has_anomaly_flag,
        }
    }
}

/// Thresholds that raise `color_issue_detected` on their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorIssueThresholds {
    pub spot_area: f64,
    pub texture_stddev: f64,
    pub lab_stddev: f64,
    pub dark_delta: f64,
}

impl Default for ColorIssueThresholds {
    fn default() -> Self {
        Self {
            spot_area: classification::ISSUE_SPOT_AREA,
            texture_stddev: classification::ISSUE_TEXTURE_STDDEV,
            lab_stddev: classification::ISSUE_LAB_STDDEV,
            dark_delta: classification::ISSUE_DARK_DELTA,
        }
    }
}

impl ColorIssueThresholds {
    pub fn is_issue(&self, color: &ColorFeatures) -> bool {
        color.detection_flag
            || color.spot_area as f64 >= self.spot_area
            || color.texture_stddev >= self.texture_stddev
            || color.lab_stddev >= self.lab_stddev
            || color.dark_delta >= self.dark_delta
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("classification.color_issue.spot_area", self.spot_area),
            ("classification.color_issue.texture_stddev", self.texture_stddev),
            ("classification.color_issue.lab_stddev", self.lab_stddev),
            ("classification.color_issue.dark_delta", self.dark_delta),
        ] {
            if value.is_nan() {
                return Err(AnalysisError::invalid_parameter(name, value));
            }
        }
        Ok(())
    }
}

/// Both symmetry variants of one object
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SymmetryScores {
    /// Window-area uniformity
    pub window: f64,
    /// Rotational self-overlap of the mask
    pub rotational: f64,
}

/// Flat merge of everything measured on one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub provenance: Provenance,
    /// Foreground share of the full frame
    pub area_ratio: f64,
    pub geometry: GeometryFeatures,
    pub color: ColorFeatures,
    pub symmetry: SymmetryScores,
    pub color_issue_detected: bool,
}

impl FeatureVector {
    pub fn new(
        provenance: Provenance,
        area_ratio: f64,
        geometry: GeometryFeatures,
        color: ColorFeatures,
        symmetry: SymmetryScores,
        thresholds: &ColorIssueThresholds,
    ) -> Self {
        let color_issue_detected = thresholds.is_issue(&color);
        Self {
            provenance,
            area_ratio,
            geometry,
            color,
            symmetry,
            color_issue_detected,
        }
    }

    pub fn window_area_avg(&self) -> f64 {
        let areas = &self.geometry.window_areas;
        if areas.is_empty() {
            return 0.0;
        }
        areas.iter().sum::<f64>() / areas.len() as f64
    }

    pub fn window_area_min(&self) -> f64 {
        self.geometry
            .window_areas
            .iter()
            .copied()
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    pub fn window_area_max(&self) -> f64 {
        self.geometry
            .window_areas
            .iter()
            .copied()
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// Largest over smallest window area, 1 without a positive minimum
    pub fn window_area_ratio(&self) -> f64 {
        let min = self.window_area_min();
        if min > 0.0 {
            self.window_area_max() / min
        } else {
            1.0
        }
    }

    /// Value of `metric`; flags read as 1/0
    pub fn metric(&self, metric: Metric) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let g = &self.geometry;
        let c = &self.color;
        match metric {
            Metric::GeometryHasPrimaryObject => flag(g.has_primary_object),
            Metric::GeometryArea => g.area,
            Metric::GeometryConvexArea => g.convex_area,
            Metric::GeometryHullRatio => g.hull_ratio(),
            Metric::GeometryEdgeDamageRatio => g.edge_damage_ratio,
            Metric::GeometryEdgeSegmentCount => g.edge_segment_count as f64,
            Metric::GeometryWindowCount => g.window_count as f64,
            Metric::GeometryHasCenterHole => flag(g.has_center_hole),
            Metric::GeometryTotalHoleCount => g.total_hole_count() as f64,
            Metric::GeometryWindowAreaAvg => self.window_area_avg(),
            Metric::GeometryWindowAreaMin => self.window_area_min(),
            Metric::GeometryWindowAreaMax => self.window_area_max(),
            Metric::GeometryWindowAreaRatio => self.window_area_ratio(),
            Metric::GeometryWindowSymmetryScore => self.symmetry.window,
            Metric::GeometryFragmentCount => g.fragment_count as f64,
            Metric::GeometryOuterContourCount => g.outer_contour_count as f64,
            Metric::ColorDetectionFlag => flag(c.detection_flag),
            Metric::ColorSpotArea => c.spot_area as f64,
            Metric::ColorTextureStddev => c.texture_stddev,
            Metric::ColorLabStddev => c.lab_stddev,
            Metric::ColorDarkDelta => c.dark_delta,
            Metric::ColorMedianIntensity => c.median_intensity,
            Metric::ColorIssueDetected => flag(self.color_issue_detected),
            Metric::SymmetryScore => self.symmetry.rotational,
            Metric::SegmentationAreaRatio => self.area_ratio,
            Metric::PipelineHasAnomalyFlag => flag(self.provenance.has_anomaly_flag),
        }
    }
}
