//! Closed set of feature metrics addressable by rules
//!
//! Metric names match the feature table columns (`geometry_window_count`,
//! `color_spot_area`, ...). An unknown name fails deserialization, so a rule
//! file referencing a metric that does not exist is rejected at load time.

use serde::{Deserialize, Serialize};

/// Value category, used when rendering reason templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Boolean, compared as 1/0
    Flag,
    /// Integral count or pixel area
    Count,
    /// Real-valued measure
    Real,
}

macro_rules! metrics {
    ($($variant:ident => $name:literal, $kind:ident;)+) => {
        /// Named scalar of a [`crate::FeatureVector`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Metric {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Metric {
            /// Every metric, in declaration order
            pub const ALL: &'static [Metric] = &[$(Metric::$variant),+];

            /// Column name of the metric
            pub fn name(self) -> &'static str {
                match self {
                    $(Metric::$variant => $name,)+
                }
            }

            pub fn kind(self) -> MetricKind {
                match self {
                    $(Metric::$variant => MetricKind::$kind,)+
                }
            }
        }
    };
}

metrics! {
    GeometryHasPrimaryObject => "geometry_has_primary_object", Flag;
    GeometryArea => "geometry_area", Real;
    GeometryConvexArea => "geometry_convex_area", Real;
    GeometryHullRatio => "geometry_hull_ratio", Real;
    GeometryEdgeDamageRatio => "geometry_edge_damage_ratio", Real;
    GeometryEdgeSegmentCount => "geometry_edge_segment_count", Count;
    GeometryWindowCount => "geometry_window_count", Count;
    GeometryHasCenterHole => "geometry_has_center_hole", Flag;
    GeometryTotalHoleCount => "geometry_total_hole_count", Count;
    GeometryWindowAreaAvg => "geometry_window_area_avg", Real;
    GeometryWindowAreaMin => "geometry_window_area_min", Real;
    GeometryWindowAreaMax => "geometry_window_area_max", Real;
    GeometryWindowAreaRatio => "geometry_window_area_ratio", Real;
    GeometryWindowSymmetryScore => "geometry_window_symmetry_score", Real;
    GeometryFragmentCount => "geometry_fragment_count", Count;
    GeometryOuterContourCount => "geometry_outer_contour_count", Count;
    ColorDetectionFlag => "color_detection_flag", Flag;
    ColorSpotArea => "color_spot_area", Count;
    ColorTextureStddev => "color_texture_stddev", Real;
    ColorLabStddev => "color_lab_stddev", Real;
    ColorDarkDelta => "color_dark_delta", Real;
    ColorMedianIntensity => "color_median_intensity", Real;
    ColorIssueDetected => "color_issue_detected", Flag;
    SymmetryScore => "symmetry_score", Real;
    SegmentationAreaRatio => "segmentation_area_ratio", Real;
    PipelineHasAnomalyFlag => "pipeline_has_anomaly_flag", Flag;
}

impl Metric {
    /// Look a metric up by column name
    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.iter().copied().find(|m| m.name() == name)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        let metric: Metric = serde_json::from_str("\"geometry_window_count\"").unwrap();
        assert_eq!(metric, Metric::GeometryWindowCount);
        assert_eq!(Metric::SymmetryScore.to_string(), "symmetry_score");
        assert_eq!(Metric::from_name("color_dark_delta"), Some(Metric::ColorDarkDelta));

        let mut names: Vec<&str> = Metric::ALL.iter().map(|m| m.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Metric::ALL.len());
    }

    #[test]
    fn test_unknown_metric_rejected() {
        assert!(serde_json::from_str::<Metric>("\"geometry_sparkle\"").is_err());
        assert_eq!(Metric::from_name("geometry_sparkle"), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Metric::GeometryWindowCount.kind(), MetricKind::Count);
        assert_eq!(Metric::ColorDetectionFlag.kind(), MetricKind::Flag);
        assert_eq!(Metric::ColorLabStddev.kind(), MetricKind::Real);
    }
}
