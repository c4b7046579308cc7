//! Per-image inspection pipeline
//!
//! [`Inspector`] owns one component per stage, all built from a single
//! validated [`PipelineConfig`]. The stage entry points (`segment`,
//! `extract_geometry`, `extract_color`, `evaluate`) are infallible and only
//! read the configuration, so one inspector can be shared across threads.

use image::{GrayImage, RgbImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::color::{ColorFeatures, SpotDetector};
use crate::config::PipelineConfig;
use crate::features::{FeatureVector, Provenance, SymmetryScores};
use crate::geometry::{GeometryAnalyzer, GeometryFeatures};
use crate::image_loader::load_image;
use crate::rules::{Decision, RuleEngine};
use crate::segmentation::{BackgroundSegmenter, PerspectiveNormalizer, SegmentationResult};
use crate::symmetry::SymmetryScorer;
use crate::{AnalysisError, Result};

/// Features and decision for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub features: FeatureVector,
    pub decision: Decision,
}

/// Outcome counts of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub inspected: usize,
    /// Inputs skipped after a recoverable error, such as an unreadable file
    pub skipped: usize,
    /// Inputs that failed for any other reason
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[Result<Inspection>]) -> Self {
        results.iter().fold(
            Self {
                total: results.len(),
                ..Self::default()
            },
            |mut summary, result| {
                match result {
                    Ok(_) => summary.inspected += 1,
                    Err(err) if err.is_recoverable() => summary.skipped += 1,
                    Err(_) => summary.failed += 1,
                }
                summary
            },
        )
    }
}

/// Inspection pipeline bound to one configuration
#[derive(Debug, Clone)]
pub struct Inspector {
    config: PipelineConfig,
    segmenter: BackgroundSegmenter,
    normalizer: PerspectiveNormalizer,
    geometry: GeometryAnalyzer,
    spots: SpotDetector,
    symmetry: SymmetryScorer,
    engine: RuleEngine,
}

impl Inspector {
    /// Build an inspector, validating the configuration first
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` or `InvalidRule` for malformed values.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            segmenter: BackgroundSegmenter::with_config(config.segmentation.clone()),
            normalizer: PerspectiveNormalizer::with_config(
                config.segmentation.clone(),
                config.perspective.clone(),
            ),
            geometry: GeometryAnalyzer::with_config(config.geometry.clone()),
            spots: SpotDetector::with_config(config.spot.clone()),
            symmetry: SymmetryScorer::with_config(config.symmetry.clone()),
            engine: RuleEngine::new(config.classification.rule_set.clone()),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn segment(&self, image: &RgbImage) -> SegmentationResult {
        self.segmenter.segment(image)
    }

    /// Warp every sufficiently large object into the canonical frame
    pub fn normalize(&self, image: &RgbImage) -> Vec<SegmentationResult> {
        self.normalizer.normalize(image)
    }

    pub fn extract_geometry(&self, segmentation: &SegmentationResult) -> GeometryFeatures {
        self.geometry.analyze_mask(&segmentation.cropped_mask)
    }

    /// Surface defect features; the zero state unless `eligible`
    pub fn extract_color(&self, image: &RgbImage, mask: &GrayImage, eligible: bool) -> ColorFeatures {
        if !eligible {
            return ColorFeatures::default();
        }
        self.spots.detect(image, mask)
    }

    pub fn evaluate(&self, features: &FeatureVector) -> Decision {
        self.engine.evaluate(features)
    }

    /// Merge the stage outputs of one segmented object
    pub fn build_features(&self, segmentation: &SegmentationResult, provenance: Provenance) -> FeatureVector {
        let geometry = self.extract_geometry(segmentation);
        let color = if geometry.has_primary_object {
            self.extract_color(
                &segmentation.cropped_image,
                &segmentation.cropped_mask,
                provenance.has_anomaly_flag,
            )
        } else {
            ColorFeatures::default()
        };
        let symmetry = SymmetryScores {
            window: self.symmetry.window_score(&geometry.window_areas),
            rotational: self.symmetry.rotational_score(&segmentation.cropped_mask),
        };

        FeatureVector::new(
            provenance,
            segmentation.area_ratio,
            geometry,
            color,
            symmetry,
            &self.config.classification.color_issue,
        )
    }

    /// Segment, measure and classify one image
    pub fn inspect(&self, image: &RgbImage, provenance: Provenance) -> Inspection {
        let segmentation = self.segment(image);
        let features = self.build_features(&segmentation, provenance);
        let decision = self.evaluate(&features);
        debug!(
            file = %features.provenance.filename,
            class = %decision.class_name,
            score = decision.score,
            "image inspected"
        );
        Inspection { features, decision }
    }

    /// Inspect every object found by perspective normalization
    pub fn inspect_normalized(&self, image: &RgbImage, provenance: Provenance) -> Vec<Inspection> {
        self.normalize(image)
            .iter()
            .map(|segmentation| {
                let features = self.build_features(segmentation, provenance.clone());
                let decision = self.evaluate(&features);
                Inspection { features, decision }
            })
            .collect()
    }

    /// Load and inspect one file
    ///
    /// # Errors
    ///
    /// Returns `ImageLoadError` if the file cannot be decoded.
    pub fn inspect_path(&self, path: &Path) -> Result<Inspection> {
        let image = load_image(path)?;
        Ok(self.inspect(&image, Provenance::from_path(path)))
    }

    /// Inspect files in parallel; results keep the input order
    ///
    /// Failed inputs stay in place as errors and are logged one by one.
    pub fn inspect_batch(&self, paths: &[PathBuf]) -> Vec<Result<Inspection>> {
        let results: Vec<Result<Inspection>> =
            paths.par_iter().map(|path| self.inspect_path(path)).collect();

        for (path, result) in paths.iter().zip(&results) {
            if let Err(err) = result {
                log_batch_error(path, err);
            }
        }
        let summary = BatchSummary::from_results(&results);
        info!(
            total = summary.total,
            inspected = summary.inspected,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch inspection finished"
        );
        results
    }
}

fn log_batch_error(path: &Path, err: &AnalysisError) {
    if err.is_recoverable() {
        warn!(path = %path.display(), reason = %err.user_message(), "image skipped");
    } else {
        warn!(path = %path.display(), error = %err, "image failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeometryConfig;
    use image::Rgb;
    use imageproc::drawing::draw_filled_circle_mut;

    const GREEN: Rgb<u8> = Rgb([40, 160, 60]);
    const DOUGH: Rgb<u8> = Rgb([225, 200, 150]);

    fn pellet_frame() -> RgbImage {
        let mut image = RgbImage::from_pixel(200, 160, GREEN);
        draw_filled_circle_mut(&mut image, (100, 80), 50, DOUGH);
        image
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = PipelineConfig::default();
        config.geometry = GeometryConfig {
            polygon_epsilon_factor: -1.0,
            ..GeometryConfig::default()
        };
        assert!(matches!(
            Inspector::new(config),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_color_skipped_when_not_eligible() {
        let inspector = Inspector::new(PipelineConfig::default()).unwrap();
        let segmentation = inspector.segment(&pellet_frame());
        let color = inspector.extract_color(&segmentation.cropped_image, &segmentation.cropped_mask, false);
        assert_eq!(color, ColorFeatures::default());
    }

    #[test]
    fn test_solid_disk_features() {
        let inspector = Inspector::new(PipelineConfig::default()).unwrap();
        let inspection = inspector.inspect(&pellet_frame(), Provenance::in_memory("disk.png", false));
        let features = &inspection.features;

        assert!(features.geometry.has_primary_object);
        assert_eq!(features.geometry.window_count, 0);
        assert!(!features.geometry.has_center_hole);
        assert!(features.symmetry.rotational > 90.0);
        assert_eq!(features.color, ColorFeatures::default());
        // solid disk has no windows and no center hole
        assert_eq!(inspection.decision.label, "rest");
        assert_eq!(inspection.decision.class_name, "Rest");
    }

    #[test]
    fn test_batch_summary_splits_recoverable_errors() {
        let inspector = Inspector::new(PipelineConfig::default()).unwrap();
        let inspection = inspector.inspect(&pellet_frame(), Provenance::in_memory("disk.png", false));
        let results: Vec<Result<Inspection>> = vec![
            Ok(inspection),
            Err(AnalysisError::ImageLoadError {
                message: "missing.png".to_string(),
                source: None,
            }),
            Err(AnalysisError::invalid_parameter("symmetry.rotations", "0")),
        ];

        let summary = BatchSummary::from_results(&results);
        assert_eq!(
            summary,
            BatchSummary {
                total: 3,
                inspected: 1,
                skipped: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn test_batch_of_missing_files_is_skipped() {
        let inspector = Inspector::new(PipelineConfig::default()).unwrap();
        let results = inspector.inspect_batch(&[PathBuf::from("gone/a.png"), PathBuf::from("gone/b.png")]);
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);
        assert!(results.iter().all(|r| r.as_ref().is_err_and(|e| e.is_recoverable())));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let inspector = Inspector::new(PipelineConfig::default()).unwrap();
        let result = inspector.inspect_path(Path::new("does/not/exist.png"));
        assert!(matches!(result, Err(AnalysisError::ImageLoadError { .. })));
    }
}
