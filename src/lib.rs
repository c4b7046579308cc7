//! # Fryum Inspect
//!
//! A Rust crate for visual quality inspection of snack pellets photographed
//! on a colored background.
//!
//! Each image goes through the same stages:
//! - Segmenting the product from the background and cropping it
//! - Measuring the silhouette: outline damage, windows, center hole, fragments
//! - Scoring the symmetry of the windows and of the whole outline
//! - Detecting dark surface spots on images flagged as defect candidates
//! - Grading the merged features with a declarative, weighted rule set
//!
//! ## Example
//!
//! ```rust,no_run
//! use fryum_inspect::{inspect_image, PipelineConfig};
//! use std::path::Path;
//!
//! let inspection = inspect_image(Path::new("pellet.png"), &PipelineConfig::default())?;
//! println!("{}", inspection.decision.justification());
//! # Ok::<(), fryum_inspect::AnalysisError>(())
//! ```

use std::path::Path;

pub mod error;
pub mod constants;
pub mod config;
pub mod morphology;
pub mod segmentation;
pub mod geometry;
pub mod symmetry;
pub mod color;
pub mod rules;
pub mod features;
pub mod pipeline;
pub mod evaluation;
pub mod image_loader;

pub use color::ColorFeatures;
pub use config::PipelineConfig;
pub use error::{AnalysisError, Result};
pub use evaluation::EvaluationReport;
pub use features::{FeatureVector, Provenance, SymmetryScores};
pub use geometry::GeometryFeatures;
pub use pipeline::{BatchSummary, Inspection, Inspector};
pub use rules::{Decision, RuleEngine, RuleSet};
pub use segmentation::SegmentationResult;

/// Inspect a single image file
///
/// Builds an [`Inspector`] for `config` and runs it once. Prefer keeping an
/// `Inspector` around when processing many files.
///
/// # Errors
///
/// Returns `AnalysisError` if:
/// - The configuration is invalid
/// - The image cannot be loaded or decoded
pub fn inspect_image(image_path: &Path, config: &PipelineConfig) -> Result<Inspection> {
    Inspector::new(config.clone())?.inspect_path(image_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspection_serialization() {
        let inspector = Inspector::new(PipelineConfig::default()).unwrap();
        let image = image::RgbImage::from_pixel(40, 30, image::Rgb([40, 160, 60]));
        let inspection = inspector.inspect(&image, Provenance::in_memory("blank.png", false));

        let json = serde_json::to_string(&inspection).unwrap();
        let deserialized: Inspection = serde_json::from_str(&json).unwrap();

        assert_eq!(inspection, deserialized);
    }
}
