//! Color analysis and conversion module
//!
//! This module handles color space conversions, surface statistics of the
//! object region, and black-hat based spot detection.

pub mod analysis;
pub mod conversion;
pub mod defects;

pub use analysis::{ColorAnalyzer, SurfaceStatistics};
pub use conversion::ColorConverter;
pub use defects::{ColorFeatures, SpotDetector};
