//! Shape analysis module
//!
//! This module traces the contour hierarchy of a segmented mask and derives
//! area, hull, edge and hole descriptors from it.

pub mod analyzer;
pub mod contour;

pub use analyzer::{GeometryAnalyzer, GeometryFeatures};
pub use contour::{min_area_rect, RotatedRect};
