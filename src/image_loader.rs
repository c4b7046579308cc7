//! Image loading into an RGB raster
//!
//! Files are decoded with the `image` crate. The extension is checked
//! first so unsupported files are rejected with a clear message; the actual
//! decoder is then chosen from the file content. Every failure surfaces as
//! [`AnalysisError::ImageLoadError`], before the image reaches any
//! processing stage.
//!
//! ## Supported Formats
//!
//! JPEG, PNG, BMP, TIFF and WebP.

use crate::error::{AnalysisError, Result};
use image::{ImageReader, RgbImage};
use std::path::{Component, Path};

/// Directory name marking images known to be potential defects
pub const ANOMALY_DIRECTORY: &str = "Anomaly";

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
    WebP,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "bmp" => Some(ImageFormat::Bmp),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }
}

/// Load an image from disk as 8-bit RGB
///
/// # Errors
///
/// Returns `AnalysisError::ImageLoadError` if:
/// - The extension is not a supported format
/// - The file cannot be opened
/// - Decoding fails
///
/// # Example
///
/// ```rust,no_run
/// use fryum_inspect::image_loader::load_image;
/// use std::path::Path;
///
/// let image = load_image(Path::new("pellet.png"))?;
/// println!("Loaded image: {}x{}", image.width(), image.height());
/// # Ok::<(), fryum_inspect::AnalysisError>(())
/// ```
pub fn load_image(path: &Path) -> Result<RgbImage> {
    if ImageFormat::from_extension(path).is_none() {
        return Err(AnalysisError::ImageLoadError {
            message: format!("Unsupported image format: {}", path.display()),
            source: None,
        });
    }

    let reader = ImageReader::open(path)
        .map_err(|e| AnalysisError::image_load(format!("Failed to open image file: {}", path.display()), e))?
        .with_guessed_format()
        .map_err(|e| AnalysisError::image_load(format!("Failed to read image header: {}", path.display()), e))?;

    let image = reader
        .decode()
        .map_err(|e| AnalysisError::image_load(format!("Failed to decode image: {}", path.display()), e))?;

    Ok(image.to_rgb8())
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}

/// Whether `path` lies below an `Anomaly` directory (case-insensitive)
pub fn is_defect_candidate(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(ANOMALY_DIRECTORY)),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::from_extension(Path::new("pellet.jpg")), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension(Path::new("pellet.JPEG")), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension(Path::new("pellet.tif")), Some(ImageFormat::Tiff));
        assert_eq!(ImageFormat::from_extension(Path::new("pellet.heic")), None);
        assert_eq!(ImageFormat::from_extension(Path::new("pellet")), None);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("png"));
        assert!(is_supported_extension("WEBP"));
        assert!(!is_supported_extension("gif"));
    }

    #[test]
    fn test_defect_candidate_paths() {
        assert!(is_defect_candidate(Path::new("data/Anomaly/img_01.png")));
        assert!(is_defect_candidate(Path::new("data/anomaly/color/img_01.png")));
        assert!(!is_defect_candidate(Path::new("data/Normal/img_01.png")));
        assert!(!is_defect_candidate(Path::new("data/Anomaly_old.png")));
    }

    #[test]
    fn test_load_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pellet.png");
        let mut image = RgbImage::from_pixel(8, 6, Rgb([10, 200, 30]));
        image.put_pixel(3, 2, Rgb([250, 240, 200]));
        image.save(&path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.dimensions(), (8, 6));
        assert_eq!(loaded.get_pixel(3, 2), &Rgb([250, 240, 200]));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = load_image(&dir.path().join("missing.png"));
        assert!(matches!(missing, Err(AnalysisError::ImageLoadError { .. })));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not an image").unwrap();
        assert!(matches!(load_image(&garbage), Err(AnalysisError::ImageLoadError { .. })));

        let unsupported = load_image(&dir.path().join("notes.txt"));
        assert!(matches!(unsupported, Err(AnalysisError::ImageLoadError { .. })));
    }
}
