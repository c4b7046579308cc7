//! Error types for the fryum_inspect library

use thiserror::Error;

/// Result type alias for fryum_inspect operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error types surfaced by the inspection pipeline
///
/// The image-processing stages themselves never fail: they degrade to a
/// "nothing found" state. Errors come only from the I/O boundary and from
/// configuration validation, which runs once when an [`crate::Inspector`]
/// is built.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid numeric parameter in the configuration
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Structurally invalid rule in the rule set
    #[error("Invalid rule '{label}': {reason}")]
    InvalidRule { label: String, reason: String },
}

impl AnalysisError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create an invalid rule error
    pub fn invalid_rule(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Check whether the error concerns a single image rather than the whole run
    ///
    /// Configuration errors abort a batch; a broken image only skips itself.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalysisError::ImageLoadError { .. })
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::ImageLoadError { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            AnalysisError::ConfigError { .. } => {
                "The configuration file could not be read. Please check its JSON syntax.".to_string()
            }
            AnalysisError::InvalidParameter { parameter, value } => {
                format!("Configuration value '{}' is not allowed: {}", parameter, value)
            }
            AnalysisError::InvalidRule { label, reason } => {
                format!("Classification rule '{}' is invalid: {}", label, reason)
            }
        }
    }
}
