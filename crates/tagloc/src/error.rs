use std::path::PathBuf;

use tagloc_image::ImageError;
use tagloc_imgproc::{calibration::CalibrationError, rectify::RectifyError};

/// An error type for loading the pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read the config file {path}. {source}")]
    Io {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected schema.
    #[error("Failed to parse the config. {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its accepted range.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A frame that could not be acquired.
///
/// These are transient: the pipeline logs them and moves on to the next frame.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrameError {
    /// The source returned an empty frame.
    #[error("Empty frame")]
    Empty,

    /// The source failed to deliver a frame.
    #[error("Image acquisition error: {0}")]
    Acquisition(String),
}

/// An error reported by a marker detector.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// The detector does not support the configured tag family.
    #[error("Unrecognized tag family name {0}")]
    UnsupportedFamily(String),

    /// The detector failed on a frame.
    #[error("Marker detection failed: {0}")]
    Detection(String),

    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] ImageError),
}

/// An error that stops the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Error loading the configuration.
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// Error loading the calibration parameters.
    #[error(transparent)]
    CalibrationError(#[from] CalibrationError),

    /// Error rectifying a frame.
    #[error(transparent)]
    RectifyError(#[from] RectifyError),

    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] ImageError),

    /// Error raised by the marker detector.
    #[error(transparent)]
    DetectorError(#[from] DetectorError),
}
