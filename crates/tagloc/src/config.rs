use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tagloc_image::ImageSize;
use tagloc_imgproc::rectify::{RectificationCache, DEFAULT_OUTPUT_SIZE};
use tagloc_marker::DEFAULT_AREA_THRESHOLD;

use crate::error::ConfigError;

/// Options handed to the marker detector when it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Tag family to detect.
    pub family: String,
    /// Decimate the input image by this factor before quad detection.
    pub decimate: f32,
    /// Standard deviation of the low-pass blur applied to the input, 0 disables it.
    pub blur: f32,
    /// Number of worker threads.
    pub threads: usize,
    /// Spend more time trying to align the edges of tags.
    pub refine_edges: bool,
    /// Enable debugging output.
    pub debug: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            family: "tag16h5".to_string(),
            decimate: 2.0,
            blur: 0.0,
            threads: 1,
            refine_edges: true,
            debug: false,
        }
    }
}

/// Configuration of the localization pipeline.
///
/// Every field has a default so a config file only needs to list what it
/// overrides.
///
/// ```json
/// {
///   "intrinsics_path": "params/intrinsics.txt",
///   "output_size": { "width": 640, "height": 480 },
///   "detector": { "threads": 4 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path of the camera matrix file.
    pub intrinsics_path: PathBuf,
    /// Path of the fisheye distortion coefficients file.
    pub distortion_path: PathBuf,
    /// Resolution of the rectified frames.
    pub output_size: ImageSize,
    /// Detections with a quad area at or below this value in pixels² are rejected.
    pub area_threshold: f64,
    /// Edge length of the printed tags in meters.
    pub tag_size: f64,
    /// Marker detector options.
    pub detector: DetectorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            intrinsics_path: PathBuf::from("intrinsics.txt"),
            distortion_path: PathBuf::from("dis_coeff.txt"),
            output_size: DEFAULT_OUTPUT_SIZE,
            area_threshold: DEFAULT_AREA_THRESHOLD,
            tag_size: 0.1,
            detector: DetectorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json_str(&json)?;
        log::debug!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Serialize the configuration as pretty printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the values that would only fail later in the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !RectificationCache::is_valid_size(self.output_size) {
            return Err(ConfigError::InvalidValue {
                field: "output_size",
                reason: format!("{} is too small to rectify", self.output_size),
            });
        }

        if !(self.tag_size.is_finite() && self.tag_size > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "tag_size",
                reason: format!("{} is not a positive length", self.tag_size),
            });
        }

        if !self.area_threshold.is_finite() || self.area_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "area_threshold",
                reason: format!("{} is not a non-negative area", self.area_threshold),
            });
        }

        if self.detector.threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "detector.threads",
                reason: "at least one thread is required".to_string(),
            });
        }

        if !(self.detector.decimate.is_finite() && self.detector.decimate >= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "detector.decimate",
                reason: format!("{} must be at least 1", self.detector.decimate),
            });
        }

        Ok(())
    }
}
