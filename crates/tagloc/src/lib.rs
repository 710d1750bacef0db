#![deny(missing_docs)]
#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

/// Pipeline configuration loaded from JSON.
pub mod config;

/// Error types for the pipeline.
pub mod error;

/// Frame by frame localization pipeline.
pub mod pipeline;

#[doc(inline)]
pub use tagloc_image as image;

#[doc(inline)]
pub use tagloc_imgproc as imgproc;

#[doc(inline)]
pub use tagloc_marker as marker;

pub use crate::config::{DetectorConfig, PipelineConfig};
pub use crate::error::{ConfigError, DetectorError, FrameError, PipelineError};
pub use crate::pipeline::{
    FrameOutput, FrameSource, MarkerDetector, MarkerObservation, Pipeline, RunStats,
};
