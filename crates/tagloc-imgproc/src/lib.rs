#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// camera calibration parameters and fisheye distortion module.
pub mod calibration;

/// color transformations module.
pub mod color;

/// utilities for interpolation.
pub mod interpolation;

/// module containing parallization utilities.
pub mod parallel;

/// resolution keyed rectification cache.
pub mod rectify;
