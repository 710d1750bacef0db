//! Pixel interpolation methods for image transformations.
//!
//! This module provides the interpolation kernels used when resampling
//! frames through a rectification map.
//!
//! # Interpolation Modes
//!
//! - **Nearest**: Fastest, uses nearest pixel value (no interpolation)
//! - **Bilinear**: Smooth linear interpolation between adjacent pixels
//!
//! # Border Modes
//!
//! - **Transparent**: samples falling outside the source leave the destination untouched
//! - **Replicate**: samples are clamped to the closest source pixel

mod bilinear;

/// Grid generation and coordinate mapping utilities.
pub mod grid;

pub(crate) mod interpolate;
mod nearest;
mod remap;

pub use interpolate::{interpolate_pixel, BorderMode, InterpolationMode};
pub use remap::remap;
