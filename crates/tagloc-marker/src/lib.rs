#![deny(missing_docs)]
//! # Tagloc Marker
//!
//! Consumes the output of a fiducial marker detector: rejects small or
//! degenerate quads, solves the marker pose and reports it as translation
//! plus yaw, pitch and roll in degrees.

/// Area based rejection of spurious detections.
pub mod area;

/// Marker detection records.
pub mod detection;

/// Error types for pose estimation.
pub mod errors;

/// Planar homography estimation.
pub mod homography;

/// Pose representation and angle normalization.
pub mod pose;

/// Pose solvers turning detections into poses.
pub mod solver;

pub use area::{quad_area, AreaFilter, DEFAULT_AREA_THRESHOLD};
pub use detection::{MarkerDetection, Point2d};
pub use errors::PoseError;
pub use homography::Homography;
pub use pose::{normalize_angle, Pose, PoseReport};
pub use solver::{HomographyPoseSolver, PoseParams, PoseSolver};
