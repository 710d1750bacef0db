/// fisheye distortion model and correction maps.
pub mod distortion;

/// plain text storage of the calibration parameters.
pub mod store;

use std::path::Path;

pub use distortion::FisheyeDistortion;
pub use store::{load_calibration, save_calibration, CalibrationError};

/// Represents the instrinsic parameters of a pinhole camera
///
/// # Fields
///
/// * `fx` - The focal length in the x direction
/// * `fy` - The focal length in the y direction
/// * `cx` - The x coordinate of the principal point
/// * `cy` - The y coordinate of the principal point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsic {
    /// The focal length in the x direction
    pub fx: f64,
    /// The focal length in the y direction
    pub fy: f64,
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
}

impl CameraIntrinsic {
    /// Extract the pinhole parameters from a row-major 3x3 camera matrix.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Self {
        Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        }
    }

    /// The row-major 3x3 camera matrix without skew.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }
}

/// Intrinsic matrix and fisheye distortion coefficients of a calibrated camera.
///
/// Loaded once from the parameter files written by the offline calibration
/// tool and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationParameters {
    camera_matrix: [[f64; 3]; 3],
    distortion: FisheyeDistortion,
}

impl CalibrationParameters {
    /// Create the parameters from a camera matrix and distortion coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidIntrinsics`] when a focal length is
    /// zero or any coefficient is not finite.
    pub fn new(
        camera_matrix: [[f64; 3]; 3],
        distortion: FisheyeDistortion,
    ) -> Result<Self, CalibrationError> {
        let (fx, fy) = (camera_matrix[0][0], camera_matrix[1][1]);
        let finite = camera_matrix.iter().flatten().all(|v| v.is_finite())
            && distortion.as_array().iter().all(|v| v.is_finite());
        if !finite || fx == 0.0 || fy == 0.0 {
            return Err(CalibrationError::InvalidIntrinsics { fx, fy });
        }

        Ok(Self {
            camera_matrix,
            distortion,
        })
    }

    /// Load the parameters from the intrinsics and distortion files.
    pub fn from_files(
        intrinsics_path: impl AsRef<Path>,
        distortion_path: impl AsRef<Path>,
    ) -> Result<Self, CalibrationError> {
        load_calibration(intrinsics_path, distortion_path)
    }

    /// The row-major 3x3 intrinsic matrix.
    pub fn camera_matrix(&self) -> &[[f64; 3]; 3] {
        &self.camera_matrix
    }

    /// The fisheye distortion coefficients.
    pub fn distortion(&self) -> &FisheyeDistortion {
        &self.distortion
    }

    /// The pinhole parameters of the camera matrix.
    pub fn intrinsic(&self) -> CameraIntrinsic {
        CameraIntrinsic::from_matrix(&self.camera_matrix)
    }
}
