use super::CameraIntrinsic;
use crate::interpolation::grid::meshgrid_from_fn;
use tagloc_image::{Image, ImageError, ImageSize};

/// Represents the fisheye (equidistant) distortion parameters of a camera
///
/// The distorted angle is `theta_d = theta * (1 + k1 * theta^2 + k2 * theta^4 + k3 * theta^6 + k4 * theta^8)`.
///
/// # Fields
///
/// * `k1` - The first distortion coefficient
/// * `k2` - The second distortion coefficient
/// * `k3` - The third distortion coefficient
/// * `k4` - The fourth distortion coefficient
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FisheyeDistortion {
    /// The first distortion coefficient
    pub k1: f64,
    /// The second distortion coefficient
    pub k2: f64,
    /// The third distortion coefficient
    pub k3: f64,
    /// The fourth distortion coefficient
    pub k4: f64,
}

impl FisheyeDistortion {
    /// Build the coefficients from the `[k1, k2, k3, k4]` vector.
    pub fn from_array(coeffs: [f64; 4]) -> Self {
        Self {
            k1: coeffs[0],
            k2: coeffs[1],
            k3: coeffs[2],
            k4: coeffs[3],
        }
    }

    /// The coefficients as the `[k1, k2, k3, k4]` vector.
    pub fn as_array(&self) -> [f64; 4] {
        [self.k1, self.k2, self.k3, self.k4]
    }
}

/// Distort a point using the fisheye model
///
/// The point is given in the pixel frame of an ideal pinhole camera with the
/// same intrinsics and is projected to where the fisheye lens images it.
///
/// # Arguments
///
/// * `x` - The x coordinate of the point
/// * `y` - The y coordinate of the point
/// * `intrinsic` - The intrinsic parameters of the camera
/// * `distortion` - The distortion parameters of the camera
///
/// # Returns
///
/// * `x` - The x coordinate of the distorted point
/// * `y` - The y coordinate of the distorted point
pub fn distort_point_fisheye(
    x: f64,
    y: f64,
    intrinsic: &CameraIntrinsic,
    distortion: &FisheyeDistortion,
) -> (f64, f64) {
    let (fx, fy, cx, cy) = (intrinsic.fx, intrinsic.fy, intrinsic.cx, intrinsic.cy);
    let FisheyeDistortion { k1, k2, k3, k4 } = *distortion;

    // normalize the coordinates
    let x = (x - cx) / fx;
    let y = (y - cy) / fy;

    let r = (x * x + y * y).sqrt();
    let theta = r.atan();

    let theta2 = theta * theta;
    let theta4 = theta2 * theta2;
    let theta6 = theta4 * theta2;
    let theta8 = theta4 * theta4;
    let theta_d = theta * (1.0 + k1 * theta2 + k2 * theta4 + k3 * theta6 + k4 * theta8);

    let scale = if r > 0.0 { theta_d / r } else { 1.0 };

    // denormalize the coordinates
    let xdst = fx * x * scale + cx;
    let ydst = fy * y * scale + cy;

    (xdst, ydst)
}

/// Generate the undistort and rectify map for a fisheye distortion model
///
/// The rectification is the identity and the new camera matrix equals the
/// original one, so the output keeps the calibrated focal lengths and
/// principal point.
///
/// # Arguments
///
/// * `intrinsic` - The intrinsic parameters of the camera
/// * `distortion` - The distortion parameters of the camera
/// * `size` - The size of the output image
///
/// # Returns
///
/// * `map_x` - The x map for undistorting the image
/// * `map_y` - The y map for undistorting the image
pub fn generate_correction_map_fisheye(
    intrinsic: &CameraIntrinsic,
    distortion: &FisheyeDistortion,
    size: ImageSize,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    meshgrid_from_fn(size, |x, y| {
        let (xdst, ydst) = distort_point_fisheye(x as f64, y as f64, intrinsic, distortion);
        (xdst as f32, ydst as f32)
    })
}
