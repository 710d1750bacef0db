use nalgebra::Matrix3;

use crate::{detection::MarkerDetection, errors::PoseError, homography::Homography, pose::Pose};

/// Physical tag size and camera intrinsics used to recover metric poses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseParams {
    /// Edge length of the tag in meters.
    pub tag_size: f64,
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x in pixels.
    pub cx: f64,
    /// Principal point y in pixels.
    pub cy: f64,
}

impl PoseParams {
    /// Create the parameters from a tag size and a row-major camera matrix.
    pub fn from_camera_matrix(tag_size: f64, k: &[[f64; 3]; 3]) -> Self {
        Self {
            tag_size,
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        }
    }

    /// The pinhole camera matrix built from the focal lengths and principal point.
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    fn validate(&self) -> Result<(), PoseError> {
        if !(self.tag_size.is_finite() && self.tag_size > 0.0) {
            return Err(PoseError::InvalidTagSize(self.tag_size));
        }
        if !(self.fx.is_finite() && self.fy.is_finite()) || self.fx == 0.0 || self.fy == 0.0 {
            return Err(PoseError::InvalidFocalLength(self.fx, self.fy));
        }
        Ok(())
    }
}

/// Recovers the pose of a detected marker relative to the camera.
pub trait PoseSolver: Send + Sync {
    /// Estimate the tag-to-camera transform of one detection.
    fn solve(&self, detection: &MarkerDetection, params: &PoseParams) -> Result<Pose, PoseError>;
}

/// Pose from the decomposition of the tag-to-image homography.
///
/// The tag lies on the `z = 0` plane with its corners at `(±s, ±s, 0)`,
/// `s` being half the tag size. For noise free corners the recovered pose is exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomographyPoseSolver;

impl PoseSolver for HomographyPoseSolver {
    fn solve(&self, detection: &MarkerDetection, params: &PoseParams) -> Result<Pose, PoseError> {
        params.validate()?;

        let h =
            Homography::from_quad_corners(&detection.corners).ok_or(PoseError::DegenerateQuad)?;

        let k_inv = params
            .camera_matrix()
            .try_inverse()
            .ok_or(PoseError::InvalidFocalLength(params.fx, params.fy))?;
        let m = k_inv * h.matrix;
        let (m1, m2, m3) = (
            m.column(0).into_owned(),
            m.column(1).into_owned(),
            m.column(2).into_owned(),
        );

        let scale = (m1.norm() + m2.norm()) / 2.0;
        if !scale.is_normal() {
            return Err(PoseError::DegenerateQuad);
        }

        // the tag must be in front of the camera
        let sign = if m3.z < 0.0 { -1.0 } else { 1.0 };
        let half_size = params.tag_size / 2.0;

        let r1 = (m1 * sign)
            .try_normalize(f64::EPSILON)
            .ok_or(PoseError::DegenerateQuad)?;
        let r2 = m2 * sign;
        let r2 = (r2 - r1 * r1.dot(&r2))
            .try_normalize(f64::EPSILON)
            .ok_or(PoseError::DegenerateQuad)?;
        let r3 = r1.cross(&r2);

        Ok(Pose {
            rotation: Matrix3::from_columns(&[r1, r2, r3]),
            translation: m3 * (sign * half_size / scale),
        })
    }
}
