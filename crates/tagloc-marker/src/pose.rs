use std::f64::consts::PI;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// A rigid transform from the tag frame to the camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// 3x3 rotation matrix.
    pub rotation: Matrix3<f64>,
    /// Translation vector in meters.
    pub translation: Vector3<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

impl Pose {
    /// Yaw, pitch and roll of the rotation in radians, each within `(-pi, pi]`.
    ///
    /// yaw = atan2(r10, r00), pitch = asin(-r20), roll = atan2(r21, r22).
    pub fn euler_angles(&self) -> (f64, f64, f64) {
        let r = &self.rotation;
        let yaw = r[(1, 0)].atan2(r[(0, 0)]);
        // rounding may push the sine slightly outside [-1, 1]
        let pitch = (-r[(2, 0)]).clamp(-1.0, 1.0).asin();
        let roll = r[(2, 1)].atan2(r[(2, 2)]);

        (
            normalize_angle(yaw),
            normalize_angle(pitch),
            normalize_angle(roll),
        )
    }

    /// Build the pose report of this pose.
    pub fn report(&self) -> PoseReport {
        PoseReport::from(self)
    }
}

/// Position and orientation of a marker as reported to the user.
///
/// Angles are in degrees within `(-180, 180]`, translation in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseReport {
    /// Translation along the camera x axis.
    pub x: f64,
    /// Translation along the camera y axis.
    pub y: f64,
    /// Translation along the camera z axis.
    pub z: f64,
    /// Rotation about the vertical axis.
    pub yaw: f64,
    /// Rotation about the lateral axis.
    pub pitch: f64,
    /// Rotation about the longitudinal axis.
    pub roll: f64,
}

impl From<&Pose> for PoseReport {
    fn from(pose: &Pose) -> Self {
        let (yaw, pitch, roll) = pose.euler_angles();
        let t = &pose.translation;

        Self {
            x: t.x,
            y: t.y,
            z: t.z,
            yaw: yaw.to_degrees(),
            pitch: pitch.to_degrees(),
            roll: roll.to_degrees(),
        }
    }
}

impl std::fmt::Display for PoseReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "x: {:.3} y: {:.3} z: {:.3} yaw: {:.2} pitch: {:.2} roll: {:.2}",
            self.x, self.y, self.z, self.yaw, self.pitch, self.roll
        )
    }
}

/// Map an angle in radians to its representative in `(-pi, pi]`.
///
/// Non-negative angles are shifted by `+pi`, wrapped and shifted back; negative
/// angles use the mirrored rule so both sides wrap continuously.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = if angle >= 0.0 {
        (angle + PI) % (2.0 * PI) - PI
    } else {
        (angle - PI) % (-2.0 * PI) + PI
    };

    // the positive branch lands on -pi for odd multiples of pi
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}
