use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::detection::Point2d;

/// Tag coordinates of the four quad corners, in detection corner order.
pub const TAG_CORNERS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

// pivots and determinants below this are treated as singular
const SINGULAR_EPS: f64 = 1e-12;

/// A planar projective transform normalized so that `h[(2, 2)] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    /// The 3x3 matrix.
    pub matrix: Matrix3<f64>,
}

impl Homography {
    /// Fit the homography mapping each `src` point to the matching `dst` point.
    ///
    /// Solves the direct linear transform with `h33 = 1` for exactly four
    /// correspondences.
    ///
    /// # Returns
    ///
    /// `None` if the correspondences are degenerate, e.g. three collinear points.
    pub fn from_correspondences(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<Self> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (&[x, y], &[u, v])) in src.iter().zip(dst.iter()).enumerate() {
            a.set_row(
                2 * i,
                &SMatrix::<f64, 1, 8>::from_row_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u]),
            );
            a.set_row(
                2 * i + 1,
                &SMatrix::<f64, 1, 8>::from_row_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v]),
            );
            b[2 * i] = u;
            b[2 * i + 1] = v;
        }

        let lu = a.lu();
        if lu.u().diagonal().iter().any(|d| d.abs() < SINGULAR_EPS) {
            return None;
        }

        let h = lu.solve(&b)?;
        if h.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let matrix = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);

        // three collinear points give a solvable system but a rank deficient transform
        (matrix.determinant().abs() > SINGULAR_EPS).then_some(Self { matrix })
    }

    /// Fit the homography from tag coordinates to the given image corners.
    pub fn from_quad_corners(corners: &[Point2d; 4]) -> Option<Self> {
        let dst = corners.map(|p| [p.x, p.y]);
        Self::from_correspondences(&TAG_CORNERS, &dst)
    }

    /// Apply the transform to a point.
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.matrix * Vector3::new(x, y, 1.0);
        (p.x / p.z, p.y / p.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_homography() {
        let h = Homography::from_correspondences(&TAG_CORNERS, &TAG_CORNERS).unwrap();
        assert_relative_eq!(h.matrix, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn quad_corners_round_trip() {
        let corners = [[100.0, 120.0], [210.0, 110.0], [220.0, 230.0], [95.0, 215.0]]
            .map(Point2d::from);
        let h = Homography::from_quad_corners(&corners).unwrap();

        for (tag, image) in TAG_CORNERS.iter().zip(corners.iter()) {
            let (u, v) = h.project(tag[0], tag[1]);
            assert_relative_eq!(u, image.x, epsilon = 1e-9);
            assert_relative_eq!(v, image.y, epsilon = 1e-9);
        }
        assert_eq!(h.matrix[(2, 2)], 1.0);
    }

    #[test]
    fn scaled_square() {
        let corners = [[10.0, 10.0], [30.0, 10.0], [30.0, 30.0], [10.0, 30.0]].map(Point2d::from);
        let h = Homography::from_quad_corners(&corners).unwrap();
        let (u, v) = h.project(0.0, 0.0);
        assert_relative_eq!(u, 20.0, epsilon = 1e-9);
        assert_relative_eq!(v, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_corners() {
        let collapsed = [Point2d::new(5.0, 5.0); 4];
        assert!(Homography::from_quad_corners(&collapsed).is_none());

        let collinear = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [5.0, 5.0]].map(Point2d::from);
        assert!(Homography::from_quad_corners(&collinear).is_none());
    }
}
