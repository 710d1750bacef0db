use serde::{Deserialize, Serialize};

/// A point in image coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2d {
    /// The x coordinate in pixels.
    pub x: f64,
    /// The y coordinate in pixels.
    pub y: f64,
}

impl Point2d {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2d) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f64; 2]> for Point2d {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

/// A fiducial marker found in a rectified frame.
///
/// Produced by the external detector for every frame and discarded once the
/// frame is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    /// The decoded tag identifier.
    pub id: u32,
    /// The four corners of the tag quad.
    ///
    /// Order: [Bottom-left, Bottom-right, Top-right, Top-left] in tag
    /// coordinates, i.e. `(-1, -1)`, `(1, -1)`, `(1, 1)`, `(-1, 1)`.
    pub corners: [Point2d; 4],
    /// The center of the tag in image coordinates.
    pub center: Point2d,
}

impl MarkerDetection {
    /// Create a detection whose center is the mean of the corners.
    pub fn from_corners(id: u32, corners: [Point2d; 4]) -> Self {
        let (sx, sy) = corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Self {
            id,
            corners,
            center: Point2d::new(sx / 4.0, sy / 4.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_from_corners() {
        let det = MarkerDetection::from_corners(
            3,
            [[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0]].map(Point2d::from),
        );
        assert_eq!(det.id, 3);
        assert_eq!(det.center, Point2d::new(2.0, 1.0));
    }

    #[test]
    fn point_distance() {
        assert_eq!(Point2d::new(0.0, 0.0).distance(&Point2d::new(3.0, 4.0)), 5.0);
    }
}
