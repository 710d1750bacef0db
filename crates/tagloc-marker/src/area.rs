use crate::detection::Point2d;

/// Minimum quad area in pixels² for a detection to be trusted.
pub const DEFAULT_AREA_THRESHOLD: f64 = 2000.0;

/// Area of a triangle from its side lengths (Heron's formula).
///
/// Rounding can make the radicand of a degenerate triangle slightly
/// negative, it is clamped to zero.
pub fn triangle_area(a: &Point2d, b: &Point2d, c: &Point2d) -> f64 {
    let ab = a.distance(b);
    let bc = b.distance(c);
    let ca = c.distance(a);
    let p = (ab + bc + ca) / 2.0;
    (p * (p - ab) * (p - bc) * (p - ca)).max(0.0).sqrt()
}

/// Area of a quad split along the diagonal joining its second and fourth corners.
pub fn quad_area(corners: &[Point2d; 4]) -> f64 {
    triangle_area(&corners[0], &corners[1], &corners[3])
        + triangle_area(&corners[1], &corners[2], &corners[3])
}

/// Rejects detections whose quad is too small to be trusted.
///
/// Distant, occluded or degenerate quads have a small area and are the
/// usual source of false positives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaFilter {
    threshold: f64,
}

impl Default for AreaFilter {
    fn default() -> Self {
        Self::new(DEFAULT_AREA_THRESHOLD)
    }
}

impl AreaFilter {
    /// Create a filter with the given threshold in pixels².
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The threshold in pixels².
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether the quad area is strictly above the threshold.
    pub fn accept(&self, corners: &[Point2d; 4]) -> bool {
        quad_area(corners) > self.threshold
    }
}
