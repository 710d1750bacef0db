/// Errors raised while estimating a marker pose.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    /// The corners do not span a plane, e.g. three of them are collinear.
    #[error("Degenerate marker quad, the homography is singular")]
    DegenerateQuad,

    /// The tag size is not a positive finite number.
    #[error("Invalid tag size {0}, it must be positive")]
    InvalidTagSize(f64),

    /// The focal lengths cannot be inverted.
    #[error("Invalid focal lengths fx={0} fy={1}")]
    InvalidFocalLength(f64, f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            PoseError::InvalidTagSize(-0.5).to_string(),
            "Invalid tag size -0.5, it must be positive"
        );
        assert_eq!(
            PoseError::InvalidFocalLength(0.0, 600.0).to_string(),
            "Invalid focal lengths fx=0 fy=600"
        );
    }
}
