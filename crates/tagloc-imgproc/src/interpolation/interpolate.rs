use super::bilinear::bilinear_interpolation;
use super::nearest::nearest_neighbor_interpolation;
use tagloc_image::{Image, ImageDtype};

/// Interpolation mode for the remap operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    /// Bilinear interpolation
    Bilinear,
    /// Nearest neighbor interpolation
    Nearest,
}

/// How samples that fall outside the source image are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// Leave the destination pixel untouched.
    Transparent,
    /// Clamp the sample to the closest source pixel.
    Replicate,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
/// * `border` - The policy for coordinates outside the image.
///
/// # Returns
///
/// The interpolated pixel, or `None` when the sample is outside the image
/// and the border is [`BorderMode::Transparent`].
pub fn interpolate_pixel<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
    interpolation: InterpolationMode,
    border: BorderMode,
) -> Option<[f32; C]> {
    if image.is_empty() {
        return None;
    }

    let max_u = (image.cols() - 1) as f32;
    let max_v = (image.rows() - 1) as f32;

    let inside = (0.0..=max_u).contains(&u) && (0.0..=max_v).contains(&v);

    let (u, v) = match border {
        BorderMode::Transparent if !inside => return None,
        BorderMode::Transparent => (u, v),
        // NaN coordinates collapse to the origin
        BorderMode::Replicate => (
            if u.is_nan() { 0.0 } else { u.clamp(0.0, max_u) },
            if v.is_nan() { 0.0 } else { v.clamp(0.0, max_v) },
        ),
    };

    Some(match interpolation {
        InterpolationMode::Bilinear => bilinear_interpolation(image, u, v),
        InterpolationMode::Nearest => nearest_neighbor_interpolation(image, u, v),
    })
}
