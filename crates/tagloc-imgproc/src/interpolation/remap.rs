use crate::parallel;

use super::interpolate::interpolate_pixel;
use super::{BorderMode, InterpolationMode};
use tagloc_image::{Image, ImageDtype, ImageError};

/// Apply generic geometric transformation to an image.
///
/// Each destination pixel `(x, y)` is sampled from the source at
/// `(map_x[y, x], map_y[y, x])`.
///
/// # Arguments
///
/// * `src` - The input image container with shape (height, width, C).
/// * `dst` - The output image container with shape (height, width, C).
/// * `map_x` - The x coordinates of the pixels to interpolate.
/// * `map_y` - The y coordinates of the pixels to interpolate.
/// * `interpolation` - The interpolation mode to use.
/// * `border` - The policy for samples outside the source image.
///
/// # Errors
///
/// * The mapx and mapy must have the same size.
/// * The output image must have the same size as the mapx and mapy.
pub fn remap<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    interpolation: InterpolationMode,
    border: BorderMode,
) -> Result<(), ImageError> {
    if map_x.size() != map_y.size() {
        return Err(ImageError::InvalidImageSize(
            map_x.cols(),
            map_x.rows(),
            map_y.cols(),
            map_y.rows(),
        ));
    }

    if dst.size() != map_x.size() {
        return Err(ImageError::InvalidImageSize(
            map_x.cols(),
            map_x.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    // parallelize the remap operation by rows
    parallel::par_iter_rows_resample(dst, map_x, map_y, |&x, &y, dst_pixel| {
        if let Some(pixel) = interpolate_pixel(src, x, y, interpolation, border) {
            dst_pixel
                .iter_mut()
                .zip(pixel.iter())
                .for_each(|(d, &p)| *d = T::from_f32(p));
        }
    });

    Ok(())
}
