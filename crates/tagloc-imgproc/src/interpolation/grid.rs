use rayon::prelude::*;
use tagloc_image::{Image, ImageError, ImageSize};

/// Create a pair of coordinate maps by evaluating `f` at every grid point.
///
/// # Arguments
///
/// * `size` - The size of the grid.
/// * `f` - Maps the destination pixel `(x, y)` to the source coordinates to sample.
///
/// # Returns
///
/// A tuple of single channel images of the grid size holding the x and y coordinates.
pub fn meshgrid_from_fn<F>(
    size: ImageSize,
    f: F,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError>
where
    F: Fn(usize, usize) -> (f32, f32) + Send + Sync,
{
    let (rows, cols) = (size.height, size.width);
    let mut map_x = vec![0.0f32; rows * cols];
    let mut map_y = vec![0.0f32; rows * cols];

    if cols > 0 {
        map_x
            .par_chunks_exact_mut(cols)
            .zip(map_y.par_chunks_exact_mut(cols))
            .enumerate()
            .for_each(|(y, (row_x, row_y))| {
                row_x
                    .iter_mut()
                    .zip(row_y.iter_mut())
                    .enumerate()
                    .for_each(|(x, (mx, my))| {
                        (*mx, *my) = f(x, y);
                    });
            });
    }

    Ok((Image::new(size, map_x)?, Image::new(size, map_y)?))
}

/// Create a meshgrid of x and y coordinates
///
/// # Arguments
///
/// * `size` - The size of the grid.
///
/// # Returns
///
/// A tuple of maps where every pixel holds its own coordinates.
pub fn meshgrid(size: ImageSize) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    meshgrid_from_fn(size, |x, y| (x as f32, y as f32))
}
