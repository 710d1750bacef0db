//! Plain text calibration files.
//!
//! The intrinsics file holds the 3x3 camera matrix row by row and the
//! distortion file holds the four fisheye coefficients. Values are separated
//! by any whitespace.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{CalibrationParameters, FisheyeDistortion};

/// Number of values in the intrinsics file.
const INTRINSICS_LEN: usize = 9;

/// Number of values in the distortion file.
const DISTORTION_LEN: usize = 4;

/// Errors raised while reading or writing the calibration files.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// The file could not be read or written.
    #[error("failed to access calibration file {path}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying io error.
        #[source]
        source: std::io::Error,
    },

    /// A token is not a finite floating point number.
    #[error("invalid value {token:?} in calibration file {path}")]
    InvalidToken {
        /// Path of the file.
        path: PathBuf,
        /// The offending token.
        token: String,
    },

    /// The file holds fewer values than required.
    #[error("calibration file {path} holds {found} values, expected {expected}")]
    MissingValues {
        /// Path of the file.
        path: PathBuf,
        /// Number of values required.
        expected: usize,
        /// Number of values found.
        found: usize,
    },

    /// The camera matrix cannot describe a pinhole camera.
    #[error("invalid intrinsics: fx = {fx}, fy = {fy}")]
    InvalidIntrinsics {
        /// Focal length in x.
        fx: f64,
        /// Focal length in y.
        fy: f64,
    },
}

/// Read exactly `N` whitespace separated values from a file.
fn read_values<const N: usize>(path: &Path) -> Result<[f64; N], CalibrationError> {
    let content = fs::read_to_string(path).map_err(|source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut values = [0.0; N];
    let mut found = 0;

    for token in content.split_whitespace() {
        let value = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CalibrationError::InvalidToken {
                path: path.to_path_buf(),
                token: token.to_string(),
            })?;

        if found < N {
            values[found] = value;
        }
        found += 1;
    }

    if found < N {
        return Err(CalibrationError::MissingValues {
            path: path.to_path_buf(),
            expected: N,
            found,
        });
    }

    if found > N {
        log::warn!(
            "ignoring {} trailing values in {}",
            found - N,
            path.display()
        );
    }

    Ok(values)
}

/// Load the calibration parameters from the intrinsics and distortion files.
///
/// # Arguments
///
/// * `intrinsics_path` - File holding the row-major 3x3 camera matrix.
/// * `distortion_path` - File holding the four fisheye coefficients.
///
/// # Errors
///
/// Fails when a file is missing, truncated or holds non numeric tokens.
pub fn load_calibration(
    intrinsics_path: impl AsRef<Path>,
    distortion_path: impl AsRef<Path>,
) -> Result<CalibrationParameters, CalibrationError> {
    let k = read_values::<INTRINSICS_LEN>(intrinsics_path.as_ref())?;
    let d = read_values::<DISTORTION_LEN>(distortion_path.as_ref())?;

    let camera_matrix = [[k[0], k[1], k[2]], [k[3], k[4], k[5]], [k[6], k[7], k[8]]];
    let params = CalibrationParameters::new(camera_matrix, FisheyeDistortion::from_array(d))?;

    log::info!("intrinsics: {:?}", params.camera_matrix());
    log::info!("distortion: {:?}", params.distortion().as_array());

    Ok(params)
}

/// Write the calibration parameters in the layout read by [`load_calibration`].
///
/// Each matrix row goes on its own line and values are tab separated.
pub fn save_calibration(
    params: &CalibrationParameters,
    intrinsics_path: impl AsRef<Path>,
    distortion_path: impl AsRef<Path>,
) -> Result<(), CalibrationError> {
    let intrinsics_path = intrinsics_path.as_ref();
    write_rows(intrinsics_path, params.camera_matrix())?;

    let distortion_path = distortion_path.as_ref();
    write_rows(distortion_path, &[params.distortion().as_array()])?;

    Ok(())
}

fn write_rows<const N: usize>(path: &Path, rows: &[[f64; N]]) -> Result<(), CalibrationError> {
    let to_error = |source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = fs::File::create(path).map_err(to_error)?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        for value in row {
            write!(writer, "{value}\t").map_err(to_error)?;
        }
        writeln!(writer).map_err(to_error)?;
    }
    writer.flush().map_err(to_error)?;

    Ok(())
}
