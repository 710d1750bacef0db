//! Resolution keyed cache of fisheye rectification maps.
//!
//! Building a map costs one fisheye projection per output pixel while
//! applying it is a plain resampling pass. The output resolution rarely
//! changes during a session, so [`RectificationCache`] keeps a single map and
//! only rebuilds it when a different, valid resolution is requested.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tagloc_image::{Image, ImageDtype, ImageError, ImageSize};

use crate::calibration::distortion::generate_correction_map_fisheye;
use crate::calibration::{CalibrationError, CalibrationParameters};
use crate::interpolation::{remap, BorderMode, InterpolationMode};

/// Requested sizes must exceed this value in both dimensions to trigger a rebuild.
pub const MIN_RECTIFY_DIMENSION: usize = 100;

/// Output resolution used when none is configured.
pub const DEFAULT_OUTPUT_SIZE: ImageSize = ImageSize {
    width: 1280,
    height: 720,
};

/// Errors raised by the rectification cache.
#[derive(Debug, thiserror::Error)]
pub enum RectifyError {
    /// Error related to image.
    #[error(transparent)]
    ImageError(#[from] ImageError),

    /// Error loading the calibration parameters.
    #[error(transparent)]
    CalibrationError(#[from] CalibrationError),

    /// The cache is empty and the requested size cannot be used to build a map.
    #[error("no rectification map built yet and {0} is not a valid output size")]
    NotInitialized(ImageSize),

    /// A thread panicked while holding the cache lock.
    #[error("rectification cache lock poisoned")]
    LockPoisoned,
}

/// Pair of lookup tables mapping every output pixel to its source coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RectificationMap {
    size: ImageSize,
    map_x: Image<f32, 1>,
    map_y: Image<f32, 1>,
}

impl RectificationMap {
    /// Build the map of the given calibration for an output size.
    pub fn new(calibration: &CalibrationParameters, size: ImageSize) -> Result<Self, ImageError> {
        let (map_x, map_y) = generate_correction_map_fisheye(
            &calibration.intrinsic(),
            calibration.distortion(),
            size,
        )?;

        Ok(Self { size, map_x, map_y })
    }

    /// The output size the map was built for.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The x lookup table.
    pub fn map_x(&self) -> &Image<f32, 1> {
        &self.map_x
    }

    /// The y lookup table.
    pub fn map_y(&self) -> &Image<f32, 1> {
        &self.map_y
    }

    /// Resample `src` into `dst` with bilinear interpolation.
    ///
    /// Destination pixels whose sample falls outside `src` keep their value.
    ///
    /// # Errors
    ///
    /// `dst` must have the size of the map.
    pub fn apply_into<T: ImageDtype, const C: usize>(
        &self,
        src: &Image<T, C>,
        dst: &mut Image<T, C>,
    ) -> Result<(), ImageError> {
        remap(
            src,
            dst,
            &self.map_x,
            &self.map_y,
            InterpolationMode::Bilinear,
            BorderMode::Transparent,
        )
    }
}

/// Holds at most one [`RectificationMap`] together with its output size.
///
/// The cache is meant to be created once at startup and shared by reference
/// (or through an [`Arc`]) with every caller that rectifies frames.
///
/// Readers only hold the lock long enough to clone the map handle, so
/// rectification against a stable map runs without contention. Rebuilds are
/// serialized and the new map is published in a single swap once complete.
pub struct RectificationCache {
    calibration: CalibrationParameters,
    current: RwLock<Option<Arc<RectificationMap>>>,
    rebuild: Mutex<()>,
    builds: AtomicUsize,
}

impl RectificationCache {
    /// Create an empty cache for the given calibration.
    pub fn new(calibration: CalibrationParameters) -> Self {
        Self {
            calibration,
            current: RwLock::new(None),
            rebuild: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Create a cache and build its first map.
    ///
    /// # Errors
    ///
    /// [`RectifyError::NotInitialized`] when `size` is not a valid output size.
    pub fn with_size(
        calibration: CalibrationParameters,
        size: ImageSize,
    ) -> Result<Self, RectifyError> {
        let cache = Self::new(calibration);
        cache.map_for(size)?;
        Ok(cache)
    }

    /// Load the calibration files and build the first map.
    pub fn from_files(
        intrinsics_path: impl AsRef<Path>,
        distortion_path: impl AsRef<Path>,
        size: ImageSize,
    ) -> Result<Self, RectifyError> {
        let calibration = CalibrationParameters::from_files(intrinsics_path, distortion_path)?;
        Self::with_size(calibration, size)
    }

    /// Whether `size` is large enough to build a map for.
    pub fn is_valid_size(size: ImageSize) -> bool {
        size.width > MIN_RECTIFY_DIMENSION && size.height > MIN_RECTIFY_DIMENSION
    }

    /// The calibration the maps are built from.
    pub fn calibration(&self) -> &CalibrationParameters {
        &self.calibration
    }

    /// Number of maps built since the cache was created.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Acquire)
    }

    /// The output size of the cached map, if any.
    pub fn current_size(&self) -> Result<Option<ImageSize>, RectifyError> {
        Ok(self.cached()?.map(|map| map.size()))
    }

    fn cached(&self) -> Result<Option<Arc<RectificationMap>>, RectifyError> {
        let guard = self.current.read().map_err(|_| RectifyError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Get the map to use for the requested output size.
    ///
    /// The cached map is returned when it matches `size`, or when `size` is
    /// too small to build a map for. Otherwise a new map is built and
    /// replaces the cached one.
    ///
    /// # Errors
    ///
    /// [`RectifyError::NotInitialized`] when nothing is cached and `size` is too small.
    pub fn map_for(&self, size: ImageSize) -> Result<Arc<RectificationMap>, RectifyError> {
        let valid = Self::is_valid_size(size);

        if let Some(map) = self.cached()? {
            if map.size() == size || !valid {
                return Ok(map);
            }
        }

        if !valid {
            return Err(RectifyError::NotInitialized(size));
        }

        let _guard = self.rebuild.lock().map_err(|_| RectifyError::LockPoisoned)?;

        // another caller may have built the same size while we waited
        if let Some(map) = self.cached()? {
            if map.size() == size {
                return Ok(map);
            }
        }

        log::info!("building rectification map for {size}");
        let map = Arc::new(RectificationMap::new(&self.calibration, size)?);

        *self
            .current
            .write()
            .map_err(|_| RectifyError::LockPoisoned)? = Some(Arc::clone(&map));
        self.builds.fetch_add(1, Ordering::AcqRel);

        Ok(map)
    }

    /// Rectify a frame to the requested output size.
    ///
    /// The output has the size of the map in use, which differs from `size`
    /// when `size` is too small and an older map is reused. Pixels that map
    /// outside the raw frame are left at zero.
    pub fn apply<T: ImageDtype, const C: usize>(
        &self,
        src: &Image<T, C>,
        size: ImageSize,
    ) -> Result<Image<T, C>, RectifyError> {
        let map = self.map_for(size)?;
        let mut dst = Image::from_size_val(map.size(), T::default())?;
        map.apply_into(src, &mut dst)?;
        Ok(dst)
    }

    /// Rectify a frame into an existing buffer whose size is the requested output size.
    ///
    /// Pixels that map outside the raw frame keep their previous value, which
    /// allows compositing on top of an existing image.
    pub fn apply_into<T: ImageDtype, const C: usize>(
        &self,
        src: &Image<T, C>,
        dst: &mut Image<T, C>,
    ) -> Result<(), RectifyError> {
        let map = self.map_for(dst.size())?;
        map.apply_into(src, dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::FisheyeDistortion;

    fn calibration() -> CalibrationParameters {
        CalibrationParameters::new(
            [[120.0, 0.0, 80.0], [0.0, 118.0, 60.0], [0.0, 0.0, 1.0]],
            FisheyeDistortion::from_array([-0.02, 0.004, 0.0, 0.0]),
        )
        .unwrap()
    }

    fn frame(size: ImageSize) -> Result<Image<u8, 3>, ImageError> {
        let data = (0..size.area() * 3).map(|i| (i % 251) as u8).collect();
        Image::new(size, data)
    }

    const SIZE_A: ImageSize = ImageSize {
        width: 160,
        height: 120,
    };

    const SIZE_B: ImageSize = ImageSize {
        width: 200,
        height: 150,
    };

    #[test]
    fn same_size_builds_once() -> Result<(), RectifyError> {
        let cache = RectificationCache::new(calibration());
        let raw = frame(SIZE_A)?;

        let first = cache.apply(&raw, SIZE_A)?;
        let second = cache.apply(&raw, SIZE_A)?;

        assert_eq!(cache.build_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first.size(), SIZE_A);
        Ok(())
    }

    #[test]
    fn new_size_rebuilds() -> Result<(), RectifyError> {
        let cache = RectificationCache::new(calibration());
        let raw = frame(SIZE_A)?;

        cache.apply(&raw, SIZE_A)?;
        let out = cache.apply(&raw, SIZE_B)?;

        assert_eq!(cache.build_count(), 2);
        assert_eq!(out.size(), SIZE_B);
        assert_eq!(cache.current_size()?, Some(SIZE_B));

        let fresh = RectificationMap::new(&calibration(), SIZE_B)?;
        assert_eq!(*cache.map_for(SIZE_B)?, fresh);
        assert_eq!(cache.build_count(), 2);
        Ok(())
    }

    #[test]
    fn small_size_reuses_cached_map() -> Result<(), RectifyError> {
        let cache = RectificationCache::with_size(calibration(), SIZE_A)?;
        let raw = frame(SIZE_A)?;

        for size in [[100, 720], [1280, 100], [50, 50], [0, 0]] {
            let out = cache.apply(&raw, size.into())?;
            assert_eq!(out.size(), SIZE_A);
        }

        assert_eq!(cache.build_count(), 1);
        assert_eq!(cache.current_size()?, Some(SIZE_A));
        Ok(())
    }

    #[test]
    fn small_size_without_map_fails() -> Result<(), RectifyError> {
        let cache = RectificationCache::new(calibration());
        let raw = frame(SIZE_A)?;

        let res = cache.apply(&raw, [100, 100].into());
        assert!(matches!(res, Err(RectifyError::NotInitialized(size)) if size.width == 100));
        assert_eq!(cache.build_count(), 0);
        assert_eq!(cache.current_size()?, None);

        assert!(matches!(
            RectificationCache::with_size(calibration(), [64, 480].into()),
            Err(RectifyError::NotInitialized(_))
        ));
        Ok(())
    }

    #[test]
    fn rectified_principal_point_matches_source() -> Result<(), RectifyError> {
        let cache = RectificationCache::new(calibration());
        let raw = frame(SIZE_A)?;

        // the principal point is a fixed point of the fisheye map
        let out = cache.apply(&raw, SIZE_A)?;
        for ch in 0..3 {
            assert_eq!(out.get_pixel(80, 60, ch)?, raw.get_pixel(80, 60, ch)?);
        }
        Ok(())
    }

    #[test]
    fn apply_into_keeps_out_of_frame_pixels() -> Result<(), RectifyError> {
        // strong barrel distortion pushes the output corners outside the raw frame
        let calibration = CalibrationParameters::new(
            [[60.0, 0.0, 80.0], [0.0, 60.0, 60.0], [0.0, 0.0, 1.0]],
            FisheyeDistortion::from_array([0.8, 0.0, 0.0, 0.0]),
        )
        .unwrap();
        let cache = RectificationCache::new(calibration);
        let raw = Image::<u8, 1>::from_size_val([120, 100].into(), 10)?;

        let mut dst = Image::<u8, 1>::from_size_val(SIZE_A, 99)?;
        cache.apply_into(&raw, &mut dst)?;

        assert_eq!(dst.get_pixel(0, 0, 0)?, 99);
        assert_eq!(dst.get_pixel(80, 60, 0)?, 10);
        Ok(())
    }

    #[test]
    fn map_entries_are_finite() -> Result<(), ImageError> {
        let map = RectificationMap::new(&calibration(), SIZE_A)?;
        assert!(map.map_x().as_slice().iter().all(|v| v.is_finite()));
        assert!(map.map_y().as_slice().iter().all(|v| v.is_finite()));

        // a calibration with a zero focal length never reaches the map builder
        let res = CalibrationParameters::new(
            [[0.0, 0.0, 80.0], [0.0, 118.0, 60.0], [0.0, 0.0, 1.0]],
            FisheyeDistortion::default(),
        );
        assert!(res.is_err());
        Ok(())
    }

    #[test]
    fn concurrent_callers_share_one_build() -> Result<(), RectifyError> {
        let cache = RectificationCache::new(calibration());
        let raw = frame(SIZE_B)?;

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| cache.apply(&raw, SIZE_B).map(|img| img.size())))
                .collect();
            for handle in handles {
                let size = handle.join().expect("rectification thread panicked");
                assert!(matches!(size, Ok(s) if s == SIZE_B));
            }
        });

        assert_eq!(cache.build_count(), 1);
        Ok(())
    }
}
