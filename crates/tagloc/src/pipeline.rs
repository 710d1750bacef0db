//! Frame by frame localization pipeline.
//!
//! Each frame is rectified, converted to grayscale and handed to the marker
//! detector. Detections with a small quad are dropped, the rest are turned
//! into poses and reported. Frames are independent of each other.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::Serialize;
use tagloc_image::{Image, ImageSize};
use tagloc_imgproc::{
    calibration::CalibrationParameters, color::gray_from_rgb_u8, rectify::RectificationCache,
};
use tagloc_marker::{
    quad_area, AreaFilter, HomographyPoseSolver, MarkerDetection, Pose, PoseParams, PoseReport,
    PoseSolver,
};

use crate::config::PipelineConfig;
use crate::error::{DetectorError, FrameError, PipelineError};

/// A source of raw camera frames.
pub trait FrameSource {
    /// Grab the next frame.
    ///
    /// Returns `None` once the source is exhausted. A `Some(Err(_))` is a
    /// transient failure and the caller may grab again.
    fn grab(&mut self) -> Option<Result<Image<u8, 3>, FrameError>>;
}

/// Finds fiducial markers in a grayscale frame.
pub trait MarkerDetector {
    /// Detect the markers of a frame.
    fn detect(&mut self, gray: &Image<u8, 1>) -> Result<Vec<MarkerDetection>, DetectorError>;
}

/// An accepted detection with its pose.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerObservation {
    /// The detection as reported by the detector.
    pub detection: MarkerDetection,
    /// Area of the detection quad in pixels².
    pub area: f64,
    /// The tag-to-camera transform.
    pub pose: Pose,
    /// Translation and yaw, pitch, roll in degrees.
    pub report: PoseReport,
}

/// The result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// The rectified RGB frame.
    pub rectified: Image<u8, 3>,
    /// Detections that passed the area filter, in detector order.
    pub observations: Vec<MarkerObservation>,
    /// Number of detections that were dropped.
    pub rejected: usize,
}

/// Counters accumulated by [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Frames rectified and searched for markers.
    pub frames_processed: usize,
    /// Frames the source failed to deliver.
    pub frames_skipped: usize,
    /// Detections reported with a pose.
    pub detections_accepted: usize,
    /// Detections dropped by the area filter or the pose solver.
    pub detections_rejected: usize,
}

/// Rectification, detection filtering and pose reporting for a stream of frames.
pub struct Pipeline<D: MarkerDetector, S: PoseSolver = HomographyPoseSolver> {
    cache: Arc<RectificationCache>,
    detector: D,
    solver: S,
    filter: AreaFilter,
    pose_params: PoseParams,
    output_size: ImageSize,
}

impl<D: MarkerDetector> Pipeline<D, HomographyPoseSolver> {
    /// Load the calibration named in the config and build the first rectification map.
    ///
    /// # Errors
    ///
    /// Fails when the config is invalid or the calibration files cannot be loaded.
    pub fn from_config(config: &PipelineConfig, detector: D) -> Result<Self, PipelineError> {
        config.validate()?;

        let calibration =
            CalibrationParameters::from_files(&config.intrinsics_path, &config.distortion_path)?;
        let cache = RectificationCache::with_size(calibration, config.output_size)?;

        Ok(Self::new(
            Arc::new(cache),
            detector,
            HomographyPoseSolver,
            config,
        ))
    }
}

impl<D: MarkerDetector, S: PoseSolver> Pipeline<D, S> {
    /// Create a pipeline around an existing rectification cache.
    ///
    /// The pose solver uses the camera matrix of the cache's calibration,
    /// which is also the camera matrix of the rectified frames.
    pub fn new(
        cache: Arc<RectificationCache>,
        detector: D,
        solver: S,
        config: &PipelineConfig,
    ) -> Self {
        let pose_params =
            PoseParams::from_camera_matrix(config.tag_size, cache.calibration().camera_matrix());

        Self {
            cache,
            detector,
            solver,
            filter: AreaFilter::new(config.area_threshold),
            pose_params,
            output_size: config.output_size,
        }
    }

    /// The shared rectification cache.
    pub fn cache(&self) -> &Arc<RectificationCache> {
        &self.cache
    }

    /// The area filter applied to detections.
    pub fn filter(&self) -> &AreaFilter {
        &self.filter
    }

    /// The tag size and intrinsics given to the pose solver.
    pub fn pose_params(&self) -> &PoseParams {
        &self.pose_params
    }

    /// Rectify one frame and report the poses of the markers found in it.
    pub fn process_frame(&mut self, frame: &Image<u8, 3>) -> Result<FrameOutput, PipelineError> {
        let rectified = self.cache.apply(frame, self.output_size)?;

        let mut gray = Image::from_size_val(rectified.size(), 0u8)?;
        gray_from_rgb_u8(&rectified, &mut gray)?;

        let detections = self.detector.detect(&gray)?;

        let mut observations = Vec::with_capacity(detections.len());
        let mut rejected = 0;

        for detection in detections {
            let area = quad_area(&detection.corners);
            if !self.filter.accept(&detection.corners) {
                log::debug!(
                    "rejected tag {}: area {:.1} <= {:.1}",
                    detection.id,
                    area,
                    self.filter.threshold()
                );
                rejected += 1;
                continue;
            }

            let pose = match self.solver.solve(&detection, &self.pose_params) {
                Ok(pose) => pose,
                Err(err) => {
                    log::warn!("no pose for tag {}: {err}", detection.id);
                    rejected += 1;
                    continue;
                }
            };

            observations.push(MarkerObservation {
                report: pose.report(),
                detection,
                area,
                pose,
            });
        }

        Ok(FrameOutput {
            rectified,
            observations,
            rejected,
        })
    }

    /// Process frames until the source is exhausted or `cancel` is set.
    ///
    /// Every processed frame is handed to `sink`. Frames the source fails to
    /// deliver are logged and skipped.
    ///
    /// # Errors
    ///
    /// Rectification and detector failures stop the loop.
    pub fn run<F, K>(
        &mut self,
        source: &mut F,
        cancel: &AtomicBool,
        mut sink: K,
    ) -> Result<RunStats, PipelineError>
    where
        F: FrameSource,
        K: FnMut(FrameOutput),
    {
        let mut stats = RunStats::default();

        while !cancel.load(Ordering::SeqCst) {
            let frame = match source.grab() {
                None => break,
                Some(Ok(frame)) if frame.is_empty() => {
                    log::warn!("{}", FrameError::Empty);
                    stats.frames_skipped += 1;
                    continue;
                }
                Some(Ok(frame)) => frame,
                Some(Err(err)) => {
                    log::warn!("{err}");
                    stats.frames_skipped += 1;
                    continue;
                }
            };

            let output = self.process_frame(&frame)?;

            for obs in output.observations.iter() {
                log::info!("tag {} {}", obs.detection.id, obs.report);
            }

            stats.frames_processed += 1;
            stats.detections_accepted += output.observations.len();
            stats.detections_rejected += output.rejected;

            sink(output);
        }

        log::info!(
            "processed {} frames, skipped {}, accepted {} detections, rejected {}",
            stats.frames_processed,
            stats.frames_skipped,
            stats.detections_accepted,
            stats.detections_rejected
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tagloc_imgproc::calibration::FisheyeDistortion;
    use tagloc_marker::{Point2d, PoseError};

    struct QueueSource(VecDeque<Result<Image<u8, 3>, FrameError>>);

    impl FrameSource for QueueSource {
        fn grab(&mut self) -> Option<Result<Image<u8, 3>, FrameError>> {
            self.0.pop_front()
        }
    }

    struct FixedDetector {
        detections: Vec<MarkerDetection>,
        calls: usize,
    }

    impl MarkerDetector for FixedDetector {
        fn detect(&mut self, gray: &Image<u8, 1>) -> Result<Vec<MarkerDetection>, DetectorError> {
            assert_eq!(gray.size(), ImageSize { width: 160, height: 120 });
            self.calls += 1;
            Ok(self.detections.clone())
        }
    }

    struct FailingSolver;

    impl PoseSolver for FailingSolver {
        fn solve(&self, _: &MarkerDetection, _: &PoseParams) -> Result<Pose, PoseError> {
            Err(PoseError::DegenerateQuad)
        }
    }

    fn square(id: u32, x: f64, y: f64, side: f64) -> MarkerDetection {
        MarkerDetection::from_corners(
            id,
            [[x, y], [x + side, y], [x + side, y + side], [x, y + side]].map(Point2d::from),
        )
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            output_size: ImageSize {
                width: 160,
                height: 120,
            },
            ..Default::default()
        }
    }

    fn cache() -> Arc<RectificationCache> {
        let calibration = CalibrationParameters::new(
            [[150.0, 0.0, 80.0], [0.0, 150.0, 60.0], [0.0, 0.0, 1.0]],
            FisheyeDistortion::from_array([-0.01, 0.002, 0.0, 0.0]),
        )
        .unwrap();
        Arc::new(RectificationCache::new(calibration))
    }

    fn frame() -> Image<u8, 3> {
        Image::from_size_val([200, 150].into(), 128).unwrap()
    }

    #[test]
    fn area_filter_drops_small_quads() -> Result<(), PipelineError> {
        let detector = FixedDetector {
            detections: vec![square(1, 10.0, 10.0, 60.0), square(2, 100.0, 10.0, 20.0)],
            calls: 0,
        };
        let mut pipeline = Pipeline::new(cache(), detector, HomographyPoseSolver, &config());

        let output = pipeline.process_frame(&frame())?;
        assert_eq!(output.rectified.size(), config().output_size);
        assert_eq!(output.observations.len(), 1);
        assert_eq!(output.observations[0].detection.id, 1);
        assert_eq!(output.observations[0].area, 3600.0);
        assert_eq!(output.rejected, 1);
        assert!(output.observations[0].pose.translation.z > 0.0);
        Ok(())
    }

    #[test]
    fn solver_failures_are_rejections() -> Result<(), PipelineError> {
        let detector = FixedDetector {
            detections: vec![square(1, 10.0, 10.0, 60.0)],
            calls: 0,
        };
        let mut pipeline = Pipeline::new(cache(), detector, FailingSolver, &config());

        let output = pipeline.process_frame(&frame())?;
        assert!(output.observations.is_empty());
        assert_eq!(output.rejected, 1);
        Ok(())
    }

    #[test]
    fn run_skips_bad_frames() -> Result<(), PipelineError> {
        let detector = FixedDetector {
            detections: vec![square(4, 10.0, 10.0, 60.0)],
            calls: 0,
        };
        let mut pipeline = Pipeline::new(cache(), detector, HomographyPoseSolver, &config());

        let mut source = QueueSource(VecDeque::from(vec![
            Ok(frame()),
            Err(FrameError::Acquisition("timeout".to_string())),
            Ok(Image::new([0, 0].into(), vec![]).unwrap()),
            Ok(frame()),
        ]));

        let mut outputs = Vec::new();
        let stats = pipeline.run(&mut source, &AtomicBool::new(false), |out| outputs.push(out))?;

        assert_eq!(
            stats,
            RunStats {
                frames_processed: 2,
                frames_skipped: 2,
                detections_accepted: 2,
                detections_rejected: 0,
            }
        );
        assert_eq!(outputs.len(), 2);
        assert_eq!(pipeline.detector.calls, 2);
        assert_eq!(pipeline.cache().build_count(), 1);
        Ok(())
    }

    #[test]
    fn run_stops_on_cancel() -> Result<(), PipelineError> {
        let detector = FixedDetector {
            detections: vec![],
            calls: 0,
        };
        let mut pipeline = Pipeline::new(cache(), detector, HomographyPoseSolver, &config());
        let mut source = QueueSource(VecDeque::from(vec![Ok(frame())]));

        let stats = pipeline.run(&mut source, &AtomicBool::new(true), |_| {})?;
        assert_eq!(stats, RunStats::default());
        assert_eq!(pipeline.detector.calls, 0);
        Ok(())
    }
}
