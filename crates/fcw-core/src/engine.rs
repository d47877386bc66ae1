//! Per-frame FCW pipeline
//!
//! projection -> history update -> radius culling -> prediction ->
//! evaluation -> aggregation

use camera_model::{CameraConfig, CameraModel, GroundPosition};
use rayon::prelude::*;
use ring_buffer::Stamped;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::aggregator::{RiskAggregator, WarningResult};
use crate::config::{FcwConfig, HysteresisConfig};
use crate::evaluator::{DangerZoneEvaluator, TrackAssessment};
use crate::predictor::{predict, MotionPredictor, PathSettings, Velocity};
use crate::projector::GroundProjector;
use crate::types::{FrameMeta, TrackId, TrackedObject};
use crate::FcwError;

/// Immutable calibration and zone geometry snapshot
#[derive(Debug, Clone)]
pub struct Calibration {
    pub camera: CameraModel,
    pub projector: GroundProjector,
    pub evaluator: DangerZoneEvaluator,
    pub path: PathSettings,
    pub parallel: bool,
}

impl Calibration {
    /// Validate the configuration and calibrate the camera
    pub fn new(camera: &CameraConfig, config: &FcwConfig) -> Result<Self, FcwError> {
        config.validate()?;
        Ok(Self {
            camera: CameraModel::from_config(camera)?,
            projector: GroundProjector::new(config),
            evaluator: DangerZoneEvaluator::new(&config.fcw)?,
            path: PathSettings::from_config(&config.fcw),
            parallel: config.fcw.parallel,
        })
    }
}

/// Calibration handle shared between frame processors. Replaced whole, never mutated.
#[derive(Debug)]
pub struct SharedCalibration {
    inner: RwLock<Arc<Calibration>>,
}

impl SharedCalibration {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            inner: RwLock::new(Arc::new(calibration)),
        }
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<Calibration> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new snapshot, returning the previous one
    pub fn swap(&self, calibration: Calibration) -> Arc<Calibration> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(calibration))
    }
}

pub struct FcwEngine {
    calibration: Arc<SharedCalibration>,
    predictor: MotionPredictor,
    aggregator: RiskAggregator,
    hysteresis: Option<HysteresisConfig>,
}

impl FcwEngine {
    /// Calibrate the camera and build the pipeline
    pub fn new(camera: &CameraConfig, config: &FcwConfig) -> Result<Self, FcwError> {
        let calibration = Calibration::new(camera, config)?;
        Ok(Self::with_calibration(Arc::new(SharedCalibration::new(calibration)), config))
    }

    /// Build a pipeline over an existing calibration handle
    pub fn with_calibration(calibration: Arc<SharedCalibration>, config: &FcwConfig) -> Self {
        let snapshot = calibration.load();
        let pose = snapshot.camera.pose();
        info!(
            "FCW engine ready: horizon mode {:?}, roll {:.2} pitch {:.2} yaw {:.2} deg, {} prediction steps of {:.2}s",
            pose.mode,
            pose.roll.to_degrees(),
            pose.pitch.to_degrees(),
            pose.yaw.to_degrees(),
            snapshot.path.steps,
            snapshot.path.step,
        );

        Self {
            calibration,
            predictor: MotionPredictor::new(config.fcw.history_length),
            aggregator: RiskAggregator::from_config(config.fcw.hysteresis),
            hysteresis: config.fcw.hysteresis,
        }
    }

    /// Shared handle to the calibration snapshot
    pub fn calibration(&self) -> Arc<SharedCalibration> {
        Arc::clone(&self.calibration)
    }

    /// Recalibrate and atomically replace the snapshot. On error the old one stays.
    ///
    /// Track histories are dropped: positions projected under the old pose
    /// cannot be differenced against positions under the new one.
    pub fn reconfigure(&mut self, camera: &CameraConfig, config: &FcwConfig) -> Result<(), FcwError> {
        let calibration = Calibration::new(camera, config)?;
        self.calibration.swap(calibration);

        let dropped = self.predictor.tracked();
        self.predictor = MotionPredictor::new(config.fcw.history_length);
        if config.fcw.hysteresis != self.hysteresis {
            self.aggregator = RiskAggregator::from_config(config.fcw.hysteresis);
            self.hysteresis = config.fcw.hysteresis;
        }
        info!("FCW calibration replaced, {} track histories reset", dropped);
        Ok(())
    }

    /// Project earlier boxes of a track first seen by the predictor
    fn seed_history(&mut self, calibration: &Calibration, track: &TrackedObject, frame_index: u64) {
        let count = track.history.len() as u64;
        let samples: Vec<Stamped<GroundPosition>> = track
            .history
            .iter()
            .enumerate()
            .filter_map(|(i, bbox)| {
                let index = frame_index.checked_sub(count - i as u64)?;
                let position = calibration.projector.locate_unfiltered(bbox, &calibration.camera)?;
                Some(Stamped::new(index, position))
            })
            .collect();

        if !samples.is_empty() {
            debug!("Seeded track {} with {} history samples", track.id, samples.len());
            self.predictor.seed(track.id, samples);
        }
    }

    /// Run the full pipeline on one frame of tracked objects
    pub fn process_frame(&mut self, frame: &FrameMeta, tracks: &[TrackedObject]) -> Result<WarningResult, FcwError> {
        if !(frame.fps > 0.0 && frame.fps.is_finite()) {
            return Err(FcwError::InvalidFrame(format!("fps must be > 0, got {}", frame.fps)));
        }

        let calibration = self.calibration.load();
        let present: Vec<TrackId> = tracks.iter().map(|t| t.id).collect();
        self.predictor.retain_present(&present);

        let projection = calibration.projector.project(tracks, &calibration.camera);
        let frame_interval = frame.frame_interval();

        let mut candidates: Vec<(&TrackedObject, GroundPosition, Velocity)> =
            Vec::with_capacity(projection.observations.len());
        let mut culled = 0;

        for observation in &projection.observations {
            let track = observation.track;
            if !self.predictor.has_history(track.id) && !track.history.is_empty() {
                self.seed_history(&calibration, track, frame.frame_index);
            }
            self.predictor.observe(track.id, frame.frame_index, observation.position);

            if !calibration.evaluator.within_radius(&observation.position) {
                debug!(
                    "Culled track {} at {} beyond {:.1}m",
                    track.id,
                    observation.position,
                    calibration.evaluator.safety_radius()
                );
                culled += 1;
                continue;
            }

            let velocity = self.predictor.velocity(track.id, frame_interval);
            candidates.push((track, observation.position, velocity));
        }

        let assess = |(track, position, velocity): &(&TrackedObject, GroundPosition, Velocity)| -> TrackAssessment {
            let path = predict(*position, velocity, &calibration.path);
            calibration.evaluator.evaluate(track, *position, *velocity, path)
        };

        // Indexed collect keeps id order on both paths
        let assessments: Vec<TrackAssessment> = if calibration.parallel {
            candidates.par_iter().map(assess).collect()
        } else {
            candidates.iter().map(assess).collect()
        };

        Ok(self
            .aggregator
            .aggregate(frame, assessments, projection.skipped, culled))
    }
}
