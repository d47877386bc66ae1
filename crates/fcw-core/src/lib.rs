//! Forward Collision Warning (FCW)
//!
//! Geometric risk assessment for tracked road users:
//! - Ground projection of tracked bounding boxes through the calibrated camera
//! - Constant-velocity motion prediction from per-track ground history
//! - Danger-zone and vehicle-footprint intersection tests
//! - Frame-level warning aggregation
//!
//! Detection and multi-object tracking happen upstream; this crate consumes
//! their tracks once per frame.

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod predictor;
pub mod projector;
pub mod types;
pub mod zone;

pub use aggregator::{Hysteresis, Passthrough, RiskAggregator, UrgentTrack, WarningFilter, WarningResult};
pub use config::{CollisionConfig, ConfigError, DetectorConfig, FcwConfig, HysteresisConfig, TrackerConfig};
pub use engine::{Calibration, FcwEngine, SharedCalibration};
pub use evaluator::{DangerZoneEvaluator, RiskLevel, TrackAssessment};
pub use predictor::{MotionPredictor, PathSample, PathSettings, PredictedPath, Velocity, VelocitySource};
pub use projector::{GroundProjector, Projected, Projection, SkipReason, SkippedTrack};
pub use types::{BoundingBox, FrameMeta, TrackId, TrackedObject};
pub use zone::{DangerZone, VehicleFootprint};

pub use camera_model::{CalibrationError, CameraConfig, CameraModel, GroundPosition, ImageSpace, ProjectionError};

use thiserror::Error;

/// FCW error types
#[derive(Error, Debug)]
pub enum FcwError {
    #[error("Camera calibration failed: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}
