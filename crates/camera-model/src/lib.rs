//! Camera Model for Forward Collision Warning
//!
//! Calibrates a vehicle-mounted camera and maps between image pixels and the
//! vehicle ground plane:
//! - Lens undistortion (OpenCV rational / Brown-Conrady coefficients)
//! - Mount pose estimation from manually measured horizon points
//! - Back-projection of image points onto the ground plane (z = 0)
//!
//! Vehicle frame: x forward, y left, z up, origin on the ground below the
//! front bumper centre. Camera frame: x right, y down, z along the optical axis.

pub mod camera;
pub mod config;
pub mod distortion;
pub mod ground;
pub mod pose;

pub use camera::{CameraModel, ImageSpace, Intrinsics};
pub use config::{CameraConfig, ImageSize, ViewDirection};
pub use distortion::Distortion;
pub use ground::GroundPosition;
pub use pose::{estimate_pose, CameraPose, HorizonMode, HorizonObservation};

use thiserror::Error;

/// Errors raised while building the calibration. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Intrinsic matrix is not invertible")]
    SingularIntrinsics,

    #[error("Unsupported distortion coefficient count {0} (expected 0, 4, 5 or 8)")]
    DistortionCount(usize),

    #[error("Invalid image size {width}x{height}")]
    ImageSize { width: u32, height: u32 },

    #[error("Camera must be mounted above the ground plane (height {0} m)")]
    MountHeight(f64),

    #[error("Horizon points are degenerate: {0}")]
    DegenerateHorizon(&'static str),

    #[error("Horizon points are not collinear: RMS residual {rms_deg:.2} deg exceeds {limit_deg:.2} deg")]
    InconsistentHorizon { rms_deg: f64, limit_deg: f64 },

    #[error("Horizon point ({x:.1}, {y:.1}) could not be undistorted")]
    HorizonPoint { x: f64, y: f64 },
}

/// Per-point projection failures. Recoverable: the caller drops the point.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ProjectionError {
    #[error("Distortion polynomial denominator underflow at normalized ({x:.4}, {y:.4})")]
    DistortionDomain { x: f64, y: f64 },

    #[error("Camera ray does not intersect the ground plane")]
    NoGroundIntersection,

    #[error("Point lies behind the camera")]
    BehindCamera,
}
