//! FCW configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on `prediction_length / prediction_step`
const MAX_PREDICTION_STEPS: f64 = 10_000.0;

/// Configuration shape errors. Fatal at load time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Danger zone needs at least 3 vertices, got {0}")]
    DangerZoneVertices(usize),

    #[error("Danger zone vertex {index} is not finite")]
    NonFiniteVertex { index: usize },

    #[error("{field} must be > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("prediction_length {length} is shorter than prediction_step {step}")]
    PredictionWindow { length: f64, step: f64 },

    #[error("prediction_length / prediction_step gives {0:.0} steps, at most 10000 allowed")]
    PredictionSteps(f64),

    #[error("history_length must be >= 2, got {0}")]
    HistoryLength(usize),
}

/// Detector settings. The class list is applied by the detector itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Model path or name
    pub model: Option<String>,

    /// Class labels kept by the detector (empty = all)
    pub classes: Vec<String>,

    /// Minimum bounding box area in px^2 (0 disables)
    pub min_area: f64,

    /// Drop boxes not fully inside the image
    pub filter_in_frame: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: None,
            classes: Vec::new(),
            min_area: 0.0,
            filter_in_frame: true,
        }
    }
}

/// SORT tracker settings, consumed by the external tracker and the track gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub max_age: u32,
    pub min_hits: u32,
    pub iou_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 1,
            min_hits: 3,
            iou_threshold: 0.3,
        }
    }
}

/// Frame-level warning hysteresis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisConfig {
    /// Consecutive flagged frames needed to raise the warning
    pub on_frames: u32,
    /// Consecutive clear frames needed to release it
    pub off_frames: u32,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            on_frames: 2,
            off_frames: 5,
        }
    }
}

/// Collision-warning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Objects farther than this (m) are ignored
    pub safety_radius: f64,

    /// Danger zone polygon in vehicle coordinates (m)
    pub danger_zone: Vec<[f64; 2]>,

    pub vehicle_length: f64,
    pub vehicle_width: f64,

    /// Safety margin around the vehicle and the danger zone (m)
    pub vehicle_zone_buffer: f64,

    /// Prediction horizon (s)
    pub prediction_length: f64,

    /// Integration step (s)
    pub prediction_step: f64,

    /// Ground samples kept per track for velocity estimation
    pub history_length: usize,

    /// Time-to-intersection at or below which a warning is critical (s)
    pub critical_time: f64,

    /// Track boxes come from rectified frames
    pub rectified_input: bool,

    /// Evaluate tracks on the rayon pool
    pub parallel: bool,

    /// Smooth the frame-level flag (disabled when absent)
    pub hysteresis: Option<HysteresisConfig>,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            safety_radius: 25.0,
            danger_zone: vec![[3.0, 1.5], [10.0, 1.5], [10.0, -1.5], [3.0, -1.5]],
            vehicle_length: 4.0,
            vehicle_width: 1.8,
            vehicle_zone_buffer: 0.5,
            prediction_length: 1.0,
            prediction_step: 0.1,
            history_length: 5,
            critical_time: 0.5,
            rectified_input: false,
            parallel: false,
            hysteresis: None,
        }
    }
}

/// Complete algorithm configuration (`detector`, `tracker`, `fcw` sections)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FcwConfig {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub fcw: CollisionConfig,
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl CollisionConfig {
    /// Validate configuration shape
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.danger_zone.len() < 3 {
            return Err(ConfigError::DangerZoneVertices(self.danger_zone.len()));
        }
        if let Some(index) = self
            .danger_zone
            .iter()
            .position(|v| !v[0].is_finite() || !v[1].is_finite())
        {
            return Err(ConfigError::NonFiniteVertex { index });
        }

        require_positive("prediction_step", self.prediction_step)?;
        require_positive("prediction_length", self.prediction_length)?;
        if self.prediction_length < self.prediction_step {
            return Err(ConfigError::PredictionWindow {
                length: self.prediction_length,
                step: self.prediction_step,
            });
        }
        let steps = self.prediction_length / self.prediction_step;
        if steps > MAX_PREDICTION_STEPS {
            return Err(ConfigError::PredictionSteps(steps));
        }
        require_positive("vehicle_length", self.vehicle_length)?;
        require_positive("vehicle_width", self.vehicle_width)?;
        require_non_negative("vehicle_zone_buffer", self.vehicle_zone_buffer)?;
        require_non_negative("safety_radius", self.safety_radius)?;
        require_non_negative("critical_time", self.critical_time)?;
        if self.history_length < 2 {
            return Err(ConfigError::HistoryLength(self.history_length));
        }
        Ok(())
    }
}

impl FcwConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("min_area", self.detector.min_area)?;
        self.fcw.validate()
    }
}
