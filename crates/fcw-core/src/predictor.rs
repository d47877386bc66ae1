//! Motion Predictor
//!
//! Keeps a bounded ground-position history per track and extrapolates each
//! track forward under constant velocity. History lives only as long as the
//! tracker keeps reporting the track.

use camera_model::GroundPosition;
use ring_buffer::{RingBuffer, Stamped};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

use crate::config::CollisionConfig;
use crate::types::TrackId;

/// Slack when rounding `length / step` to a sample count
const STEP_COUNT_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocitySource {
    /// Finite difference over the track history
    Estimated,
    /// Fewer than two usable samples
    Stationary,
}

/// Ground velocity (m/s)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
    pub source: VelocitySource,
}

impl Velocity {
    pub const STATIONARY: Velocity = Velocity {
        vx: 0.0,
        vy: 0.0,
        source: VelocitySource::Stationary,
    };

    pub fn estimated(vx: f64, vy: f64) -> Self {
        Self {
            vx,
            vy,
            source: VelocitySource::Estimated,
        }
    }
}

/// Prediction time grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSettings {
    pub step: f64,
    pub steps: usize,
}

impl PathSettings {
    /// Samples at `step` intervals up to `length` seconds
    pub fn new(step: f64, length: f64) -> Self {
        Self {
            step,
            steps: (length / step + STEP_COUNT_EPS).floor() as usize,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.prediction_step, config.prediction_length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSample {
    /// Offset from the current frame (s)
    pub t: f64,
    pub position: GroundPosition,
}

/// Predicted samples at `step, 2*step, .., steps*step`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictedPath {
    pub samples: Vec<PathSample>,
}

impl PredictedPath {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSample> + '_ {
        self.samples.iter()
    }

    pub fn last(&self) -> Option<&PathSample> {
        self.samples.last()
    }
}

/// Step-wise constant-velocity integration from `start`
pub fn predict(start: GroundPosition, velocity: &Velocity, settings: &PathSettings) -> PredictedPath {
    let mut position = start;
    let samples = (1..=settings.steps)
        .map(|k| {
            position = position.advanced(velocity.vx, velocity.vy, settings.step);
            PathSample {
                t: k as f64 * settings.step,
                position,
            }
        })
        .collect();
    PredictedPath { samples }
}

pub struct MotionPredictor {
    history_length: usize,
    histories: HashMap<TrackId, RingBuffer<Stamped<GroundPosition>>>,
}

impl MotionPredictor {
    /// Create predictor keeping at least two samples per track
    pub fn new(history_length: usize) -> Self {
        Self {
            history_length: history_length.max(2),
            histories: HashMap::new(),
        }
    }

    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Number of tracks with stored history
    pub fn tracked(&self) -> usize {
        self.histories.len()
    }

    pub fn has_history(&self, id: TrackId) -> bool {
        self.histories.get(&id).is_some_and(|h| !h.is_empty())
    }

    /// Drop the history of every track not in `present`. Returns the number evicted.
    pub fn retain_present(&mut self, present: &[TrackId]) -> usize {
        let before = self.histories.len();
        self.histories.retain(|id, _| present.contains(id));
        let evicted = before - self.histories.len();
        if evicted > 0 {
            trace!("Evicted history of {} expired tracks", evicted);
        }
        evicted
    }

    /// Replace a track's history with earlier samples, oldest first
    pub fn seed(&mut self, id: TrackId, samples: impl IntoIterator<Item = Stamped<GroundPosition>>) {
        let mut history = RingBuffer::new(self.history_length);
        for sample in samples {
            history.push(sample);
        }
        self.histories.insert(id, history);
    }

    /// Append the current ground position
    pub fn observe(&mut self, id: TrackId, frame_index: u64, position: GroundPosition) {
        let history_length = self.history_length;
        let history = self
            .histories
            .entry(id)
            .or_insert_with(|| RingBuffer::new(history_length));

        // A frame index that does not advance invalidates the stored timeline
        if history.newest().is_some_and(|s| s.frame_index >= frame_index) {
            history.clear();
        }
        history.push(Stamped::new(frame_index, position));
    }

    /// Velocity from the oldest and newest samples, `frame_interval` in seconds
    pub fn velocity(&self, id: TrackId, frame_interval: f64) -> Velocity {
        let Some(history) = self.histories.get(&id) else {
            return Velocity::STATIONARY;
        };
        let (Some(oldest), Some(newest)) = (history.oldest(), history.newest()) else {
            return Velocity::STATIONARY;
        };
        if history.len() < 2 || newest.frame_index <= oldest.frame_index {
            return Velocity::STATIONARY;
        }

        let dt = (newest.frame_index - oldest.frame_index) as f64 * frame_interval;
        let delta = newest.value - oldest.value;
        Velocity::estimated(delta.x / dt, delta.y / dt)
    }
}
