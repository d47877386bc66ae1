//! Danger-Zone Evaluator
//!
//! Stateless per-track intersection test of a predicted path against the
//! buffered danger zone and the buffered vehicle footprint.

use camera_model::GroundPosition;
use serde::{Deserialize, Serialize};

use crate::config::{CollisionConfig, ConfigError};
use crate::predictor::{PathSample, PredictedPath, Velocity};
use crate::types::{TrackId, TrackedObject};
use crate::zone::{DangerZone, VehicleFootprint};

/// Graded per-track severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Warning,
    Critical,
}

/// Evaluation of a single track in the current frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackAssessment {
    pub id: TrackId,
    pub class: String,
    pub position: GroundPosition,
    pub velocity: Velocity,
    pub in_danger: bool,

    /// Offset (s) of the first predicted sample inside the buffered zone
    pub time_to_intersection: Option<f64>,
    pub intrusion_point: Option<GroundPosition>,

    /// Distance (m) to the buffered vehicle footprint, 0 when not in danger
    pub dangerous_distance: f64,
    pub risk: RiskLevel,
    pub predicted_path: PredictedPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DangerZoneEvaluator {
    zone: DangerZone,
    footprint: VehicleFootprint,
    margin: f64,
    safety_radius: f64,
    critical_time: f64,
}

impl DangerZoneEvaluator {
    pub fn new(config: &CollisionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            zone: DangerZone::from_points(&config.danger_zone)?,
            footprint: VehicleFootprint::new(
                config.vehicle_length,
                config.vehicle_width,
                config.vehicle_zone_buffer,
            )?,
            margin: config.vehicle_zone_buffer,
            safety_radius: config.safety_radius,
            critical_time: config.critical_time,
        })
    }

    pub fn zone(&self) -> &DangerZone {
        &self.zone
    }

    pub fn footprint(&self) -> &VehicleFootprint {
        &self.footprint
    }

    pub fn safety_radius(&self) -> f64 {
        self.safety_radius
    }

    /// Objects beyond the safety radius are culled before prediction
    pub fn within_radius(&self, position: &GroundPosition) -> bool {
        position.range() <= self.safety_radius
    }

    /// Inside the buffered danger zone or the buffered vehicle footprint
    pub fn intrudes(&self, position: &GroundPosition) -> bool {
        self.zone.contains_buffered(position, self.margin) || self.footprint.contains(position)
    }

    pub fn first_intrusion<'p>(&self, path: &'p PredictedPath) -> Option<&'p PathSample> {
        path.iter().find(|sample| self.intrudes(&sample.position))
    }

    pub fn risk_level(&self, time_to_intersection: Option<f64>) -> RiskLevel {
        match time_to_intersection {
            None => RiskLevel::Safe,
            Some(t) if t <= self.critical_time => RiskLevel::Critical,
            Some(_) => RiskLevel::Warning,
        }
    }

    pub fn evaluate(
        &self,
        track: &TrackedObject,
        position: GroundPosition,
        velocity: Velocity,
        path: PredictedPath,
    ) -> TrackAssessment {
        let intrusion = self.first_intrusion(&path).copied();
        let time_to_intersection = intrusion.map(|s| s.t);
        let in_danger = intrusion.is_some();

        TrackAssessment {
            id: track.id,
            class: track.class.clone(),
            position,
            velocity,
            in_danger,
            time_to_intersection,
            intrusion_point: intrusion.map(|s| s.position),
            dangerous_distance: if in_danger {
                self.footprint.distance(&position)
            } else {
                0.0
            },
            risk: self.risk_level(time_to_intersection),
            predicted_path: path,
        }
    }
}
