//! Risk Aggregator
//!
//! Folds per-track assessments into the frame-level warning. The frame flag
//! passes through a [`WarningFilter`]; the default filter emits the raw flag
//! unchanged so each frame stands on its own.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::config::HysteresisConfig;
use crate::evaluator::{RiskLevel, TrackAssessment};
use crate::projector::SkippedTrack;
use crate::types::{FrameMeta, TrackId};

/// Smoothing applied to the raw frame-level flag
pub trait WarningFilter: Send {
    /// Filtered flag for this frame
    fn apply(&mut self, raw: bool) -> bool;

    /// Forget all carried state
    fn reset(&mut self);
}

/// No smoothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl WarningFilter for Passthrough {
    fn apply(&mut self, raw: bool) -> bool {
        raw
    }

    fn reset(&mut self) {}
}

/// Raise after `on_frames` consecutive flagged frames, release after
/// `off_frames` consecutive clear frames
#[derive(Debug, Clone)]
pub struct Hysteresis {
    on_frames: u32,
    off_frames: u32,
    active: bool,
    streak: u32,
}

impl Hysteresis {
    /// Create hysteresis filter, initially inactive
    pub fn new(config: HysteresisConfig) -> Self {
        Self {
            on_frames: config.on_frames.max(1),
            off_frames: config.off_frames.max(1),
            active: false,
            streak: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl WarningFilter for Hysteresis {
    fn apply(&mut self, raw: bool) -> bool {
        if raw == self.active {
            self.streak = 0;
            return self.active;
        }

        self.streak += 1;
        let needed = if self.active { self.off_frames } else { self.on_frames };
        if self.streak >= needed {
            self.active = raw;
            self.streak = 0;
            info!("Frame warning {}", if raw { "raised" } else { "released" });
        }
        self.active
    }

    fn reset(&mut self) {
        self.active = false;
        self.streak = 0;
    }
}

/// Soonest intersecting track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgentTrack {
    pub id: TrackId,
    pub time_to_intersection: f64,
    pub dangerous_distance: f64,
}

/// Frame-level outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningResult {
    pub frame_index: u64,
    pub timestamp_ns: u64,

    /// Flag after filtering
    pub warning: bool,

    /// Flag computed from this frame alone
    pub raw_warning: bool,

    /// Highest per-track severity
    pub level: RiskLevel,
    pub most_urgent: Option<UrgentTrack>,

    /// Evaluated tracks in id order
    pub tracks: Vec<TrackAssessment>,
    pub skipped: Vec<SkippedTrack>,

    /// Tracks dropped by the safety radius
    pub culled: usize,
}

impl WarningResult {
    pub fn flagged(&self) -> impl Iterator<Item = &TrackAssessment> + '_ {
        self.tracks.iter().filter(|t| t.in_danger)
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackAssessment> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

/// Soonest intersection first, then nearer to the vehicle, then lower id
fn urgency(a: &TrackAssessment, b: &TrackAssessment) -> Ordering {
    let tti = |t: &TrackAssessment| t.time_to_intersection.unwrap_or(f64::INFINITY);
    tti(a)
        .total_cmp(&tti(b))
        .then(a.dangerous_distance.total_cmp(&b.dangerous_distance))
        .then(a.id.cmp(&b.id))
}

pub struct RiskAggregator {
    filter: Box<dyn WarningFilter>,
}

impl RiskAggregator {
    /// Create aggregator with the passthrough filter
    pub fn new() -> Self {
        Self::with_filter(Box::new(Passthrough))
    }

    /// Create aggregator with a custom warning filter
    pub fn with_filter(filter: Box<dyn WarningFilter>) -> Self {
        Self { filter }
    }

    /// Hysteresis when configured, passthrough otherwise
    pub fn from_config(hysteresis: Option<HysteresisConfig>) -> Self {
        match hysteresis {
            Some(config) => Self::with_filter(Box::new(Hysteresis::new(config))),
            None => Self::new(),
        }
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Combine one frame's track assessments into the frame-level result
    pub fn aggregate(
        &mut self,
        frame: &FrameMeta,
        mut tracks: Vec<TrackAssessment>,
        skipped: Vec<SkippedTrack>,
        culled: usize,
    ) -> WarningResult {
        tracks.sort_by_key(|t| t.id);

        let most_urgent = tracks
            .iter()
            .filter(|t| t.in_danger)
            .min_by(|a, b| urgency(a, b))
            .and_then(|t| {
                t.time_to_intersection.map(|tti| UrgentTrack {
                    id: t.id,
                    time_to_intersection: tti,
                    dangerous_distance: t.dangerous_distance,
                })
            });

        let raw_warning = most_urgent.is_some();
        let warning = self.filter.apply(raw_warning);
        let level = tracks.iter().map(|t| t.risk).max().unwrap_or(RiskLevel::Safe);

        if let Some(urgent) = &most_urgent {
            debug!(
                "Frame {}: track {} intersects in {:.2}s ({:.2}m)",
                frame.frame_index, urgent.id, urgent.time_to_intersection, urgent.dangerous_distance
            );
        }

        WarningResult {
            frame_index: frame.frame_index,
            timestamp_ns: frame.timestamp_ns,
            warning,
            raw_warning,
            level,
            most_urgent,
            tracks,
            skipped,
            culled,
        }
    }
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self::new()
    }
}
