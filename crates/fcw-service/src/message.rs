//! Wire shapes of incoming frames and published results

use fcw_core::{BoundingBox, RiskLevel, SkippedTrack, TrackId, TrackedObject, UrgentTrack};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line of the input stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMessage {
    /// Capture timestamp (ns)
    #[serde(default)]
    pub timestamp: u64,

    /// Source frame index; frames are counted by the worker when absent
    #[serde(default)]
    pub frame_index: Option<u64>,

    /// Tracker output for this frame
    #[serde(default)]
    pub tracks: Vec<TrackedObject>,
}

/// Frame accepted by the reader
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub message: FrameMessage,
    pub recv_timestamp: u64,
}

/// Per-track entry of the published result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class: String,

    /// Distance to the buffered vehicle footprint for tracks in danger, 0 otherwise
    pub dangerous_distance: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_intersection: Option<f64>,

    #[serde(default = "safe")]
    pub risk: RiskLevel,
}

fn safe() -> RiskLevel {
    RiskLevel::Safe
}

/// Published per-frame result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    pub frame_index: u64,
    pub timestamp: u64,
    pub recv_timestamp: u64,
    pub timestamp_before_process: u64,
    pub timestamp_after_process: u64,
    pub send_timestamp: u64,
    pub warning: bool,
    pub most_urgent: Option<UrgentTrack>,
    pub detections: BTreeMap<TrackId, Detection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedTrack>,
}
