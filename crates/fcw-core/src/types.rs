//! Track and frame data supplied by the detector/tracker

use camera_model::ImageSize;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persistent track identity assigned by the tracker
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Axis-aligned box in pixels, serialized as `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Ground contact point: middle of the bottom edge
    pub fn bottom_center(&self) -> Point2<f64> {
        Point2::new((self.x1 + self.x2) / 2.0, self.y2)
    }

    /// Whether the whole box lies inside an image of `size`
    pub fn inside(&self, size: ImageSize) -> bool {
        size.contains(&Point2::new(self.x1, self.y1)) && size.contains(&Point2::new(self.x2, self.y2))
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Track reported by the external tracker for the current frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: TrackId,

    /// Class label from the detector
    #[serde(default, alias = "label")]
    pub class: String,

    /// Current box estimate
    pub bbox: BoundingBox,

    /// Frames since the track was created
    #[serde(default)]
    pub age: u32,

    /// Total matched detections
    #[serde(default)]
    pub hits: u32,

    /// Consecutive matched frames
    #[serde(default)]
    pub hit_streak: u32,

    /// Frames since the last matched detection
    #[serde(default)]
    pub time_since_update: u32,

    /// Previous boxes, oldest first, one per preceding frame
    #[serde(default)]
    pub history: Vec<BoundingBox>,
}

impl TrackedObject {
    pub fn new(id: u64, class: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            id: TrackId(id),
            class: class.into(),
            bbox,
            age: 0,
            hits: 0,
            hit_streak: 0,
            time_since_update: 0,
            history: Vec::new(),
        }
    }

    /// Confirmed by the tracker and updated in this frame
    pub fn is_confirmed(&self, min_hits: u32) -> bool {
        self.hit_streak > min_hits && self.time_since_update < 1
    }
}

/// Per-frame metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    pub frame_index: u64,
    pub timestamp_ns: u64,
    pub fps: f64,
}

impl FrameMeta {
    pub fn new(frame_index: u64, timestamp_ns: u64, fps: f64) -> Self {
        Self {
            frame_index,
            timestamp_ns,
            fps,
        }
    }

    /// Inter-frame interval (s)
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_geometry() {
        let b = BoundingBox::new(100.0, 200.0, 140.0, 260.0);
        assert_eq!(b.area(), 2400.0);
        assert_eq!(b.bottom_center(), Point2::new(120.0, 260.0));
        assert!(b.inside(ImageSize::new(640, 480)));
        assert!(!BoundingBox::new(-5.0, 10.0, 20.0, 30.0).inside(ImageSize::new(640, 480)));
    }

    #[test]
    fn test_tracked_object_from_json() {
        let json = r#"{"id": 7, "label": "car", "bbox": [10, 20, 50, 80], "hit_streak": 4}"#;
        let t: TrackedObject = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, TrackId(7));
        assert_eq!(t.class, "car");
        assert!(t.is_confirmed(3));
        assert!(t.history.is_empty());
    }
}
