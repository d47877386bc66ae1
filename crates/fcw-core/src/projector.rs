//! Ground Projector
//!
//! Maps each track's bottom-centre pixel onto the vehicle ground plane.
//! Tracks that are filtered out or cannot be projected are reported as
//! skipped and never reach the evaluator.

use camera_model::{CameraModel, GroundPosition, ImageSpace, ProjectionError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FcwConfig;
use crate::types::{BoundingBox, TrackId, TrackedObject};

/// Why a track was excluded from the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BelowMinArea,
    OutsideFrame,
    NoGroundIntersection,
    Undistortion,
}

impl From<ProjectionError> for SkipReason {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::DistortionDomain { .. } => SkipReason::Undistortion,
            ProjectionError::NoGroundIntersection | ProjectionError::BehindCamera => {
                SkipReason::NoGroundIntersection
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkippedTrack {
    pub id: TrackId,
    pub reason: SkipReason,
}

/// Track with its current ground position
#[derive(Debug, Clone, Copy)]
pub struct Projected<'a> {
    pub track: &'a TrackedObject,
    pub position: GroundPosition,
}

/// Per-frame projector output, both lists in ascending id order
#[derive(Debug, Default)]
pub struct Projection<'a> {
    pub observations: Vec<Projected<'a>>,
    pub skipped: Vec<SkippedTrack>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundProjector {
    min_area: f64,
    filter_in_frame: bool,
    space: ImageSpace,
}

impl GroundProjector {
    pub fn new(config: &FcwConfig) -> Self {
        Self {
            min_area: config.detector.min_area,
            filter_in_frame: config.detector.filter_in_frame,
            space: if config.fcw.rectified_input {
                ImageSpace::Rectified
            } else {
                ImageSpace::Raw
            },
        }
    }

    /// Project a single box, applying the area and frame filters
    pub fn locate(&self, bbox: &BoundingBox, camera: &CameraModel) -> Result<GroundPosition, SkipReason> {
        if self.min_area > 0.0 && bbox.area() < self.min_area {
            return Err(SkipReason::BelowMinArea);
        }
        if self.filter_in_frame && !bbox.inside(camera.image_size(self.space)) {
            return Err(SkipReason::OutsideFrame);
        }
        camera
            .image_to_ground(&bbox.bottom_center(), self.space)
            .map_err(SkipReason::from)
    }

    /// Project a box without the area and frame filters (history seeding)
    pub fn locate_unfiltered(&self, bbox: &BoundingBox, camera: &CameraModel) -> Option<GroundPosition> {
        camera.image_to_ground(&bbox.bottom_center(), self.space).ok()
    }

    pub fn project<'a>(&self, tracks: &'a [TrackedObject], camera: &CameraModel) -> Projection<'a> {
        let mut projection = Projection::default();

        for track in tracks {
            match self.locate(&track.bbox, camera) {
                Ok(position) => projection.observations.push(Projected { track, position }),
                Err(reason) => {
                    debug!("Skipping track {}: {:?}", track.id, reason);
                    projection.skipped.push(SkippedTrack { id: track.id, reason });
                }
            }
        }

        projection.observations.sort_by_key(|p| p.track.id);
        projection.skipped.sort_by_key(|s| s.id);
        projection
    }
}
