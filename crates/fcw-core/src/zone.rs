//! Danger-zone polygon and vehicle footprint geometry
//!
//! Polygons are closed; points on an edge count as inside.

use camera_model::GroundPosition;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Distance (m) under which a point is considered on an edge
const ON_EDGE_EPS: f64 = 1e-9;

/// Closed polygon in vehicle coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DangerZone {
    vertices: Vec<GroundPosition>,
}

impl DangerZone {
    /// Create danger zone from vehicle-frame vertices
    pub fn new(vertices: Vec<GroundPosition>) -> Result<Self, ConfigError> {
        if vertices.len() < 3 {
            return Err(ConfigError::DangerZoneVertices(vertices.len()));
        }
        if let Some(index) = vertices.iter().position(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return Err(ConfigError::NonFiniteVertex { index });
        }
        Ok(Self { vertices })
    }

    pub fn from_points(points: &[[f64; 2]]) -> Result<Self, ConfigError> {
        Self::new(points.iter().map(|&p| GroundPosition::from(p)).collect())
    }

    /// Polygon vertices in configuration order
    pub fn vertices(&self) -> &[GroundPosition] {
        &self.vertices
    }

    fn edges(&self) -> impl Iterator<Item = (&GroundPosition, &GroundPosition)> + '_ {
        self.vertices
            .iter()
            .zip(self.vertices.iter().cycle().skip(1))
    }

    /// Point-in-polygon (crossing number), edge inclusive
    pub fn contains(&self, p: &GroundPosition) -> bool {
        if self.boundary_distance(p) <= ON_EDGE_EPS {
            return true;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance to the nearest edge
    pub fn boundary_distance(&self, p: &GroundPosition) -> f64 {
        self.edges()
            .map(|(a, b)| segment_distance(p, a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Distance to the polygon, 0 inside
    pub fn distance(&self, p: &GroundPosition) -> f64 {
        if self.contains(p) {
            0.0
        } else {
            self.boundary_distance(p)
        }
    }

    /// Membership in the polygon dilated by `margin`
    pub fn contains_buffered(&self, p: &GroundPosition, margin: f64) -> bool {
        self.distance(p) <= margin + ON_EDGE_EPS
    }
}

fn segment_distance(p: &GroundPosition, a: &GroundPosition, b: &GroundPosition) -> f64 {
    let ab = *b - *a;
    let ap = *p - *a;
    let len2 = ab.x * ab.x + ab.y * ab.y;
    if len2 == 0.0 {
        return p.distance_to(a);
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / len2).clamp(0.0, 1.0);
    p.distance_to(&a.advanced(ab.x, ab.y, t))
}

/// Ego-vehicle rectangle behind the front bumper, dilated by a safety buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleFootprint {
    pub length: f64,
    pub width: f64,
    pub buffer: f64,
    outline: DangerZone,
}

impl VehicleFootprint {
    /// Create footprint from vehicle dimensions and safety buffer
    pub fn new(length: f64, width: f64, buffer: f64) -> Result<Self, ConfigError> {
        let half = width / 2.0;
        let outline = DangerZone::new(vec![
            GroundPosition::new(0.0, half),
            GroundPosition::new(0.0, -half),
            GroundPosition::new(-length, -half),
            GroundPosition::new(-length, half),
        ])?;
        Ok(Self {
            length,
            width,
            buffer,
            outline,
        })
    }

    /// Undilated rectangle
    pub fn outline(&self) -> &DangerZone {
        &self.outline
    }

    pub fn contains(&self, p: &GroundPosition) -> bool {
        self.outline.contains_buffered(p, self.buffer)
    }

    /// Distance to the buffered footprint, 0 inside
    pub fn distance(&self, p: &GroundPosition) -> f64 {
        (self.outline.distance(p) - self.buffer).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rectangle() -> DangerZone {
        DangerZone::from_points(&[[3.0, 1.5], [10.0, 1.5], [10.0, -1.5], [3.0, -1.5]]).unwrap()
    }

    #[test]
    fn test_interior_and_exterior() {
        let zone = rectangle();
        assert!(zone.contains(&GroundPosition::new(5.0, 0.0)));
        assert!(!zone.contains(&GroundPosition::new(11.0, 0.0)));
        assert!(!zone.contains(&GroundPosition::new(5.0, 2.0)));
        assert!(!zone.contains(&GroundPosition::new(0.0, 0.0)));
    }

    #[test]
    fn test_edges_and_vertices_are_inside() {
        let zone = rectangle();
        assert!(zone.contains(&GroundPosition::new(10.0, 0.0)));
        assert!(zone.contains(&GroundPosition::new(6.0, 1.5)));
        assert!(zone.contains(&GroundPosition::new(3.0, -1.5)));
        assert!(zone.contains(&GroundPosition::new(10.0, 1.5)));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening towards +x
        let zone = DangerZone::from_points(&[
            [0.0, 0.0],
            [4.0, 0.0],
            [4.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [4.0, 2.0],
            [4.0, 3.0],
            [0.0, 3.0],
        ])
        .unwrap();
        assert!(zone.contains(&GroundPosition::new(0.5, 1.5)));
        assert!(!zone.contains(&GroundPosition::new(2.5, 1.5)));
        assert!(zone.contains(&GroundPosition::new(2.5, 0.5)));
    }

    #[test]
    fn test_distance_and_buffer() {
        let zone = rectangle();
        assert_eq!(zone.distance(&GroundPosition::new(5.0, 0.0)), 0.0);
        assert!((zone.distance(&GroundPosition::new(10.5, 0.0)) - 0.5).abs() < 1e-12);
        assert!((zone.distance(&GroundPosition::new(13.0, 5.5)) - 5.0).abs() < 1e-12);
        assert!(zone.contains_buffered(&GroundPosition::new(10.5, 0.0), 0.5));
        assert!(!zone.contains_buffered(&GroundPosition::new(10.6, 0.0), 0.5));
        assert!(zone.contains_buffered(&GroundPosition::new(6.0, 2.0), 0.5));
    }

    #[test]
    fn test_vehicle_footprint() {
        let footprint = VehicleFootprint::new(4.6, 1.8, 0.5).unwrap();
        assert!(footprint.contains(&GroundPosition::new(-2.0, 0.0)));
        assert!(footprint.contains(&GroundPosition::new(0.4, 0.0)));
        assert!(!footprint.contains(&GroundPosition::new(0.6, 0.0)));
        assert!((footprint.distance(&GroundPosition::new(8.0, 0.0)) - 7.5).abs() < 1e-12);
        assert_eq!(footprint.distance(&GroundPosition::new(-1.0, 0.5)), 0.0);
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        assert_eq!(
            DangerZone::from_points(&[[0.0, 0.0], [1.0, 0.0]]).unwrap_err(),
            ConfigError::DangerZoneVertices(2)
        );
    }

    proptest! {
        #[test]
        fn axis_aligned_membership(x in -5.0f64..15.0, y in -4.0f64..4.0) {
            let zone = rectangle();
            let expected = (3.0..=10.0).contains(&x) && (-1.5..=1.5).contains(&y);
            prop_assert_eq!(zone.contains(&GroundPosition::new(x, y)), expected);
        }

        #[test]
        fn buffered_zone_contains_zone(x in -5.0f64..15.0, y in -4.0f64..4.0, margin in 0.0f64..2.0) {
            let zone = rectangle();
            let p = GroundPosition::new(x, y);
            if zone.contains(&p) {
                prop_assert!(zone.contains_buffered(&p, margin));
            }
        }
    }
}
