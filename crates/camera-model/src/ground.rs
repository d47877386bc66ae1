//! Ground-plane positions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Vehicle-relative position on the ground plane (meters, x forward, y left)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundPosition {
    pub x: f64,
    pub y: f64,
}

impl GroundPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from the vehicle frame origin
    pub fn range(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance_to(&self, other: &GroundPosition) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Position displaced by `(vx, vy) * dt`
    pub fn advanced(&self, vx: f64, vy: f64, dt: f64) -> Self {
        Self::new(self.x + vx * dt, self.y + vy * dt)
    }
}

impl Add for GroundPosition {
    type Output = GroundPosition;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GroundPosition {
    type Output = GroundPosition;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<[f64; 2]> for GroundPosition {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl fmt::Display for GroundPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
