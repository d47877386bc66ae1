//! Camera configuration

use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Image dimensions in pixels, serialized as `[width, height]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Create image size in pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Image centre in pixel coordinates
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Check if a pixel lies inside the image
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width as f64 && p.y <= self.height as f64
    }
}

impl From<[u32; 2]> for ImageSize {
    fn from(v: [u32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<ImageSize> for [u32; 2] {
    fn from(s: ImageSize) -> Self {
        [s.width, s.height]
    }
}

/// Vehicle axis the camera looks along
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewDirection {
    #[default]
    #[serde(alias = "x", alias = "+x")]
    Forward,
    #[serde(alias = "-x", alias = "backward")]
    Back,
    #[serde(alias = "y", alias = "+y")]
    Left,
    #[serde(alias = "-y")]
    Right,
}

impl ViewDirection {
    /// Unit axis in the vehicle frame
    pub fn axis(&self) -> Vector3<f64> {
        match self {
            ViewDirection::Forward => Vector3::x(),
            ViewDirection::Back => -Vector3::x(),
            ViewDirection::Left => Vector3::y(),
            ViewDirection::Right => -Vector3::y(),
        }
    }
}

/// Static camera calibration, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Raw sensor image size
    pub image_size: ImageSize,

    /// Size of rectified frames; defaults to `image_size`
    #[serde(default)]
    pub rectified_size: Option<ImageSize>,

    /// Intrinsic matrix, row major
    #[serde(rename = "K", alias = "k")]
    pub k: [[f64; 3]; 3],

    /// Distortion coefficients `k1 k2 p1 p2 [k3 [k4 k5 k6]]`
    #[serde(rename = "D", alias = "d", default)]
    pub d: Vec<f64>,

    #[serde(default)]
    pub view_direction: ViewDirection,

    /// Camera position in the vehicle frame (meters), z is mount height
    pub location: [f64; 3],

    /// Image points measured on the true horizon
    #[serde(default)]
    pub horizon_points: Vec<[f64; 2]>,
}

impl CameraConfig {
    pub fn intrinsic_matrix(&self) -> Matrix3<f64> {
        let k = &self.k;
        Matrix3::new(
            k[0][0], k[0][1], k[0][2],
            k[1][0], k[1][1], k[1][2],
            k[2][0], k[2][1], k[2][2],
        )
    }

    pub fn rectified_size(&self) -> ImageSize {
        self.rectified_size.unwrap_or(self.image_size)
    }

    pub fn location(&self) -> Vector3<f64> {
        Vector3::from(self.location)
    }

    pub fn horizon_points(&self) -> Vec<Point2<f64>> {
        self.horizon_points
            .iter()
            .map(|p| Point2::new(p[0], p[1]))
            .collect()
    }
}

impl Default for CameraConfig {
    /// 1280x720 dashcam, 60 deg horizontal FOV, 1.5 m above the bumper
    fn default() -> Self {
        Self {
            image_size: ImageSize::new(1280, 720),
            rectified_size: None,
            k: [[1108.5, 0.0, 640.0], [0.0, 1108.5, 360.0], [0.0, 0.0, 1.0]],
            d: Vec::new(),
            view_direction: ViewDirection::Forward,
            location: [0.0, 0.0, 1.5],
            horizon_points: Vec::new(),
        }
    }
}
