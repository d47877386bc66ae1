//! Calibrated camera: intrinsics, mount pose and ground-plane projection

use nalgebra::{Matrix3, Point2, Unit, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{CameraConfig, ImageSize, ViewDirection};
use crate::distortion::Distortion;
use crate::ground::GroundPosition;
use crate::pose::{estimate_pose, CameraPose, HorizonObservation};
use crate::{CalibrationError, ProjectionError};

/// |det K| below this is treated as singular
const SINGULAR_EPS: f64 = 1e-12;

/// Rays must descend at least this much (vehicle z per unit length) to hit the ground
const GROUND_RAY_EPS: f64 = 1e-9;

/// Minimum depth in front of the camera for projection
const DEPTH_EPS: f64 = 1e-9;

/// Which image a pixel coordinate refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSpace {
    /// Raw sensor image: distortion applies
    #[default]
    Raw,
    /// Rectified image at `rectified_size`: ideal pinhole
    Rectified,
}

/// Pinhole intrinsics with lens distortion
#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsics {
    k: Matrix3<f64>,
    k_inv: Matrix3<f64>,
    distortion: Distortion,
    size: ImageSize,
}

impl Intrinsics {
    pub fn new(k: Matrix3<f64>, distortion: Distortion, size: ImageSize) -> Result<Self, CalibrationError> {
        if size.width == 0 || size.height == 0 {
            return Err(CalibrationError::ImageSize {
                width: size.width,
                height: size.height,
            });
        }
        let det = k.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPS {
            return Err(CalibrationError::SingularIntrinsics);
        }
        let k_inv = k.try_inverse().ok_or(CalibrationError::SingularIntrinsics)?;
        Ok(Self {
            k,
            k_inv,
            distortion,
            size,
        })
    }

    /// Distortion-free intrinsics for a rectified image of `size`
    pub fn rectified(&self, size: ImageSize) -> Result<Self, CalibrationError> {
        let sx = size.width as f64 / self.size.width as f64;
        let sy = size.height as f64 / self.size.height as f64;
        let scale = Matrix3::from_diagonal(&Vector3::new(sx, sy, 1.0));
        Self::new(scale * self.k, Distortion::default(), size)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.k
    }

    pub fn distortion(&self) -> &Distortion {
        &self.distortion
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Pixel -> undistorted normalized coordinates (z = 1 plane)
    pub fn normalize(&self, pixel: &Point2<f64>) -> Result<Vector2<f64>, ProjectionError> {
        let h = self.k_inv * Vector3::new(pixel.x, pixel.y, 1.0);
        self.distortion.undistort(&Vector2::new(h.x / h.z, h.y / h.z))
    }

    /// Remove lens distortion, returning the ideal pinhole pixel
    pub fn undistort(&self, pixel: &Point2<f64>) -> Result<Point2<f64>, ProjectionError> {
        let n = self.normalize(pixel)?;
        Ok(self.to_pixel(&n))
    }

    /// Unit viewing ray through `pixel` in the camera frame
    pub fn pixel_ray(&self, pixel: &Point2<f64>) -> Result<Unit<Vector3<f64>>, ProjectionError> {
        let n = self.normalize(pixel)?;
        Ok(Unit::new_normalize(Vector3::new(n.x, n.y, 1.0)))
    }

    /// Camera-frame direction -> distorted pixel
    pub fn project(&self, direction: &Vector3<f64>) -> Result<Point2<f64>, ProjectionError> {
        if direction.z <= DEPTH_EPS {
            return Err(ProjectionError::BehindCamera);
        }
        let n = Vector2::new(direction.x / direction.z, direction.y / direction.z);
        let distorted = self.distortion.distort(&n)?;
        Ok(self.to_pixel(&distorted))
    }

    /// Camera-frame direction -> pixel, ignoring distortion
    pub fn project_pinhole(&self, direction: &Vector3<f64>) -> Point2<f64> {
        let h = self.k * direction;
        Point2::new(h.x / h.z, h.y / h.z)
    }

    fn to_pixel(&self, n: &Vector2<f64>) -> Point2<f64> {
        self.project_pinhole(&Vector3::new(n.x, n.y, 1.0))
    }

    /// Horizon as a pixel-space line `l . (u, v, 1) = 0`
    fn horizon_coefficients(&self, up: &Vector3<f64>) -> Vector3<f64> {
        self.k_inv.transpose() * up
    }
}

/// Calibrated camera, immutable after construction
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    raw: Intrinsics,
    rectified: Intrinsics,
    view_direction: ViewDirection,
    location: Vector3<f64>,
    pose: CameraPose,
}

impl CameraModel {
    /// Validate the configuration and run the one-off pose calibration
    pub fn from_config(config: &CameraConfig) -> Result<Self, CalibrationError> {
        let distortion = Distortion::from_coefficients(&config.d)?;
        let raw = Intrinsics::new(config.intrinsic_matrix(), distortion, config.image_size)?;
        let rectified = raw.rectified(config.rectified_size())?;

        let location = config.location();
        if !(location.z > 0.0) {
            return Err(CalibrationError::MountHeight(location.z));
        }

        let observation = HorizonObservation::from_points(&config.horizon_points());
        let pose = estimate_pose(&raw, config.view_direction, &observation)?;

        info!(
            "Camera calibrated: {}x{} (rectified {}x{}), view {:?}, mounted at ({:.2}, {:.2}, {:.2}) m",
            raw.size.width,
            raw.size.height,
            rectified.size.width,
            rectified.size.height,
            config.view_direction,
            location.x,
            location.y,
            location.z,
        );

        Ok(Self {
            raw,
            rectified,
            view_direction: config.view_direction,
            location,
            pose,
        })
    }

    pub fn intrinsics(&self, space: ImageSpace) -> &Intrinsics {
        match space {
            ImageSpace::Raw => &self.raw,
            ImageSpace::Rectified => &self.rectified,
        }
    }

    pub fn image_size(&self, space: ImageSpace) -> ImageSize {
        self.intrinsics(space).size
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn location(&self) -> Vector3<f64> {
        self.location
    }

    pub fn view_direction(&self) -> ViewDirection {
        self.view_direction
    }

    /// Remove lens distortion from a raw image pixel
    pub fn undistort(&self, pixel: &Point2<f64>) -> Result<Point2<f64>, ProjectionError> {
        self.raw.undistort(pixel)
    }

    /// Intersect the viewing ray through `pixel` with the ground plane
    pub fn image_to_ground(&self, pixel: &Point2<f64>, space: ImageSpace) -> Result<GroundPosition, ProjectionError> {
        let ray = self.intrinsics(space).pixel_ray(pixel)?;
        let dir = self.pose.rotation * ray.into_inner();
        if dir.z > -GROUND_RAY_EPS {
            return Err(ProjectionError::NoGroundIntersection);
        }
        let s = -self.location.z / dir.z;
        let hit = self.location + dir * s;
        Ok(GroundPosition::new(hit.x, hit.y))
    }

    /// Project a ground position into the image
    pub fn ground_to_image(&self, ground: &GroundPosition, space: ImageSpace) -> Result<Point2<f64>, ProjectionError> {
        let offset = Vector3::new(ground.x, ground.y, 0.0) - self.location;
        let in_camera = self.pose.rotation.inverse() * offset;
        self.intrinsics(space).project(&in_camera)
    }

    /// End points of the horizon across the image width (pinhole approximation)
    pub fn horizon_line(&self, space: ImageSpace) -> Option<(Point2<f64>, Point2<f64>)> {
        let intrinsics = self.intrinsics(space);
        let l = intrinsics.horizon_coefficients(&self.pose.up_in_camera());
        if l.y.abs() < 1e-12 {
            return None;
        }
        let v = |u: f64| -(l.x * u + l.z) / l.y;
        let width = intrinsics.size.width as f64;
        Some((Point2::new(0.0, v(0.0)), Point2::new(width, v(width))))
    }
}
