//! Camera mount pose from horizon observations
//!
//! The horizon is the image of all ground-parallel directions. Each
//! observation mode has its own estimator:
//! - [`HorizonObservation::NoHorizon`]: the view axis projects to the image
//!   centre, camera x axis is level (zero roll)
//! - [`HorizonObservation::SingleHorizonPoint`]: the point is the vanishing
//!   point of the view axis (heading + pitch), zero roll
//! - [`HorizonObservation::MultiHorizonPoints`]: least-squares fit of the
//!   ground normal to all horizon rays (pitch + roll), heading from the mean
//!   horizon bearing
//!
//! The resulting rotation maps camera-frame vectors into the vehicle frame.
//! Reported angles are deviations from the nominal mount for the configured
//! [`ViewDirection`]: roll about vehicle x, pitch about vehicle y (positive
//! tilts the optical axis down), yaw about vehicle z.

use nalgebra::{Matrix3, Point2, Rotation3, SymmetricEigen, Unit, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::camera::Intrinsics;
use crate::config::ViewDirection;
use crate::CalibrationError;

/// Largest accepted RMS angular distance of horizon rays from the fitted horizon
pub const MAX_HORIZON_RESIDUAL_DEG: f64 = 2.0;

/// Relative eigenvalue below which the horizon scatter is considered rank-deficient
const DEGENERATE_EIGEN_RATIO: f64 = 1e-10;

/// Horizon calibration mode, derived from the number of horizon points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizonMode {
    NoHorizon,
    SingleHorizonPoint,
    MultiHorizonPoints,
}

/// Horizon measurements in raw image pixels
#[derive(Debug, Clone, PartialEq)]
pub enum HorizonObservation {
    NoHorizon,
    SingleHorizonPoint(Point2<f64>),
    MultiHorizonPoints(Vec<Point2<f64>>),
}

impl HorizonObservation {
    pub fn from_points(points: &[Point2<f64>]) -> Self {
        match points {
            [] => HorizonObservation::NoHorizon,
            [p] => HorizonObservation::SingleHorizonPoint(*p),
            _ => HorizonObservation::MultiHorizonPoints(points.to_vec()),
        }
    }

    pub fn mode(&self) -> HorizonMode {
        match self {
            HorizonObservation::NoHorizon => HorizonMode::NoHorizon,
            HorizonObservation::SingleHorizonPoint(_) => HorizonMode::SingleHorizonPoint,
            HorizonObservation::MultiHorizonPoints(_) => HorizonMode::MultiHorizonPoints,
        }
    }
}

/// Estimated extrinsic rotation of the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub mode: HorizonMode,
    /// Camera frame -> vehicle frame
    pub rotation: Rotation3<f64>,
    /// Radians
    pub roll: f64,
    /// Radians, positive tilts the optical axis towards the ground
    pub pitch: f64,
    /// Radians
    pub yaw: f64,
    /// Raw-image pixel where the view axis vanishes
    pub vanishing_point: Point2<f64>,
    /// RMS angular residual of the horizon fit (radians), 0 for fewer than 3 points
    pub residual_rms: f64,
}

impl CameraPose {
    /// Ground normal (vehicle up) expressed in the camera frame
    pub fn up_in_camera(&self) -> Vector3<f64> {
        self.rotation.inverse() * Vector3::z()
    }
}

/// Estimate the camera rotation from horizon observations
pub fn estimate_pose(
    intrinsics: &Intrinsics,
    view: ViewDirection,
    observation: &HorizonObservation,
) -> Result<CameraPose, CalibrationError> {
    let pose = match observation {
        HorizonObservation::NoHorizon => centered_pose(intrinsics, view)?,
        HorizonObservation::SingleHorizonPoint(p) => single_point_pose(intrinsics, view, p)?,
        HorizonObservation::MultiHorizonPoints(points) => horizon_fit_pose(intrinsics, view, points)?,
    };

    info!(
        "Camera pose ({:?}): roll {:.2} deg, pitch {:.2} deg, yaw {:.2} deg, vanishing point ({:.1}, {:.1})",
        pose.mode,
        pose.roll.to_degrees(),
        pose.pitch.to_degrees(),
        pose.yaw.to_degrees(),
        pose.vanishing_point.x,
        pose.vanishing_point.y,
    );
    Ok(pose)
}

fn centered_pose(intrinsics: &Intrinsics, view: ViewDirection) -> Result<CameraPose, CalibrationError> {
    let center = intrinsics.size().center();
    let forward = horizon_ray(intrinsics, &center)?;
    let up = level_up(&forward);
    Ok(pose_from_axes(intrinsics, view, HorizonMode::NoHorizon, forward, up, 0.0))
}

fn single_point_pose(
    intrinsics: &Intrinsics,
    view: ViewDirection,
    point: &Point2<f64>,
) -> Result<CameraPose, CalibrationError> {
    let forward = horizon_ray(intrinsics, point)?;
    let up = level_up(&forward);
    Ok(pose_from_axes(intrinsics, view, HorizonMode::SingleHorizonPoint, forward, up, 0.0))
}

fn horizon_fit_pose(
    intrinsics: &Intrinsics,
    view: ViewDirection,
    points: &[Point2<f64>],
) -> Result<CameraPose, CalibrationError> {
    let rays: Vec<Vector3<f64>> = points
        .iter()
        .map(|p| horizon_ray(intrinsics, p).map(Unit::into_inner))
        .collect::<Result<_, _>>()?;

    // Ground normal minimizes sum (n . r_i)^2 over unit rays: the eigenvector
    // of the ray scatter matrix with the smallest eigenvalue.
    let scatter = rays
        .iter()
        .fold(Matrix3::<f64>::zeros(), |acc, r| acc + r * r.transpose());
    let eigen = SymmetricEigen::new(scatter);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let largest = eigen.eigenvalues[order[2]];
    if eigen.eigenvalues[order[1]] <= DEGENERATE_EIGEN_RATIO * largest {
        return Err(CalibrationError::DegenerateHorizon("all horizon points project to one ray"));
    }

    let mut normal: Vector3<f64> = eigen.eigenvectors.column(order[0]).into_owned();
    // Camera y points down, so the ground normal has a negative y component
    if normal.dot(&-Vector3::y()) < 0.0 {
        normal = -normal;
    }
    let up = Unit::new_normalize(normal);

    let sum_sq: f64 = rays
        .iter()
        .map(|r| up.dot(r).clamp(-1.0, 1.0).asin().powi(2))
        .sum();
    let residual_rms = (sum_sq / rays.len() as f64).sqrt();
    let limit = MAX_HORIZON_RESIDUAL_DEG.to_radians();
    if residual_rms > limit {
        return Err(CalibrationError::InconsistentHorizon {
            rms_deg: residual_rms.to_degrees(),
            limit_deg: MAX_HORIZON_RESIDUAL_DEG,
        });
    }
    debug!(
        "Horizon fit over {} points, RMS residual {:.4} deg",
        rays.len(),
        residual_rms.to_degrees()
    );

    let centroid = rays.iter().fold(Vector3::<f64>::zeros(), |acc, r| acc + r) / rays.len() as f64;
    let in_plane = centroid - up.into_inner() * up.dot(&centroid);
    if in_plane.norm() < 1e-9 {
        return Err(CalibrationError::DegenerateHorizon("horizon bearing is undefined"));
    }
    let forward = Unit::new_normalize(in_plane);

    Ok(pose_from_axes(
        intrinsics,
        view,
        HorizonMode::MultiHorizonPoints,
        forward,
        up,
        residual_rms,
    ))
}

fn horizon_ray(intrinsics: &Intrinsics, p: &Point2<f64>) -> Result<Unit<Vector3<f64>>, CalibrationError> {
    intrinsics
        .pixel_ray(p)
        .map_err(|_| CalibrationError::HorizonPoint { x: p.x, y: p.y })
}

/// Ground normal perpendicular to `forward` that keeps the camera x axis level
fn level_up(forward: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    Unit::new_normalize(Vector3::x().cross(&forward.into_inner()))
}

/// Rotation taking camera axes `forward`/`up` onto the vehicle view axis and z
fn axes_rotation(view: ViewDirection, forward: &Vector3<f64>, up: &Vector3<f64>) -> Rotation3<f64> {
    let camera = Matrix3::from_columns(&[*forward, *up, up.cross(forward)]);
    let axis = view.axis();
    let z = Vector3::z();
    let vehicle = Matrix3::from_columns(&[axis, z, z.cross(&axis)]);
    Rotation3::from_matrix_unchecked(vehicle * camera.transpose())
}

/// Mount rotation with the optical axis on the view axis and image rows level
pub fn nominal_rotation(view: ViewDirection) -> Rotation3<f64> {
    axes_rotation(view, &Vector3::z(), &-Vector3::y())
}

fn pose_from_axes(
    intrinsics: &Intrinsics,
    view: ViewDirection,
    mode: HorizonMode,
    forward: Unit<Vector3<f64>>,
    up: Unit<Vector3<f64>>,
    residual_rms: f64,
) -> CameraPose {
    let rotation = axes_rotation(view, &forward, &up);
    let deviation = rotation * nominal_rotation(view).inverse();
    let (roll, pitch, yaw) = deviation.euler_angles();

    let vanishing_point = intrinsics
        .project(&forward)
        .unwrap_or_else(|_| intrinsics.project_pinhole(&forward));

    CameraPose {
        mode,
        rotation,
        roll,
        pitch,
        yaw,
        vanishing_point,
        residual_rms,
    }
}
