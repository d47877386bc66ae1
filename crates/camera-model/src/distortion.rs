//! Lens distortion (OpenCV rational model)
//!
//! Operates on normalized image coordinates (the z = 1 plane). The plain
//! Brown-Conrady model is the special case `k4 = k5 = k6 = 0`.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{CalibrationError, ProjectionError};

/// Rational denominators below this are treated as underflow
const DENOMINATOR_EPS: f64 = 1e-9;

/// Fixed-point iterations used to invert the distortion
const UNDISTORT_ITERS: usize = 50;

/// Convergence threshold for undistortion, in normalized units
const UNDISTORT_TOL: f64 = 1e-12;

/// Largest accepted `|distort(undistort(p)) - p|`, in normalized units
const UNDISTORT_RESIDUAL: f64 = 1e-9;

/// Distortion coefficients
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
    pub p1: f64,
    pub p2: f64,
}

impl Distortion {
    /// Build from an OpenCV ordered coefficient list `k1 k2 p1 p2 [k3 [k4 k5 k6]]`
    pub fn from_coefficients(d: &[f64]) -> Result<Self, CalibrationError> {
        let mut out = Self::default();
        match d.len() {
            0 => {}
            4 | 5 | 8 => {
                out.k1 = d[0];
                out.k2 = d[1];
                out.p1 = d[2];
                out.p2 = d[3];
                if d.len() >= 5 {
                    out.k3 = d[4];
                }
                if d.len() == 8 {
                    out.k4 = d[5];
                    out.k5 = d[6];
                    out.k6 = d[7];
                }
            }
            n => return Err(CalibrationError::DistortionCount(n)),
        }
        Ok(out)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Radial numerator and denominator at squared radius `r2`
    fn radial_terms(&self, r2: f64) -> (f64, f64) {
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let num = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let den = 1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6;
        (num, den)
    }

    fn tangential(&self, x: f64, y: f64, r2: f64) -> (f64, f64) {
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (dx, dy)
    }

    /// Apply distortion to an ideal normalized point
    pub fn distort(&self, n: &Vector2<f64>) -> Result<Vector2<f64>, ProjectionError> {
        if self.is_identity() {
            return Ok(*n);
        }
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let (num, den) = self.radial_terms(r2);
        if den.abs() < DENOMINATOR_EPS {
            return Err(ProjectionError::DistortionDomain { x, y });
        }
        let radial = num / den;
        let (dx, dy) = self.tangential(x, y, r2);
        Ok(Vector2::new(x * radial + dx, y * radial + dy))
    }

    /// Remove distortion from an observed normalized point
    ///
    /// Fixed-point iteration `x = (x_d - delta(x)) / radial(x)`. Fails when
    /// the radial factor leaves the valid domain (denominator underflow or a
    /// sign flip, which happens far outside the calibrated field of view), or
    /// when the iterate does not distort back onto the observed point.
    pub fn undistort(&self, n_dist: &Vector2<f64>) -> Result<Vector2<f64>, ProjectionError> {
        if self.is_identity() {
            return Ok(*n_dist);
        }
        let (x0, y0) = (n_dist.x, n_dist.y);
        let (mut x, mut y) = (x0, y0);

        for _ in 0..UNDISTORT_ITERS {
            let r2 = x * x + y * y;
            let (num, den) = self.radial_terms(r2);
            if num.abs() < DENOMINATOR_EPS || den.abs() < DENOMINATOR_EPS {
                return Err(ProjectionError::DistortionDomain { x: x0, y: y0 });
            }
            let inv_radial = den / num;
            if inv_radial < 0.0 {
                return Err(ProjectionError::DistortionDomain { x: x0, y: y0 });
            }
            let (dx, dy) = self.tangential(x, y, r2);
            let nx = (x0 - dx) * inv_radial;
            let ny = (y0 - dy) * inv_radial;
            let step = (nx - x).abs().max((ny - y).abs());
            x = nx;
            y = ny;
            if step < UNDISTORT_TOL {
                break;
            }
        }

        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::DistortionDomain { x: x0, y: y0 });
        }
        let ideal = Vector2::new(x, y);
        let restored = self
            .distort(&ideal)
            .map_err(|_| ProjectionError::DistortionDomain { x: x0, y: y0 })?;
        let residual = (restored - n_dist).norm();
        if !residual.is_finite() || residual > UNDISTORT_RESIDUAL {
            return Err(ProjectionError::DistortionDomain { x: x0, y: y0 });
        }
        Ok(ideal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn barrel() -> Distortion {
        Distortion::from_coefficients(&[-0.28, 0.07, 0.001, -0.0005, 0.0]).unwrap()
    }

    #[test]
    fn test_coefficient_counts() {
        assert!(Distortion::from_coefficients(&[]).unwrap().is_identity());
        assert!(Distortion::from_coefficients(&[0.1, 0.0, 0.0, 0.0]).is_ok());
        let d = Distortion::from_coefficients(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]).unwrap();
        assert_eq!((d.k1, d.k2, d.p1, d.p2, d.k3), (0.1, 0.2, 0.3, 0.4, 0.5));
        assert_eq!((d.k4, d.k5, d.k6), (0.6, 0.7, 0.8));
        assert_eq!(
            Distortion::from_coefficients(&[0.1, 0.2, 0.3]),
            Err(CalibrationError::DistortionCount(3))
        );
    }

    #[test]
    fn test_identity_passthrough() {
        let d = Distortion::default();
        let p = Vector2::new(0.3, -0.2);
        assert_eq!(d.undistort(&p).unwrap(), p);
        assert_eq!(d.distort(&p).unwrap(), p);
    }

    #[test]
    fn test_denominator_underflow() {
        // 1 + k4 r^2 vanishes at r^2 = 1
        let d = Distortion {
            k4: -1.0,
            ..Default::default()
        };
        let err = d.distort(&Vector2::new(1.0, 0.0)).unwrap_err();
        assert!(matches!(err, ProjectionError::DistortionDomain { .. }));
    }

    #[test]
    fn test_negative_radial_factor_rejected() {
        // Strong barrel folds back beyond r ~ 1
        let d = Distortion {
            k1: -1.5,
            ..Default::default()
        };
        assert!(d.undistort(&Vector2::new(2.0, 2.0)).is_err());
    }

    #[test]
    fn test_unconverged_undistort_rejected() {
        // Beyond r ~ 0.9 the iteration oscillates instead of settling
        let strong = Distortion::from_coefficients(&[-0.35, 0.12, 0.0, 0.0, -0.02]).unwrap();
        assert!(matches!(
            strong.undistort(&Vector2::new(0.35, 0.82)),
            Err(ProjectionError::DistortionDomain { .. })
        ));
        assert!(matches!(
            barrel().undistort(&Vector2::new(1.99, 1.30)),
            Err(ProjectionError::DistortionDomain { .. })
        ));
    }

    #[test]
    fn test_undistort_result_distorts_back() {
        let d = barrel();
        for p in [Vector2::new(0.1, -0.05), Vector2::new(0.45, 0.25), Vector2::new(-0.3, 0.3)] {
            let ideal = d.undistort(&p).unwrap();
            assert!((d.distort(&ideal).unwrap() - p).norm() < 1e-9);
        }
    }

    proptest! {
        #[test]
        fn undistort_inverts_distort(x in -0.5f64..0.5, y in -0.4f64..0.4) {
            let d = barrel();
            let ideal = Vector2::new(x, y);
            let observed = d.distort(&ideal).unwrap();
            let restored = d.undistort(&observed).unwrap();
            prop_assert!((restored - ideal).norm() < 1e-8);
        }
    }
}
