//! Zero-Doppler range/height intersection for a single platform state.
//!
//! The target lies in the plane through the platform perpendicular to its
//! Earth-fixed velocity, on the sphere of radius `slant_range` around it.
//! Parameterised by the look angle `theta` off nadir within that plane, the
//! target height above the ellipsoid grows monotonically from nadir towards
//! the horizon, so the height constraint is solved as a bracketed 1-D root.

use crate::core::ephemeris::Ephemeris;
use crate::core::geodesy::{ecef_to_ground, WGS84_A};
use crate::types::{GroundPoint, LookSide, ReferenceFrame, SarError, SarResult, Vec3};
use std::f64::consts::FRAC_PI_2;

/// Solver for the zero-Doppler intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarSensor {
    pub look_side: LookSide,
    /// Height tolerance of the solution (m)
    pub height_tolerance: f64,
    pub max_iterations: usize,
}

impl SarSensor {
    pub fn new(look_side: LookSide, height_tolerance: f64, max_iterations: usize) -> Self {
        Self {
            look_side,
            height_tolerance,
            max_iterations,
        }
    }

    /// Ground point at `slant_range` from the platform, `height` meters above
    /// the ellipsoid, in the zero-Doppler plane of `state`
    pub fn image_to_world(
        &self,
        state: &Ephemeris,
        slant_range: f64,
        height: f64,
    ) -> SarResult<GroundPoint> {
        let ecef = self.intersect(state, slant_range, height)?;
        let mut ground = ecef_to_ground(&ecef);
        ground.height = height;
        Ok(ground)
    }

    /// Earth-fixed position of the intersection
    pub fn intersect(&self, state: &Ephemeris, slant_range: f64, height: f64) -> SarResult<Vec3> {
        if state.frame != ReferenceFrame::EarthFixed {
            return Err(SarError::InvalidParameter(format!(
                "Intersection needs an Earth-fixed platform state, got {}",
                state.frame
            )));
        }
        if !(slant_range.is_finite() && slant_range > 0.0) {
            return Err(SarError::GeometricSolve(format!(
                "Invalid slant range {}",
                slant_range
            )));
        }

        let position = state.position;
        let speed = state.velocity.norm();
        if speed == 0.0 || position.norm() < WGS84_A * 0.5 {
            return Err(SarError::GeometricSolve(
                "Degenerate platform state (zero velocity or position inside the Earth)".to_string(),
            ));
        }
        let along = state.velocity / speed;

        // Nadir direction projected into the zero-Doppler plane
        let down = -position;
        let nadir = down - along * down.dot(&along);
        let nadir_norm = nadir.norm();
        if nadir_norm == 0.0 {
            return Err(SarError::GeometricSolve(
                "Platform velocity is radial, zero-Doppler plane undefined".to_string(),
            ));
        }
        let nadir = nadir / nadir_norm;
        let side = match self.look_side {
            LookSide::Right => nadir.cross(&along),
            LookSide::Left => along.cross(&nadir),
        };

        let point_at = |theta: f64| {
            let (s, c) = theta.sin_cos();
            position + (nadir * c + side * s) * slant_range
        };
        let residual = |theta: f64| ecef_to_ground(&point_at(theta)).height - height;

        let (mut lo, mut hi) = (0.0, FRAC_PI_2);
        let (mut f_lo, mut f_hi) = (residual(lo), residual(hi));
        if f_lo > 0.0 {
            return Err(SarError::GeometricSolve(format!(
                "Slant range {:.1} m does not reach {:.1} m height (nadir residual {:.1} m)",
                slant_range, height, f_lo
            )));
        }
        if f_hi < 0.0 {
            return Err(SarError::GeometricSolve(format!(
                "Slant range {:.1} m passes over the horizon for {:.1} m height",
                slant_range, height
            )));
        }

        // Illinois variant of regula falsi
        let mut side_kept = 0i8;
        for iteration in 0..self.max_iterations {
            let theta = (lo * f_hi - hi * f_lo) / (f_hi - f_lo);
            let f = residual(theta);
            if f.abs() <= self.height_tolerance {
                log::trace!("Intersection converged after {} iterations", iteration + 1);
                return Ok(point_at(theta));
            }
            if f < 0.0 {
                lo = theta;
                f_lo = f;
                if side_kept == -1 {
                    f_hi *= 0.5;
                }
                side_kept = -1;
            } else {
                hi = theta;
                f_hi = f;
                if side_kept == 1 {
                    f_lo *= 0.5;
                }
                side_kept = 1;
            }
        }

        Err(SarError::GeometricSolve(format!(
            "Intersection did not reach {:.1e} m height tolerance in {} iterations",
            self.height_tolerance, self.max_iterations
        )))
    }
}
