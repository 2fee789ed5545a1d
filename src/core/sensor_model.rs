//! Geometric SAR sensor model: image <-> ground transforms built from an
//! interpolated orbit, the acquisition parameters and a reference point, with
//! an optional GCP-fitted linear correction and an optional coarse grid
//! standing in for the rigorous forward projection.

use crate::core::coarse_grid::{CoarseGrid, GridConfig};
use crate::core::elevation::HeightProvider;
use crate::core::ephemeris::Ephemeris;
use crate::core::frames::ensure_earth_fixed;
use crate::core::gcp::{Correction, GcpList};
use crate::core::geodesy::{east_north, ground_to_ecef};
use crate::core::orbit::PlatformPosition;
use crate::core::sar_sensor::SarSensor;
use crate::core::sensor_params::{RefPoint, SensorParams};
use crate::io::annotation::AnnotationParser;
use crate::io::keywordlist::{key, Keywordlist};
use crate::io::orbit::OrbitReader;
use crate::types::{GroundPoint, ImagePoint, SarError, SarResult};
use chrono::{DateTime, Utc};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

const MODEL_TYPE: &str = "GeometricSarSensorModel";

/// Terrain iteration stops once the looked-up height moves less than this (m)
const TERRAIN_HEIGHT_THRESHOLD: f64 = 0.01;
const TERRAIN_MAX_ITERATIONS: usize = 30;

/// Jacobian determinants below this are treated as singular (m^2 / px^2)
const MIN_JACOBIAN_DETERMINANT: f64 = 1e-12;

/// Numerical settings of the forward and inverse solvers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Newton iterations allowed in `world_to_line_sample`
    pub max_iterations: usize,
    /// Newton step (pixels) below which the inverse is converged
    pub convergence_threshold: f64,
    /// Finite-difference steps (pixels) for the Jacobian
    pub line_step: f64,
    pub col_step: f64,
    /// Fail instead of warning on non-convergence or a singular Jacobian
    pub strict: bool,
    /// Forward intersection tolerance on the target height (m)
    pub height_tolerance: f64,
    pub max_solve_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            convergence_threshold: 1e-4,
            line_step: 1.0,
            col_step: 1.0,
            strict: false,
            height_tolerance: 1e-6,
            max_solve_iterations: 100,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> SarResult<()> {
        if self.max_iterations == 0 || self.max_solve_iterations == 0 {
            return Err(SarError::InvalidParameter(
                "Solver iteration limits must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("convergence_threshold", self.convergence_threshold),
            ("line_step", self.line_step),
            ("col_step", self.col_step),
            ("height_tolerance", self.height_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SarError::InvalidParameter(format!(
                    "Solver {} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn save(&self, kwl: &mut Keywordlist, prefix: &str) {
        kwl.add(key(prefix, "max_iterations"), self.max_iterations);
        kwl.add(key(prefix, "convergence_threshold"), self.convergence_threshold);
        kwl.add(key(prefix, "line_step"), self.line_step);
        kwl.add(key(prefix, "col_step"), self.col_step);
        kwl.add(key(prefix, "strict"), self.strict);
        kwl.add(key(prefix, "height_tolerance"), self.height_tolerance);
        kwl.add(key(prefix, "max_solve_iterations"), self.max_solve_iterations);
    }

    fn load(kwl: &Keywordlist, prefix: &str) -> SarResult<Self> {
        let d = Self::default();
        let config = Self {
            max_iterations: kwl.get_or(&key(prefix, "max_iterations"), d.max_iterations)?,
            convergence_threshold: kwl
                .get_or(&key(prefix, "convergence_threshold"), d.convergence_threshold)?,
            line_step: kwl.get_or(&key(prefix, "line_step"), d.line_step)?,
            col_step: kwl.get_or(&key(prefix, "col_step"), d.col_step)?,
            strict: kwl.get_or(&key(prefix, "strict"), d.strict)?,
            height_tolerance: kwl.get_or(&key(prefix, "height_tolerance"), d.height_tolerance)?,
            max_solve_iterations: kwl
                .get_or(&key(prefix, "max_solve_iterations"), d.max_solve_iterations)?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Geometric SAR sensor model
///
/// Queries take `&self` and may run concurrently; `optimize_model`,
/// `clear_gcp_list` and the grid methods take `&mut self`, so interleaving them
/// with queries needs external locking.
#[derive(Debug, Clone)]
pub struct GeometricSarSensorModel {
    platform: PlatformPosition,
    sensor: SensorParams,
    ref_point: RefPoint,
    gcps: GcpList,
    correction: Correction,
    solver: SolverConfig,
    grid: Option<CoarseGrid>,
}

impl GeometricSarSensorModel {
    pub fn new(platform: PlatformPosition, sensor: SensorParams, ref_point: RefPoint) -> Self {
        log::info!(
            "Geometric SAR model: {} orbit samples, {} product, reference point at line {:.1} col {:.1}",
            platform.len(),
            if sensor.is_georeferenced() { "ground range" } else { "slant range" },
            ref_point.image.line,
            ref_point.image.col
        );
        Self {
            platform,
            sensor,
            ref_point,
            gcps: GcpList::new(),
            correction: Correction::identity(),
            solver: SolverConfig::default(),
            grid: None,
        }
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> SarResult<Self> {
        self.set_solver(solver)?;
        Ok(self)
    }

    pub fn set_solver(&mut self, solver: SolverConfig) -> SarResult<()> {
        solver.validate()?;
        self.solver = solver;
        Ok(())
    }

    pub fn solver(&self) -> &SolverConfig {
        &self.solver
    }

    pub fn platform(&self) -> &PlatformPosition {
        &self.platform
    }

    pub fn sensor_params(&self) -> &SensorParams {
        &self.sensor
    }

    pub fn ref_point(&self) -> &RefPoint {
        &self.ref_point
    }

    /// Replace the inversion seed
    pub fn set_ref_point(&mut self, ref_point: RefPoint) {
        self.ref_point = ref_point;
    }

    pub fn gcp_list(&self) -> &GcpList {
        &self.gcps
    }

    pub fn correction(&self) -> &Correction {
        &self.correction
    }

    fn intersector(&self) -> SarSensor {
        SarSensor::new(
            self.sensor.look_side(),
            self.solver.height_tolerance,
            self.solver.max_solve_iterations,
        )
    }

    /// Earth-fixed platform state at `time`
    pub fn platform_state_at(&self, time: DateTime<Utc>) -> SarResult<Ephemeris> {
        self.platform.interpolate(time).map(ensure_earth_fixed)
    }

    /// Earth-fixed platform state when the given (corrected) image line was acquired
    pub fn platform_position_at_line(&self, line: f64) -> SarResult<Ephemeris> {
        let native = self.correction.remove(&ImagePoint::new(line, 0.0));
        self.platform_state_at(self.sensor.time(native.line)?)
    }

    /// Ground position of an image point at a height above the ellipsoid
    pub fn line_sample_height_to_world(&self, image: &ImagePoint, height: f64) -> SarResult<GroundPoint> {
        if !(image.line.is_finite() && image.col.is_finite() && height.is_finite()) {
            return Err(SarError::InvalidParameter(format!(
                "Image point (line {}, col {}) at height {} is not finite",
                image.line, image.col, height
            )));
        }
        let native = self.correction.remove(image);
        self.native_to_world(&native, height)
    }

    fn native_to_world(&self, native: &ImagePoint, height: f64) -> SarResult<GroundPoint> {
        match &self.grid {
            Some(grid) => Ok(grid.line_sample_height_to_world(native, height)),
            None => self.rigorous_native_to_world(native, height),
        }
    }

    fn rigorous_native_to_world(&self, native: &ImagePoint, height: f64) -> SarResult<GroundPoint> {
        let time = self.sensor.time(native.line)?;
        let slant_range = self.sensor.slant_range(native.col, time);
        let state = self.platform_state_at(time)?;
        self.intersector().image_to_world(&state, slant_range, height)
    }

    /// Ground position of an image point on a terrain model
    ///
    /// Alternates forward projection and height look-up until the height
    /// settles. Where the provider has no data the last estimate is kept.
    pub fn line_sample_to_world(
        &self,
        image: &ImagePoint,
        heights: &dyn HeightProvider,
    ) -> SarResult<GroundPoint> {
        let mut height = self.ref_point.ground.height;
        let mut ground = self.line_sample_height_to_world(image, height)?;

        for _ in 0..TERRAIN_MAX_ITERATIONS {
            let next = match heights.height_above_ellipsoid(ground.latitude, ground.longitude) {
                Some(h) => h,
                None => {
                    log::debug!(
                        "No height at ({:.6}, {:.6}), keeping {:.2} m",
                        ground.latitude,
                        ground.longitude,
                        height
                    );
                    return Ok(ground);
                }
            };
            let delta = (next - height).abs();
            height = next;
            ground = self.line_sample_height_to_world(image, height)?;
            if delta < TERRAIN_HEIGHT_THRESHOLD {
                return Ok(ground);
            }
        }

        log::warn!(
            "Terrain height did not settle after {} iterations at line {:.2} col {:.2}",
            TERRAIN_MAX_ITERATIONS,
            image.line,
            image.col
        );
        Ok(ground)
    }

    /// Image coordinates of a ground point
    pub fn world_to_line_sample(&self, ground: &GroundPoint) -> SarResult<ImagePoint> {
        let native = self.world_to_native(ground)?;
        Ok(self.correction.apply(&native))
    }

    /// Newton inversion of the uncorrected forward model
    fn world_to_native(&self, ground: &GroundPoint) -> SarResult<ImagePoint> {
        if !(ground.latitude.is_finite() && ground.longitude.is_finite() && ground.height.is_finite()) {
            return Err(SarError::InvalidParameter(format!(
                "Ground point ({}, {}, {}) is not finite",
                ground.latitude, ground.longitude, ground.height
            )));
        }
        let target = ground_to_ecef(ground);
        let (east, north) = east_north(ground);
        // Horizontal offset (m) of a projected image point from the target
        let residual = |p: &ImagePoint| -> SarResult<Vector2<f64>> {
            let offset = ground_to_ecef(&self.native_to_world(p, ground.height)?) - target;
            Ok(Vector2::new(offset.dot(&east), offset.dot(&north)))
        };

        let config = &self.solver;
        let mut current = self.ref_point.image;
        let mut step_size = f64::INFINITY;

        for iteration in 0..config.max_iterations {
            let f0 = residual(&current)?;
            let f_col = residual(&ImagePoint::new(current.line, current.col + config.col_step))?;
            let f_line = residual(&ImagePoint::new(current.line + config.line_step, current.col))?;
            let jacobian = Matrix2::from_columns(&[
                (f_col - f0) / config.col_step,
                (f_line - f0) / config.line_step,
            ]);

            let inverse = match jacobian.try_inverse() {
                Some(inv) if jacobian.determinant().abs() > MIN_JACOBIAN_DETERMINANT => inv,
                _ => {
                    if config.strict {
                        return Err(SarError::SingularJacobian { iteration });
                    }
                    // A zero step leaves every later iteration identical
                    log::warn!(
                        "Singular Jacobian at iteration {} for ({:.6}, {:.6}), returning current estimate",
                        iteration,
                        ground.latitude,
                        ground.longitude
                    );
                    return Ok(current);
                }
            };

            let step = -(inverse * f0);
            current.col += step[0];
            current.line += step[1];
            step_size = step.norm();

            if step_size < config.convergence_threshold {
                log::trace!(
                    "Inverse converged in {} iterations: line {:.4} col {:.4}",
                    iteration + 1,
                    current.line,
                    current.col
                );
                return Ok(current);
            }
        }

        if config.strict {
            return Err(SarError::NonConvergence {
                iterations: config.max_iterations,
                step: step_size,
            });
        }
        log::warn!(
            "Inverse location of ({:.6}, {:.6}) not converged after {} iterations (last step {:.3e} px)",
            ground.latitude,
            ground.longitude,
            config.max_iterations,
            step_size
        );
        Ok(current)
    }

    /// Add GCPs and refit the per-axis correction on all accumulated points
    ///
    /// On error neither the GCP lists nor the correction change.
    pub fn optimize_model(&mut self, ground: &[GroundPoint], image: &[ImagePoint]) -> SarResult<()> {
        let candidate = self.gcps.extended(ground, image)?;
        if candidate.len() < 2 {
            return Err(SarError::InsufficientGcp {
                available: candidate.len(),
            });
        }

        #[cfg(feature = "parallel")]
        let predicted: SarResult<Vec<ImagePoint>> = {
            use rayon::prelude::*;
            candidate
                .ground()
                .par_iter()
                .map(|g| self.world_to_native(g))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let predicted: SarResult<Vec<ImagePoint>> =
            candidate.ground().iter().map(|g| self.world_to_native(g)).collect();

        let correction = Correction::fit(&predicted?, candidate.image())?;
        log::info!(
            "Model optimised on {} GCPs: col = {:.6} * x + {:.3}, line = {:.6} * y + {:.3}",
            candidate.len(),
            correction.factor_x,
            correction.bias_x,
            correction.factor_y,
            correction.bias_y
        );

        self.gcps = candidate;
        self.correction = correction;
        Ok(())
    }

    /// Forget all GCPs and restore the identity correction
    pub fn clear_gcp_list(&mut self) {
        if !self.gcps.is_empty() {
            log::info!("Clearing {} GCPs", self.gcps.len());
        }
        self.gcps.clear();
        self.correction = Correction::identity();
    }

    /// Replace the rigorous forward model by a grid sampled over `lines` x `cols`
    pub fn create_replacement_grid(&mut self, lines: usize, cols: usize, config: &GridConfig) -> SarResult<()> {
        let grid = CoarseGrid::build(lines, cols, config, |p, h| self.rigorous_native_to_world(p, h))?;
        self.grid = Some(grid);
        Ok(())
    }

    pub fn has_replacement_grid(&self) -> bool {
        self.grid.is_some()
    }

    pub fn drop_replacement_grid(&mut self) {
        self.grid = None;
    }

    /// Write the full model state under `prefix`
    pub fn save_state(&self, kwl: &mut Keywordlist, prefix: &str) {
        kwl.add(key(prefix, "type"), MODEL_TYPE);
        AnnotationParser::save_sensor_params(&self.sensor, kwl, &key(prefix, "sensor."));
        AnnotationParser::save_ref_point(&self.ref_point, kwl, &key(prefix, "refpoint."));
        OrbitReader::save(&self.platform, kwl, &key(prefix, "orbit."));
        self.solver.save(kwl, &key(prefix, "solver."));

        kwl.add(key(prefix, "optimization_factor_x"), self.correction.factor_x);
        kwl.add(key(prefix, "optimization_factor_y"), self.correction.factor_y);
        kwl.add(key(prefix, "optimization_bias_x"), self.correction.bias_x);
        kwl.add(key(prefix, "optimization_bias_y"), self.correction.bias_y);

        kwl.add(key(prefix, "gcp.count"), self.gcps.len());
        for (i, gcp) in self.gcps.iter().enumerate() {
            let item = format!("{}gcp[{}].", prefix, i);
            kwl.add(key(&item, "latitude"), gcp.ground.latitude);
            kwl.add(key(&item, "longitude"), gcp.ground.longitude);
            kwl.add(key(&item, "height"), gcp.ground.height);
            kwl.add(key(&item, "line"), gcp.image.line);
            kwl.add(key(&item, "col"), gcp.image.col);
        }
    }

    /// Rebuild a model from the state written by [`save_state`](Self::save_state)
    pub fn load_state(kwl: &Keywordlist, prefix: &str) -> SarResult<Self> {
        let type_key = key(prefix, "type");
        if let Some(kind) = kwl.find(&type_key) {
            if kind != MODEL_TYPE {
                return Err(SarError::Keyword {
                    key: type_key,
                    value: kind.to_string(),
                    reason: format!("expected {}", MODEL_TYPE),
                });
            }
        }

        let sensor = AnnotationParser::load_sensor_params(kwl, &key(prefix, "sensor."))?;
        let ref_point = AnnotationParser::load_ref_point(kwl, &key(prefix, "refpoint."))?;
        let platform = OrbitReader::load(kwl, &key(prefix, "orbit."))?;
        let solver = SolverConfig::load(kwl, &key(prefix, "solver."))?;

        let correction = Correction {
            factor_x: kwl.get_or(&key(prefix, "optimization_factor_x"), 1.0)?,
            factor_y: kwl.get_or(&key(prefix, "optimization_factor_y"), 1.0)?,
            bias_x: kwl.get_or(&key(prefix, "optimization_bias_x"), 0.0)?,
            bias_y: kwl.get_or(&key(prefix, "optimization_bias_y"), 0.0)?,
        };
        correction.validate()?;

        let count: usize = kwl.get_or(&key(prefix, "gcp.count"), 0)?;
        let mut ground = Vec::with_capacity(count);
        let mut image = Vec::with_capacity(count);
        for i in 0..count {
            let item = format!("{}gcp[{}].", prefix, i);
            ground.push(GroundPoint::new(
                kwl.get(&key(&item, "latitude"))?,
                kwl.get(&key(&item, "longitude"))?,
                kwl.get(&key(&item, "height"))?,
            ));
            image.push(ImagePoint::new(
                kwl.get(&key(&item, "line"))?,
                kwl.get(&key(&item, "col"))?,
            ));
        }

        let mut model = Self::new(platform, sensor, ref_point);
        model.solver = solver;
        model.gcps = GcpList::from_parts(ground, image)?;
        model.correction = correction;
        Ok(model)
    }
}

impl fmt::Display for GeometricSarSensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kwl = Keywordlist::new();
        self.save_state(&mut kwl, "");
        write!(f, "{}", kwl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ephemeris::add_seconds;
    use crate::core::frames::EARTH_ROTATION_RATE;
    use crate::types::{ReferenceFrame, SPEED_OF_LIGHT};
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    // Circular orbit at ~700 km, 98.2 deg inclination, rotated analytically to Earth-fixed
    fn model() -> GeometricSarSensorModel {
        let mu: f64 = 3.986_004_418e14;
        let r: f64 = 7_071_000.0;
        let inclination = 98.2_f64.to_radians();
        let n = (mu / r.powi(3)).sqrt();
        let w = EARTH_ROTATION_RATE;
        let t0 = Utc.with_ymd_and_hms(2020, 1, 3, 17, 8, 0).unwrap();

        let samples: Vec<Ephemeris> = (0..15)
            .map(|k| {
                let dt = 10.0 * k as f64;
                let u = 0.5 + n * dt;
                let (su, cu) = u.sin_cos();
                let (si, ci) = inclination.sin_cos();
                let (x, y, z) = (r * cu, r * su * ci, r * su * si);
                let (vx, vy, vz) = (-r * n * su, r * n * cu * ci, r * n * cu * si);
                let (s, c) = (1.0 + w * dt).sin_cos();
                Ephemeris::earth_fixed(
                    add_seconds(t0, dt).unwrap(),
                    [x * c + y * s, -x * s + y * c, z],
                    [
                        vx * c + vy * s - w * (x * s - y * c),
                        -vx * s + vy * c - w * (x * c + y * s),
                        vz,
                    ],
                )
            })
            .collect();

        let start = add_seconds(t0, 60.0).unwrap();
        let mut sensor = SensorParams::new(1700.0, 5.405e9, 1e8, 2.0 * 850e3 / SPEED_OF_LIGHT, start).unwrap();
        sensor.set_azimuth_time_interval(0.01).unwrap();

        let platform = PlatformPosition::new(samples).unwrap();
        let centre = ImagePoint::new(500.0, 1000.0);
        let seed = RefPoint {
            image: centre,
            ground: GroundPoint::default(),
            time: sensor.time(centre.line).unwrap(),
            slant_range: sensor.slant_range(centre.col, sensor.time(centre.line).unwrap()),
        };
        let mut model = GeometricSarSensorModel::new(platform, sensor, seed.clone());
        let ground = model.line_sample_height_to_world(&centre, 0.0).unwrap();
        model.set_ref_point(RefPoint { ground, ..seed });
        model
    }

    #[test]
    fn test_forward_inverse_round_trip() {
        let model = model();
        for &(line, col, h) in &[(0.0, 0.0, 0.0), (250.5, 1500.25, 300.0), (999.0, 1999.0, -50.0)] {
            let image = ImagePoint::new(line, col);
            let ground = model.line_sample_height_to_world(&image, h).unwrap();
            assert_eq!(ground.height, h);
            let back = model.world_to_line_sample(&ground).unwrap();
            assert_abs_diff_eq!(back.line, line, epsilon = 1e-3);
            assert_abs_diff_eq!(back.col, col, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_platform_position_at_line_is_earth_fixed() {
        let model = model();
        let state = model.platform_position_at_line(500.0).unwrap();
        assert_eq!(state.frame, ReferenceFrame::EarthFixed);
        assert_eq!(state.time, model.sensor_params().time(500.0).unwrap());
    }

    #[test]
    fn test_strict_mode_reports_non_convergence() {
        let config = SolverConfig {
            max_iterations: 1,
            strict: true,
            ..SolverConfig::default()
        };
        let model = model().with_solver(config).unwrap();
        let ground = model
            .line_sample_height_to_world(&ImagePoint::new(100.0, 100.0), 0.0)
            .unwrap();
        assert!(matches!(
            model.world_to_line_sample(&ground),
            Err(SarError::NonConvergence { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_insufficient_gcps_leave_model_unchanged() {
        let mut model = model();
        let image = ImagePoint::new(10.0, 20.0);
        let ground = model.line_sample_height_to_world(&image, 0.0).unwrap();
        let result = model.optimize_model(&[ground], &[image]);
        assert!(matches!(result, Err(SarError::InsufficientGcp { available: 1 })));
        assert!(model.gcp_list().is_empty());
        assert!(model.correction().is_identity());

        let result = model.optimize_model(&[ground], &[]);
        assert!(matches!(result, Err(SarError::MismatchedGcpLists { .. })));
    }

    #[test]
    fn test_invalid_solver_config_rejected() {
        let config = SolverConfig {
            convergence_threshold: 0.0,
            ..SolverConfig::default()
        };
        assert!(model().with_solver(config).is_err());
    }
}
