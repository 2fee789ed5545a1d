//! Orbit interpolation from a sparse list of platform state vectors

use crate::core::ephemeris::{elapsed_seconds, Ephemeris};
use crate::core::hermite::HermiteSpline;
use crate::types::{ReferenceFrame, SarError, SarResult, Vec3};
use chrono::{DateTime, Utc};

/// Platform position over time, interpolated per axis with Hermite splines
///
/// Samples are kept in insertion order, which callers must make chronological.
/// One spline per axis is keyed by seconds elapsed since the first sample, with
/// the sample velocity as the derivative constraint; the interpolated velocity
/// is the spline derivative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformPosition {
    samples: Vec<Ephemeris>,
    splines: Option<[HermiteSpline; 3]>,
}

impl PlatformPosition {
    /// Build the interpolator, failing when fewer than 2 samples are given
    pub fn new(samples: Vec<Ephemeris>) -> SarResult<Self> {
        let mut platform = Self::default();
        platform.set_data(samples)?;
        Ok(platform)
    }

    /// Replace all samples and rebuild the splines
    ///
    /// On failure the previous state is left untouched.
    pub fn set_data(&mut self, samples: Vec<Ephemeris>) -> SarResult<()> {
        if samples.len() < 2 {
            return Err(SarError::InsufficientData(format!(
                "Orbit interpolation needs at least 2 ephemeris samples, got {}",
                samples.len()
            )));
        }

        let frame = samples[0].frame;
        if let Some(other) = samples.iter().find(|s| s.frame != frame) {
            return Err(SarError::InvalidParameter(format!(
                "Ephemeris samples mix reference frames ({} and {})",
                frame, other.frame
            )));
        }

        let t0 = samples[0].time;
        let xs: Vec<f64> = samples.iter().map(|s| elapsed_seconds(t0, s.time)).collect();

        let splines = [
            Self::axis_spline(&xs, &samples, 0)?,
            Self::axis_spline(&xs, &samples, 1)?,
            Self::axis_spline(&xs, &samples, 2)?,
        ];

        log::debug!(
            "Orbit interpolator built from {} samples ({} frame, span {:.1}s)",
            samples.len(),
            frame,
            elapsed_seconds(t0, samples[samples.len() - 1].time)
        );

        self.samples = samples;
        self.splines = Some(splines);
        Ok(())
    }

    /// Position spline of one axis, with the sampled velocity as tangent
    fn axis_spline(xs: &[f64], samples: &[Ephemeris], axis: usize) -> SarResult<HermiteSpline> {
        HermiteSpline::new(
            xs.to_vec(),
            samples.iter().map(|s| s.position[axis]).collect(),
            samples.iter().map(|s| s.velocity[axis]).collect(),
        )
    }

    pub fn samples(&self) -> &[Ephemeris] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frame shared by all samples, `None` before initialisation
    pub fn frame(&self) -> Option<ReferenceFrame> {
        self.samples.first().map(|s| s.frame)
    }

    /// Time span covered by the samples
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }

    /// Interpolated state at `time`
    ///
    /// Times outside the sampled span are extrapolated from the end intervals,
    /// not rejected. The result carries the frame of the stored samples.
    pub fn interpolate(&self, time: DateTime<Utc>) -> SarResult<Ephemeris> {
        let (splines, first) = match (&self.splines, self.samples.first()) {
            (Some(splines), Some(first)) if self.samples.len() >= 2 => (splines, first),
            _ => {
                return Err(SarError::InsufficientData(format!(
                    "Orbit interpolator holds {} samples, at least 2 required",
                    self.samples.len()
                )))
            }
        };

        let dt = elapsed_seconds(first.time, time);
        if let Some((start, end)) = self.time_range() {
            if time < start || time > end {
                log::debug!(
                    "Extrapolating orbit at {} outside sampled span [{}, {}]",
                    time,
                    start,
                    end
                );
            }
        }

        let (x, vx) = splines[0].evaluate(dt);
        let (y, vy) = splines[1].evaluate(dt);
        let (z, vz) = splines[2].evaluate(dt);
        let position = Vec3::new(x, y, z);
        let velocity = Vec3::new(vx, vy, vz);

        Ok(first.with_state(time, position, velocity))
    }

    /// Interpolated position and velocity at `time`
    pub fn position_velocity_at(&self, time: DateTime<Utc>) -> SarResult<(Vec3, Vec3)> {
        let state = self.interpolate(time)?;
        Ok((state.position, state.velocity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ephemeris::add_seconds;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn linear_orbit() -> Vec<Ephemeris> {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 3, 17, 8, 0).unwrap();
        let p0 = [7_000_000.0, -1_000.0, 250.0];
        let v = [10.0, 7_500.0, -3.0];
        (0..5)
            .map(|i| {
                let dt = 10.0 * i as f64;
                Ephemeris::earth_fixed(
                    add_seconds(t0, dt).unwrap(),
                    [p0[0] + v[0] * dt, p0[1] + v[1] * dt, p0[2] + v[2] * dt],
                    v,
                )
            })
            .collect()
    }

    #[test]
    fn test_constant_velocity_reduces_to_linear() {
        let samples = linear_orbit();
        let t0 = samples[0].time;
        let p0 = samples[0].position;
        let v = samples[0].velocity;
        let platform = PlatformPosition::new(samples).unwrap();

        for &dt in &[0.0, 3.3, 10.0, 17.25, 29.9, 40.0] {
            let state = platform.interpolate(add_seconds(t0, dt).unwrap()).unwrap();
            let expected = p0 + v * dt;
            for axis in 0..3 {
                assert_abs_diff_eq!(state.position[axis], expected[axis], epsilon = 1e-6);
                assert_abs_diff_eq!(state.velocity[axis], v[axis], epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_single_sample_is_insufficient() {
        let mut samples = linear_orbit();
        samples.truncate(1);
        let result = PlatformPosition::new(samples);
        assert!(matches!(result, Err(SarError::InsufficientData(_))));

        let empty = PlatformPosition::default();
        let t = Utc.with_ymd_and_hms(2020, 1, 3, 17, 8, 0).unwrap();
        assert!(matches!(empty.interpolate(t), Err(SarError::InsufficientData(_))));
    }

    #[test]
    fn test_failed_set_data_keeps_previous_state() {
        let samples = linear_orbit();
        let mut platform = PlatformPosition::new(samples.clone()).unwrap();
        assert!(platform.set_data(samples[..1].to_vec()).is_err());
        assert_eq!(platform.len(), 5);
        assert!(platform.interpolate(samples[2].time).is_ok());
    }

    #[test]
    fn test_mixed_frames_rejected() {
        let mut samples = linear_orbit();
        samples[3].frame = ReferenceFrame::QuasiInertial;
        assert!(matches!(
            PlatformPosition::new(samples),
            Err(SarError::InvalidParameter(_))
        ));
    }
}
