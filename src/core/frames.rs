//! Conversion of platform states between the Earth-fixed frame and a
//! quasi-inertial frame (mean equator and equinox of date).
//!
//! The rotation is `R = R3(gast) * N`, where `N` is the nutation matrix built
//! from a truncated IAU 1980 series and `gast` is the apparent Greenwich
//! sidereal angle. Polar motion and precession are not modelled. Velocities
//! use the rotating-frame addition formula `v_ef = R v_i - w x r_ef`.
//!
//! Everything here is a pure function of its inputs.

use crate::core::ephemeris::{julian_centuries_j2000, julian_date, Ephemeris, J2000_JD};
use crate::types::{ReferenceFrame, SarError, SarResult, Vec3};
use chrono::{DateTime, Utc};
use nalgebra::Matrix3;
use std::f64::consts::TAU;

/// Earth rotation rate (rad/s), one turn per sidereal day of 86164.09054 s
pub const EARTH_ROTATION_RATE: f64 = TAU / 86_164.090_54;

const ARCSEC_TO_RAD: f64 = TAU / (360.0 * 3600.0);

/// Fundamental arguments of the nutation theory, radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundamentalArguments {
    /// Mean anomaly of the Moon
    pub moon_anomaly: f64,
    /// Mean anomaly of the Sun
    pub sun_anomaly: f64,
    /// Mean argument of latitude of the Moon
    pub moon_latitude: f64,
    /// Mean elongation of the Moon from the Sun
    pub elongation: f64,
    /// Mean longitude of the ascending node of the lunar orbit
    pub node_longitude: f64,
    /// Mean longitude of the Moon
    pub moon_longitude: f64,
    /// Mean longitude of the Sun
    pub sun_longitude: f64,
    /// Mean longitude of the lunar perigee
    pub moon_perigee: f64,
    /// Mean obliquity of the ecliptic
    pub mean_obliquity: f64,
}

fn polynomial_arcsec(degrees: f64, coefficients: [f64; 4], t: f64) -> f64 {
    let [c1, c2, c3, c4] = coefficients;
    let arcsec = (((c4 * t + c3) * t + c2) * t + c1) * t;
    (degrees * 3600.0 + arcsec) * ARCSEC_TO_RAD
}

impl FundamentalArguments {
    /// Arguments at `t` Julian centuries since J2000.0
    pub fn at(t: f64) -> Self {
        let moon_anomaly = polynomial_arcsec(
            134.963_402_51,
            [1_717_915_923.217_8, 31.879_2, 0.051_635, -0.000_244_70],
            t,
        );
        let sun_anomaly = polynomial_arcsec(
            357.529_109_18,
            [129_596_581.048_1, -0.553_2, 0.000_136, -0.000_011_49],
            t,
        );
        let moon_latitude = polynomial_arcsec(
            93.272_090_62,
            [1_739_527_262.847_8, -12.751_2, -0.001_037, 0.000_004_17],
            t,
        );
        let elongation = polynomial_arcsec(
            297.850_195_47,
            [1_602_961_601.209_0, -6.370_6, 0.006_593, -0.000_031_69],
            t,
        );
        let node_longitude = polynomial_arcsec(
            125.044_555_01,
            [-6_962_890.543_1, 7.472_2, 0.007_702, -0.000_059_39],
            t,
        );
        let perihelion = polynomial_arcsec(282.937_347_98, [6_190.345_9, 1.651_2, 0.0, 0.0], t);
        let mean_obliquity = (84_381.448 + (-46.815_0 + (-0.000_59 + 0.001_813 * t) * t) * t)
            * ARCSEC_TO_RAD;

        let moon_longitude = moon_latitude + node_longitude;
        Self {
            moon_anomaly,
            sun_anomaly,
            moon_latitude,
            elongation,
            node_longitude,
            moon_longitude,
            sun_longitude: sun_anomaly + perihelion,
            moon_perigee: moon_longitude - moon_anomaly,
            mean_obliquity,
        }
    }
}

/// Leading terms of the IAU 1980 nutation series
///
/// Columns: multipliers of (l, l', F, D, Omega), then longitude (A, A') and
/// obliquity (B, B') coefficients in units of 0.1 mas.
const NUTATION_TERMS: [([f64; 5], f64, f64, f64, f64); 9] = [
    ([0.0, 0.0, 0.0, 0.0, 1.0], -171_996.0, -174.2, 92_025.0, 8.9),
    ([0.0, 0.0, 2.0, -2.0, 2.0], -13_187.0, -1.6, 5_736.0, -3.1),
    ([0.0, 0.0, 2.0, 0.0, 2.0], -2_274.0, -0.2, 977.0, -0.5),
    ([0.0, 0.0, 0.0, 0.0, 2.0], 2_062.0, 0.2, -895.0, 0.5),
    ([0.0, 1.0, 0.0, 0.0, 0.0], 1_426.0, -3.4, 54.0, -0.1),
    ([1.0, 0.0, 0.0, 0.0, 0.0], 712.0, 0.1, -7.0, 0.0),
    ([0.0, 1.0, 2.0, -2.0, 2.0], -517.0, 1.2, 224.0, -0.6),
    ([0.0, 0.0, 2.0, 0.0, 1.0], -386.0, -0.4, 200.0, 0.0),
    ([1.0, 0.0, 2.0, 0.0, 2.0], -301.0, 0.0, 129.0, -0.1),
];

/// Nutation in longitude and obliquity with the obliquities it applies to, radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nutation {
    pub longitude: f64,
    pub obliquity: f64,
    pub mean_obliquity: f64,
}

impl Nutation {
    pub fn at(t: f64) -> Self {
        let args = FundamentalArguments::at(t);
        let base = [
            args.moon_anomaly,
            args.sun_anomaly,
            args.moon_latitude,
            args.elongation,
            args.node_longitude,
        ];

        let mut dpsi = 0.0;
        let mut deps = 0.0;
        for (multipliers, a, a_rate, b, b_rate) in NUTATION_TERMS.iter() {
            let argument: f64 = multipliers.iter().zip(base.iter()).map(|(m, x)| m * x).sum();
            dpsi += (a + a_rate * t) * argument.sin();
            deps += (b + b_rate * t) * argument.cos();
        }

        Self {
            longitude: dpsi * 1e-4 * ARCSEC_TO_RAD,
            obliquity: deps * 1e-4 * ARCSEC_TO_RAD,
            mean_obliquity: args.mean_obliquity,
        }
    }

    pub fn true_obliquity(&self) -> f64 {
        self.mean_obliquity + self.obliquity
    }

    /// Equation of the equinoxes (apparent minus mean sidereal angle)
    pub fn equation_of_equinoxes(&self) -> f64 {
        self.longitude * self.true_obliquity().cos()
    }

    /// Rotation from mean-of-date to true-of-date axes
    pub fn matrix(&self) -> Matrix3<f64> {
        r1(-self.true_obliquity()) * r3(-self.longitude) * r1(self.mean_obliquity)
    }
}

/// Frame rotation about X
fn r1(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// Frame rotation about Z
fn r3(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Derivative of `r3` with respect to its angle
fn r3_rate(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(-s, c, 0.0, -c, -s, 0.0, 0.0, 0.0, 0.0)
}

/// Greenwich mean sidereal angle (radians, in [0, 2pi)) from the mean sidereal time polynomial
pub fn mean_sidereal_angle(time: DateTime<Utc>) -> f64 {
    let jd = julian_date(time);
    let t = (jd - J2000_JD) / 36_525.0;
    let degrees = 280.460_618_37 + 360.985_647_366_29 * (jd - J2000_JD) + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    degrees.to_radians().rem_euclid(TAU)
}

/// Greenwich apparent sidereal angle: mean angle plus the equation of the equinoxes
pub fn apparent_sidereal_angle(time: DateTime<Utc>) -> f64 {
    let nutation = Nutation::at(julian_centuries_j2000(time));
    (mean_sidereal_angle(time) + nutation.equation_of_equinoxes()).rem_euclid(TAU)
}

/// Rotation from the quasi-inertial frame to the Earth-fixed frame and its time derivative
///
/// When `greenwich_angle` is given it replaces the computed apparent sidereal angle.
pub fn earth_fixed_rotation(
    time: DateTime<Utc>,
    greenwich_angle: Option<f64>,
) -> (Matrix3<f64>, Matrix3<f64>) {
    let nutation = Nutation::at(julian_centuries_j2000(time));
    let theta = greenwich_angle.unwrap_or_else(|| {
        (mean_sidereal_angle(time) + nutation.equation_of_equinoxes()).rem_euclid(TAU)
    });
    let n = nutation.matrix();
    let rotation = r3(theta) * n;
    let rotation_rate = r3_rate(theta) * n * EARTH_ROTATION_RATE;
    (rotation, rotation_rate)
}

/// Convert a quasi-inertial state to the Earth-fixed frame
pub fn to_earth_fixed(ephemeris: &Ephemeris, greenwich_angle: Option<f64>) -> SarResult<Ephemeris> {
    match ephemeris.frame {
        ReferenceFrame::EarthFixed => Err(SarError::InvalidParameter(
            "Ephemeris is already Earth-fixed".to_string(),
        )),
        ReferenceFrame::QuasiInertial => Ok(rotate_to_earth_fixed(ephemeris, greenwich_angle)),
    }
}

fn rotate_to_earth_fixed(ephemeris: &Ephemeris, greenwich_angle: Option<f64>) -> Ephemeris {
    let (rotation, rotation_rate) = earth_fixed_rotation(ephemeris.time, greenwich_angle);
    Ephemeris::new(
        ephemeris.time,
        rotation * ephemeris.position,
        rotation * ephemeris.velocity + rotation_rate * ephemeris.position,
        ReferenceFrame::EarthFixed,
    )
}

/// Convert an Earth-fixed state to the quasi-inertial frame
pub fn to_inertial(ephemeris: &Ephemeris, greenwich_angle: Option<f64>) -> SarResult<Ephemeris> {
    match ephemeris.frame {
        ReferenceFrame::QuasiInertial => Err(SarError::InvalidParameter(
            "Ephemeris is already quasi-inertial".to_string(),
        )),
        ReferenceFrame::EarthFixed => {
            let (rotation, rotation_rate) = earth_fixed_rotation(ephemeris.time, greenwich_angle);
            let inverse = rotation.transpose();
            let position = inverse * ephemeris.position;
            let velocity = inverse * (ephemeris.velocity - rotation_rate * position);
            Ok(Ephemeris::new(
                ephemeris.time,
                position,
                velocity,
                ReferenceFrame::QuasiInertial,
            ))
        }
    }
}

/// Bring a state into the Earth-fixed frame, whatever frame it is in
pub fn ensure_earth_fixed(ephemeris: Ephemeris) -> Ephemeris {
    match ephemeris.frame {
        ReferenceFrame::EarthFixed => ephemeris,
        ReferenceFrame::QuasiInertial => rotate_to_earth_fixed(&ephemeris, None),
    }
}

/// Earth rotation angular velocity vector, Earth-fixed axes
pub fn earth_rotation_vector() -> Vec3 {
    Vec3::new(0.0, 0.0, EARTH_ROTATION_RATE)
}
