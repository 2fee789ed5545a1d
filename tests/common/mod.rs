#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sargeom::core::ephemeris::add_seconds;
use sargeom::core::frames::EARTH_ROTATION_RATE;
use sargeom::{
    Ephemeris, GeometricSarSensorModel, GroundPoint, ImagePoint, PlatformPosition, RefPoint,
    SensorParams, SPEED_OF_LIGHT,
};

pub const LINES: usize = 1000;
pub const COLS: usize = 2000;

const MU: f64 = 3.986_004_418e14;
const ORBIT_RADIUS: f64 = 7_071_000.0;
const INCLINATION_DEG: f64 = 98.2;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// First state vector epoch; the image starts 60 s later
pub fn orbit_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 3, 17, 8, 0).unwrap()
}

/// Analytic circular orbit, (position, velocity) in the inertial frame at `dt` seconds
pub fn inertial_state(dt: f64) -> ([f64; 3], [f64; 3]) {
    let r = ORBIT_RADIUS;
    let n = (MU / r.powi(3)).sqrt();
    let (si, ci) = INCLINATION_DEG.to_radians().sin_cos();
    let (su, cu) = (0.5 + n * dt).sin_cos();
    (
        [r * cu, r * su * ci, r * su * si],
        [-r * n * su, r * n * cu * ci, r * n * cu * si],
    )
}

/// The same orbit seen from a frame rotating at the Earth rate
pub fn earth_fixed_state(dt: f64) -> ([f64; 3], [f64; 3]) {
    let ([x, y, z], [vx, vy, vz]) = inertial_state(dt);
    let w = EARTH_ROTATION_RATE;
    let (s, c) = (1.0 + w * dt).sin_cos();
    (
        [x * c + y * s, -x * s + y * c, z],
        [
            vx * c + vy * s - w * (x * s - y * c),
            -vx * s + vy * c - w * (x * c + y * s),
            vz,
        ],
    )
}

/// State vectors every 10 s from 60 s before to 70 s after image start
pub fn synthetic_orbit() -> Vec<Ephemeris> {
    (0..15)
        .map(|k| {
            let dt = 10.0 * k as f64;
            let (position, velocity) = earth_fixed_state(dt);
            let time = add_seconds(orbit_epoch(), dt).expect("valid time");
            Ephemeris::earth_fixed(time, position, velocity)
        })
        .collect()
}

/// Right-looking slant-range SLC, 1000 lines at 10 ms, 2000 columns at 100 MHz from ~850 km
pub fn synthetic_sensor() -> SensorParams {
    let start = add_seconds(orbit_epoch(), 60.0).expect("valid time");
    let mut sensor = SensorParams::new(1700.0, 5.405e9, 1e8, 2.0 * 850e3 / SPEED_OF_LIGHT, start)
        .expect("valid sensor parameters");
    sensor
        .set_azimuth_time_interval(0.01)
        .expect("valid azimuth interval");
    sensor
}

/// Model with its reference point at the image centre on the ellipsoid
pub fn model_from(platform: PlatformPosition, sensor: SensorParams) -> GeometricSarSensorModel {
    let centre = ImagePoint::new(LINES as f64 / 2.0, COLS as f64 / 2.0);
    let time = sensor.time(centre.line).expect("valid line");
    let seed = RefPoint {
        image: centre,
        ground: GroundPoint::default(),
        time,
        slant_range: sensor.slant_range(centre.col, time),
    };
    let mut model = GeometricSarSensorModel::new(platform, sensor, seed.clone());
    let ground = model
        .line_sample_height_to_world(&centre, 0.0)
        .expect("centre projects to the ground");
    model.set_ref_point(RefPoint { ground, ..seed });
    model
}

pub fn synthetic_model() -> GeometricSarSensorModel {
    let platform = PlatformPosition::new(synthetic_orbit()).expect("orbit builds");
    model_from(platform, synthetic_sensor())
}

/// Image points spread over the scene, corners included
pub fn test_points() -> Vec<ImagePoint> {
    let mut points = Vec::new();
    for &line in &[0.0, 137.5, 500.0, 862.25, 999.0] {
        for &col in &[0.0, 420.75, 1000.0, 1733.0, 1999.0] {
            points.push(ImagePoint::new(line, col));
        }
    }
    points
}

/// Model whose orbit holds no samples yet
pub fn model_from_empty_orbit() -> GeometricSarSensorModel {
    let sensor = synthetic_sensor();
    let time = sensor.time(0.0).expect("valid line");
    let seed = RefPoint {
        image: ImagePoint::new(0.0, 0.0),
        ground: GroundPoint::default(),
        time,
        slant_range: sensor.slant_range(0.0, time),
    };
    GeometricSarSensorModel::new(PlatformPosition::default(), sensor, seed)
}
