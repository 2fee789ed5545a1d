//! WGS84 geodetic <-> Earth-fixed cartesian conversions

use crate::types::{GroundPoint, Vec3};

/// WGS84 semi-major axis (m)
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (m)
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Convert lat/lon/height to Earth-fixed cartesian coordinates
pub fn ground_to_ecef(point: &GroundPoint) -> Vec3 {
    let lat_rad = point.latitude.to_radians();
    let lon_rad = point.longitude.to_radians();
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    let n = prime_vertical_radius(lat_rad);

    Vec3::new(
        (n + point.height) * cos_lat * cos_lon,
        (n + point.height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + point.height) * sin_lat,
    )
}

/// Convert Earth-fixed cartesian coordinates to lat/lon/height
///
/// Fixed-point iteration on the latitude; converges to well below a
/// millimeter within a handful of iterations for points up to orbital heights.
pub fn ecef_to_ground(ecef: &Vec3) -> GroundPoint {
    let (x, y, z) = (ecef.x, ecef.y, ecef.z);
    let longitude = y.atan2(x);
    let p = (x * x + y * y).sqrt();

    if p < 1e-9 {
        // On the polar axis
        let latitude = if z >= 0.0 { 90.0 } else { -90.0 };
        return GroundPoint::new(latitude, 0.0, z.abs() - WGS84_B);
    }

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..20 {
        let n = prime_vertical_radius(lat);
        let height = geodetic_height(p, z, lat);
        let next = z.atan2(p * (1.0 - WGS84_E2 * n / (n + height)));
        let delta = (next - lat).abs();
        lat = next;
        if delta < 1e-15 {
            break;
        }
    }
    let height = geodetic_height(p, z, lat);

    GroundPoint::new(lat.to_degrees(), longitude.to_degrees(), height)
}

fn prime_vertical_radius(lat: f64) -> f64 {
    let sin_lat = lat.sin();
    WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt()
}

// Stable near the poles, unlike p / cos(lat) - N
fn geodetic_height(p: f64, z: f64, lat: f64) -> f64 {
    let (sin_lat, cos_lat) = lat.sin_cos();
    p * cos_lat + z * sin_lat - WGS84_A * WGS84_A / prime_vertical_radius(lat)
}

/// Local east and north unit vectors at a ground point
pub fn east_north(point: &GroundPoint) -> (Vec3, Vec3) {
    let (sin_lat, cos_lat) = point.latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = point.longitude.to_radians().sin_cos();
    let east = Vec3::new(-sin_lon, cos_lon, 0.0);
    let north = Vec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    (east, north)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_equator_prime_meridian() {
        let ecef = ground_to_ecef(&GroundPoint::new(0.0, 0.0, 0.0));
        assert_abs_diff_eq!(ecef.x, WGS84_A, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_round_trip() {
        let points = [
            GroundPoint::new(43.6, 1.44, 150.0),
            GroundPoint::new(-33.9, 151.2, -30.0),
            GroundPoint::new(78.2, -15.6, 4_000.0),
            GroundPoint::new(5.0, 120.0, 700_000.0),
        ];
        for point in &points {
            let back = ecef_to_ground(&ground_to_ecef(point));
            assert_abs_diff_eq!(back.latitude, point.latitude, epsilon = 1e-10);
            assert_abs_diff_eq!(back.longitude, point.longitude, epsilon = 1e-10);
            assert_abs_diff_eq!(back.height, point.height, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_east_north_are_orthonormal() {
        let (east, north) = east_north(&GroundPoint::new(45.0, 30.0, 0.0));
        assert_abs_diff_eq!(east.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(north.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(east.dot(&north), 0.0, epsilon = 1e-12);
    }
}
