//! Timestamped platform state and the time arithmetic shared by the orbit code

use crate::types::{ReferenceFrame, SarError, SarResult, Vec3};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Julian date of the Unix epoch (1970-01-01T00:00:00Z)
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian date of J2000.0
pub const J2000_JD: f64 = 2_451_545.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Seconds elapsed from `from` to `to` (negative when `to` is earlier)
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        // Beyond ~292 years nanoseconds overflow; millisecond precision is plenty there
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}

/// Shift a timestamp by a (possibly fractional, possibly negative) number of seconds
///
/// Fails on non-finite offsets and on results outside the representable date range.
pub fn add_seconds(time: DateTime<Utc>, seconds: f64) -> SarResult<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(SarError::InvalidParameter(format!(
            "Cannot shift {} by {} seconds",
            time, seconds
        )));
    }
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as i64;
    // `as` saturates, and try_seconds rejects the saturated values
    Duration::try_seconds(whole as i64)
        .and_then(|d| time.checked_add_signed(d))
        .and_then(|t| t.checked_add_signed(Duration::nanoseconds(nanos)))
        .ok_or_else(|| {
            SarError::InvalidParameter(format!(
                "Shifting {} by {:e} seconds leaves the supported date range",
                time, seconds
            ))
        })
}

/// Julian date (UTC scale) of a timestamp
pub fn julian_date(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;
    UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
}

/// Julian centuries elapsed since J2000.0
pub fn julian_centuries_j2000(time: DateTime<Utc>) -> f64 {
    (julian_date(time) - J2000_JD) / 36_525.0
}

/// Single position/velocity sample of the sensor platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ephemeris {
    pub time: DateTime<Utc>,
    pub position: Vec3, // meters
    pub velocity: Vec3, // m/s
    pub frame: ReferenceFrame,
}

impl Ephemeris {
    pub fn new(time: DateTime<Utc>, position: Vec3, velocity: Vec3, frame: ReferenceFrame) -> Self {
        Self {
            time,
            position,
            velocity,
            frame,
        }
    }

    /// Earth-fixed sample built from plain arrays, the layout orbit files use
    pub fn earth_fixed(time: DateTime<Utc>, position: [f64; 3], velocity: [f64; 3]) -> Self {
        Self::new(
            time,
            Vec3::from(position),
            Vec3::from(velocity),
            ReferenceFrame::EarthFixed,
        )
    }

    /// Copy of this sample at another time with another state, keeping the frame
    pub fn with_state(&self, time: DateTime<Utc>, position: Vec3, velocity: Vec3) -> Self {
        Self {
            time,
            position,
            velocity,
            frame: self.frame,
        }
    }

    pub fn radius(&self) -> f64 {
        self.position.norm()
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }
}
