//! Per-acquisition sensor parameters, the reference point and the
//! image-to-(time, slant range) mappers.

use crate::core::ephemeris::{add_seconds, elapsed_seconds};
use crate::types::{GroundPoint, ImagePoint, LookSide, SarError, SarResult, SPEED_OF_LIGHT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ground-range to slant-range polynomial valid around one azimuth time
///
/// Evaluates `sum(coefficients[k] * (ground_range - ground_range_origin)^k)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrgrRecord {
    pub azimuth_time: DateTime<Utc>,
    pub ground_range_origin: f64,
    pub coefficients: Vec<f64>,
}

impl SrgrRecord {
    fn evaluate(origin: f64, coefficients: &[f64], ground_range: f64) -> f64 {
        let relative = ground_range - origin;
        coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| c + relative * acc)
    }
}

/// How image columns relate to slant range for a given mission/product type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum MissionAdapter {
    /// Slant-range product: column is a fast-time sample index
    #[default]
    SlantRange,
    /// Ground-range product with time-tagged ground-to-slant range polynomials
    ///
    /// The ground range of a column is `col * pixel_spacing` meters.
    GroundRange {
        pixel_spacing: f64,
        records: Vec<SrgrRecord>,
    },
    /// Ground-range product with a quadratic two-way range time per column
    RangeTimePolynomial { coefficients: [f64; 3] },
}

impl MissionAdapter {
    /// Whether the product is projected to ground range
    pub fn is_georeferenced(&self) -> bool {
        !matches!(self, MissionAdapter::SlantRange)
    }

    pub fn validate(&self) -> SarResult<()> {
        match self {
            MissionAdapter::SlantRange | MissionAdapter::RangeTimePolynomial { .. } => Ok(()),
            MissionAdapter::GroundRange {
                pixel_spacing,
                records,
            } => {
                if *pixel_spacing <= 0.0 || !pixel_spacing.is_finite() {
                    return Err(SarError::InvalidParameter(format!(
                        "Ground range pixel spacing must be positive, got {}",
                        pixel_spacing
                    )));
                }
                if records.is_empty() {
                    return Err(SarError::InvalidParameter(
                        "Ground range product needs at least one SRGR record".to_string(),
                    ));
                }
                if let Some(i) = records.iter().position(|r| r.coefficients.is_empty()) {
                    return Err(SarError::InvalidParameter(format!(
                        "SRGR record {} has no coefficients",
                        i
                    )));
                }
                if records.windows(2).any(|w| w[1].azimuth_time < w[0].azimuth_time) {
                    return Err(SarError::InvalidParameter(
                        "SRGR records must be sorted by azimuth time".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Slant range of a ground range at `azimuth_time`
    ///
    /// Between two records the origin and coefficients are linearly
    /// interpolated in time; outside the records the nearest one is used.
    fn ground_to_slant_range(records: &[SrgrRecord], ground_range: f64, azimuth_time: DateTime<Utc>) -> f64 {
        let (first, last) = match (records.first(), records.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return f64::NAN,
        };

        if azimuth_time < first.azimuth_time {
            return SrgrRecord::evaluate(first.ground_range_origin, &first.coefficients, ground_range);
        }
        if azimuth_time >= last.azimuth_time {
            return SrgrRecord::evaluate(last.ground_range_origin, &last.coefficients, ground_range);
        }

        let next = records.partition_point(|r| r.azimuth_time <= azimuth_time);
        let (previous, following) = (&records[next - 1], &records[next]);
        let span = elapsed_seconds(previous.azimuth_time, following.azimuth_time);
        let weight = if span > 0.0 {
            elapsed_seconds(previous.azimuth_time, azimuth_time) / span
        } else {
            0.0
        };

        let origin = (1.0 - weight) * previous.ground_range_origin + weight * following.ground_range_origin;
        let coefficients: Vec<f64> = previous
            .coefficients
            .iter()
            .zip(following.coefficients.iter())
            .map(|(p, n)| (1.0 - weight) * p + weight * n)
            .collect();
        SrgrRecord::evaluate(origin, &coefficients, ground_range)
    }
}

/// Static acquisition parameters anchoring the geometric model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorParams {
    prf: f64,                   // Hz
    radar_frequency: f64,       // Hz
    range_sampling_rate: f64,   // Hz
    near_range_time: f64,       // two-way, seconds
    range_resolution: f64,      // meters
    azimuth_resolution: f64,    // meters
    azimuth_start: DateTime<Utc>,
    azimuth_time_interval: f64, // seconds per line
    look_side: LookSide,
    adapter: MissionAdapter,
}

fn check_positive(name: &str, value: f64) -> SarResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SarError::InvalidParameter(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

impl SensorParams {
    /// Slant-range, right-looking parameters with the line interval taken as 1/PRF
    pub fn new(
        prf: f64,
        radar_frequency: f64,
        range_sampling_rate: f64,
        near_range_time: f64,
        azimuth_start: DateTime<Utc>,
    ) -> SarResult<Self> {
        check_positive("PRF", prf)?;
        check_positive("Radar frequency", radar_frequency)?;
        check_positive("Range sampling rate", range_sampling_rate)?;
        if !near_range_time.is_finite() || near_range_time < 0.0 {
            return Err(SarError::InvalidParameter(format!(
                "Near range time must be non-negative, got {}",
                near_range_time
            )));
        }

        Ok(Self {
            prf,
            radar_frequency,
            range_sampling_rate,
            near_range_time,
            range_resolution: SPEED_OF_LIGHT / (2.0 * range_sampling_rate),
            azimuth_resolution: 0.0,
            azimuth_start,
            azimuth_time_interval: 1.0 / prf,
            look_side: LookSide::Right,
            adapter: MissionAdapter::SlantRange,
        })
    }

    pub fn prf(&self) -> f64 {
        self.prf
    }

    pub fn radar_frequency(&self) -> f64 {
        self.radar_frequency
    }

    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT / self.radar_frequency
    }

    pub fn range_sampling_rate(&self) -> f64 {
        self.range_sampling_rate
    }

    pub fn near_range_time(&self) -> f64 {
        self.near_range_time
    }

    pub fn range_resolution(&self) -> f64 {
        self.range_resolution
    }

    pub fn azimuth_resolution(&self) -> f64 {
        self.azimuth_resolution
    }

    pub fn azimuth_start(&self) -> DateTime<Utc> {
        self.azimuth_start
    }

    pub fn azimuth_time_interval(&self) -> f64 {
        self.azimuth_time_interval
    }

    pub fn look_side(&self) -> LookSide {
        self.look_side
    }

    pub fn adapter(&self) -> &MissionAdapter {
        &self.adapter
    }

    pub fn is_georeferenced(&self) -> bool {
        self.adapter.is_georeferenced()
    }

    pub fn set_prf(&mut self, prf: f64) -> SarResult<()> {
        check_positive("PRF", prf)?;
        self.prf = prf;
        Ok(())
    }

    pub fn set_radar_frequency(&mut self, frequency: f64) -> SarResult<()> {
        check_positive("Radar frequency", frequency)?;
        self.radar_frequency = frequency;
        Ok(())
    }

    pub fn set_range_sampling_rate(&mut self, rate: f64) -> SarResult<()> {
        check_positive("Range sampling rate", rate)?;
        self.range_sampling_rate = rate;
        Ok(())
    }

    pub fn set_resolutions(&mut self, range: f64, azimuth: f64) -> SarResult<()> {
        if range.is_nan() || azimuth.is_nan() || range < 0.0 || azimuth < 0.0 {
            return Err(SarError::InvalidParameter(format!(
                "Resolutions must be non-negative, got range {} and azimuth {}",
                range, azimuth
            )));
        }
        self.range_resolution = range;
        self.azimuth_resolution = azimuth;
        Ok(())
    }

    pub fn set_azimuth_time_interval(&mut self, interval: f64) -> SarResult<()> {
        check_positive("Azimuth time interval", interval)?;
        self.azimuth_time_interval = interval;
        Ok(())
    }

    /// Derive line timing from the first/last line times and the number of lines
    pub fn set_azimuth_timing(
        &mut self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        lines: usize,
    ) -> SarResult<()> {
        if lines < 2 {
            return Err(SarError::InvalidParameter(format!(
                "Azimuth timing needs at least 2 lines, got {}",
                lines
            )));
        }
        let interval = elapsed_seconds(start, stop) / (lines - 1) as f64;
        check_positive("Azimuth time interval", interval)?;
        self.azimuth_start = start;
        self.azimuth_time_interval = interval;
        Ok(())
    }

    pub fn set_look_side(&mut self, look_side: LookSide) {
        self.look_side = look_side;
    }

    pub fn set_adapter(&mut self, adapter: MissionAdapter) -> SarResult<()> {
        adapter.validate()?;
        self.adapter = adapter;
        Ok(())
    }

    /// Acquisition time of an image line
    pub fn time(&self, line: f64) -> SarResult<DateTime<Utc>> {
        add_seconds(self.azimuth_start, line * self.azimuth_time_interval)
    }

    /// Fractional image line acquired at `time`
    pub fn line_at(&self, time: DateTime<Utc>) -> f64 {
        elapsed_seconds(self.azimuth_start, time) / self.azimuth_time_interval
    }

    /// Slant range (m) of an image column
    ///
    /// `azimuth_time` only matters for ground-range products whose polynomials
    /// vary along the orbit.
    pub fn slant_range(&self, col: f64, azimuth_time: DateTime<Utc>) -> f64 {
        match &self.adapter {
            MissionAdapter::SlantRange => {
                (self.near_range_time + col / self.range_sampling_rate) * SPEED_OF_LIGHT / 2.0
            }
            MissionAdapter::GroundRange {
                pixel_spacing,
                records,
            } => MissionAdapter::ground_to_slant_range(records, col * pixel_spacing, azimuth_time),
            MissionAdapter::RangeTimePolynomial { coefficients } => {
                let [c0, c1, c2] = *coefficients;
                (c0 + c1 * col + c2 * col * col) * SPEED_OF_LIGHT / 2.0
            }
        }
    }
}

/// Known correspondence between one image point and its ground position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefPoint {
    pub image: ImagePoint,
    pub ground: GroundPoint,
    pub time: DateTime<Utc>,
    pub slant_range: f64,
}
