use crate::core::ephemeris::Ephemeris;
use crate::core::orbit::PlatformPosition;
use crate::io::keywordlist::{key, Keywordlist};
use crate::types::{ReferenceFrame, SarError, SarResult, Vec3};

/// Orbit state vectors to and from keyword lists
pub struct OrbitReader;

impl OrbitReader {
    /// Write all samples of `orbit` under `prefix`
    pub fn save(orbit: &PlatformPosition, kwl: &mut Keywordlist, prefix: &str) {
        kwl.add(key(prefix, "count"), orbit.len());
        if let Some(frame) = orbit.frame() {
            kwl.add(key(prefix, "frame"), frame);
        }
        for (i, sample) in orbit.samples().iter().enumerate() {
            let item = format!("{}[{}].", prefix.trim_end_matches('.'), i);
            kwl.add_time(key(&item, "time"), sample.time);
            kwl.add_list(key(&item, "position"), sample.position.as_slice());
            kwl.add_list(key(&item, "velocity"), sample.velocity.as_slice());
        }
    }

    /// Read the samples written by [`OrbitReader::save`] and build the interpolator
    pub fn load(kwl: &Keywordlist, prefix: &str) -> SarResult<PlatformPosition> {
        let count: usize = kwl.get(&key(prefix, "count"))?;
        let frame: ReferenceFrame = kwl.get_or(&key(prefix, "frame"), ReferenceFrame::EarthFixed)?;

        let samples = (0..count)
            .map(|i| {
                let item = format!("{}[{}].", prefix.trim_end_matches('.'), i);
                Ok(Ephemeris::new(
                    kwl.get_time(&key(&item, "time"))?,
                    Vec3::from(kwl.get_array::<3>(&key(&item, "position"))?),
                    Vec3::from(kwl.get_array::<3>(&key(&item, "velocity"))?),
                    frame,
                ))
            })
            .collect::<SarResult<Vec<_>>>()?;

        Self::validate_orbit_data(&samples)?;
        log::info!("Loaded {} orbit state vectors ({} frame)", samples.len(), frame);
        PlatformPosition::new(samples)
    }

    /// Sanity checks on state vectors
    ///
    /// Out-of-order samples are an error; implausible speeds or radii for a
    /// low Earth orbit are only reported.
    pub fn validate_orbit_data(samples: &[Ephemeris]) -> SarResult<()> {
        if samples.is_empty() {
            return Err(SarError::InsufficientData("No state vectors to validate".to_string()));
        }

        if let Some(pair) = samples.windows(2).find(|w| w[1].time < w[0].time) {
            return Err(SarError::InvalidParameter(format!(
                "State vectors are not chronological: {} follows {}",
                pair[1].time, pair[0].time
            )));
        }

        for sv in samples {
            // Speeds are checked in the frame given; LEO is ~7.5 km/s either way
            let speed = sv.speed();
            if !(6_000.0..=9_000.0).contains(&speed) {
                log::warn!(
                    "Unusual orbital velocity: {:.1} m/s at {}",
                    speed,
                    sv.time.format("%Y-%m-%d %H:%M:%S")
                );
            }

            let radius = sv.radius();
            if !(6_400_000.0..=8_500_000.0).contains(&radius) {
                log::warn!(
                    "Unusual orbital radius: {:.1} km at {}",
                    radius / 1000.0,
                    sv.time.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }

        log::debug!("Orbit data validation completed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ephemeris::add_seconds;
    use chrono::{TimeZone, Utc};

    fn samples() -> Vec<Ephemeris> {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 3, 17, 8, 0).unwrap();
        (0..4)
            .map(|i| {
                let dt = 10.0 * i as f64;
                Ephemeris::earth_fixed(
                    add_seconds(t0, dt + 0.123_456_789).unwrap(),
                    [7_071_000.0 / 3.0, 1.0 / 7.0 + 7_500.0 * dt, 0.1 + 0.2],
                    [0.3, 7_500.0, -1.0 / 3.0],
                )
            })
            .collect()
    }

    #[test]
    fn test_save_load_is_bit_identical() {
        let orbit = PlatformPosition::new(samples()).unwrap();
        let mut kwl = Keywordlist::new();
        OrbitReader::save(&orbit, &mut kwl, "orbit.");
        assert_eq!(kwl.find("orbit.count"), Some("4"));
        assert!(kwl.contains("orbit[2].velocity"));

        let text = kwl.to_string();
        let reloaded = OrbitReader::load(&text.parse().unwrap(), "orbit.").unwrap();
        assert_eq!(reloaded, orbit);
    }

    #[test]
    fn test_unordered_samples_rejected() {
        let mut samples = samples();
        samples.swap(1, 2);
        assert!(OrbitReader::validate_orbit_data(&samples).is_err());
        assert!(OrbitReader::validate_orbit_data(&[]).is_err());
    }
}
