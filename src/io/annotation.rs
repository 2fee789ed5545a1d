use crate::core::sensor_params::{MissionAdapter, RefPoint, SensorParams, SrgrRecord};
use crate::io::keywordlist::{key, Keywordlist};
use crate::types::{GroundPoint, ImagePoint, LookSide, SarError, SarResult};

const SLANT_RANGE: &str = "SLANT_RANGE";
const GROUND_RANGE: &str = "GROUND_RANGE";
const RANGE_TIME_POLYNOMIAL: &str = "RANGE_TIME_POLYNOMIAL";

/// Acquisition metadata (sensor parameters, reference point, range conversion)
/// to and from keyword lists
pub struct AnnotationParser;

impl AnnotationParser {
    pub fn save_sensor_params(params: &SensorParams, kwl: &mut Keywordlist, prefix: &str) {
        kwl.add(key(prefix, "prf"), params.prf());
        kwl.add(key(prefix, "radar_frequency"), params.radar_frequency());
        kwl.add(key(prefix, "range_sampling_rate"), params.range_sampling_rate());
        kwl.add(key(prefix, "near_range_time"), params.near_range_time());
        kwl.add(key(prefix, "range_resolution"), params.range_resolution());
        kwl.add(key(prefix, "azimuth_resolution"), params.azimuth_resolution());
        kwl.add_time(key(prefix, "azimuth_start"), params.azimuth_start());
        kwl.add(key(prefix, "azimuth_time_interval"), params.azimuth_time_interval());
        kwl.add(key(prefix, "look_side"), params.look_side());
        kwl.add(key(prefix, "product_georeferenced_flag"), params.is_georeferenced());
        Self::save_adapter(params.adapter(), kwl, prefix);
    }

    fn save_adapter(adapter: &MissionAdapter, kwl: &mut Keywordlist, prefix: &str) {
        match adapter {
            MissionAdapter::SlantRange => kwl.add(key(prefix, "range_mode"), SLANT_RANGE),
            MissionAdapter::GroundRange {
                pixel_spacing,
                records,
            } => {
                kwl.add(key(prefix, "range_mode"), GROUND_RANGE);
                kwl.add(key(prefix, "srgr.pixel_spacing"), pixel_spacing);
                kwl.add(key(prefix, "srgr.count"), records.len());
                for (i, record) in records.iter().enumerate() {
                    let item = format!("{}srgr[{}].", prefix, i);
                    kwl.add_time(key(&item, "azimuth_time"), record.azimuth_time);
                    kwl.add(key(&item, "ground_range_origin"), record.ground_range_origin);
                    kwl.add_list(key(&item, "coefficients"), &record.coefficients);
                }
            }
            MissionAdapter::RangeTimePolynomial { coefficients } => {
                kwl.add(key(prefix, "range_mode"), RANGE_TIME_POLYNOMIAL);
                kwl.add_list(key(prefix, "range_time_coefficients"), coefficients);
            }
        }
    }

    pub fn load_sensor_params(kwl: &Keywordlist, prefix: &str) -> SarResult<SensorParams> {
        let mut params = SensorParams::new(
            kwl.get(&key(prefix, "prf"))?,
            kwl.get(&key(prefix, "radar_frequency"))?,
            kwl.get(&key(prefix, "range_sampling_rate"))?,
            kwl.get(&key(prefix, "near_range_time"))?,
            kwl.get_time(&key(prefix, "azimuth_start"))?,
        )?;

        let interval_key = key(prefix, "azimuth_time_interval");
        if kwl.contains(&interval_key) {
            params.set_azimuth_time_interval(kwl.get(&interval_key)?)?;
        }
        let range_resolution = kwl.get_or(&key(prefix, "range_resolution"), params.range_resolution())?;
        let azimuth_resolution = kwl.get_or(&key(prefix, "azimuth_resolution"), 0.0)?;
        params.set_resolutions(range_resolution, azimuth_resolution)?;
        params.set_look_side(kwl.get_or(&key(prefix, "look_side"), LookSide::Right)?);
        params.set_adapter(Self::load_adapter(kwl, prefix)?)?;

        let flag_key = key(prefix, "product_georeferenced_flag");
        if kwl.contains(&flag_key) && kwl.get::<bool>(&flag_key)? != params.is_georeferenced() {
            return Err(SarError::Keyword {
                key: flag_key.clone(),
                value: kwl.find(&flag_key).unwrap_or_default().to_string(),
                reason: format!("inconsistent with range mode {:?}", params.adapter()),
            });
        }

        Ok(params)
    }

    fn load_adapter(kwl: &Keywordlist, prefix: &str) -> SarResult<MissionAdapter> {
        let mode_key = key(prefix, "range_mode");
        let mode: String = kwl.get_or(&mode_key, SLANT_RANGE.to_string())?;
        match mode.as_str() {
            SLANT_RANGE => Ok(MissionAdapter::SlantRange),
            GROUND_RANGE => {
                let count: usize = kwl.get(&key(prefix, "srgr.count"))?;
                let records = (0..count)
                    .map(|i| {
                        let item = format!("{}srgr[{}].", prefix, i);
                        Ok(SrgrRecord {
                            azimuth_time: kwl.get_time(&key(&item, "azimuth_time"))?,
                            ground_range_origin: kwl.get(&key(&item, "ground_range_origin"))?,
                            coefficients: kwl.get_list(&key(&item, "coefficients"))?,
                        })
                    })
                    .collect::<SarResult<Vec<_>>>()?;
                Ok(MissionAdapter::GroundRange {
                    pixel_spacing: kwl.get(&key(prefix, "srgr.pixel_spacing"))?,
                    records,
                })
            }
            RANGE_TIME_POLYNOMIAL => Ok(MissionAdapter::RangeTimePolynomial {
                coefficients: kwl.get_array::<3>(&key(prefix, "range_time_coefficients"))?,
            }),
            other => Err(SarError::Keyword {
                key: mode_key,
                value: other.to_string(),
                reason: format!(
                    "expected one of {}, {}, {}",
                    SLANT_RANGE, GROUND_RANGE, RANGE_TIME_POLYNOMIAL
                ),
            }),
        }
    }

    pub fn save_ref_point(ref_point: &RefPoint, kwl: &mut Keywordlist, prefix: &str) {
        kwl.add(key(prefix, "line"), ref_point.image.line);
        kwl.add(key(prefix, "col"), ref_point.image.col);
        kwl.add(key(prefix, "latitude"), ref_point.ground.latitude);
        kwl.add(key(prefix, "longitude"), ref_point.ground.longitude);
        kwl.add(key(prefix, "height"), ref_point.ground.height);
        kwl.add_time(key(prefix, "time"), ref_point.time);
        kwl.add(key(prefix, "slant_range"), ref_point.slant_range);
    }

    pub fn load_ref_point(kwl: &Keywordlist, prefix: &str) -> SarResult<RefPoint> {
        Ok(RefPoint {
            image: ImagePoint::new(kwl.get(&key(prefix, "line"))?, kwl.get(&key(prefix, "col"))?),
            ground: GroundPoint::new(
                kwl.get(&key(prefix, "latitude"))?,
                kwl.get(&key(prefix, "longitude"))?,
                kwl.get(&key(prefix, "height"))?,
            ),
            time: kwl.get_time(&key(prefix, "time"))?,
            slant_range: kwl.get(&key(prefix, "slant_range"))?,
        })
    }
}
