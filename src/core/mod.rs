//! Core geometric SAR modules

pub mod ephemeris;
pub mod hermite;
pub mod orbit;
pub mod frames;
pub mod geodesy;
pub mod sensor_params;
pub mod sar_sensor;
pub mod gcp;
pub mod elevation;
pub mod coarse_grid;
pub mod sensor_model;

// Re-export main types
pub use ephemeris::Ephemeris;
pub use orbit::PlatformPosition;
pub use frames::{to_earth_fixed, to_inertial};
pub use geodesy::{ecef_to_ground, ground_to_ecef};
pub use sensor_params::{MissionAdapter, RefPoint, SensorParams, SrgrRecord};
pub use sar_sensor::SarSensor;
pub use gcp::{Correction, GcpList};
pub use elevation::{ConstantHeight, GriddedHeights, HeightProvider};
pub use coarse_grid::{CoarseGrid, GridConfig};
pub use sensor_model::{GeometricSarSensorModel, SolverConfig};
