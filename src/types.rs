use serde::{Deserialize, Serialize};

/// Cartesian 3-vector (meters or m/s, Earth-centered)
pub type Vec3 = nalgebra::Vector3<f64>;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 2.99792458e+8;

/// Reference frame of a set of ephemeris samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceFrame {
    /// Earth-centered, Earth-fixed rotating frame
    EarthFixed,
    /// Mean equator and equinox of date (quasi-inertial)
    QuasiInertial,
}

impl std::fmt::Display for ReferenceFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceFrame::EarthFixed => write!(f, "EARTH_FIXED"),
            ReferenceFrame::QuasiInertial => write!(f, "QUASI_INERTIAL"),
        }
    }
}

impl std::str::FromStr for ReferenceFrame {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EARTH_FIXED" | "ECEF" => Ok(ReferenceFrame::EarthFixed),
            "QUASI_INERTIAL" | "MOD" => Ok(ReferenceFrame::QuasiInertial),
            other => Err(SarError::InvalidParameter(format!(
                "Unknown reference frame: {}",
                other
            ))),
        }
    }
}

/// Side the antenna looks to, relative to the platform velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookSide {
    Right,
    Left,
}

impl std::fmt::Display for LookSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookSide::Right => write!(f, "RIGHT"),
            LookSide::Left => write!(f, "LEFT"),
        }
    }
}

impl std::str::FromStr for LookSide {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RIGHT" => Ok(LookSide::Right),
            "LEFT" => Ok(LookSide::Left),
            other => Err(SarError::InvalidParameter(format!(
                "Unknown look side: {}",
                other
            ))),
        }
    }
}

/// Image coordinate: column (x, range direction) and line (y, azimuth direction)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagePoint {
    pub col: f64,
    pub line: f64,
}

impl ImagePoint {
    pub fn new(line: f64, col: f64) -> Self {
        Self { col, line }
    }

    pub fn distance(&self, other: &ImagePoint) -> f64 {
        ((self.col - other.col).powi(2) + (self.line - other.line).powi(2)).sqrt()
    }
}

/// Geodetic ground coordinate on the WGS84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundPoint {
    pub latitude: f64,  // degrees
    pub longitude: f64, // degrees
    pub height: f64,    // meters above ellipsoid
}

impl GroundPoint {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
        }
    }
}

/// Ground control point: a known ground position and where it appears in the image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gcp {
    pub ground: GroundPoint,
    pub image: ImagePoint,
}

/// Affine mapping from raster pixel indices to longitude/latitude (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Fractional (row, col) raster position of a longitude/latitude pair
    ///
    /// Rotation terms are ignored, as for north-up elevation grids.
    pub fn to_pixel(&self, longitude: f64, latitude: f64) -> (f64, f64) {
        let col = (longitude - self.top_left_x) / self.pixel_width;
        let row = (latitude - self.top_left_y) / self.pixel_height;
        (row, col)
    }
}

/// Error types for geometric SAR processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Insufficient ground control points: {available} available, at least 2 required")]
    InsufficientGcp { available: usize },

    #[error("GCP lists differ in length: {ground} ground points, {image} image points")]
    MismatchedGcpLists { ground: usize, image: usize },

    #[error("Geometric solve failed: {0}")]
    GeometricSolve(String),

    #[error("Singular Jacobian at inverse iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error("Inverse location did not converge after {iterations} iterations (last step {step:.3e} px)")]
    NonConvergence { iterations: usize, step: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Required keyword not found: {0}")]
    MissingKeyword(String),

    #[error("Invalid value '{value}' for keyword {key}: {reason}")]
    Keyword {
        key: String,
        value: String,
        reason: String,
    },
}

/// Result type for SAR geometry operations
pub type SarResult<T> = Result<T, SarError>;
