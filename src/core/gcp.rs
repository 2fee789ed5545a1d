//! Ground control point bookkeeping and the per-axis linear correction fitted from them.
//!
//! Native (sensor) image coordinates `n` and corrected image coordinates `i`
//! relate by `i = factor * n + bias`, independently for columns (x) and lines (y).

use crate::types::{Gcp, GroundPoint, ImagePoint, SarError, SarResult};
use serde::{Deserialize, Serialize};

/// Variance below which an axis is fitted as a pure offset
const MIN_VARIANCE: f64 = f32::EPSILON as f64;

/// Factors smaller than this in magnitude collapse an image axis
const MIN_FACTOR: f64 = f32::EPSILON as f64;

/// Scale and offset applied per image axis on top of the geometric model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub factor_x: f64,
    pub factor_y: f64,
    pub bias_x: f64,
    pub bias_y: f64,
}

impl Default for Correction {
    fn default() -> Self {
        Self::identity()
    }
}

impl Correction {
    pub fn identity() -> Self {
        Self {
            factor_x: 1.0,
            factor_y: 1.0,
            bias_x: 0.0,
            bias_y: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Check that the correction can be inverted
    pub fn validate(&self) -> SarResult<()> {
        let axes = [
            ("x", self.factor_x, self.bias_x),
            ("y", self.factor_y, self.bias_y),
        ];
        for (axis, factor, bias) in axes {
            if !(factor.is_finite() && factor.abs() >= MIN_FACTOR && bias.is_finite()) {
                return Err(SarError::InvalidParameter(format!(
                    "Degenerate {} correction: factor {}, bias {}",
                    axis, factor, bias
                )));
            }
        }
        Ok(())
    }

    /// Corrected image coordinates of a native point
    pub fn apply(&self, native: &ImagePoint) -> ImagePoint {
        ImagePoint {
            col: self.factor_x * native.col + self.bias_x,
            line: self.factor_y * native.line + self.bias_y,
        }
    }

    /// Native coordinates of a corrected image point
    pub fn remove(&self, image: &ImagePoint) -> ImagePoint {
        ImagePoint {
            col: (image.col - self.bias_x) / self.factor_x,
            line: (image.line - self.bias_y) / self.factor_y,
        }
    }

    /// Least-squares fit of `actual = factor * predicted + bias` on both axes
    pub fn fit(predicted: &[ImagePoint], actual: &[ImagePoint]) -> SarResult<Self> {
        if predicted.len() != actual.len() {
            return Err(SarError::MismatchedGcpLists {
                ground: predicted.len(),
                image: actual.len(),
            });
        }
        if predicted.len() < 2 {
            return Err(SarError::InsufficientGcp {
                available: predicted.len(),
            });
        }

        let column = |points: &[ImagePoint]| points.iter().map(|p| p.col).collect::<Vec<_>>();
        let line = |points: &[ImagePoint]| points.iter().map(|p| p.line).collect::<Vec<_>>();

        let (factor_x, bias_x) = fit_axis(&column(predicted), &column(actual));
        let (factor_y, bias_y) = fit_axis(&line(predicted), &line(actual));
        let correction = Self {
            factor_x,
            factor_y,
            bias_x,
            bias_y,
        };
        correction.validate()?;
        Ok(correction)
    }
}

/// Simple linear regression of `ys` on `xs`, returning (slope, intercept)
///
/// Falls back to slope 1 and a mean offset when `xs` has no spread, which is
/// the case for GCPs all lying on one image line or column.
fn fit_axis(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }

    if sxx / n < MIN_VARIANCE {
        return (1.0, mean_y - mean_x);
    }
    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x)
}

/// Parallel lists of ground and image coordinates accumulated for optimisation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcpList {
    ground: Vec<GroundPoint>,
    image: Vec<ImagePoint>,
}

impl GcpList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists of equal length, or `MismatchedGcpLists`
    pub fn from_parts(ground: Vec<GroundPoint>, image: Vec<ImagePoint>) -> SarResult<Self> {
        if ground.len() != image.len() {
            return Err(SarError::MismatchedGcpLists {
                ground: ground.len(),
                image: image.len(),
            });
        }
        Ok(Self { ground, image })
    }

    pub fn len(&self) -> usize {
        self.ground.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ground.is_empty()
    }

    pub fn ground(&self) -> &[GroundPoint] {
        &self.ground
    }

    pub fn image(&self) -> &[ImagePoint] {
        &self.image
    }

    pub fn iter(&self) -> impl Iterator<Item = Gcp> + '_ {
        self.ground
            .iter()
            .zip(self.image.iter())
            .map(|(ground, image)| Gcp {
                ground: *ground,
                image: *image,
            })
    }

    /// Copy of this list with more pairs appended
    pub fn extended(&self, ground: &[GroundPoint], image: &[ImagePoint]) -> SarResult<Self> {
        if ground.len() != image.len() {
            return Err(SarError::MismatchedGcpLists {
                ground: ground.len(),
                image: image.len(),
            });
        }
        let mut list = self.clone();
        list.ground.extend_from_slice(ground);
        list.image.extend_from_slice(image);
        Ok(list)
    }

    pub fn clear(&mut self) {
        self.ground.clear();
        self.image.clear();
    }
}
