//! Piecewise cubic Hermite interpolation of a sampled value and its derivative.
//!
//! Each interval between two consecutive knots carries the unique cubic that
//! matches both end values and both end derivatives, so the curve passes
//! through every knot with the sampled slope there. Outside the knot range the
//! first (resp. last) cubic is extended.

use crate::types::{SarError, SarResult};
use serde::{Deserialize, Serialize};

/// One-dimensional Hermite spline over abscissae sorted in increasing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HermiteSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    derivs: Vec<f64>,
}

impl HermiteSpline {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, derivs: Vec<f64>) -> SarResult<Self> {
        if xs.len() < 2 {
            return Err(SarError::InsufficientData(format!(
                "Hermite interpolation needs at least 2 samples, got {}",
                xs.len()
            )));
        }
        if xs.len() != ys.len() || xs.len() != derivs.len() {
            return Err(SarError::InvalidParameter(format!(
                "Hermite sample lengths differ: {} abscissae, {} values, {} derivatives",
                xs.len(),
                ys.len(),
                derivs.len()
            )));
        }

        Ok(Self { xs, ys, derivs })
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Index of the interval used for `x`, clamped to the first and last interval
    fn interval(&self, x: f64) -> usize {
        let upper = self.xs.partition_point(|&xi| xi <= x);
        upper.saturating_sub(1).min(self.xs.len() - 2)
    }

    /// Value and first derivative at `x`
    pub fn evaluate(&self, x: f64) -> (f64, f64) {
        let i = self.interval(x);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.derivs[i], self.derivs[i + 1]);

        let h = x1 - x0;
        if h == 0.0 {
            // Duplicate knots: nothing to interpolate across
            return (y0, m0);
        }

        let s = (x - x0) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        let value = h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1;

        let d00 = 6.0 * s2 - 6.0 * s;
        let d10 = 3.0 * s2 - 4.0 * s + 1.0;
        let d01 = -6.0 * s2 + 6.0 * s;
        let d11 = 3.0 * s2 - 2.0 * s;
        let derivative = (d00 * y0 + d01 * y1) / h + d10 * m0 + d11 * m1;

        (value, derivative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_passes_through_knots() {
        let xs: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| x.cos()).collect();
        let derivs: Vec<f64> = xs.iter().map(|x| -x.sin()).collect();
        let spline = HermiteSpline::new(xs.clone(), ys, derivs).unwrap();

        for x in xs {
            let (value, derivative) = spline.evaluate(x);
            assert_abs_diff_eq!(value, x.cos(), epsilon = 1e-12);
            assert_abs_diff_eq!(derivative, -x.sin(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cubic_is_reproduced_exactly() {
        let f = |x: f64| 0.5 * x * x * x - 2.0 * x * x + x - 3.0;
        let df = |x: f64| 1.5 * x * x - 4.0 * x + 1.0;
        let xs = vec![-2.0, -0.5, 1.0, 4.0];
        let ys = xs.iter().map(|&x| f(x)).collect();
        let derivs = xs.iter().map(|&x| df(x)).collect();
        let spline = HermiteSpline::new(xs, ys, derivs).unwrap();

        for &x in &[-1.7, -0.1, 0.3, 2.2, 3.9] {
            let (value, derivative) = spline.evaluate(x);
            assert_abs_diff_eq!(value, f(x), epsilon = 1e-10);
            assert_abs_diff_eq!(derivative, df(x), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_extrapolates_with_end_intervals() {
        let spline = HermiteSpline::new(vec![0.0, 1.0], vec![1.0, 3.0], vec![2.0, 2.0]).unwrap();
        let (before, _) = spline.evaluate(-1.0);
        let (after, slope) = spline.evaluate(2.5);
        assert_abs_diff_eq!(before, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(after, 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(slope, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_single_sample() {
        let result = HermiteSpline::new(vec![0.0], vec![1.0], vec![0.0]);
        assert!(matches!(result, Err(SarError::InsufficientData(_))));
    }
}
