//! Height-above-ellipsoid sources injected into terrain-aware projections

use crate::types::{GeoTransform, SarError, SarResult};
use ndarray::Array2;

/// Anything that can tell the height above the WGS84 ellipsoid at a location
pub trait HeightProvider {
    /// Height (m) at the given latitude/longitude (degrees), `None` when unknown
    fn height_above_ellipsoid(&self, latitude: f64, longitude: f64) -> Option<f64>;
}

impl<F> HeightProvider for F
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn height_above_ellipsoid(&self, latitude: f64, longitude: f64) -> Option<f64> {
        self(latitude, longitude)
    }
}

/// Same height everywhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantHeight(pub f64);

impl HeightProvider for ConstantHeight {
    fn height_above_ellipsoid(&self, _latitude: f64, _longitude: f64) -> Option<f64> {
        Some(self.0)
    }
}

/// North-up in-memory elevation raster, bilinearly interpolated
#[derive(Debug, Clone)]
pub struct GriddedHeights {
    heights: Array2<f32>,
    transform: GeoTransform,
    nodata: f32,
}

impl GriddedHeights {
    pub fn new(heights: Array2<f32>, transform: GeoTransform, nodata: f32) -> SarResult<Self> {
        let (rows, cols) = heights.dim();
        if rows < 2 || cols < 2 {
            return Err(SarError::InvalidParameter(format!(
                "Elevation grid must be at least 2x2, got {}x{}",
                rows, cols
            )));
        }
        if transform.pixel_width == 0.0 || transform.pixel_height == 0.0 {
            return Err(SarError::InvalidParameter(
                "Elevation grid pixel size must be non-zero".to_string(),
            ));
        }
        log::debug!("Elevation grid {}x{} loaded, nodata = {}", rows, cols, nodata);
        Ok(Self {
            heights,
            transform,
            nodata,
        })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.heights.dim()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }
}

impl HeightProvider for GriddedHeights {
    fn height_above_ellipsoid(&self, latitude: f64, longitude: f64) -> Option<f64> {
        let (row, col) = self.transform.to_pixel(longitude, latitude);
        let (rows, cols) = self.heights.dim();

        if row < 0.0 || col < 0.0 || row > (rows - 1) as f64 || col > (cols - 1) as f64 {
            return None;
        }

        let x1 = (col.floor() as usize).min(cols - 2);
        let y1 = (row.floor() as usize).min(rows - 2);
        let (x2, y2) = (x1 + 1, y1 + 1);
        let dx = col - x1 as f64;
        let dy = row - y1 as f64;

        let corners = [
            self.heights[[y1, x1]],
            self.heights[[y2, x1]],
            self.heights[[y1, x2]],
            self.heights[[y2, x2]],
        ];
        if corners.iter().any(|&v| v == self.nodata || v.is_nan()) {
            return None;
        }
        let [v11, v12, v21, v22] = corners.map(f64::from);

        Some(
            v11 * (1.0 - dx) * (1.0 - dy)
                + v21 * dx * (1.0 - dy)
                + v12 * (1.0 - dx) * dy
                + v22 * dx * dy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn small_grid() -> GriddedHeights {
        // 0.1 degree posting, top-left at (lon 10.0, lat 45.0)
        let heights = array![[100.0f32, 200.0, 300.0], [110.0, 210.0, -32768.0]];
        let transform = GeoTransform {
            top_left_x: 10.0,
            pixel_width: 0.1,
            rotation_x: 0.0,
            top_left_y: 45.0,
            rotation_y: 0.0,
            pixel_height: -0.1,
        };
        GriddedHeights::new(heights, transform, -32768.0).unwrap()
    }

    #[test]
    fn test_bilinear_between_posts() {
        let grid = small_grid();
        assert_abs_diff_eq!(grid.height_above_ellipsoid(45.0, 10.0).unwrap(), 100.0, epsilon = 1e-9);
        let h = grid.height_above_ellipsoid(44.95, 10.05).unwrap();
        assert_abs_diff_eq!(h, (100.0 + 200.0 + 110.0 + 210.0) / 4.0, epsilon = 1e-3);
    }

    #[test]
    fn test_nodata_and_outside_are_unknown() {
        let grid = small_grid();
        assert!(grid.height_above_ellipsoid(44.95, 10.15).is_none());
        assert!(grid.height_above_ellipsoid(46.0, 10.05).is_none());
    }

    #[test]
    fn test_closures_and_constants_provide_heights() {
        let flat = ConstantHeight(42.0);
        assert_eq!(flat.height_above_ellipsoid(0.0, 0.0), Some(42.0));
        let slope = |lat: f64, _lon: f64| Some(lat * 10.0);
        assert_eq!(slope.height_above_ellipsoid(3.0, 0.0), Some(30.0));
    }
}
