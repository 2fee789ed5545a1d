//! Replacement grid model: the rigorous forward projection sampled on a coarse
//! image grid at two heights, then interpolated bilinearly in image space and
//! linearly in height.

use crate::types::{GroundPoint, ImagePoint, SarError, SarResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Sampling parameters of the replacement grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Lines between grid nodes
    pub line_spacing: f64,
    /// Columns between grid nodes
    pub col_spacing: f64,
    /// Lower sampling height (m above ellipsoid)
    pub height: f64,
    /// Upper sampling height is `height + height_delta`
    pub height_delta: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            line_spacing: 50.0,
            col_spacing: 50.0,
            height: 0.0,
            height_delta: 500.0,
        }
    }
}

/// Node positions along one image axis, always including both ends
fn axis_nodes(size: usize, spacing: f64) -> Vec<f64> {
    let last = (size - 1) as f64;
    let steps = (last / spacing).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|i| (i as f64 * spacing).min(last))
        .collect()
}

/// Cell index and fractional position of `x` among `nodes`, extrapolating past the ends
fn locate(nodes: &[f64], x: f64) -> (usize, f64) {
    let upper = nodes.partition_point(|&n| n <= x);
    let i = upper.saturating_sub(1).min(nodes.len() - 2);
    let t = (x - nodes[i]) / (nodes[i + 1] - nodes[i]);
    (i, t)
}

fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Ground coordinates sampled at one height
#[derive(Debug, Clone, PartialEq)]
struct Layer {
    height: f64,
    latitude: Array2<f64>,
    // Unwrapped around the first node so interpolation never crosses the antimeridian
    longitude: Array2<f64>,
}

impl Layer {
    fn sample(&self, row: (usize, f64), col: (usize, f64)) -> (f64, f64) {
        let bilinear = |grid: &Array2<f64>| {
            let (i, dy) = row;
            let (j, dx) = col;
            grid[[i, j]] * (1.0 - dx) * (1.0 - dy)
                + grid[[i, j + 1]] * dx * (1.0 - dy)
                + grid[[i + 1, j]] * (1.0 - dx) * dy
                + grid[[i + 1, j + 1]] * dx * dy
        };
        (bilinear(&self.latitude), bilinear(&self.longitude))
    }
}

/// Coarse replacement for the rigorous forward model
///
/// Works in native (uncorrected) image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CoarseGrid {
    lines: Vec<f64>,
    cols: Vec<f64>,
    layers: [Layer; 2],
}

impl CoarseGrid {
    /// Sample `forward` over an image of `lines` x `cols` pixels
    pub fn build<F>(lines: usize, cols: usize, config: &GridConfig, forward: F) -> SarResult<Self>
    where
        F: Fn(&ImagePoint, f64) -> SarResult<GroundPoint> + Sync,
    {
        if lines < 2 || cols < 2 {
            return Err(SarError::InvalidParameter(format!(
                "Replacement grid needs an image of at least 2x2 pixels, got {}x{}",
                lines, cols
            )));
        }
        if !(config.line_spacing >= 1.0 && config.col_spacing >= 1.0) {
            return Err(SarError::InvalidParameter(format!(
                "Grid spacing must be at least one pixel, got {} x {}",
                config.line_spacing, config.col_spacing
            )));
        }
        if config.height_delta == 0.0 || !config.height_delta.is_finite() {
            return Err(SarError::InvalidParameter(
                "Grid height delta must be non-zero".to_string(),
            ));
        }

        let line_nodes = axis_nodes(lines, config.line_spacing);
        let col_nodes = axis_nodes(cols, config.col_spacing);
        log::info!(
            "🗺️  Building replacement grid: {}x{} nodes over {}x{} pixels",
            line_nodes.len(),
            col_nodes.len(),
            lines,
            cols
        );

        let lower = Self::sample_layer(&line_nodes, &col_nodes, config.height, &forward)?;
        let upper = Self::sample_layer(
            &line_nodes,
            &col_nodes,
            config.height + config.height_delta,
            &forward,
        )?;

        Ok(Self {
            lines: line_nodes,
            cols: col_nodes,
            layers: [lower, upper],
        })
    }

    fn sample_layer<F>(line_nodes: &[f64], col_nodes: &[f64], height: f64, forward: &F) -> SarResult<Layer>
    where
        F: Fn(&ImagePoint, f64) -> SarResult<GroundPoint> + Sync,
    {
        let shape = (line_nodes.len(), col_nodes.len());
        let coords: Vec<ImagePoint> = line_nodes
            .iter()
            .flat_map(|&line| col_nodes.iter().map(move |&col| ImagePoint::new(line, col)))
            .collect();

        #[cfg(feature = "parallel")]
        let points: SarResult<Vec<GroundPoint>> = {
            use rayon::prelude::*;
            coords.par_iter().map(|p| forward(p, height)).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let points: SarResult<Vec<GroundPoint>> = coords.iter().map(|p| forward(p, height)).collect();
        let points = points?;

        let reference = points.first().map(|p| p.longitude).unwrap_or(0.0);
        let latitude: Vec<f64> = points.iter().map(|p| p.latitude).collect();
        let longitude: Vec<f64> = points
            .iter()
            .map(|p| reference + wrap_longitude(p.longitude - reference))
            .collect();

        let to_grid = |values: Vec<f64>| {
            Array2::from_shape_vec(shape, values)
                .map_err(|e| SarError::InvalidParameter(format!("Grid shape error: {}", e)))
        };
        Ok(Layer {
            height,
            latitude: to_grid(latitude)?,
            longitude: to_grid(longitude)?,
        })
    }

    /// Number of (line, column) nodes
    pub fn dim(&self) -> (usize, usize) {
        (self.lines.len(), self.cols.len())
    }

    /// Interpolated ground position of a native image point at `height`
    pub fn line_sample_height_to_world(&self, native: &ImagePoint, height: f64) -> GroundPoint {
        let row = locate(&self.lines, native.line);
        let col = locate(&self.cols, native.col);

        let [lower, upper] = &self.layers;
        let (lat0, lon0) = lower.sample(row, col);
        let (lat1, lon1) = upper.sample(row, col);
        let w = (height - lower.height) / (upper.height - lower.height);

        GroundPoint::new(
            lat0 + w * (lat1 - lat0),
            wrap_longitude(lon0 + w * (lon1 - lon0)),
            height,
        )
    }
}
