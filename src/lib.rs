//! sargeom: geometric SAR sensor model
//!
//! Orbit state-vector interpolation, Earth-fixed/quasi-inertial frame
//! conversion, and image <-> ground projection for slant- and ground-range
//! SAR products, with GCP-based refinement of the model.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    GeoTransform, Gcp, GroundPoint, ImagePoint, LookSide, ReferenceFrame, SarError, SarResult,
    Vec3, SPEED_OF_LIGHT,
};

pub use crate::core::{
    ConstantHeight, Correction, Ephemeris, GcpList, GeometricSarSensorModel, GridConfig,
    GriddedHeights, HeightProvider, MissionAdapter, PlatformPosition, RefPoint, SensorParams,
    SolverConfig, SrgrRecord,
};
pub use io::{AnnotationParser, Keywordlist, OrbitReader};

#[cfg(feature = "python")]
mod python {
    use super::*;
    use pyo3::exceptions::PyRuntimeError;
    use pyo3::prelude::*;

    fn to_py_err(e: SarError) -> PyErr {
        PyErr::new::<PyRuntimeError, _>(format!("{}", e))
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PySensorModel>()?;
        Ok(())
    }

    /// Python wrapper for GeometricSarSensorModel
    #[pyclass(name = "SensorModel")]
    struct PySensorModel {
        inner: GeometricSarSensorModel,
    }

    #[pymethods]
    impl PySensorModel {
        /// Build from the text of a saved keyword list
        #[new]
        fn new(state: &str) -> PyResult<Self> {
            let kwl: Keywordlist = state.parse().map_err(to_py_err)?;
            let inner = GeometricSarSensorModel::load_state(&kwl, "").map_err(to_py_err)?;
            Ok(PySensorModel { inner })
        }

        #[staticmethod]
        fn load(path: String) -> PyResult<Self> {
            let kwl = Keywordlist::load(&path).map_err(to_py_err)?;
            let inner = GeometricSarSensorModel::load_state(&kwl, "").map_err(to_py_err)?;
            Ok(PySensorModel { inner })
        }

        fn save(&self, path: String) -> PyResult<()> {
            let mut kwl = Keywordlist::new();
            self.inner.save_state(&mut kwl, "");
            kwl.save(&path).map_err(to_py_err)
        }

        /// (latitude, longitude, height) of an image point at a given height
        fn line_sample_height_to_world(&self, line: f64, col: f64, height: f64) -> PyResult<(f64, f64, f64)> {
            let ground = self
                .inner
                .line_sample_height_to_world(&ImagePoint::new(line, col), height)
                .map_err(to_py_err)?;
            Ok((ground.latitude, ground.longitude, ground.height))
        }

        /// (line, col) of a ground point
        fn world_to_line_sample(&self, latitude: f64, longitude: f64, height: f64) -> PyResult<(f64, f64)> {
            let image = self
                .inner
                .world_to_line_sample(&GroundPoint::new(latitude, longitude, height))
                .map_err(to_py_err)?;
            Ok((image.line, image.col))
        }

        fn optimize_model(&mut self, ground: Vec<(f64, f64, f64)>, image: Vec<(f64, f64)>) -> PyResult<()> {
            let ground: Vec<GroundPoint> = ground
                .into_iter()
                .map(|(lat, lon, h)| GroundPoint::new(lat, lon, h))
                .collect();
            let image: Vec<ImagePoint> = image
                .into_iter()
                .map(|(line, col)| ImagePoint::new(line, col))
                .collect();
            self.inner.optimize_model(&ground, &image).map_err(to_py_err)
        }

        fn clear_gcp_list(&mut self) {
            self.inner.clear_gcp_list();
        }

        #[getter]
        fn correction(&self) -> (f64, f64, f64, f64) {
            let c = self.inner.correction();
            (c.factor_x, c.factor_y, c.bias_x, c.bias_y)
        }

        fn __str__(&self) -> String {
            format!("{}", self.inner)
        }
    }
}
