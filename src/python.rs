use crate::core::glt::{self, GeometricLookupTable, UnorthoParams, CollisionPolicy};
use crate::core::pipeline::{CloudShadowProcessor, ProcessingParams};
use crate::core::shadow_caster::ShadowParams;
use numpy::{PyReadonlyArray2, PyReadonlyArray3, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(e: crate::types::CloudShadowError) -> PyErr {
    PyValueError::new_err(format!("{}", e))
}

fn parse_collision_policy(policy: &str) -> PyResult<CollisionPolicy> {
    match policy.to_lowercase().as_str() {
        "first" => Ok(CollisionPolicy::First),
        "last" => Ok(CollisionPolicy::Last),
        "mean" => Ok(CollisionPolicy::Mean),
        _ => Err(PyValueError::new_err(format!("Invalid collision policy: {}", policy))),
    }
}

/// Orthorectify a (rows, cols, bands) sensor raster with a band-last GLT
#[pyfunction]
fn ortho(
    py: Python,
    img_dat: PyReadonlyArray3<f32>,
    glt_data: PyReadonlyArray3<i32>,
) -> PyResult<PyObject> {
    let table = GeometricLookupTable::new(glt_data.as_array().to_owned()).map_err(to_py_err)?;
    let result = glt::ortho(img_dat.as_array(), &table).map_err(to_py_err)?;
    Ok(result.to_pyarray(py).into())
}

/// Map a (rows, cols, bands) map-grid raster back onto the sensor grid
#[pyfunction]
#[pyo3(signature = (img_dat, glt_data, rows, cols, interpolate = false, collision_policy = "last"))]
fn unortho(
    py: Python,
    img_dat: PyReadonlyArray3<f32>,
    glt_data: PyReadonlyArray3<i32>,
    rows: usize,
    cols: usize,
    interpolate: bool,
    collision_policy: &str,
) -> PyResult<PyObject> {
    let table = GeometricLookupTable::new(glt_data.as_array().to_owned()).map_err(to_py_err)?;
    let params = UnorthoParams {
        interpolate,
        collision_policy: parse_collision_policy(collision_policy)?,
        max_fill_radius: None,
    };
    let result = glt::unortho(img_dat.as_array(), &table, (rows, cols), &params).map_err(to_py_err)?;
    Ok(result.to_pyarray(py).into())
}

/// Sensor-grid cloud shadow distances
#[pyfunction]
#[pyo3(signature = (clouds, solar_azimuth, solar_zenith, glt_data, pixel_size = 60.0, cloud_height = 4000.0))]
fn cloud_shadow_distance(
    py: Python,
    clouds: PyReadonlyArray2<f32>,
    solar_azimuth: PyReadonlyArray2<f32>,
    solar_zenith: PyReadonlyArray2<f32>,
    glt_data: PyReadonlyArray3<i32>,
    pixel_size: f64,
    cloud_height: f64,
) -> PyResult<PyObject> {
    let table = GeometricLookupTable::new(glt_data.as_array().to_owned()).map_err(to_py_err)?;
    let params = ProcessingParams {
        shadow: ShadowParams {
            pixel_size_m: pixel_size,
            cloud_height_m: cloud_height,
            ..Default::default()
        },
        ..Default::default()
    };
    let processor = CloudShadowProcessor::new(params).map_err(to_py_err)?;
    let product = processor
        .process(clouds.as_array(), solar_azimuth.as_array(), solar_zenith.as_array(), &table)
        .map_err(to_py_err)?;

    let result = PyDict::new(py);
    result.set_item("data", product.sensor_distances.to_pyarray(py))?;
    result.set_item("map_data", product.map_distances.to_pyarray(py))?;
    result.set_item("cloud_pixels", product.stats.cloud_pixels)?;
    result.set_item("shaded_pixels", product.stats.shaded_pixels)?;
    result.set_item("unfilled_pixels", product.stats.unfilled_pixels)?;
    Ok(result.into())
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ortho, m)?)?;
    m.add_function(wrap_pyfunction!(unortho, m)?)?;
    m.add_function(wrap_pyfunction!(cloud_shadow_distance, m)?)?;
    Ok(())
}
