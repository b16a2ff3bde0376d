use pyo3::prelude::*;

pub mod config;
pub mod deproject;
pub mod error;
pub mod frame;
pub mod interpolation;
pub mod pipeline;
pub mod profile;

pub use config::{BeamCalibration, DiskGeometry, PipelineSettings, WcsHeader};
pub use error::DeprojectionError;

#[pymodule]
fn diskprofile(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    py_module.add_class::<config::DiskGeometry>()?;
    py_module.add_class::<config::BeamCalibration>()?;
    py_module.add_class::<config::WcsHeader>()?;
    py_module.add_class::<config::PipelineSettings>()?;

    // Register submodules
    register_frame_module(py_module)?;
    register_deproject_module(py_module)?;
    register_profile_module(py_module)?;
    register_pipeline_module(py_module)?;

    py_module.add(
        "__doc__",
        "Disk deprojection and radial brightness-temperature profiles implemented in Rust.",
    )?;

    Ok(())
}

fn register_frame_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "frame")?;
    submodule.add("__doc__", "Sky-plane offset axes and cutouts.")?;
    submodule.add_function(wrap_pyfunction!(frame::sky_frame, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(frame::cutout_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

fn register_deproject_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "deproject")?;
    submodule.add("__doc__", "Face-on resampling of an inclined disk.")?;
    submodule.add_class::<deproject::DeprojectionResult>()?;
    submodule.add_function(wrap_pyfunction!(deproject::deproject_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

fn register_profile_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "profile")?;
    submodule.add("__doc__", "Azimuthally averaged brightness-temperature profile.")?;
    submodule.add_class::<profile::RadialProfileResult>()?;
    submodule.add_function(wrap_pyfunction!(profile::radial_profile_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

fn register_pipeline_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "pipeline")?;
    submodule.add("__doc__", "Fused pipeline — single FFI call per deprojection.")?;
    submodule.add_class::<pipeline::PipelineResult>()?;
    submodule.add_function(wrap_pyfunction!(pipeline::run_deprojection, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}
