//! Fused deprojection pipeline — single FFI entrance/exit per run.
//!
//! Orchestrates: display centre → cutout → sky frame → deprojection → radial profile.
//! Intermediates stay as ndarray arrays and are passed by value between stages;
//! only the final products cross back into Python.

use ndarray::{Array2, ArrayView2};
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::config::{BeamCalibration, DiskGeometry, PipelineSettings, WcsHeader};
use crate::deproject::{deproject, deprojected_to_py, DeprojectedImage, DeprojectionResult};
use crate::error::{DeprojectionError, Result};
use crate::frame::{build_sky_frame, cutout, native_center, SkyFrame};
use crate::profile::{profile_to_py, radial_profile, RadialProfile, RadialProfileResult};

/// All products of one run.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub center: (f64, f64),
    pub frame: SkyFrame,
    pub deprojected: DeprojectedImage,
    pub profile: RadialProfile,
}

/// Run every stage on a full image.
///
/// `display_center` is the centre picked in the UI's display pixel space
/// (`settings.display_scale` pixels per axis).
pub fn run_pipeline(
    image: ArrayView2<f64>,
    header: &WcsHeader,
    display_center: (f64, f64),
    geometry: Option<&DiskGeometry>,
    beam: Option<&BeamCalibration>,
    settings: &PipelineSettings,
) -> Result<PipelineOutput> {
    let geometry = geometry
        .ok_or_else(|| DeprojectionError::missing_calibration("disk geometry was not supplied"))?;
    let beam = beam
        .ok_or_else(|| DeprojectionError::missing_calibration("beam calibration was not supplied"))?;
    // Fail before the expensive stages.
    geometry.check_inclination()?;
    geometry.check_outer_radius()?;
    beam.check()?;

    let center = native_center(
        display_center,
        (header.naxis1, header.naxis2),
        settings.display_scale,
    )?;
    log::debug!(
        "display centre ({:.2}, {:.2}) -> native ({:.2}, {:.2})",
        display_center.0,
        display_center.1,
        center.0,
        center.1
    );

    let (data, cutout_wcs) = cutout(image, header, center, settings.cutout_size)?;
    let frame = build_sky_frame(
        data.view(),
        &cutout_wcs,
        (header.crpix1, header.crpix2),
        center,
        settings.registration_scale,
    )?;
    let deprojected = deproject(&frame, geometry, settings.grid_size)?;
    let profile = radial_profile(&deprojected, geometry, beam, settings.theta_samples)?;

    log::info!(
        "deprojected disk at i={} PA={} onto {}x{} grid, {} radial samples out to {:.3}\"",
        geometry.inclination_deg,
        geometry.position_angle_deg,
        settings.grid_size,
        settings.grid_size,
        profile.radius.len(),
        profile.radius.iter().copied().last().unwrap_or(0.0)
    );

    Ok(PipelineOutput {
        center,
        frame,
        deprojected,
        profile,
    })
}

// ── Output struct ──────────────────────────────────────────────────────────

/// Result of a full pipeline run.
#[pyclass]
pub struct PipelineResult {
    /// Disk centre in native pixels.
    #[pyo3(get)]
    pub center: (f64, f64),
    #[pyo3(get)]
    pub ra_offset: Py<PyArray1<f64>>,
    #[pyo3(get)]
    pub dec_offset: Py<PyArray1<f64>>,
    #[pyo3(get)]
    pub deprojected: Py<DeprojectionResult>,
    #[pyo3(get)]
    pub profile: Py<RadialProfileResult>,
}

/// Deproject a disk and extract its radial profile in one call.
///
/// Args:
///     image: full 2D intensity in Jy/beam, indexed [row, col].
///     header: WcsHeader of the full image.
///     display_center: (x, y) picked in display pixels.
///     geometry: DiskGeometry; None raises ValueError.
///     beam: BeamCalibration; None raises ValueError.
///     settings: PipelineSettings; defaults when omitted.
#[pyfunction]
#[pyo3(signature = (image, header, display_center, geometry, beam, settings = None))]
pub fn run_deprojection(
    py: Python<'_>,
    image: PyReadonlyArray2<f64>,
    header: WcsHeader,
    display_center: (f64, f64),
    geometry: Option<DiskGeometry>,
    beam: Option<BeamCalibration>,
    settings: Option<PipelineSettings>,
) -> PyResult<PipelineResult> {
    let settings = settings.unwrap_or_default();
    // Copy into an owned array so the computation can run without the GIL
    let image: Array2<f64> = image.as_array().to_owned();
    let output = py.allow_threads(|| {
        run_pipeline(
            image.view(),
            &header,
            display_center,
            geometry.as_ref(),
            beam.as_ref(),
            &settings,
        )
    })?;

    Ok(PipelineResult {
        center: output.center,
        ra_offset: output.frame.ra_offset.into_pyarray(py).unbind(),
        dec_offset: output.frame.dec_offset.into_pyarray(py).unbind(),
        deprojected: Py::new(py, deprojected_to_py(py, output.deprojected))?,
        profile: Py::new(py, profile_to_py(py, output.profile))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::brightness_temperature_factor;

    fn small_settings() -> PipelineSettings {
        PipelineSettings::new(61, 80, 1000.0, 1.5 / 500.0, 181)
    }

    fn header(n: usize) -> WcsHeader {
        // 0.1"/pixel, reference pixel at the image centre
        let crpix = (n / 2) as f64;
        WcsHeader::new(n, n, crpix, crpix, -0.1 / 3600.0, 0.1 / 3600.0)
    }

    #[test]
    fn test_uniform_disk_end_to_end() {
        let n = 200;
        let image = Array2::from_elem((n, n), 4.0);
        let header = header(n);
        let geometry = DiskGeometry::new(30.0, 45.0, 1.2);
        let beam = BeamCalibration::new(0.05, 0.04, 0.0, 230.0e9);
        // crpix 100 of 200 is display pixel 500 of 1000
        let out = run_pipeline(
            image.view(),
            &header,
            (500.0, 500.0),
            Some(&geometry),
            Some(&beam),
            &small_settings(),
        )
        .unwrap();

        assert!((out.center.0 - 100.0).abs() < 1e-9 && (out.center.1 - 100.0).abs() < 1e-9);
        assert_eq!(out.frame.image.dim(), (80, 80));
        assert_eq!(out.deprojected.image.dim(), (61, 61));
        assert_eq!(out.deprojected.grid.x[30], 0.0);

        let k = brightness_temperature_factor(&beam).unwrap();
        for (&tb, &err) in out.profile.tb.iter().zip(out.profile.tb_err.iter()) {
            assert!((tb - 4.0 * k).abs() / (4.0 * k) < 1e-9);
            assert!(err.abs() / (4.0 * k) < 1e-9);
        }
    }

    #[test]
    fn test_missing_geometry_and_beam() {
        let image = Array2::<f64>::zeros((20, 20));
        let header = header(20);
        let geometry = DiskGeometry::new(30.0, 45.0, 1.0);
        let beam = BeamCalibration::new(0.05, 0.04, 0.0, 230.0e9);
        let settings = small_settings();
        assert!(matches!(
            run_pipeline(image.view(), &header, (500.0, 500.0), None, Some(&beam), &settings),
            Err(DeprojectionError::MissingCalibration(_))
        ));
        assert!(matches!(
            run_pipeline(image.view(), &header, (500.0, 500.0), Some(&geometry), None, &settings),
            Err(DeprojectionError::MissingCalibration(_))
        ));
    }

    #[test]
    fn test_rejects_geometry_before_work() {
        let image = Array2::<f64>::zeros((20, 20));
        let header = header(20);
        let geometry = DiskGeometry::new(95.0, 45.0, 1.0);
        let beam = BeamCalibration::new(0.05, 0.04, 0.0, 230.0e9);
        assert!(matches!(
            run_pipeline(
                image.view(),
                &header,
                (500.0, 500.0),
                Some(&geometry),
                Some(&beam),
                &small_settings()
            ),
            Err(DeprojectionError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_header_mismatch() {
        let image = Array2::<f64>::zeros((20, 30));
        let header = header(20);
        let geometry = DiskGeometry::new(30.0, 45.0, 1.0);
        let beam = BeamCalibration::new(0.05, 0.04, 0.0, 230.0e9);
        assert!(matches!(
            run_pipeline(
                image.view(),
                &header,
                (500.0, 500.0),
                Some(&geometry),
                Some(&beam),
                &small_settings()
            ),
            Err(DeprojectionError::DimensionMismatch(_))
        ));
    }
}
