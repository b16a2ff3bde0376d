//! Azimuthally averaged brightness-temperature profile of a face-on disk.

use std::f64::consts::{LN_2, PI};

use ndarray::{Array1, Array2, Axis, Zip};
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::config::{BeamCalibration, DiskGeometry, DEFAULT_THETA_SAMPLES};
use crate::deproject::{DeprojectedImage, DiskGrid};
use crate::error::{DeprojectionError, Result};
use crate::interpolation::Interpolant;

/// Speed of light, cm/s.
const C_CGS: f64 = 2.99792e10;
/// Boltzmann constant, erg/K.
const K_B_CGS: f64 = 1.38064852e-16;
/// Jy in erg s^-1 cm^-2 Hz^-1.
const JANSKY_CGS: f64 = 1.0e-26;
const ARCSEC_PER_RAD: f64 = 3600.0 * 180.0 / PI;

/// Radius and position-angle samples for the polar resampling.
#[derive(Clone, Debug)]
pub struct PolarGrid {
    /// arcsec, from one step up to (not including) twice the outer radius
    pub radius: Array1<f64>,
    /// degrees, -180..=180
    pub theta_deg: Array1<f64>,
}

impl PolarGrid {
    pub fn new(step: f64, outer_radius: f64, theta_samples: usize) -> Result<Self> {
        if !(outer_radius > 0.0 && outer_radius.is_finite()) {
            return Err(DeprojectionError::invalid_geometry(format!(
                "outer radius {outer_radius} arcsec must be positive"
            )));
        }
        if !(step > 0.0 && step.is_finite()) {
            return Err(DeprojectionError::invalid_geometry(format!(
                "radial step {step} must be positive"
            )));
        }
        if theta_samples == 0 {
            return Err(DeprojectionError::division_by_zero(
                "polar grid needs at least one angle sample",
            ));
        }

        let stop = 2.0 * outer_radius;
        let count = ((stop - step) / step).ceil().max(0.0) as usize;
        let radius: Array1<f64> = (0..count)
            .map(|k| step + k as f64 * step)
            .filter(|&r| r < stop)
            .collect();
        if radius.is_empty() {
            return Err(DeprojectionError::invalid_geometry(format!(
                "outer radius {outer_radius} arcsec is below half a grid step ({step})"
            )));
        }

        let theta_deg = if theta_samples == 1 {
            Array1::from_elem(1, -180.0)
        } else {
            Array1::linspace(-180.0, 180.0, theta_samples)
        };
        Ok(Self { radius, theta_deg })
    }

    /// Sample `source` at every `(theta, r)`; result indexed `[theta, r]`.
    pub fn sample<F: Interpolant>(&self, source: &F) -> Array2<f64> {
        let mut polar = Array2::<f64>::zeros((self.theta_deg.len(), self.radius.len()));
        Zip::indexed(&mut polar).par_for_each(|(j, i), out| {
            let (sin_t, cos_t) = self.theta_deg[j].to_radians().sin_cos();
            let r = self.radius[i];
            *out = source.sample(r * cos_t, r * sin_t);
        });
        polar
    }
}

/// Brightness temperature and its standard error per radius.
#[derive(Clone, Debug)]
pub struct RadialProfile {
    pub radius: Array1<f64>,
    pub tb: Array1<f64>,
    pub tb_err: Array1<f64>,
}

/// Gaussian beam solid angle in steradians.
pub fn beam_area_sr(beam: &BeamCalibration) -> f64 {
    PI * beam.major_arcsec * beam.minor_arcsec / (4.0 * LN_2) / (ARCSEC_PER_RAD * ARCSEC_PER_RAD)
}

/// Rayleigh-Jeans factor turning Jy/beam into Kelvin.
pub fn brightness_temperature_factor(beam: &BeamCalibration) -> Result<f64> {
    beam.check()?;
    let freq = beam.frequency_hz;
    Ok(C_CGS * C_CGS * JANSKY_CGS / (beam_area_sr(beam) * 2.0 * K_B_CGS * freq * freq))
}

/// Mean and standard error over the angle axis of a `[theta, r]` matrix,
/// both scaled by `factor`.
pub fn reduce_over_angle(polar: &Array2<f64>, factor: f64) -> Result<(Array1<f64>, Array1<f64>)> {
    let n_theta = polar.len_of(Axis(0));
    let mean = polar
        .mean_axis(Axis(0))
        .ok_or_else(|| DeprojectionError::division_by_zero("no angle samples to average"))?;
    let spread = if n_theta == 1 {
        Array1::zeros(polar.len_of(Axis(1)))
    } else {
        polar.std_axis(Axis(0), 0.0) / (n_theta as f64).sqrt()
    };
    Ok((mean * factor, spread * factor))
}

/// Resample a face-on image on a polar grid and reduce it to Tb(r).
pub fn radial_profile(
    deprojected: &DeprojectedImage,
    geometry: &DiskGeometry,
    beam: &BeamCalibration,
    theta_samples: usize,
) -> Result<RadialProfile> {
    geometry.check_outer_radius()?;
    let factor = brightness_temperature_factor(beam)?;
    let polar_grid = PolarGrid::new(
        deprojected.grid.step,
        geometry.outer_radius_arcsec,
        theta_samples,
    )?;
    let face_on = deprojected.bicubic()?;

    log::debug!(
        "radial profile: {} radii x {} angles, K = {:.6e} K/(Jy/beam)",
        polar_grid.radius.len(),
        polar_grid.theta_deg.len(),
        factor
    );
    let polar = polar_grid.sample(&face_on);
    let (tb, tb_err) = reduce_over_angle(&polar, factor)?;
    Ok(RadialProfile {
        radius: polar_grid.radius,
        tb,
        tb_err,
    })
}

/// Radial profile for Python.
#[pyclass]
pub struct RadialProfileResult {
    #[pyo3(get)]
    pub radius: Py<PyArray1<f64>>,
    #[pyo3(get)]
    pub tb: Py<PyArray1<f64>>,
    #[pyo3(get)]
    pub tb_err: Py<PyArray1<f64>>,
}

pub(crate) fn profile_to_py(py: Python<'_>, profile: RadialProfile) -> RadialProfileResult {
    RadialProfileResult {
        radius: profile.radius.into_pyarray(py).unbind(),
        tb: profile.tb.into_pyarray(py).unbind(),
        tb_err: profile.tb_err.into_pyarray(py).unbind(),
    }
}

/// Radial brightness-temperature profile of a deprojected image (PyO3 wrapper).
///
/// Args:
///     x, y: disk grid axes in arcsec (x descending, y ascending, same step).
///     image: 2D face-on intensity in Jy/beam, indexed [y, x].
///     geometry: DiskGeometry (outer radius used).
///     beam: BeamCalibration.
///
/// Returns:
///     RadialProfileResult with radius, tb and tb_err arrays.
#[pyfunction]
#[pyo3(name = "radial_profile", signature = (x, y, image, geometry, beam, theta_samples = DEFAULT_THETA_SAMPLES))]
pub fn radial_profile_py(
    py: Python<'_>,
    x: PyReadonlyArray1<f64>,
    y: PyReadonlyArray1<f64>,
    image: PyReadonlyArray2<f64>,
    geometry: Option<DiskGeometry>,
    beam: Option<BeamCalibration>,
    theta_samples: usize,
) -> PyResult<RadialProfileResult> {
    let geometry = geometry
        .ok_or_else(|| DeprojectionError::missing_calibration("disk geometry was not supplied"))?;
    let beam = beam
        .ok_or_else(|| DeprojectionError::missing_calibration("beam calibration was not supplied"))?;

    let x = x.as_array().to_owned();
    let y = y.as_array().to_owned();
    let image = image.as_array().to_owned();
    if image.dim() != (y.len(), x.len()) {
        return Err(DeprojectionError::dimension_mismatch(format!(
            "image shape {:?} does not match (len(y), len(x)) = ({}, {})",
            image.dim(),
            y.len(),
            x.len()
        ))
        .into());
    }
    let deprojected = DeprojectedImage {
        grid: DiskGrid::from_axes(x, y)?,
        image,
    };

    let profile =
        py.allow_threads(|| radial_profile(&deprojected, &geometry, &beam, theta_samples))?;
    Ok(profile_to_py(py, profile))
}
