//! Deprojection of an inclined, rotated disk into its face-on frame.
//!
//! Every point of a square disk-frame grid is mapped back onto the sky plane
//! (rotation by PA, foreshortening by cos(i)) and the observed frame is
//! sampled there with a bilinear interpolant.

use ndarray::{Array1, Array2, Zip};
use ndarray_stats::QuantileExt;
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::config::{DiskGeometry, DEFAULT_GRID_SIZE};
use crate::error::{DeprojectionError, Result};
use crate::frame::SkyFrame;
use crate::interpolation::{BicubicInterpolant, Interpolant};

/// Relative slack allowed between consecutive axis spacings.
const SPACING_TOLERANCE: f64 = 1e-6;

/// Square disk-frame grid in arcsec. `x` runs opposite to RA offset.
#[derive(Clone, Debug)]
pub struct DiskGrid {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub step: f64,
}

impl DiskGrid {
    /// `n` samples per side, centred on index `n / 2`.
    pub fn new(n: usize, step: f64) -> Result<Self> {
        if n < 3 || n % 2 == 0 {
            return Err(DeprojectionError::invalid_geometry(format!(
                "disk grid size must be odd and at least 3, got {n}"
            )));
        }
        if !(step > 0.0 && step.is_finite()) {
            return Err(DeprojectionError::invalid_geometry(format!(
                "disk grid step {step} must be positive"
            )));
        }
        let centre = (n / 2) as f64;
        let x = Array1::from_shape_fn(n, |i| (i as f64 - centre) * -step);
        let y = Array1::from_shape_fn(n, |j| (j as f64 - centre) * step);
        Ok(Self { x, y, step })
    }

    /// Rebuild a grid from axes handed back by the caller. Both axes must be
    /// evenly spaced with the same spacing magnitude and `y` ascending.
    pub fn from_axes(x: Array1<f64>, y: Array1<f64>) -> Result<Self> {
        if x.len() < 2 || y.len() < 2 {
            return Err(DeprojectionError::dimension_mismatch(format!(
                "disk grid axes need at least 2 samples, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        let step = y[1] - y[0];
        if !(step > 0.0 && step.is_finite()) {
            return Err(DeprojectionError::invalid_geometry(format!(
                "disk grid y step {step} must be positive"
            )));
        }
        let tolerance = step * SPACING_TOLERANCE;
        let even = |axis: &Array1<f64>, expected: f64| {
            axis.windows(2)
                .into_iter()
                .all(|w| ((w[1] - w[0]) - expected).abs() <= tolerance)
        };
        if !even(&y, step) {
            return Err(DeprojectionError::invalid_geometry(
                "disk grid y axis is not evenly spaced",
            ));
        }
        let x_step = x[1] - x[0];
        if (x_step.abs() - step).abs() > tolerance || !even(&x, x_step) {
            return Err(DeprojectionError::invalid_geometry(format!(
                "disk grid x axis must be evenly spaced by {step}, got first step {x_step}"
            )));
        }
        Ok(Self { x, y, step })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn center_index(&self) -> usize {
        self.x.len() / 2
    }

    /// (x_min, x_max, y_min, y_max)
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let n = self.len() - 1;
        (self.x[n], self.x[0], self.y[0], self.y[n])
    }
}

/// Face-on image indexed `[y, x]` over its disk grid.
#[derive(Clone, Debug)]
pub struct DeprojectedImage {
    pub grid: DiskGrid,
    pub image: Array2<f64>,
}

impl DeprojectedImage {
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        self.grid.extent()
    }

    /// Bicubic interpolant over the face-on image, zero outside the grid.
    pub fn bicubic(&self) -> Result<BicubicInterpolant> {
        BicubicInterpolant::new(self.grid.x.view(), self.grid.y.view(), self.image.view())
    }

    /// Disk coordinate `(x, y)` and value of the brightest pixel, ignoring NaN.
    pub fn peak(&self) -> Option<(f64, f64, f64)> {
        let (j, i) = self.image.argmax_skipnan().ok()?;
        Some((self.grid.x[i], self.grid.y[j], self.image[[j, i]]))
    }
}

/// Sky-plane offset `(dra, ddec)` that lands on disk point `(x, y)`.
///
/// Angles in radians.
#[inline]
pub fn sky_offset(x: f64, y: f64, inclination: f64, position_angle: f64) -> (f64, f64) {
    let (sin_pa, cos_pa) = position_angle.sin_cos();
    let xc = x * inclination.cos();
    (cos_pa * xc + sin_pa * y, -sin_pa * xc + cos_pa * y)
}

/// Inverse of [`sky_offset`]: the disk point seen at sky offset `(dra, ddec)`.
#[inline]
pub fn disk_from_sky(dra: f64, ddec: f64, inclination: f64, position_angle: f64) -> (f64, f64) {
    let (sin_pa, cos_pa) = position_angle.sin_cos();
    let xc = cos_pa * dra - sin_pa * ddec;
    let y = sin_pa * dra + cos_pa * ddec;
    (xc / inclination.cos(), y)
}

/// Fill `grid` by sampling `source` at the sky offset of every disk point.
pub fn deproject_onto<F: Interpolant>(
    source: &F,
    geometry: &DiskGeometry,
    grid: DiskGrid,
) -> Result<DeprojectedImage> {
    geometry.check_inclination()?;
    let inclination = geometry.inclination_rad();
    let position_angle = geometry.position_angle_rad();

    let n = grid.len();
    let mut image = Array2::<f64>::zeros((n, n));
    Zip::indexed(&mut image).par_for_each(|(j, i), out| {
        let (dra, ddec) = sky_offset(grid.x[i], grid.y[j], inclination, position_angle);
        *out = source.sample(dra, ddec);
    });

    Ok(DeprojectedImage { grid, image })
}

/// Deproject an observed frame onto an `n x n` disk grid whose step is the
/// frame's Dec pixel scale.
pub fn deproject(frame: &SkyFrame, geometry: &DiskGeometry, grid_size: usize) -> Result<DeprojectedImage> {
    geometry.check_inclination()?;
    let step = frame.dec_step().ok_or_else(|| {
        DeprojectionError::dimension_mismatch("sky frame needs at least 2 Dec samples")
    })?;
    let grid = DiskGrid::new(grid_size, step)?;
    let sky = frame.bilinear()?;

    log::debug!(
        "deprojecting {}x{} frame onto {}x{} grid (step {:.5}\", i={}, PA={})",
        frame.ra_offset.len(),
        frame.dec_offset.len(),
        grid_size,
        grid_size,
        step,
        geometry.inclination_deg,
        geometry.position_angle_deg
    );
    deproject_onto(&sky, geometry, grid)
}

/// Result of a deprojection for Python.
#[pyclass]
pub struct DeprojectionResult {
    #[pyo3(get)]
    pub image: Py<PyArray2<f64>>,
    #[pyo3(get)]
    pub x: Py<PyArray1<f64>>,
    #[pyo3(get)]
    pub y: Py<PyArray1<f64>>,
    /// (x_min, x_max, y_min, y_max) for rendering.
    #[pyo3(get)]
    pub extent: (f64, f64, f64, f64),
}

pub(crate) fn deprojected_to_py(py: Python<'_>, deprojected: DeprojectedImage) -> DeprojectionResult {
    let extent = deprojected.extent();
    DeprojectionResult {
        image: deprojected.image.into_pyarray(py).unbind(),
        x: deprojected.grid.x.into_pyarray(py).unbind(),
        y: deprojected.grid.y.into_pyarray(py).unbind(),
        extent,
    }
}

/// Deproject an observed frame (PyO3 wrapper).
///
/// Args:
///     ra_offset, dec_offset: 1D offset axes in arcsec.
///     image: 2D intensity, indexed [dec, ra].
///     geometry: DiskGeometry; None raises ValueError.
///     grid_size: odd side length of the disk grid.
#[pyfunction]
#[pyo3(name = "deproject", signature = (ra_offset, dec_offset, image, geometry, grid_size = DEFAULT_GRID_SIZE))]
pub fn deproject_py(
    py: Python<'_>,
    ra_offset: PyReadonlyArray1<f64>,
    dec_offset: PyReadonlyArray1<f64>,
    image: PyReadonlyArray2<f64>,
    geometry: Option<DiskGeometry>,
    grid_size: usize,
) -> PyResult<DeprojectionResult> {
    let geometry = geometry
        .ok_or_else(|| DeprojectionError::missing_calibration("disk geometry was not supplied"))?;
    let frame = SkyFrame::new(
        ra_offset.as_array().to_owned(),
        dec_offset.as_array().to_owned(),
        image.as_array().to_owned(),
    )?;
    let deprojected = py.allow_threads(|| deproject(&frame, &geometry, grid_size))?;
    Ok(deprojected_to_py(py, deprojected))
}
