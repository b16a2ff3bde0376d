//! Configuration scalars handed to the pipeline by the Python host.
//!
//! Each struct is created once on the Python side and passed by reference;
//! the core only reads them.

use pyo3::prelude::*;

use crate::error::{DeprojectionError, Result};

/// Default side length of the square disk-frame grid. Must stay odd so the
/// grid has a sample at the exact centre.
pub const DEFAULT_GRID_SIZE: usize = 1001;
/// Default cutout side length, in native pixels.
pub const DEFAULT_CUTOUT_SIZE: usize = 1200;
/// Pixel scale the UI uses when the user clicks the disk centre.
pub const DEFAULT_DISPLAY_SCALE: f64 = 1000.0;
/// Empirical arcsec per display pixel used to register the chosen centre
/// against the header reference pixel. Calibrated on a single dataset.
pub const DEFAULT_REGISTRATION_SCALE: f64 = 1.5 / 500.0;
/// Number of position-angle samples in the polar grid (-180..=180 degrees).
pub const DEFAULT_THETA_SAMPLES: usize = 181;

const ARCSEC_PER_DEG: f64 = 3600.0;

/// Disk orientation and extent.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct DiskGeometry {
    /// Tilt of the disk axis against the line of sight; 0 is face-on.
    #[pyo3(get, set)]
    pub inclination_deg: f64,
    #[pyo3(get, set)]
    pub position_angle_deg: f64,
    /// Outer radius of the disk in arcsec. The radial profile extends to twice this.
    #[pyo3(get, set)]
    pub outer_radius_arcsec: f64,
}

#[pymethods]
impl DiskGeometry {
    #[new]
    pub fn new(inclination_deg: f64, position_angle_deg: f64, outer_radius_arcsec: f64) -> Self {
        Self {
            inclination_deg,
            position_angle_deg,
            outer_radius_arcsec,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "DiskGeometry(inclination_deg={}, position_angle_deg={}, outer_radius_arcsec={})",
            self.inclination_deg, self.position_angle_deg, self.outer_radius_arcsec
        )
    }
}

impl DiskGeometry {
    pub fn inclination_rad(&self) -> f64 {
        self.inclination_deg.to_radians()
    }

    pub fn position_angle_rad(&self) -> f64 {
        self.position_angle_deg.to_radians()
    }

    /// Inclination must lie in [0, 90) degrees and the position angle must be finite.
    pub fn check_inclination(&self) -> Result<()> {
        if !(0.0..90.0).contains(&self.inclination_deg) {
            return Err(DeprojectionError::invalid_geometry(format!(
                "inclination {} deg is outside [0, 90)",
                self.inclination_deg
            )));
        }
        if !self.position_angle_deg.is_finite() {
            return Err(DeprojectionError::invalid_geometry(
                "position angle must be finite",
            ));
        }
        Ok(())
    }

    pub fn check_outer_radius(&self) -> Result<()> {
        if !(self.outer_radius_arcsec > 0.0 && self.outer_radius_arcsec.is_finite()) {
            return Err(DeprojectionError::invalid_geometry(format!(
                "outer radius {} arcsec must be positive",
                self.outer_radius_arcsec
            )));
        }
        Ok(())
    }
}

/// Synthesized beam and observing frequency used for the Rayleigh-Jeans conversion.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct BeamCalibration {
    #[pyo3(get, set)]
    pub major_arcsec: f64,
    #[pyo3(get, set)]
    pub minor_arcsec: f64,
    /// Carried for completeness; the beam area does not depend on it.
    #[pyo3(get, set)]
    pub position_angle_deg: f64,
    #[pyo3(get, set)]
    pub frequency_hz: f64,
}

#[pymethods]
impl BeamCalibration {
    #[new]
    pub fn new(
        major_arcsec: f64,
        minor_arcsec: f64,
        position_angle_deg: f64,
        frequency_hz: f64,
    ) -> Self {
        Self {
            major_arcsec,
            minor_arcsec,
            position_angle_deg,
            frequency_hz,
        }
    }

    /// Build from header values: `BMAJ`/`BMIN` in degrees, `BPA` in degrees,
    /// `CRVAL3` in Hz.
    #[staticmethod]
    pub fn from_header(bmaj_deg: f64, bmin_deg: f64, bpa_deg: f64, crval3_hz: f64) -> Self {
        Self::new(
            bmaj_deg * ARCSEC_PER_DEG,
            bmin_deg * ARCSEC_PER_DEG,
            bpa_deg,
            crval3_hz,
        )
    }

    fn __repr__(&self) -> String {
        format!(
            "BeamCalibration(major_arcsec={}, minor_arcsec={}, position_angle_deg={}, frequency_hz={})",
            self.major_arcsec, self.minor_arcsec, self.position_angle_deg, self.frequency_hz
        )
    }
}

impl BeamCalibration {
    /// A zero, negative or non-finite axis or frequency means the header never
    /// carried the value.
    pub fn check(&self) -> Result<()> {
        let fields = [
            ("beam major axis", self.major_arcsec),
            ("beam minor axis", self.minor_arcsec),
            ("frequency", self.frequency_hz),
        ];
        for (name, value) in fields {
            if !(value > 0.0 && value.is_finite()) {
                return Err(DeprojectionError::missing_calibration(format!(
                    "{name} is not set (got {value})"
                )));
            }
        }
        Ok(())
    }
}

/// World-coordinate subset of an image header. `cdelt` is degrees per pixel,
/// `crpix` is 1-based.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct WcsHeader {
    #[pyo3(get, set)]
    pub naxis1: usize,
    #[pyo3(get, set)]
    pub naxis2: usize,
    #[pyo3(get, set)]
    pub crpix1: f64,
    #[pyo3(get, set)]
    pub crpix2: f64,
    #[pyo3(get, set)]
    pub cdelt1: f64,
    #[pyo3(get, set)]
    pub cdelt2: f64,
}

#[pymethods]
impl WcsHeader {
    #[new]
    pub fn new(
        naxis1: usize,
        naxis2: usize,
        crpix1: f64,
        crpix2: f64,
        cdelt1: f64,
        cdelt2: f64,
    ) -> Self {
        Self {
            naxis1,
            naxis2,
            crpix1,
            crpix2,
            cdelt1,
            cdelt2,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "WcsHeader(naxis1={}, naxis2={}, crpix1={}, crpix2={}, cdelt1={}, cdelt2={})",
            self.naxis1, self.naxis2, self.crpix1, self.crpix2, self.cdelt1, self.cdelt2
        )
    }
}

/// Sizes and empirical constants of a pipeline run.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    #[pyo3(get, set)]
    pub grid_size: usize,
    #[pyo3(get, set)]
    pub cutout_size: usize,
    #[pyo3(get, set)]
    pub display_scale: f64,
    #[pyo3(get, set)]
    pub registration_scale: f64,
    #[pyo3(get, set)]
    pub theta_samples: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            cutout_size: DEFAULT_CUTOUT_SIZE,
            display_scale: DEFAULT_DISPLAY_SCALE,
            registration_scale: DEFAULT_REGISTRATION_SCALE,
            theta_samples: DEFAULT_THETA_SAMPLES,
        }
    }
}

#[pymethods]
impl PipelineSettings {
    #[new]
    #[pyo3(signature = (
        grid_size = DEFAULT_GRID_SIZE,
        cutout_size = DEFAULT_CUTOUT_SIZE,
        display_scale = DEFAULT_DISPLAY_SCALE,
        registration_scale = DEFAULT_REGISTRATION_SCALE,
        theta_samples = DEFAULT_THETA_SAMPLES
    ))]
    pub fn new(
        grid_size: usize,
        cutout_size: usize,
        display_scale: f64,
        registration_scale: f64,
        theta_samples: usize,
    ) -> Self {
        Self {
            grid_size,
            cutout_size,
            display_scale,
            registration_scale,
            theta_samples,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PipelineSettings(grid_size={}, cutout_size={}, display_scale={}, registration_scale={}, theta_samples={})",
            self.grid_size,
            self.cutout_size,
            self.display_scale,
            self.registration_scale,
            self.theta_samples
        )
    }
}
