//! Error taxonomy shared by every stage of the deprojection pipeline.

use pyo3::exceptions::{PyValueError, PyZeroDivisionError};
use pyo3::PyErr;
use thiserror::Error;

/// Terminal failure of a pipeline stage. No stage returns partial results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeprojectionError {
    /// Array and axis lengths disagree.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Out-of-range inclination, non-positive radius or grid step, or an
    /// axis that is not strictly monotonic.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A required beam, frequency or geometry parameter was not supplied.
    #[error("missing calibration: {0}")]
    MissingCalibration(String),

    /// Degenerate angular sample count.
    #[error("division by zero: {0}")]
    DivisionByZero(String),
}

impl DeprojectionError {
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn missing_calibration(msg: impl Into<String>) -> Self {
        Self::MissingCalibration(msg.into())
    }

    pub fn division_by_zero(msg: impl Into<String>) -> Self {
        Self::DivisionByZero(msg.into())
    }
}

impl From<DeprojectionError> for PyErr {
    fn from(err: DeprojectionError) -> Self {
        match err {
            DeprojectionError::DivisionByZero(_) => PyZeroDivisionError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeprojectionError>;
