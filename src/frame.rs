//! Sky-plane coordinate frame of the observed cutout.
//!
//! Turns a header's pixel scale and reference pixel into RA/Dec offset axes
//! in arcsec, registered against the centre the user picked in the display.

use ndarray::{s, Array1, Array2, ArrayView2};
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::config::{WcsHeader, DEFAULT_REGISTRATION_SCALE};
use crate::error::{DeprojectionError, Result};
use crate::interpolation::BilinearInterpolant;

const ARCSEC_PER_DEG: f64 = 3600.0;

/// Observed intensity with its RA/Dec offset axes (arcsec).
/// `image` is indexed `[dec, ra]`.
#[derive(Clone, Debug)]
pub struct SkyFrame {
    pub ra_offset: Array1<f64>,
    pub dec_offset: Array1<f64>,
    pub image: Array2<f64>,
}

impl SkyFrame {
    pub fn new(ra_offset: Array1<f64>, dec_offset: Array1<f64>, image: Array2<f64>) -> Result<Self> {
        let expected = (dec_offset.len(), ra_offset.len());
        if image.dim() != expected {
            return Err(DeprojectionError::dimension_mismatch(format!(
                "image shape {:?} does not match (len(dec), len(ra)) = {:?}",
                image.dim(),
                expected
            )));
        }
        Ok(Self {
            ra_offset,
            dec_offset,
            image,
        })
    }

    /// Signed Dec spacing in arcsec.
    pub fn dec_step(&self) -> Option<f64> {
        (self.dec_offset.len() >= 2).then(|| self.dec_offset[1] - self.dec_offset[0])
    }

    /// Bilinear interpolant over the frame, zero outside its span.
    pub fn bilinear(&self) -> Result<BilinearInterpolant> {
        BilinearInterpolant::new(
            self.ra_offset.view(),
            self.dec_offset.view(),
            self.image.view(),
        )
    }
}

/// `3600 * cdelt * (index - (crpix - 1))` for `index in 0..n`.
pub fn offset_axis(n: usize, cdelt_deg: f64, crpix: f64) -> Array1<f64> {
    let reference = crpix - 1.0;
    Array1::from_shape_fn(n, |k| ARCSEC_PER_DEG * cdelt_deg * (k as f64 - reference))
}

/// Scale the centre picked in display pixels back to native pixels.
pub fn native_center(
    display_center: (f64, f64),
    naxis: (usize, usize),
    display_scale: f64,
) -> Result<(f64, f64)> {
    if !(display_scale > 0.0) {
        return Err(DeprojectionError::invalid_geometry(format!(
            "display scale {display_scale} must be positive"
        )));
    }
    Ok((
        display_center.0 * (naxis.0 as f64 / display_scale),
        display_center.1 * (naxis.1 as f64 / display_scale),
    ))
}

/// Build the SkyFrame of a cutout.
///
/// `cutout_wcs` describes the cutout itself; `host_crpix` is the reference
/// pixel of the full image the centre was chosen on. The offset axes are
/// shifted by `registration_scale * (center - host_crpix)`, negated on RA.
pub fn build_sky_frame(
    image: ArrayView2<f64>,
    cutout_wcs: &WcsHeader,
    host_crpix: (f64, f64),
    center: (f64, f64),
    registration_scale: f64,
) -> Result<SkyFrame> {
    let (ny, nx) = image.dim();
    if (cutout_wcs.naxis1, cutout_wcs.naxis2) != (nx, ny) {
        return Err(DeprojectionError::dimension_mismatch(format!(
            "header declares {}x{} but image is {}x{}",
            cutout_wcs.naxis1, cutout_wcs.naxis2, nx, ny
        )));
    }

    let shift_ra = -registration_scale * (center.0 - host_crpix.0);
    let shift_dec = registration_scale * (center.1 - host_crpix.1);
    log::debug!(
        "sky frame {}x{}: registration shift ra={:.6}\" dec={:.6}\"",
        nx,
        ny,
        shift_ra,
        shift_dec
    );

    let ra = offset_axis(nx, cutout_wcs.cdelt1, cutout_wcs.crpix1) - shift_ra;
    let dec = offset_axis(ny, cutout_wcs.cdelt2, cutout_wcs.crpix2) - shift_dec;
    SkyFrame::new(ra, dec, image.to_owned())
}

/// Cut a `size x size` window centred on the 0-based pixel `center = (x, y)`.
///
/// Edges are `ceil(center - size/2)` to `+ size`, trimmed to the image. The
/// returned header has the cutout's own size and reference pixel.
pub fn cutout(
    image: ArrayView2<f64>,
    header: &WcsHeader,
    center: (f64, f64),
    size: usize,
) -> Result<(Array2<f64>, WcsHeader)> {
    let (ny, nx) = image.dim();
    if (header.naxis1, header.naxis2) != (nx, ny) {
        return Err(DeprojectionError::dimension_mismatch(format!(
            "header declares {}x{} but image is {}x{}",
            header.naxis1, header.naxis2, nx, ny
        )));
    }
    if size == 0 {
        return Err(DeprojectionError::invalid_geometry("cutout size must be positive"));
    }

    let (x0, x1) = trimmed_edges(center.0, size, nx)?;
    let (y0, y1) = trimmed_edges(center.1, size, ny)?;
    if x1 - x0 < size || y1 - y0 < size {
        log::warn!(
            "cutout around ({:.2}, {:.2}) trimmed to {}x{} at the image edge",
            center.0,
            center.1,
            x1 - x0,
            y1 - y0
        );
    }

    let data = image.slice(s![y0..y1, x0..x1]).to_owned();
    let wcs = WcsHeader {
        naxis1: x1 - x0,
        naxis2: y1 - y0,
        crpix1: header.crpix1 - x0 as f64,
        crpix2: header.crpix2 - y0 as f64,
        cdelt1: header.cdelt1,
        cdelt2: header.cdelt2,
    };
    Ok((data, wcs))
}

fn trimmed_edges(center: f64, size: usize, len: usize) -> Result<(usize, usize)> {
    if !center.is_finite() {
        return Err(DeprojectionError::invalid_geometry("cutout centre must be finite"));
    }
    let start = (center - size as f64 / 2.0).ceil() as i64;
    // The cast saturates for far-off centres; keep the addition saturating too.
    let end = start.saturating_add(size as i64);
    let lo = start.clamp(0, len as i64);
    let hi = end.clamp(0, len as i64);
    if hi <= lo {
        return Err(DeprojectionError::invalid_geometry(format!(
            "cutout around {center} does not overlap an axis of length {len}"
        )));
    }
    Ok((lo as usize, hi as usize))
}

/// Build RA/Dec offset axes for a cutout (PyO3 wrapper).
///
/// Returns:
///     (ra_offset, dec_offset) arrays in arcsec.
#[pyfunction]
#[pyo3(signature = (image, cutout_wcs, host_crpix, center, registration_scale = DEFAULT_REGISTRATION_SCALE))]
pub fn sky_frame(
    py: Python<'_>,
    image: PyReadonlyArray2<f64>,
    cutout_wcs: PyRef<'_, WcsHeader>,
    host_crpix: (f64, f64),
    center: (f64, f64),
    registration_scale: f64,
) -> PyResult<(Py<PyArray1<f64>>, Py<PyArray1<f64>>)> {
    let frame = build_sky_frame(
        image.as_array(),
        &cutout_wcs,
        host_crpix,
        center,
        registration_scale,
    )?;
    Ok((
        frame.ra_offset.into_pyarray(py).unbind(),
        frame.dec_offset.into_pyarray(py).unbind(),
    ))
}

/// Cut a square window out of an image (PyO3 wrapper).
///
/// Returns:
///     (cutout, cutout_wcs).
#[pyfunction]
#[pyo3(name = "cutout")]
pub fn cutout_py(
    py: Python<'_>,
    image: PyReadonlyArray2<f64>,
    header: PyRef<'_, WcsHeader>,
    center: (f64, f64),
    size: usize,
) -> PyResult<(Py<PyArray2<f64>>, WcsHeader)> {
    let (data, wcs) = cutout(image.as_array(), &header, center, size)?;
    Ok((data.into_pyarray(py).unbind(), wcs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_axis_zero_at_reference() {
        let header = WcsHeader::new(1000, 1000, 500.0, 500.0, -0.001, 0.001);
        let image = Array2::<f64>::zeros((1000, 1000));
        let frame = build_sky_frame(
            image.view(),
            &header,
            (500.0, 500.0),
            (500.0, 500.0),
            DEFAULT_REGISTRATION_SCALE,
        )
        .unwrap();
        assert!(frame.ra_offset[499].abs() < 1e-12);
        assert!(frame.dec_offset[499].abs() < 1e-12);
        // RA decreases with pixel index for negative cdelt.
        assert!((frame.ra_offset[500] - -3.6).abs() < 1e-9);
        assert!((frame.dec_offset[500] - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_registration_shift_signs() {
        let header = WcsHeader::new(10, 10, 5.0, 5.0, -1.0e-4, 1.0e-4);
        let image = Array2::<f64>::zeros((10, 10));
        let base = build_sky_frame(image.view(), &header, (50.0, 50.0), (50.0, 50.0), 0.003).unwrap();
        let moved = build_sky_frame(image.view(), &header, (50.0, 50.0), (60.0, 40.0), 0.003).unwrap();
        // RA: offset - (-0.003 * 10) => +0.03; Dec: offset - (0.003 * -10) => +0.03
        assert!((moved.ra_offset[3] - base.ra_offset[3] - 0.03).abs() < 1e-12);
        assert!((moved.dec_offset[3] - base.dec_offset[3] - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_header_shape_mismatch() {
        let header = WcsHeader::new(8, 10, 5.0, 5.0, -1.0e-4, 1.0e-4);
        let image = Array2::<f64>::zeros((10, 10));
        assert!(matches!(
            build_sky_frame(image.view(), &header, (5.0, 5.0), (5.0, 5.0), 0.003),
            Err(DeprojectionError::DimensionMismatch(_))
        ));
        let ra = Array1::zeros(3);
        let dec = Array1::zeros(4);
        assert!(SkyFrame::new(ra, dec, Array2::zeros((3, 4))).is_err());
    }

    #[test]
    fn test_native_center_scaling() {
        let (x, y) = native_center((500.0, 250.0), (2000, 1000), 1000.0).unwrap();
        assert_eq!((x, y), (1000.0, 250.0));
        assert!(native_center((1.0, 1.0), (10, 10), 0.0).is_err());
    }

    #[test]
    fn test_cutout_interior_and_trim() {
        let image = Array2::from_shape_fn((20, 30), |(j, i)| (j * 100 + i) as f64);
        let header = WcsHeader::new(30, 20, 15.0, 10.0, -1.0e-4, 1.0e-4);

        let (data, wcs) = cutout(image.view(), &header, (15.0, 10.0), 6).unwrap();
        assert_eq!(data.dim(), (6, 6));
        // start = ceil(15 - 3) = 12, ceil(10 - 3) = 7
        assert_eq!(data[[0, 0]], 712.0);
        assert_eq!(wcs.crpix1, 3.0);
        assert_eq!(wcs.crpix2, 3.0);
        assert_eq!((wcs.naxis1, wcs.naxis2), (6, 6));

        let (data, wcs) = cutout(image.view(), &header, (1.0, 1.0), 6).unwrap();
        assert_eq!(data.dim(), (4, 4));
        assert_eq!(wcs.crpix1, 15.0);
        assert_eq!(data[[0, 0]], 0.0);

        assert!(matches!(
            cutout(image.view(), &header, (100.0, 10.0), 6),
            Err(DeprojectionError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_cutout_far_off_centre() {
        let image = Array2::<f64>::zeros((20, 30));
        let header = WcsHeader::new(30, 20, 15.0, 10.0, -1.0e-4, 1.0e-4);
        for center in [(1.0e300, 10.0), (15.0, -1.0e300), (f64::MAX, f64::MIN)] {
            assert!(matches!(
                cutout(image.view(), &header, center, 6),
                Err(DeprojectionError::InvalidGeometry(_))
            ));
        }
        assert!(cutout(image.view(), &header, (f64::NAN, 10.0), 6).is_err());
    }

    #[test]
    fn test_dec_step() {
        let frame = SkyFrame::new(
            offset_axis(4, -1.0e-4, 2.0),
            offset_axis(3, 1.0e-4, 2.0),
            Array2::zeros((3, 4)),
        )
        .unwrap();
        assert!((frame.dec_step().unwrap() - 0.36).abs() < 1e-12);
    }
}
