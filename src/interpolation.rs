//! Interpolants over rectilinear grids.
//!
//! Both interpolants accept axes in either ascending or descending order
//! (RA offsets decrease with pixel index) and return exactly 0.0 for any query
//! outside the span of the axes. They never extrapolate.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{DeprojectionError, Result};

/// Sample a 2-D field at an `(x, y)` coordinate pair.
pub trait Interpolant: Sync {
    fn sample(&self, x: f64, y: f64) -> f64;
}

/// Strictly monotonic coordinate axis with interval lookup.
#[derive(Clone, Debug)]
pub(crate) struct Axis {
    /// Logical order, independent of the caller's memory layout.
    values: Vec<f64>,
    ascending: bool,
    lo: f64,
    hi: f64,
}

impl Axis {
    pub(crate) fn new(name: &str, values: ArrayView1<f64>) -> Result<Self> {
        let n = values.len();
        if n < 2 {
            return Err(DeprojectionError::dimension_mismatch(format!(
                "{name} axis needs at least 2 samples, got {n}"
            )));
        }
        let ascending = values[1] > values[0];
        let monotonic = values.windows(2).into_iter().all(|w| {
            if ascending {
                w[1] > w[0]
            } else {
                w[1] < w[0]
            }
        });
        if !monotonic {
            return Err(DeprojectionError::invalid_geometry(format!(
                "{name} axis is not strictly monotonic"
            )));
        }
        let (first, last) = (values[0], values[n - 1]);
        Ok(Self {
            values: values.iter().copied().collect(),
            ascending,
            lo: first.min(last),
            hi: first.max(last),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Interval index `i` and fraction `t` such that `q = v[i] + t * (v[i+1] - v[i])`.
    /// `None` outside the axis span (and for NaN).
    pub(crate) fn locate(&self, q: f64) -> Option<(usize, f64)> {
        if !(q >= self.lo && q <= self.hi) {
            return None;
        }
        let n = self.values.len();
        let slice = self.values.as_slice();
        let past = if self.ascending {
            slice.partition_point(|&v| v <= q)
        } else {
            slice.partition_point(|&v| v >= q)
        };
        let i = past.saturating_sub(1).min(n - 2);
        let (a, b) = (slice[i], slice[i + 1]);
        Some((i, (q - a) / (b - a)))
    }
}

fn check_shape(x: &Axis, y: &Axis, values: &ArrayView2<f64>) -> Result<()> {
    let expected = (y.len(), x.len());
    if values.dim() != expected {
        return Err(DeprojectionError::dimension_mismatch(format!(
            "values have shape {:?}, axes imply {:?} (rows = y, cols = x)",
            values.dim(),
            expected
        )));
    }
    Ok(())
}

/// Bilinear interpolant. Used to raster the observed frame onto the disk grid.
#[derive(Clone, Debug)]
pub struct BilinearInterpolant {
    x: Axis,
    y: Axis,
    values: Array2<f64>,
}

impl BilinearInterpolant {
    /// `values` is indexed `[y, x]`.
    pub fn new(x: ArrayView1<f64>, y: ArrayView1<f64>, values: ArrayView2<f64>) -> Result<Self> {
        let x = Axis::new("x", x)?;
        let y = Axis::new("y", y)?;
        check_shape(&x, &y, &values)?;
        Ok(Self {
            x,
            y,
            values: values.to_owned(),
        })
    }
}

impl Interpolant for BilinearInterpolant {
    fn sample(&self, x: f64, y: f64) -> f64 {
        let (Some((i, tx)), Some((j, ty))) = (self.x.locate(x), self.y.locate(y)) else {
            return 0.0;
        };
        let v = &self.values;
        let top = v[[j, i]] * (1.0 - tx) + v[[j, i + 1]] * tx;
        let bottom = v[[j + 1, i]] * (1.0 - tx) + v[[j + 1, i + 1]] * tx;
        top * (1.0 - ty) + bottom * ty
    }
}

/// Bicubic (Catmull-Rom) interpolant over a uniformly spaced grid. Neighbours
/// beyond the grid edge are clamped to the edge sample.
#[derive(Clone, Debug)]
pub struct BicubicInterpolant {
    x: Axis,
    y: Axis,
    values: Array2<f64>,
}

impl BicubicInterpolant {
    /// `values` is indexed `[y, x]`.
    pub fn new(x: ArrayView1<f64>, y: ArrayView1<f64>, values: ArrayView2<f64>) -> Result<Self> {
        let x = Axis::new("x", x)?;
        let y = Axis::new("y", y)?;
        check_shape(&x, &y, &values)?;
        Ok(Self {
            x,
            y,
            values: values.to_owned(),
        })
    }

    #[inline]
    fn at(&self, row: isize, col: isize) -> f64 {
        let r = row.clamp(0, self.y.len() as isize - 1) as usize;
        let c = col.clamp(0, self.x.len() as isize - 1) as usize;
        self.values[[r, c]]
    }
}

impl Interpolant for BicubicInterpolant {
    fn sample(&self, x: f64, y: f64) -> f64 {
        let (Some((i, tx)), Some((j, ty))) = (self.x.locate(x), self.y.locate(y)) else {
            return 0.0;
        };
        let (i, j) = (i as isize, j as isize);
        let mut rows = [0.0f64; 4];
        for (k, row) in rows.iter_mut().enumerate() {
            let r = j + k as isize - 1;
            *row = catmull_rom(
                self.at(r, i - 1),
                self.at(r, i),
                self.at(r, i + 1),
                self.at(r, i + 2),
                tx,
            );
        }
        catmull_rom(rows[0], rows[1], rows[2], rows[3], ty)
    }
}

#[inline]
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    ((a * t + b) * t + c) * t + p1
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s, Array1};

    #[test]
    fn test_axis_locate_descending() {
        let values = array![2.0, 1.0, 0.0, -1.0];
        let axis = Axis::new("ra", values.view()).unwrap();
        assert_eq!(axis.locate(2.0), Some((0, 0.0)));
        assert_eq!(axis.locate(-1.0), Some((2, 1.0)));
        let (i, t) = axis.locate(0.25).unwrap();
        assert_eq!(i, 1);
        assert!((t - 0.75).abs() < 1e-12);
        assert_eq!(axis.locate(2.5), None);
        assert_eq!(axis.locate(f64::NAN), None);
    }

    #[test]
    fn test_axis_rejects_non_monotonic() {
        let values = array![0.0, 1.0, 1.0, 2.0];
        assert!(matches!(
            Axis::new("x", values.view()),
            Err(DeprojectionError::InvalidGeometry(_))
        ));
        let values = array![0.0];
        assert!(matches!(
            Axis::new("x", values.view()),
            Err(DeprojectionError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_bilinear_corners_and_centre() {
        let x = array![0.0, 1.0];
        let y = array![0.0, 1.0];
        let v = array![[1.0, 2.0], [3.0, 4.0]];
        let f = BilinearInterpolant::new(x.view(), y.view(), v.view()).unwrap();
        assert_eq!(f.sample(0.0, 0.0), 1.0);
        assert_eq!(f.sample(1.0, 0.0), 2.0);
        assert_eq!(f.sample(0.0, 1.0), 3.0);
        assert_eq!(f.sample(1.0, 1.0), 4.0);
        assert!((f.sample(0.5, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_domain_is_zero() {
        let x = Array1::linspace(-1.0, 1.0, 5);
        let y = Array1::linspace(-1.0, 1.0, 5);
        let v = Array2::from_elem((5, 5), 7.0);
        let bilinear = BilinearInterpolant::new(x.view(), y.view(), v.view()).unwrap();
        let bicubic = BicubicInterpolant::new(x.view(), y.view(), v.view()).unwrap();
        for (qx, qy) in [(1.01, 0.0), (0.0, -1.5), (f64::NAN, 0.0), (f64::INFINITY, 0.0)] {
            assert_eq!(bilinear.sample(qx, qy), 0.0);
            assert_eq!(bicubic.sample(qx, qy), 0.0);
        }
    }

    #[test]
    fn test_bicubic_reproduces_constant_and_plane() {
        let x = Array1::linspace(2.0, -2.0, 9);
        let y = Array1::linspace(-2.0, 2.0, 9);
        let flat = Array2::from_elem((9, 9), 3.5);
        let f = BicubicInterpolant::new(x.view(), y.view(), flat.view()).unwrap();
        assert!((f.sample(0.3, -1.7) - 3.5).abs() < 1e-12);

        // Catmull-Rom is exact for linear data away from the clamped edge.
        let plane = Array2::from_shape_fn((9, 9), |(j, i)| 2.0 * x[i] - y[j]);
        let f = BicubicInterpolant::new(x.view(), y.view(), plane.view()).unwrap();
        let got = f.sample(0.3, -0.2);
        assert!((got - (0.6 + 0.2)).abs() < 1e-12, "got {got}");
    }

    #[test]
    fn test_reversed_view_axes() {
        let asc = Array1::linspace(-1.0, 1.0, 5);
        let reversed = asc.slice(s![..;-1]).to_owned();
        let y = Array1::linspace(-1.0, 1.0, 5);
        let v = Array2::from_elem((5, 5), 7.0);
        let bilinear = BilinearInterpolant::new(reversed.view(), y.view(), v.view()).unwrap();
        let bicubic = BicubicInterpolant::new(reversed.view(), y.view(), v.view()).unwrap();
        assert!((bilinear.sample(0.3, -0.4) - 7.0).abs() < 1e-12);
        assert!((bicubic.sample(0.3, -0.4) - 7.0).abs() < 1e-12);

        let axis = Axis::new("x", reversed.view()).unwrap();
        let (i, t) = axis.locate(0.75).unwrap();
        assert_eq!(i, 0);
        assert!((t - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![0.0, 1.0, 2.0];
        let y = array![0.0, 1.0];
        let v = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            BilinearInterpolant::new(x.view(), y.view(), v.view()),
            Err(DeprojectionError::DimensionMismatch(_))
        ));
    }
}
