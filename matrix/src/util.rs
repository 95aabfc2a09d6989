//! Comparison and rendering helpers that work on any [`Matrix`].

use alloc::format;
use core::fmt::{self, Display, Formatter};

use itertools::iproduct;

use crate::{Dimensions, Matrix};

/// Significant digits kept when two results are compared.
pub const COMPARE_SIGNIFICANT_DIGITS: usize = 4;

/// `|x| > 0`. `NaN` is not treated as a non-zero.
#[inline]
pub fn is_nonzero(x: f32) -> bool {
    x > 0.0 || x < 0.0
}

/// Whether `x` and `y` agree to [`COMPARE_SIGNIFICANT_DIGITS`] significant digits.
///
/// Both values are rounded through scientific formatting, so `-0.0` and `0.0` agree but values
/// straddling a rounding boundary do not.
pub fn approx_eq(x: f32, y: f32) -> bool {
    if x == y {
        return true;
    }
    let precision = COMPARE_SIGNIFICANT_DIGITS - 1;
    format!("{x:.precision$e}") == format!("{y:.precision$e}")
}

/// The first difference found between two matrices.
#[derive(Clone, Debug, PartialEq)]
pub enum Mismatch {
    Shape {
        expected: Dimensions,
        actual: Dimensions,
    },
    Value {
        row: usize,
        col: usize,
        expected: f32,
        actual: f32,
    },
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape { expected, actual } => {
                write!(f, "shape differs: expected {expected}, got {actual}")
            }
            Self::Value {
                row,
                col,
                expected,
                actual,
            } => write!(
                f,
                "value differs at ({row}, {col}): expected {expected}, got {actual}"
            ),
        }
    }
}

/// Scan both matrices in row-major order and report the first cell that differs at
/// [`COMPARE_SIGNIFICANT_DIGITS`] significant digits.
pub fn first_mismatch<E, A>(expected: &E, actual: &A) -> Option<Mismatch>
where
    E: Matrix<f32> + ?Sized,
    A: Matrix<f32> + ?Sized,
{
    let (expected_dims, actual_dims) = (expected.dimensions(), actual.dimensions());
    if expected_dims != actual_dims {
        return Some(Mismatch::Shape {
            expected: expected_dims,
            actual: actual_dims,
        });
    }
    iproduct!(0..expected_dims.height, 0..expected_dims.width).find_map(|(row, col)| {
        let (e, a) = (expected.get(row, col), actual.get(row, col));
        (!approx_eq(e, a)).then_some(Mismatch::Value {
            row,
            col,
            expected: e,
            actual: a,
        })
    })
}

/// Renders a matrix as one bracketed line per row.
///
/// The formatter's precision is honoured (`{:.4}`); it defaults to two decimals.
pub struct MatrixDisplay<'a, M: ?Sized>(pub &'a M);

impl<M: Matrix<f32> + ?Sized> Display for MatrixDisplay<'_, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        for r in 0..self.0.height() {
            f.write_str("[")?;
            for c in 0..self.0.width() {
                if c > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:.*}", precision, self.0.get(r, c))?;
            }
            f.write_str("]\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::dense::RowMajorMatrix;
    use crate::sparse::SparseRowStore;

    #[test]
    fn test_approx_eq_at_four_digits() {
        assert!(approx_eq(1234.0, 1234.4));
        assert!(!approx_eq(1234.0, 1236.0));
        assert!(approx_eq(0.0, -0.0));
        assert!(approx_eq(1.0e-7, 1.00004e-7));
        assert!(!approx_eq(0.0, 1.0e-7));
    }

    #[test]
    fn test_first_mismatch_reports_first_cell() {
        let a = RowMajorMatrix::new(vec![1.0, 2.0, 3.0, 4.0], 2);
        let mut b = a.clone();
        assert_eq!(first_mismatch(&a, &b), None);

        b.values[3] = 5.0;
        b.values[2] = 9.0;
        assert_eq!(
            first_mismatch(&a, &b),
            Some(Mismatch::Value {
                row: 1,
                col: 0,
                expected: 3.0,
                actual: 9.0,
            })
        );
    }

    #[test]
    fn test_first_mismatch_reports_shape() {
        let a = RowMajorMatrix::<f32>::zeros(2, 3);
        let b = RowMajorMatrix::<f32>::zeros(3, 2);
        assert!(matches!(
            first_mismatch(&a, &b),
            Some(Mismatch::Shape { .. })
        ));
    }

    #[test]
    fn test_dense_and_sparse_compare_equal() {
        let dense = RowMajorMatrix::banded_sequential(5, 5, 1);
        let store = SparseRowStore::from_dense(&dense).unwrap();
        assert_eq!(first_mismatch(&dense, &store), None);
    }

    #[test]
    fn test_display_renders_grid() {
        let m = RowMajorMatrix::new(vec![1.0, 0.5, 0.0, 2.7], 2);
        assert_eq!(format!("{}", MatrixDisplay(&m)), "[1.00, 0.50]\n[0.00, 2.70]\n");
        assert_eq!(format!("{:.1}", MatrixDisplay(&m)), "[1.0, 0.5]\n[0.0, 2.7]\n");
    }
}
