use msp_maybe_rayon::prelude::*;
use tracing::instrument;

use crate::dense::RowMajorMatrix;
use crate::{Dimensions, Matrix, MatrixError, MatrixResult};

/// Compute `C = A * Bᵗ`, where `A` and `B` are dense and share their width.
///
/// Every output entry is a full-width dot product of a row of `A` with a row of `B`,
/// accumulated left to right.
///
/// # Errors
/// [`MatrixError::DimensionMismatch`] if the widths of `A` and `B` differ.
#[instrument(skip_all, fields(a = %a.dimensions(), b = %b.dimensions()))]
pub fn mul_dense_transpose(
    a: &RowMajorMatrix<f32>,
    b: &RowMajorMatrix<f32>,
) -> MatrixResult<RowMajorMatrix<f32>> {
    if a.width() != b.width() {
        return Err(MatrixError::dimension_mismatch(
            "dense product with transpose",
            Dimensions::new(b.height(), a.width()),
            b.dimensions(),
        ));
    }
    let mut c = RowMajorMatrix::zeros(a.height(), b.height());
    c.par_rows_mut()
        .zip(a.par_rows())
        .for_each(|(c_row, a_row)| {
            for (c_val, b_row) in c_row.iter_mut().zip(b.rows()) {
                *c_val = a_row
                    .iter()
                    .zip(b_row)
                    .fold(0.0, |acc, (&x, &y)| acc + x * y);
            }
        });
    Ok(c)
}

/// Compute `P ∘ (A * Bᵗ)` the naive way: the full product first, then the mask.
///
/// This is the reference the masked sparse pipeline is checked against, and the baseline it is
/// timed against.
///
/// # Errors
/// [`MatrixError::DimensionMismatch`] if `A` and `B` do not share a width or the mask is not
/// shaped like the product.
#[instrument(skip_all, fields(mask = %mask.dimensions()))]
pub fn mul_masked_dense_transpose(
    mask: &RowMajorMatrix<f32>,
    a: &RowMajorMatrix<f32>,
    b: &RowMajorMatrix<f32>,
) -> MatrixResult<RowMajorMatrix<f32>> {
    let mut c = mul_dense_transpose(a, b)?;
    if mask.dimensions() != c.dimensions() {
        return Err(MatrixError::dimension_mismatch(
            "masked dense product",
            c.dimensions(),
            mask.dimensions(),
        ));
    }
    c.values
        .par_iter_mut()
        .zip(mask.values.par_iter())
        .for_each(|(c_val, &p)| *c_val *= p);
    Ok(c)
}
