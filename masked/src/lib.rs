//! Masked products of a dense matrix with the transpose of a sparse one.
//!
//! `C = P ∘ (A · Bᵗ)` is computed by touching only the cells the mask `P` selects: the rows of
//! `A` each selected cell needs are first condensed into `B`'s sparse column layout, then one
//! independent dot product per condensed row is dispatched and scattered into `C`.

#![no_std]

extern crate alloc;

mod condense;
mod dispatch;
mod kernel;

pub use condense::*;
pub use dispatch::*;
pub use kernel::*;
use msp_matrix::{Matrix, MatrixResult};
use msp_matrix::dense::RowMajorMatrix;
use msp_matrix::sparse::SparseRowStore;
use tracing::instrument;

/// Compute `P ∘ (A · Bᵗ)` for a sparse `B`, evaluating only the cells selected by `mask`.
///
/// Cells the mask leaves out, and masked cells whose sparse row of `B` is empty, are zero in
/// the result.
///
/// # Errors
/// [`msp_matrix::MatrixError::DimensionMismatch`] unless `mask` and `a` are `n x k` and `b` is
/// `k x k`.
#[instrument(skip_all, fields(a = %a.dimensions(), max_neighbors = b.max_neighbors()))]
pub fn masked_sparse_product<D: Dispatch>(
    mask: &RowMajorMatrix<f32>,
    a: &RowMajorMatrix<f32>,
    b: &SparseRowStore,
    dispatch: D,
) -> MatrixResult<RowMajorMatrix<f32>> {
    let condensed = CondensedRowSet::new(mask, b, a)?;
    BatchedDotProductEngine::new(dispatch).compute(&condensed, b)
}
