use alloc::vec;
use alloc::vec::Vec;

use itertools::izip;
use msp_matrix::dense::RowMajorMatrix;
use msp_matrix::sparse::SparseRowStore;
use msp_matrix::{Dimensions, Matrix, MatrixError, MatrixResult};
use tracing::instrument;

use crate::condense::CondensedRowSet;
use crate::dispatch::Dispatch;

/// Dot product of two rows, accumulated strictly left to right.
#[inline]
pub fn dot(lhs: &[f32], rhs: &[f32]) -> f32 {
    debug_assert_eq!(lhs.len(), rhs.len());
    lhs.iter().zip(rhs).fold(0.0, |acc, (&x, &y)| acc + x * y)
}

/// One dot product per condensed row.
///
/// `condensed` and `weights` are row-major buffers of width `row_len`; the result is
/// `sums[i] = dot(condensed[i], weights[target_cols[i]])`. Every unit reads its own rows and
/// writes its own slot, and each sum is accumulated by a single unit in index order, so the
/// output does not depend on how `dispatch` schedules the units.
///
/// # Errors
/// - [`MatrixError::LengthMismatch`] if either buffer is not a whole number of `row_len` rows,
///   or `condensed` does not hold one row per target.
/// - [`MatrixError::DimensionMismatch`] if a target column has no row in `weights`.
#[instrument(level = "debug", skip_all, fields(units = target_cols.len(), row_len = row_len))]
pub fn batched_dot<D: Dispatch>(
    condensed: &[f32],
    weights: &[f32],
    target_cols: &[usize],
    row_len: usize,
    dispatch: &D,
) -> MatrixResult<Vec<f32>> {
    let units = target_cols.len();
    if condensed.len() != units * row_len {
        return Err(MatrixError::LengthMismatch {
            op: "batched dot: condensed rows",
            expected: units * row_len,
            actual: condensed.len(),
        });
    }
    if row_len == 0 {
        return if weights.is_empty() {
            Ok(vec![0.0; units])
        } else {
            Err(MatrixError::LengthMismatch {
                op: "batched dot: weight rows",
                expected: 0,
                actual: weights.len(),
            })
        };
    }
    if weights.len() % row_len != 0 {
        return Err(MatrixError::LengthMismatch {
            op: "batched dot: weight rows",
            expected: weights.len().next_multiple_of(row_len),
            actual: weights.len(),
        });
    }
    let weight_rows = weights.len() / row_len;
    if let Some(&col) = target_cols.iter().find(|&&col| col >= weight_rows) {
        return Err(MatrixError::dimension_mismatch(
            "batched dot: weight rows",
            Dimensions::new(col + 1, row_len),
            Dimensions::new(weight_rows, row_len),
        ));
    }

    let mut sums = vec![0.0; units];
    dispatch.execute(&mut sums, |i| {
        let lhs = &condensed[i * row_len..(i + 1) * row_len];
        let col = target_cols[i];
        let rhs = &weights[col * row_len..(col + 1) * row_len];
        dot(lhs, rhs)
    });
    Ok(sums)
}

/// Computes the masked product from a [`CondensedRowSet`] and the sparse store it was
/// condensed against.
#[derive(Copy, Clone, Debug, Default)]
pub struct BatchedDotProductEngine<D> {
    dispatch: D,
}

impl<D: Dispatch> BatchedDotProductEngine<D> {
    pub const fn new(dispatch: D) -> Self {
        Self { dispatch }
    }

    /// Run the kernel and scatter the sums into a fresh matrix shaped like the output.
    ///
    /// # Errors
    /// See [`Self::compute_into`].
    #[instrument(name = "batched dot products", skip_all, fields(units = condensed.len()))]
    pub fn compute(
        &self,
        condensed: &CondensedRowSet,
        store: &SparseRowStore,
    ) -> MatrixResult<RowMajorMatrix<f32>> {
        let dims = condensed.output_dims();
        let mut out = RowMajorMatrix::zeros(dims.height, dims.width);
        self.compute_into(condensed, store, &mut out)?;
        Ok(out)
    }

    /// Run the kernel and write each sum to its target cell of `out`.
    ///
    /// `out` is cleared first, so cells outside the targets end up zero whatever it held before.
    ///
    /// # Errors
    /// - [`MatrixError::DimensionMismatch`] if `out` is not shaped like the condensed output or
    ///   `store` is not the store the rows were condensed against.
    /// - [`MatrixError::LengthMismatch`] if the padded widths disagree.
    pub fn compute_into(
        &self,
        condensed: &CondensedRowSet,
        store: &SparseRowStore,
        out: &mut RowMajorMatrix<f32>,
    ) -> MatrixResult<()> {
        let dims = condensed.output_dims();
        if out.dimensions() != dims {
            return Err(MatrixError::dimension_mismatch(
                "batched dot products: output",
                dims,
                out.dimensions(),
            ));
        }
        if store.height() != dims.width {
            return Err(MatrixError::dimension_mismatch(
                "batched dot products: sparse operand",
                Dimensions::new(dims.width, dims.width),
                store.dimensions(),
            ));
        }
        if store.max_neighbors() != condensed.row_len() {
            return Err(MatrixError::LengthMismatch {
                op: "batched dot products: padded row length",
                expected: store.max_neighbors(),
                actual: condensed.row_len(),
            });
        }

        let sums = batched_dot(
            &condensed.data().values,
            store.padded_weight_buffer(),
            condensed.target_cols(),
            condensed.row_len(),
            &self.dispatch,
        )?;
        out.values.fill(0.0);
        scatter(out, condensed.target_rows(), condensed.target_cols(), &sums);
        Ok(())
    }
}

/// Write `sums[i]` to `out[rows[i], cols[i]]`.
fn scatter(out: &mut RowMajorMatrix<f32>, rows: &[usize], cols: &[usize], sums: &[f32]) {
    let width = out.width;
    for (&r, &c, &sum) in izip!(rows, cols, sums) {
        out.values[r * width + c] = sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ParallelDispatch, SerialDispatch};

    #[test]
    fn test_dot_accumulates_in_order() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn test_batched_dot_reads_target_rows() {
        let condensed = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let weights = [1.0, 0.0, 0.0, 1.0, 2.0, 2.0];
        let sums = batched_dot(&condensed, &weights, &[2, 0, 1], 2, &SerialDispatch).unwrap();
        assert_eq!(sums, vec![6.0, 3.0, 6.0]);
    }

    #[test]
    fn test_batched_dot_rejects_inconsistent_buffers() {
        let weights = [1.0, 0.0, 0.0, 1.0];
        assert!(matches!(
            batched_dot(&[1.0, 2.0, 3.0], &weights, &[0, 1], 2, &SerialDispatch),
            Err(MatrixError::LengthMismatch { .. })
        ));
        assert!(matches!(
            batched_dot(&[1.0, 2.0], &weights[..3], &[0], 2, &SerialDispatch),
            Err(MatrixError::LengthMismatch { expected: 4, .. })
        ));
        assert!(matches!(
            batched_dot(&[1.0, 2.0], &weights, &[2], 2, &SerialDispatch),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_engine_scatters_into_targets() {
        let b = SparseRowStore::from_dense(&RowMajorMatrix::new(
            vec![
                1.0, 0.0, 2.0, // row 0
                0.0, 0.0, 0.0, // row 1
                0.0, 3.0, 0.0, // row 2
            ],
            3,
        ))
        .unwrap();
        let a = RowMajorMatrix::sequential(2, 3);
        let mask = RowMajorMatrix::new(vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0], 3);
        let condensed = CondensedRowSet::new(&mask, &b, &a).unwrap();

        let c = BatchedDotProductEngine::new(ParallelDispatch::new(1))
            .compute(&condensed, &b)
            .unwrap();
        // C[0, 0] = 0*1 + 2*2, C[1, 2] = 4*3; everything else stays zero.
        assert_eq!(
            c.values,
            vec![
                4.0, 0.0, 0.0, // row 0
                0.0, 0.0, 12.0, // row 1
            ]
        );
    }

    #[test]
    fn test_compute_into_clears_a_reused_buffer() {
        let b = SparseRowStore::from_dense(&RowMajorMatrix::identity(3, 3)).unwrap();
        let a = RowMajorMatrix::sequential(2, 3);
        let mask = RowMajorMatrix::new(vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0], 3);
        let condensed = CondensedRowSet::new(&mask, &b, &a).unwrap();

        let engine = BatchedDotProductEngine::new(SerialDispatch);
        let mut out = RowMajorMatrix::new(vec![-7.0; 6], 3);
        engine.compute_into(&condensed, &b, &mut out).unwrap();
        assert_eq!(out, engine.compute(&condensed, &b).unwrap());
        assert_eq!(
            out.values,
            vec![
                0.0, 0.0, 0.0, // row 0
                0.0, 0.0, 5.0, // row 1
            ]
        );
    }

    #[test]
    fn test_engine_rejects_foreign_store() {
        let b = SparseRowStore::from_dense(&RowMajorMatrix::identity(3, 3)).unwrap();
        let other = SparseRowStore::from_dense(&RowMajorMatrix::sequential(3, 3)).unwrap();
        let a = RowMajorMatrix::sequential(2, 3);
        let mask = RowMajorMatrix::new(vec![1.0; 6], 3);
        let condensed = CondensedRowSet::new(&mask, &b, &a).unwrap();

        let engine = BatchedDotProductEngine::new(SerialDispatch);
        assert!(matches!(
            engine.compute(&condensed, &other),
            Err(MatrixError::LengthMismatch { .. })
        ));

        let mut out = RowMajorMatrix::zeros(3, 3);
        assert!(matches!(
            engine.compute_into(&condensed, &b, &mut out),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }
}
