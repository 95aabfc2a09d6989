use alloc::vec;
use alloc::vec::Vec;

use msp_matrix::dense::RowMajorMatrix;
use msp_matrix::sparse::SparseRowStore;
use msp_matrix::util::is_nonzero;
use msp_matrix::{Dimensions, Matrix, MatrixError, MatrixResult};
use tracing::{debug, instrument};

/// The rows of `A` that the mask actually needs, gathered into `B`'s sparse column layout.
///
/// Entry `i` is the output cell `C[target_row(i), target_col(i)]`. Its row holds
/// `A[target_row(i), neighbor_columns(target_col(i))[j]]` for every stored neighbor `j` of the
/// sparse row `target_col(i)`, zero-padded to `max_neighbors`. Since
/// `C[r, c] = Σ_t A[r, t] · B[c, t]`, the sparse row index of `B` is the output column.
///
/// There is exactly one entry per cell with `P[r, c] != 0` whose sparse row `c` has at least one
/// neighbor; masked cells over empty sparse rows are left out because their product is zero.
#[derive(Clone, Debug, PartialEq)]
pub struct CondensedRowSet {
    data: RowMajorMatrix<f32>,
    target_rows: Vec<usize>,
    target_cols: Vec<usize>,
    output_dims: Dimensions,
}

impl CondensedRowSet {
    /// Condense `a` against the sparse row store `b` under `mask`.
    ///
    /// The first pass counts the selected cells so the row buffer can be allocated at its final
    /// size; the second pass walks the same cells in the same order (sparse rows outer, rows of
    /// `a` inner) and copies the gathered values.
    ///
    /// # Errors
    /// [`MatrixError::DimensionMismatch`] unless `mask` is `n x k`, `a` is `n x k` and `b` is
    /// `k x k`.
    #[instrument(
        name = "condense masked rows",
        skip_all,
        fields(mask = %mask.dimensions(), a = %a.dimensions(), b = %b.dimensions())
    )]
    pub fn new(
        mask: &RowMajorMatrix<f32>,
        b: &SparseRowStore,
        a: &RowMajorMatrix<f32>,
    ) -> MatrixResult<Self> {
        if mask.height() != a.height() {
            return Err(MatrixError::dimension_mismatch(
                "masked condensation: dense operand rows",
                Dimensions::new(mask.height(), a.width()),
                a.dimensions(),
            ));
        }
        if mask.width() != b.height() {
            return Err(MatrixError::dimension_mismatch(
                "masked condensation: mask columns",
                Dimensions::new(mask.height(), b.height()),
                mask.dimensions(),
            ));
        }
        if a.width() != b.width() {
            return Err(MatrixError::dimension_mismatch(
                "masked condensation: dense operand columns",
                Dimensions::new(a.height(), b.width()),
                a.dimensions(),
            ));
        }

        let (n, k) = (mask.height(), mask.width());
        let row_len = b.max_neighbors();
        let selected = |row: usize, col: usize| is_nonzero(mask.values[row * k + col]);

        let len: usize = (0..k)
            .filter(|&col| b.neighbor_count(col) > 0)
            .map(|col| (0..n).filter(|&row| selected(row, col)).count())
            .sum();

        let mut data = vec![0.0; len * row_len];
        let mut target_rows = Vec::with_capacity(len);
        let mut target_cols = Vec::with_capacity(len);
        for col in 0..k {
            let neighbors = b.neighbor_columns(col);
            if neighbors.is_empty() {
                continue;
            }
            for row in (0..n).filter(|&row| selected(row, col)) {
                let start = target_rows.len() * row_len;
                let a_row = a.row_slice(row);
                for (dst, &t) in data[start..start + neighbors.len()].iter_mut().zip(neighbors) {
                    *dst = a_row[t];
                }
                target_rows.push(row);
                target_cols.push(col);
            }
        }
        debug_assert_eq!(target_rows.len(), len);
        debug!(len, row_len, "condensed masked rows");

        Ok(Self {
            data: RowMajorMatrix::new(data, row_len),
            target_rows,
            target_cols,
            output_dims: Dimensions::new(n, k),
        })
    }

    /// Number of condensed entries, i.e. dot products left to compute.
    #[inline]
    pub fn len(&self) -> usize {
        self.target_rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.target_rows.is_empty()
    }

    /// The padded width shared by every condensed row.
    #[inline]
    pub const fn row_len(&self) -> usize {
        self.data.width
    }

    /// Condensed row `i`, padding included.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        self.data.row_slice(i)
    }

    #[inline]
    pub fn target_row(&self, i: usize) -> usize {
        self.target_rows[i]
    }

    #[inline]
    pub fn target_col(&self, i: usize) -> usize {
        self.target_cols[i]
    }

    pub fn target_rows(&self) -> &[usize] {
        &self.target_rows
    }

    pub fn target_cols(&self) -> &[usize] {
        &self.target_cols
    }

    /// `(row, col)` of every entry's output cell, in entry order.
    pub fn targets(&self) -> impl ExactSizeIterator<Item = (usize, usize)> + '_ {
        self.target_rows
            .iter()
            .copied()
            .zip(self.target_cols.iter().copied())
    }

    /// The `len x row_len` buffer of condensed rows.
    pub const fn data(&self) -> &RowMajorMatrix<f32> {
        &self.data
    }

    /// Shape of the output the entries scatter into.
    pub const fn output_dims(&self) -> Dimensions {
        self.output_dims
    }
}

impl Matrix<f32> for CondensedRowSet {
    fn width(&self) -> usize {
        self.row_len()
    }

    fn height(&self) -> usize {
        self.len()
    }

    fn get(&self, r: usize, c: usize) -> f32 {
        self.data.get(r, c)
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;

    use itertools::iproduct;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn sparse_b() -> SparseRowStore {
        // Row 1 is empty.
        SparseRowStore::from_dense(&RowMajorMatrix::new(
            vec![
                1.0, 0.0, 2.0, // row 0
                0.0, 0.0, 0.0, // row 1
                0.0, 3.0, 0.0, // row 2
            ],
            3,
        ))
        .unwrap()
    }

    #[test]
    fn test_gathers_neighbor_columns_in_layout_order() {
        let a = RowMajorMatrix::sequential(2, 3);
        let mask = RowMajorMatrix::new(
            vec![
                1.0, 1.0, 0.0, // row 0
                0.0, 1.0, 1.0, // row 1
            ],
            3,
        );
        let set = CondensedRowSet::new(&mask, &sparse_b(), &a).unwrap();

        // Column 1 is masked but its sparse row is empty, so only (0, 0) and (1, 2) remain.
        assert_eq!(set.len(), 2);
        assert_eq!(set.row_len(), 2);
        assert_eq!(set.targets().collect::<Vec<_>>(), vec![(0, 0), (1, 2)]);
        // Sparse row 0 stores columns [0, 2]; A row 0 is [0, 1, 2].
        assert_eq!(set.row(0), &[0.0, 2.0]);
        // Sparse row 2 stores column [1]; A row 1 is [3, 4, 5]; the second slot is padding.
        assert_eq!(set.row(1), &[4.0, 0.0]);
        assert_eq!(set.output_dims(), Dimensions::new(2, 3));
    }

    #[test]
    fn test_order_is_sparse_row_outer() {
        let a = RowMajorMatrix::sequential(3, 3);
        let mask = RowMajorMatrix::new(vec![1.0; 9], 3);
        let set = CondensedRowSet::new(&mask, &sparse_b(), &a).unwrap();
        assert_eq!(set.target_cols(), &[0, 0, 0, 2, 2, 2]);
        assert_eq!(set.target_rows(), &[0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_count_content_and_distinct_targets_on_random_inputs() {
        let mut rng = SmallRng::seed_from_u64(11);
        let (n, k) = (17, 23);
        let a = RowMajorMatrix::<f32>::rand(&mut rng, n, k);
        let mask = RowMajorMatrix::rand_mask(&mut rng, n, k, 0.3);
        let b = SparseRowStore::from_dense(&RowMajorMatrix::rand_sparse(&mut rng, k, k, 0.1))
            .unwrap();
        let set = CondensedRowSet::new(&mask, &b, &a).unwrap();

        let expected = iproduct!(0..n, 0..k)
            .filter(|&(r, c)| mask.get(r, c) != 0.0 && b.neighbor_count(c) > 0)
            .count();
        assert_eq!(set.len(), expected);

        let distinct: BTreeSet<_> = set.targets().collect();
        assert_eq!(distinct.len(), set.len());

        for (i, (r, c)) in set.targets().enumerate() {
            let valid = b.neighbor_count(c);
            for (j, &t) in b.neighbor_columns(c).iter().enumerate() {
                assert_eq!(set.row(i)[j], a.get(r, t));
            }
            assert!(set.row(i)[valid..].iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn test_empty_mask_gives_empty_set() {
        let a = RowMajorMatrix::sequential(2, 3);
        let mask = RowMajorMatrix::zeros(2, 3);
        let set = CondensedRowSet::new(&mask, &sparse_b(), &a).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.height(), 0);
        assert_eq!(set.width(), 2);
    }

    #[test]
    fn test_shape_preconditions() {
        let b = sparse_b();
        let a = RowMajorMatrix::sequential(2, 3);

        let short_mask = RowMajorMatrix::zeros(3, 3);
        assert!(matches!(
            CondensedRowSet::new(&short_mask, &b, &a),
            Err(MatrixError::DimensionMismatch { .. })
        ));

        let narrow_mask = RowMajorMatrix::zeros(2, 2);
        assert!(matches!(
            CondensedRowSet::new(&narrow_mask, &b, &a),
            Err(MatrixError::DimensionMismatch { .. })
        ));

        let mask = RowMajorMatrix::zeros(2, 3);
        let wide_a = RowMajorMatrix::sequential(2, 4);
        assert_eq!(
            CondensedRowSet::new(&mask, &b, &wide_a),
            Err(MatrixError::DimensionMismatch {
                op: "masked condensation: dense operand columns",
                expected: Dimensions::new(2, 3),
                actual: Dimensions::new(2, 4),
            })
        );
    }
}
