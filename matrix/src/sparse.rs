//! Padded sparse row storage.
//!
//! Every row keeps its non-zero entries as `(column, weight)` pairs in two parallel buffers of
//! width `max_neighbors`, the non-zero count of the densest row. Columns inside a row's valid
//! prefix are strictly ascending, which is what lets lookups binary search. Slots past the
//! prefix are padding and hold column `0` with weight `0.0`, so a full-width dot product over a
//! padded row equals the product over its valid prefix.

use alloc::vec;
use alloc::vec::Vec;

use msp_maybe_rayon::prelude::*;
use tracing::{debug, instrument};

use crate::dense::RowMajorMatrix;
use crate::util::is_nonzero;
use crate::{Dimensions, Matrix, MatrixError, MatrixResult};

/// Which way a [`SparseRowStore`] is read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// `(r, c)` addresses row `r`, column `c` of the stored matrix.
    #[default]
    Normal,
    /// `(r, c)` addresses row `c`, column `r`: the store is read as its transpose.
    Transposed,
}

impl Orientation {
    /// Map coordinates in this orientation to stored `(row, col)` coordinates.
    #[inline]
    pub const fn resolve(self, r: usize, c: usize) -> (usize, usize) {
        match self {
            Self::Normal => (r, c),
            Self::Transposed => (c, r),
        }
    }

    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Normal => Self::Transposed,
            Self::Transposed => Self::Normal,
        }
    }
}

/// A square sparse matrix stored as fixed-width, per-row neighbor lists.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseRowStore {
    height: usize,
    width: usize,

    /// The padded row width `f`.
    max_neighbors: usize,

    /// Number of valid entries in each row.
    neighbor_counts: Vec<usize>,

    /// `height * max_neighbors` column indices, one padded row after another.
    neighbor_columns: Vec<usize>,

    /// `height * max_neighbors` weights aligned with `neighbor_columns`.
    edge_weights: Vec<f32>,
}

impl SparseRowStore {
    /// Build sparse storage from a dense square matrix.
    ///
    /// A first pass counts the entries with `|x| > 0` in each row and takes the maximum as the
    /// padded width; a second pass fills every row by a forward scan, so columns come out in
    /// ascending order without sorting.
    ///
    /// # Errors
    /// - [`MatrixError::DimensionMismatch`] if `dense` is not square.
    /// - [`MatrixError::EmptySparseMatrix`] if `dense` has no non-zero entries.
    #[instrument(skip_all, fields(dims = %dense.dimensions()))]
    pub fn from_dense(dense: &RowMajorMatrix<f32>) -> MatrixResult<Self> {
        let dims = dense.dimensions();
        if dims.height != dims.width {
            return Err(MatrixError::dimension_mismatch(
                "sparse row store",
                Dimensions::new(dims.height, dims.height),
                dims,
            ));
        }
        let empty = MatrixError::EmptySparseMatrix {
            height: dims.height,
            width: dims.width,
        };
        if dims.height == 0 {
            return Err(empty);
        }

        let neighbor_counts: Vec<usize> = dense
            .par_rows()
            .map(|row| row.iter().filter(|&&x| is_nonzero(x)).count())
            .collect();
        let max_neighbors = neighbor_counts.iter().copied().max().unwrap_or(0);
        if max_neighbors == 0 {
            return Err(empty);
        }

        let mut neighbor_columns = vec![0; dims.height * max_neighbors];
        let mut edge_weights = vec![0.0; dims.height * max_neighbors];
        neighbor_columns
            .par_chunks_exact_mut(max_neighbors)
            .zip(edge_weights.par_chunks_exact_mut(max_neighbors))
            .zip(dense.par_rows())
            .for_each(|((columns, weights), row)| {
                let nonzeros = row
                    .iter()
                    .enumerate()
                    .filter(|&(_, &x)| is_nonzero(x));
                for ((column, weight), (c, &x)) in
                    columns.iter_mut().zip(weights.iter_mut()).zip(nonzeros)
                {
                    *column = c;
                    *weight = x;
                }
            });

        let store = Self {
            height: dims.height,
            width: dims.width,
            max_neighbors,
            neighbor_counts,
            neighbor_columns,
            edge_weights,
        };
        debug!(
            max_neighbors,
            nnz = store.nnz(),
            "built sparse row store"
        );
        Ok(store)
    }

    /// The padded row width `f`.
    #[inline]
    pub const fn max_neighbors(&self) -> usize {
        self.max_neighbors
    }

    /// Total number of stored entries.
    pub fn nnz(&self) -> usize {
        self.neighbor_counts.iter().sum()
    }

    #[inline]
    pub fn neighbor_count(&self, row: usize) -> usize {
        self.neighbor_counts[row]
    }

    pub fn neighbor_counts(&self) -> &[usize] {
        &self.neighbor_counts
    }

    /// The ascending column indices stored for `row`, without padding.
    #[inline]
    pub fn neighbor_columns(&self, row: usize) -> &[usize] {
        let start = row * self.max_neighbors;
        &self.neighbor_columns[start..start + self.neighbor_counts[row]]
    }

    /// The weights stored for `row`, without padding.
    #[inline]
    pub fn edge_weights(&self, row: usize) -> &[f32] {
        let start = row * self.max_neighbors;
        &self.edge_weights[start..start + self.neighbor_counts[row]]
    }

    /// All `max_neighbors` column slots of `row`, padding included.
    #[inline]
    pub fn padded_columns(&self, row: usize) -> &[usize] {
        let start = row * self.max_neighbors;
        &self.neighbor_columns[start..start + self.max_neighbors]
    }

    /// All `max_neighbors` weight slots of `row`, padding included.
    #[inline]
    pub fn padded_weights(&self, row: usize) -> &[f32] {
        let start = row * self.max_neighbors;
        &self.edge_weights[start..start + self.max_neighbors]
    }

    /// The whole `height * max_neighbors` weight buffer, the layout the dot-product kernel reads.
    pub fn padded_weight_buffer(&self) -> &[f32] {
        &self.edge_weights
    }

    /// Where `col` sits inside the valid prefix of `row`, if it is stored at all.
    #[inline]
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        self.neighbor_columns(row).binary_search(&col).ok()
    }

    /// Overwrite the weight of an existing entry.
    ///
    /// # Errors
    /// [`MatrixError::MissingEntry`] if `(row, col)` is not part of the sparsity pattern.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> MatrixResult<()> {
        let idx = self
            .position(row, col)
            .ok_or(MatrixError::MissingEntry { row, col })?;
        self.edge_weights[row * self.max_neighbors + idx] = value;
        Ok(())
    }

    /// Read `(r, c)` under the given orientation.
    #[inline]
    pub fn get_oriented(&self, orientation: Orientation, r: usize, c: usize) -> f32 {
        let (row, col) = orientation.resolve(r, c);
        self.get(row, col)
    }

    /// Update `(r, c)` under the given orientation.
    ///
    /// # Errors
    /// [`MatrixError::MissingEntry`], reported in stored coordinates.
    pub fn set_oriented(
        &mut self,
        orientation: Orientation,
        r: usize,
        c: usize,
        value: f32,
    ) -> MatrixResult<()> {
        let (row, col) = orientation.resolve(r, c);
        self.set(row, col, value)
    }

    /// A zero-copy view reading this store as its transpose.
    pub const fn transposed(&self) -> OrientedSparse<'_> {
        OrientedSparse {
            store: self,
            orientation: Orientation::Transposed,
        }
    }
}

impl Matrix<f32> for SparseRowStore {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    /// Stored weight at `(r, c)`, or `0.0` when the position is not stored.
    #[inline]
    fn get(&self, r: usize, c: usize) -> f32 {
        debug_assert!(c < self.width);
        self.position(r, c)
            .map_or(0.0, |idx| self.edge_weights[r * self.max_neighbors + idx])
    }
}

/// A borrowed [`SparseRowStore`] paired with the orientation it should be read in.
#[derive(Copy, Clone, Debug)]
pub struct OrientedSparse<'a> {
    store: &'a SparseRowStore,
    orientation: Orientation,
}

impl OrientedSparse<'_> {
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The same store read the other way round.
    #[must_use]
    pub const fn transposed(self) -> Self {
        Self {
            store: self.store,
            orientation: self.orientation.flip(),
        }
    }
}

impl Matrix<f32> for OrientedSparse<'_> {
    fn width(&self) -> usize {
        match self.orientation {
            Orientation::Normal => self.store.width,
            Orientation::Transposed => self.store.height,
        }
    }

    fn height(&self) -> usize {
        match self.orientation {
            Orientation::Normal => self.store.height,
            Orientation::Transposed => self.store.width,
        }
    }

    #[inline]
    fn get(&self, r: usize, c: usize) -> f32 {
        self.store.get_oriented(self.orientation, r, c)
    }
}
