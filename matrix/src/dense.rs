use alloc::vec;
use alloc::vec::Vec;

use msp_maybe_rayon::prelude::*;
use rand::Rng;
use rand::distr::{Distribution, StandardUniform};

use crate::Matrix;
use crate::util::is_nonzero;

/// A dense matrix stored in row-major form.
#[derive(Clone, Debug, PartialEq)]
pub struct RowMajorMatrix<T> {
    /// All values, stored in row-major order.
    pub values: Vec<T>,
    pub width: usize,
}

impl<T> RowMajorMatrix<T> {
    #[must_use]
    pub fn new(values: Vec<T>, width: usize) -> Self {
        debug_assert!((width == 0 && values.is_empty()) || values.len() % width == 0);
        Self { values, width }
    }

    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self
    where
        T: Default + Clone,
    {
        Self {
            values: vec![T::default(); rows * cols],
            width: cols,
        }
    }

    pub fn row_slice(&self, r: usize) -> &[T] {
        debug_assert!((r + 1) * self.width <= self.values.len());
        &self.values[r * self.width..(r + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.values.chunks_exact(self.width.max(1))
    }

    pub fn par_rows(&self) -> impl IndexedParallelIterator<Item = &[T]>
    where
        T: Sync,
    {
        self.values.par_chunks_exact(self.width.max(1))
    }

    pub fn par_rows_mut(&mut self) -> impl IndexedParallelIterator<Item = &mut [T]>
    where
        T: Send,
    {
        self.values.par_chunks_exact_mut(self.width.max(1))
    }

    pub fn rand<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Self
    where
        StandardUniform: Distribution<T>,
    {
        let values = rng.sample_iter(StandardUniform).take(rows * cols).collect();
        Self {
            values,
            width: cols,
        }
    }
}

impl RowMajorMatrix<f32> {
    /// `0, 1, 2, ...` laid out in row-major order.
    #[must_use]
    pub fn sequential(rows: usize, cols: usize) -> Self {
        let values = (0..rows * cols).map(|i| i as f32).collect();
        Self::new(values, cols)
    }

    /// Sequential fill, but only inside the band `|r - c| <= bandwidth`; zero elsewhere.
    #[must_use]
    pub fn banded_sequential(rows: usize, cols: usize, bandwidth: usize) -> Self {
        let values = (0..rows * cols)
            .map(|i| {
                let (r, c) = (i / cols, i % cols);
                if r.abs_diff(c) <= bandwidth {
                    i as f32
                } else {
                    0.0
                }
            })
            .collect();
        Self::new(values, cols)
    }

    #[must_use]
    pub fn identity(rows: usize, cols: usize) -> Self {
        let mut mat = Self::zeros(rows, cols);
        for i in 0..rows.min(cols) {
            mat.values[i * cols + i] = 1.0;
        }
        mat
    }

    /// Each entry is non-zero with probability `density`, drawn from `(0, 1]`.
    pub fn rand_sparse<R: Rng>(rng: &mut R, rows: usize, cols: usize, density: f64) -> Self {
        let values = (0..rows * cols)
            .map(|_| {
                if rng.random_bool(density) {
                    1.0 - rng.random::<f32>()
                } else {
                    0.0
                }
            })
            .collect();
        Self::new(values, cols)
    }

    /// A 0/1 mask where each entry is set with probability `density`.
    pub fn rand_mask<R: Rng>(rng: &mut R, rows: usize, cols: usize, density: f64) -> Self {
        let values = (0..rows * cols)
            .map(|_| if rng.random_bool(density) { 1.0 } else { 0.0 })
            .collect();
        Self::new(values, cols)
    }

    /// Number of entries with `|x| > 0`.
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        self.values.iter().filter(|&&x| is_nonzero(x)).count()
    }
}

impl<T: Clone> Matrix<T> for RowMajorMatrix<T> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    #[inline]
    fn get(&self, r: usize, c: usize) -> T {
        debug_assert!(c < self.width);
        self.values[r * self.width + c].clone()
    }
}
