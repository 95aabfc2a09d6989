//! Matrix library.

#![no_std]

extern crate alloc;

use core::fmt::{Display, Formatter};

pub mod dense;
pub mod error;
pub mod mul;
pub mod sparse;
pub mod util;

pub use error::*;

/// The shape of a matrix, `height` rows by `width` columns.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub const fn new(height: usize, width: usize) -> Self {
        Self { width, height }
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Read access to a two-dimensional matrix.
///
/// This is the only capability printing and comparison need, so dense and sparse matrices can
/// be rendered and checked against each other interchangeably.
pub trait Matrix<T> {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// The entry at row `r`, column `c`.
    ///
    /// # Panics
    /// May panic if `r` or `c` is out of range.
    fn get(&self, r: usize, c: usize) -> T;

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }
}

impl<T, M: Matrix<T> + ?Sized> Matrix<T> for &M {
    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn get(&self, r: usize, c: usize) -> T {
        (**self).get(r, c)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn test_dimensions_display_is_rows_by_cols() {
        assert_eq!(format!("{}", Dimensions::new(3, 5)), "3x5");
    }
}
