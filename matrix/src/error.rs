//! Errors raised when matrix inputs are structurally invalid.

use thiserror::Error;

use crate::Dimensions;

/// A structural problem with the matrices handed to a construction or indexing call.
///
/// None of these are transient: retrying with the same inputs fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// Two operands have incompatible shapes.
    #[error("{op}: expected a {expected} matrix, got {actual}")]
    DimensionMismatch {
        /// The operation that rejected its inputs.
        op: &'static str,
        expected: Dimensions,
        actual: Dimensions,
    },

    /// Sparse storage was requested for a matrix without a single non-zero entry.
    #[error("cannot build sparse row storage from a {height}x{width} matrix with no non-zero entries")]
    EmptySparseMatrix { height: usize, width: usize },

    /// An update targeted a position outside the stored sparsity pattern.
    #[error("no stored entry at ({row}, {col}); the sparsity pattern is fixed after construction")]
    MissingEntry { row: usize, col: usize },

    /// An index or result buffer has the wrong number of entries.
    #[error("{op}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl MatrixError {
    pub const fn dimension_mismatch(
        op: &'static str,
        expected: Dimensions,
        actual: Dimensions,
    ) -> Self {
        Self::DimensionMismatch {
            op,
            expected,
            actual,
        }
    }
}

/// Result type alias for matrix operations.
pub type MatrixResult<T> = core::result::Result<T, MatrixError>;

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_messages_carry_coordinates_and_shapes() {
        let err = MatrixError::dimension_mismatch(
            "condense",
            Dimensions::new(4, 2),
            Dimensions::new(3, 2),
        );
        assert_eq!(err.to_string(), "condense: expected a 4x2 matrix, got 3x2");

        let err = MatrixError::MissingEntry { row: 1, col: 7 };
        assert!(err.to_string().starts_with("no stored entry at (1, 7)"));
    }
}
