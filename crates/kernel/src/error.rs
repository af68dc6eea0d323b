//! Kernel error types.

use thiserror::Error;

/// Errors raised by grid construction and injection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Injection coordinates outside the grid.
    #[error("cell ({x}, {y}) is outside a {size}x{size} grid")]
    OutOfBounds {
        /// Requested column.
        x: usize,
        /// Requested row.
        y: usize,
        /// Grid side length.
        size: usize,
    },

    /// A grid needs at least one interior cell.
    #[error("grid size {size} has no interior cells (minimum is 3)")]
    GridTooSmall {
        /// Requested side length.
        size: usize,
    },
}
