//! Wall boundary conditions for the dense grid.
//!
//! The outermost ring of cells is never solved directly. After every
//! relaxation pass and every advection it is rebuilt from the adjacent
//! interior cells, which yields free-slip, no-penetration walls:
//!
//! - scalar fields (density, pressure, divergence) are mirrored,
//! - the velocity component normal to an edge is negated on that edge,
//! - each corner is the average of its two adjacent edge cells.

use crate::grid::ix;

/// How a field behaves at the domain walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Mirrored on every edge (density, pressure, divergence).
    Scalar,
    /// X velocity: negated on the left and right edges, mirrored elsewhere.
    VelocityX,
    /// Y velocity: negated on the top and bottom edges, mirrored elsewhere.
    VelocityY,
}

impl BoundaryKind {
    /// Sign applied to the interior value on the `x = 0` / `x = N-1` edges.
    fn vertical_edge_sign(self) -> f32 {
        match self {
            BoundaryKind::VelocityX => -1.0,
            _ => 1.0,
        }
    }

    /// Sign applied to the interior value on the `y = 0` / `y = N-1` edges.
    fn horizontal_edge_sign(self) -> f32 {
        match self {
            BoundaryKind::VelocityY => -1.0,
            _ => 1.0,
        }
    }
}

/// Rebuild the edge cells of an `n x n` field from its interior.
pub fn apply_boundary(kind: BoundaryKind, field: &mut [f32], n: usize) {
    debug_assert_eq!(field.len(), n * n);

    let top_bottom = kind.horizontal_edge_sign();
    for i in 1..n - 1 {
        field[ix(i, 0, n)] = top_bottom * field[ix(i, 1, n)];
        field[ix(i, n - 1, n)] = top_bottom * field[ix(i, n - 2, n)];
    }

    let left_right = kind.vertical_edge_sign();
    for j in 1..n - 1 {
        field[ix(0, j, n)] = left_right * field[ix(1, j, n)];
        field[ix(n - 1, j, n)] = left_right * field[ix(n - 2, j, n)];
    }

    field[ix(0, 0, n)] = 0.5 * (field[ix(1, 0, n)] + field[ix(0, 1, n)]);
    field[ix(0, n - 1, n)] = 0.5 * (field[ix(1, n - 1, n)] + field[ix(0, n - 2, n)]);
    field[ix(n - 1, 0, n)] = 0.5 * (field[ix(n - 2, 0, n)] + field[ix(n - 1, 1, n)]);
    field[ix(n - 1, n - 1, n)] =
        0.5 * (field[ix(n - 2, n - 1, n)] + field[ix(n - 1, n - 2, n)]);
}
