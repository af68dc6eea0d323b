//! Frozen density views for concurrent readers.

use crate::grid::ix;

/// Anything that can answer "how much dye is at `(x, y)`".
///
/// Implemented by the live [`FluidGrid`](crate::FluidGrid) and by
/// [`DensitySnapshot`], so pixel writers do not care which one they read.
pub trait DensitySource {
    /// Side length of the square field.
    fn size(&self) -> usize;

    /// Density at `(x, y)`. Panics outside the field.
    fn density(&self, x: usize, y: usize) -> f32;
}

/// Immutable copy of a density field taken at one tick.
///
/// Readers holding a snapshot never observe the grid it was taken from
/// mid-step.
#[derive(Debug, Clone, PartialEq)]
pub struct DensitySnapshot {
    size: usize,
    density: Vec<f32>,
}

impl DensitySnapshot {
    /// Copy the current density of `source`.
    pub fn capture<S: DensitySource + ?Sized>(source: &S) -> Self {
        let size = source.size();
        let mut density = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                density.push(source.density(x, y));
            }
        }
        Self { size, density }
    }

    /// The frozen field, row-major.
    pub fn field(&self) -> &[f32] {
        &self.density
    }
}

impl DensitySource for DensitySnapshot {
    fn size(&self) -> usize {
        self.size
    }

    fn density(&self, x: usize, y: usize) -> f32 {
        self.density[ix(x, y, self.size)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FluidGrid;

    #[test]
    fn test_snapshot_is_decoupled_from_grid() {
        let mut grid = FluidGrid::new(6, 0.0, 0.0, 0.0).unwrap();
        grid.add_density(2, 3, 42.0).unwrap();

        let snapshot = DensitySnapshot::capture(&grid);
        grid.add_density(2, 3, 1.0).unwrap();
        grid.add_density(1, 1, 7.0).unwrap();

        assert_eq!(snapshot.density(2, 3), 42.0);
        assert_eq!(snapshot.density(1, 1), 0.0);
        assert_eq!(grid.density(2, 3), 43.0);
    }

    #[test]
    fn test_capture_matches_live_field() {
        let mut grid = FluidGrid::new(5, 0.0, 0.0, 0.0).unwrap();
        grid.add_density(1, 2, 3.5).unwrap();
        grid.add_density(3, 1, 0.25).unwrap();

        let captured = DensitySnapshot::capture(&grid);
        assert_eq!(captured.field(), grid.density_field());
        assert_eq!(captured.size(), 5);
        assert_eq!(DensitySnapshot::capture(&captured), captured);
    }
}
