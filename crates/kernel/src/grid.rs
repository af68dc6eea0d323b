//! Dense square fluid grid.
//!
//! All six fields are contiguous `n * n` arrays indexed row-major by
//! `x + y * n`. The outer ring of cells is the wall and is always rebuilt from
//! the interior by the solver; injection only targets valid coordinates.

use crate::boundary::BoundaryKind;
use crate::error::KernelError;
use crate::snapshot::DensitySource;
use crate::solver::{advect, diffuse, project, SOLVER_ITERATIONS};

/// Fixed timestep used by the renderer. Small relative to any grid size.
pub const DEFAULT_DT: f32 = 1.0e-7;

/// Default density diffusion rate.
pub const DEFAULT_DIFFUSION: f32 = 100.0;

/// Default velocity diffusion rate.
pub const DEFAULT_VISCOSITY: f32 = 1.0;

/// Row-major index of cell `(x, y)` in an `n x n` field.
#[inline]
pub fn ix(x: usize, y: usize, n: usize) -> usize {
    x + y * n
}

/// Velocity and density fields of one simulation instance.
#[derive(Debug, Clone)]
pub struct FluidGrid {
    /// Side length (cells), walls included.
    size: usize,
    /// Timestep length.
    dt: f32,
    /// How fast density spreads.
    diffusion: f32,
    /// How thick the fluid is.
    viscosity: f32,
    /// Gauss-Seidel sweeps per linear solve.
    iterations: usize,

    density: Vec<f32>,
    density_scratch: Vec<f32>,
    vx: Vec<f32>,
    vy: Vec<f32>,
    vx_scratch: Vec<f32>,
    vy_scratch: Vec<f32>,
}

impl FluidGrid {
    /// Create a quiescent grid of side `size`.
    ///
    /// Fails when `size < 3`, since such a grid has no interior cell.
    pub fn new(size: usize, diffusion: f32, viscosity: f32, dt: f32) -> Result<Self, KernelError> {
        if size < 3 {
            return Err(KernelError::GridTooSmall { size });
        }
        let cells = size * size;
        tracing::trace!(size, diffusion, viscosity, dt, "allocating fluid grid");

        Ok(Self {
            size,
            dt,
            diffusion,
            viscosity,
            iterations: SOLVER_ITERATIONS,
            density: vec![0.0; cells],
            density_scratch: vec![0.0; cells],
            vx: vec![0.0; cells],
            vy: vec![0.0; cells],
            vx_scratch: vec![0.0; cells],
            vy_scratch: vec![0.0; cells],
        })
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Timestep length.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Advance the fields by one timestep.
    ///
    /// Velocity is diffused, projected, self-advected and projected again;
    /// density is then diffused and carried along the new velocity.
    pub fn step(&mut self) {
        let n = self.size;
        let iterations = self.iterations;
        let FluidGrid {
            dt,
            diffusion,
            viscosity,
            density,
            density_scratch,
            vx,
            vy,
            vx_scratch,
            vy_scratch,
            ..
        } = self;
        let (dt, diffusion, viscosity) = (*dt, *diffusion, *viscosity);

        diffuse(BoundaryKind::VelocityX, vx_scratch, vx, viscosity, dt, iterations, n);
        diffuse(BoundaryKind::VelocityY, vy_scratch, vy, viscosity, dt, iterations, n);

        project(vx_scratch, vy_scratch, vx, vy, iterations, n);

        advect(BoundaryKind::VelocityX, vx, vx_scratch, vx_scratch, vy_scratch, dt, n);
        advect(BoundaryKind::VelocityY, vy, vy_scratch, vx_scratch, vy_scratch, dt, n);

        project(vx, vy, vx_scratch, vy_scratch, iterations, n);

        diffuse(BoundaryKind::Scalar, density_scratch, density, diffusion, dt, iterations, n);
        advect(BoundaryKind::Scalar, density, density_scratch, vx, vy, dt, n);
    }

    /// Add `amount` of dye at `(x, y)`.
    pub fn add_density(&mut self, x: usize, y: usize, amount: f32) -> Result<(), KernelError> {
        let idx = self.checked_index(x, y)?;
        self.density[idx] += amount;
        Ok(())
    }

    /// Add `(amount_x, amount_y)` to the velocity at `(x, y)`.
    pub fn add_velocity(
        &mut self,
        x: usize,
        y: usize,
        amount_x: f32,
        amount_y: f32,
    ) -> Result<(), KernelError> {
        let idx = self.checked_index(x, y)?;
        self.vx[idx] += amount_x;
        self.vy[idx] += amount_y;
        Ok(())
    }

    /// Current density at `(x, y)`.
    ///
    /// # Panics
    /// If `(x, y)` lies outside the grid.
    pub fn density(&self, x: usize, y: usize) -> f32 {
        self.density[ix(x, y, self.size)]
    }

    /// Current velocity at `(x, y)`.
    ///
    /// # Panics
    /// If `(x, y)` lies outside the grid.
    pub fn velocity(&self, x: usize, y: usize) -> (f32, f32) {
        let idx = ix(x, y, self.size);
        (self.vx[idx], self.vy[idx])
    }

    /// The whole density field, row-major.
    pub fn density_field(&self) -> &[f32] {
        &self.density
    }

    /// The velocity field as `(vx, vy)`, row-major.
    pub fn velocity_field(&self) -> (&[f32], &[f32]) {
        (&self.vx, &self.vy)
    }

    fn checked_index(&self, x: usize, y: usize) -> Result<usize, KernelError> {
        if x >= self.size || y >= self.size {
            return Err(KernelError::OutOfBounds {
                x,
                y,
                size: self.size,
            });
        }
        Ok(ix(x, y, self.size))
    }
}

impl DensitySource for FluidGrid {
    fn size(&self) -> usize {
        self.size
    }

    fn density(&self, x: usize, y: usize) -> f32 {
        FluidGrid::density(self, x, y)
    }
}
