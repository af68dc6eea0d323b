//! Stable-Fluids Kernel
//!
//! This crate provides the compute core for 2D incompressible fluid
//! simulation on a dense square grid. It owns no threads and performs no
//! I/O; orchestration lives in the `orchestrator` crate.
//!
//! # Modules
//! - [`grid`] -- `FluidGrid`: velocity and density arrays plus the per-tick `step`.
//! - [`solver`] -- Gauss-Seidel relaxation, diffusion, projection and advection.
//! - [`boundary`] -- free-slip, no-penetration wall reconstruction.
//! - [`snapshot`] -- `DensitySource` capability and frozen `DensitySnapshot`s.
//! - [`error`] -- `KernelError`.

#![warn(missing_docs)]

pub mod boundary;
pub mod error;
pub mod grid;
pub mod snapshot;
pub mod solver;

pub use boundary::{apply_boundary, BoundaryKind};
pub use error::KernelError;
pub use grid::{ix, FluidGrid, DEFAULT_DIFFUSION, DEFAULT_DT, DEFAULT_VISCOSITY};
pub use snapshot::{DensitySnapshot, DensitySource};
