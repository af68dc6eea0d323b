//! Stable-fluids operators on flat `n x n` fields.
//!
//! Every operator works on slices indexed with [`ix`](crate::grid::ix) and
//! rebuilds the wall cells with [`apply_boundary`] before returning. All
//! arithmetic is single precision and unguarded: callers keep `dt`,
//! diffusion and viscosity in a stable range.
//!
//! Both relaxations use a diagonal weight of 6 (`1 + 6a` for diffusion,
//! `c = 6` for pressure). With four neighbours per cell this makes the
//! pressure solve a damped correction rather than an exact Poisson solve:
//! `project` reduces divergence but does not eliminate it.

use crate::boundary::{apply_boundary, BoundaryKind};
use crate::grid::ix;

/// Gauss-Seidel sweeps per linear solve.
pub const SOLVER_ITERATIONS: usize = 4;

/// Diagonal weight of the pressure relaxation.
pub const PRESSURE_DIAGONAL: f32 = 6.0;

/// Solve `c * x - a * sum(neighbours(x)) = x0` in place by Gauss-Seidel
/// relaxation, rebuilding the walls after each sweep.
pub fn lin_solve(
    kind: BoundaryKind,
    x: &mut [f32],
    x0: &[f32],
    a: f32,
    c: f32,
    iterations: usize,
    n: usize,
) {
    let c_recip = 1.0 / c;
    for _ in 0..iterations {
        for j in 1..n - 1 {
            for i in 1..n - 1 {
                x[ix(i, j, n)] = (x0[ix(i, j, n)]
                    + a * (x[ix(i + 1, j, n)]
                        + x[ix(i - 1, j, n)]
                        + x[ix(i, j + 1, n)]
                        + x[ix(i, j - 1, n)]))
                    * c_recip;
            }
        }
        apply_boundary(kind, x, n);
    }
}

/// Implicit diffusion of `x0` into `x` at `rate` (diffusion or viscosity).
///
/// With `rate == 0` or `dt == 0` the coefficient vanishes and the interior of
/// `x` becomes an exact copy of `x0`.
pub fn diffuse(
    kind: BoundaryKind,
    x: &mut [f32],
    x0: &[f32],
    rate: f32,
    dt: f32,
    iterations: usize,
    n: usize,
) {
    let interior = (n - 2) as f32;
    let a = dt * rate * interior * interior;
    lin_solve(kind, x, x0, a, 1.0 + PRESSURE_DIAGONAL * a, iterations, n);
}

/// Semi-Lagrangian transport of `d0` into `d` along `(vx, vy)`.
///
/// Each interior cell traces backwards by `dt * (n - 2) * velocity`, clamps
/// the source into `[0.5, n - 1.5]` on both axes and bilinearly samples `d0`
/// there. The clamp keeps every sample inside the grid; it is lossy, not
/// reflective.
pub fn advect(
    kind: BoundaryKind,
    d: &mut [f32],
    d0: &[f32],
    vx: &[f32],
    vy: &[f32],
    dt: f32,
    n: usize,
) {
    let dt0 = dt * (n - 2) as f32;
    let max = n as f32 - 1.5;

    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let idx = ix(i, j, n);
            let x = (i as f32 - dt0 * vx[idx]).clamp(0.5, max);
            let y = (j as f32 - dt0 * vy[idx]).clamp(0.5, max);

            let i0 = x.floor();
            let j0 = y.floor();
            let s1 = x - i0;
            let s0 = 1.0 - s1;
            let t1 = y - j0;
            let t0 = 1.0 - t1;

            let i0 = i0 as usize;
            let j0 = j0 as usize;
            let i1 = i0 + 1;
            let j1 = j0 + 1;

            d[idx] = s0 * (t0 * d0[ix(i0, j0, n)] + t1 * d0[ix(i0, j1, n)])
                + s1 * (t0 * d0[ix(i1, j0, n)] + t1 * d0[ix(i1, j1, n)]);
        }
    }

    apply_boundary(kind, d, n);
}

/// Pressure correction of `(vx, vy)`, using `p` and `div` as scratch space.
pub fn project(
    vx: &mut [f32],
    vy: &mut [f32],
    p: &mut [f32],
    div: &mut [f32],
    iterations: usize,
    n: usize,
) {
    let scale = n as f32;

    for j in 1..n - 1 {
        for i in 1..n - 1 {
            div[ix(i, j, n)] = divergence_at(vx, vy, i, j, n);
            p[ix(i, j, n)] = 0.0;
        }
    }

    apply_boundary(BoundaryKind::Scalar, div, n);
    apply_boundary(BoundaryKind::Scalar, p, n);
    lin_solve(BoundaryKind::Scalar, p, div, 1.0, PRESSURE_DIAGONAL, iterations, n);

    for j in 1..n - 1 {
        for i in 1..n - 1 {
            vx[ix(i, j, n)] -= 0.5 * (p[ix(i + 1, j, n)] - p[ix(i - 1, j, n)]) * scale;
            vy[ix(i, j, n)] -= 0.5 * (p[ix(i, j + 1, n)] - p[ix(i, j - 1, n)]) * scale;
        }
    }

    apply_boundary(BoundaryKind::VelocityX, vx, n);
    apply_boundary(BoundaryKind::VelocityY, vy, n);
}

/// Discrete divergence of the velocity field at interior cell `(i, j)`,
/// in the (negated, `1/n` scaled) form the pressure solve consumes.
pub fn divergence_at(vx: &[f32], vy: &[f32], i: usize, j: usize, n: usize) -> f32 {
    -0.5 * (vx[ix(i + 1, j, n)] - vx[ix(i - 1, j, n)] + vy[ix(i, j + 1, n)]
        - vy[ix(i, j - 1, n)])
        / n as f32
}

/// Sum of squared divergence over all interior cells.
pub fn divergence_energy(vx: &[f32], vy: &[f32], n: usize) -> f32 {
    let mut total = 0.0;
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let d = divergence_at(vx, vy, i, j, n);
            total += d * d;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_diffusion_copies_interior() {
        let n = 6;
        let x0: Vec<f32> = (0..n * n).map(|i| (i % 7) as f32).collect();
        let mut x = vec![0.0; n * n];

        diffuse(BoundaryKind::Scalar, &mut x, &x0, 0.0, 1.0e-3, SOLVER_ITERATIONS, n);

        for j in 1..n - 1 {
            for i in 1..n - 1 {
                assert_eq!(x[ix(i, j, n)], x0[ix(i, j, n)]);
            }
        }
    }

    #[test]
    fn test_zero_dt_diffusion_copies_interior() {
        let n = 5;
        let x0: Vec<f32> = (0..n * n).map(|i| i as f32 * 0.25).collect();
        let mut x = vec![3.0; n * n];

        diffuse(BoundaryKind::VelocityX, &mut x, &x0, 100.0, 0.0, SOLVER_ITERATIONS, n);

        for j in 1..n - 1 {
            for i in 1..n - 1 {
                assert_eq!(x[ix(i, j, n)], x0[ix(i, j, n)]);
            }
        }
    }

    #[test]
    fn test_advect_with_zero_velocity_is_identity() {
        let n = 8;
        let d0: Vec<f32> = (0..n * n).map(|i| (i * 3 % 11) as f32).collect();
        let zero = vec![0.0; n * n];
        let mut d = vec![0.0; n * n];

        advect(BoundaryKind::Scalar, &mut d, &d0, &zero, &zero, 0.1, n);

        for j in 1..n - 1 {
            for i in 1..n - 1 {
                assert!((d[ix(i, j, n)] - d0[ix(i, j, n)]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_advect_extreme_velocity_stays_in_bounds() {
        let n = 6;
        let d0 = vec![1.0; n * n];
        let vx = vec![-1.0e9; n * n];
        let vy = vec![-1.0e9; n * n];
        let mut d = vec![0.0; n * n];

        advect(BoundaryKind::Scalar, &mut d, &d0, &vx, &vy, 1.0, n);

        for value in &d {
            assert!((value - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_uniform_translation_moves_density_downstream() {
        let n = 10;
        let mut d0 = vec![0.0; n * n];
        d0[ix(4, 5, n)] = 1.0;
        // One full cell per step: dt * (n - 2) * vx == 1.
        let vx = vec![1.0; n * n];
        let vy = vec![0.0; n * n];
        let dt = 1.0 / (n - 2) as f32;
        let mut d = vec![0.0; n * n];

        advect(BoundaryKind::Scalar, &mut d, &d0, &vx, &vy, dt, n);

        assert!((d[ix(5, 5, n)] - 1.0).abs() < 1e-5);
        assert!(d[ix(4, 5, n)].abs() < 1e-5);
    }
}
