//! One-step worked example on the smallest useful grid.
//!
//! Size 4 grid, no diffusion, no viscosity, a single dye injection at (1, 1)
//! and no velocity: a step must leave the dye exactly where it was and
//! rebuild the walls from it.

use kernel::{DensitySource, DensitySnapshot, FluidGrid, DEFAULT_DT};

fn assert_worked_example(grid: &FluidGrid) {
    let tol = 1.0e-6;
    let expect = |x: usize, y: usize, value: f32| {
        let got = grid.density(x, y);
        assert!(
            (got - value).abs() < tol,
            "density({x}, {y}) = {got}, expected {value}"
        );
    };

    // Interior.
    expect(1, 1, 100.0);
    expect(2, 1, 0.0);
    expect(1, 2, 0.0);
    expect(2, 2, 0.0);

    // Edges mirror their interior neighbour.
    expect(0, 1, 100.0);
    expect(1, 0, 100.0);
    expect(3, 1, 0.0);
    expect(1, 3, 0.0);
    expect(0, 2, 0.0);
    expect(2, 0, 0.0);

    // Corners average the two adjacent edge cells.
    expect(0, 0, 100.0);
    expect(3, 0, 0.0);
    expect(0, 3, 0.0);
    expect(3, 3, 0.0);
}

#[test]
fn single_injection_survives_step_with_zero_dt() {
    let mut grid = FluidGrid::new(4, 0.0, 0.0, 0.0).unwrap();
    grid.add_density(1, 1, 100.0).unwrap();
    grid.step();
    assert_worked_example(&grid);
}

#[test]
fn single_injection_survives_step_without_diffusion() {
    let mut grid = FluidGrid::new(4, 0.0, 0.0, DEFAULT_DT).unwrap();
    grid.add_density(1, 1, 100.0).unwrap();
    grid.step();
    assert_worked_example(&grid);

    let (vx, vy) = grid.velocity_field();
    assert!(vx.iter().chain(vy).all(|&v| v == 0.0));
}

#[test]
fn snapshot_of_stepped_grid_matches_live_values() {
    let mut grid = FluidGrid::new(4, 0.0, 0.0, 0.0).unwrap();
    grid.add_density(1, 1, 100.0).unwrap();
    grid.step();

    let snapshot = DensitySnapshot::capture(&grid);
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(snapshot.density(x, y), grid.density(x, y));
        }
    }
}
