//! Solver throughput across grid sizes.
//!
//! Run with: cargo bench -p kernel --bench step_throughput

use std::time::Instant;

use kernel::{FluidGrid, DEFAULT_DIFFUSION, DEFAULT_DT, DEFAULT_VISCOSITY};

fn main() {
    println!("=== FluidGrid::step throughput ===\n");

    // (grid size, steps) -- fewer steps at larger sizes
    let configs = [(64, 400), (128, 200), (256, 50), (512, 10)];

    for (size, steps) in configs {
        let mut grid = FluidGrid::new(size, DEFAULT_DIFFUSION, DEFAULT_VISCOSITY, DEFAULT_DT)
            .expect("benchmark grid sizes are valid");
        let center = size / 2;
        grid.add_density(center, center, 150.0).expect("center is inside the grid");
        grid.add_velocity(center, center, 1.0, -1.0).expect("center is inside the grid");

        // Warm up
        for _ in 0..3 {
            grid.step();
        }

        let start = Instant::now();
        for _ in 0..steps {
            grid.step();
        }
        let elapsed = start.elapsed();
        let per_step = elapsed.as_secs_f64() / steps as f64;
        let cells_per_sec = (size * size) as f64 / per_step;

        println!(
            "{size:>4}x{size:<4} {steps:>4} steps  {:>9.3} ms/step  {:>8.1} Mcell/s",
            per_step * 1.0e3,
            cells_per_sec / 1.0e6,
        );
    }
}
