//! Simulation driver: one grid, its tick budget and its injection policy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kernel::{DensitySource, FluidGrid, KernelError, DEFAULT_DT};

use crate::config::JobConfig;
use crate::error::ConfigError;

/// Injection is suppressed for this many final ticks when fading out.
pub const FADE_OUT_TICKS: usize = 50;

/// Dye amount upper bound (exclusive) for random injection.
const MAX_RANDOM_DENSITY: f32 = 200.0;

/// Velocity magnitude upper bound (exclusive) per component.
const MAX_RANDOM_VELOCITY: f32 = 2.0;

/// Velocity kicks per random injection.
const RANDOM_KICKS: usize = 4;

/// Named rule for adding dye and momentum each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPolicy {
    /// Dye and four random velocity kicks at a random interior cell, with the
    /// same kicks mirrored at the grid center.
    Random,
}

impl InjectionPolicy {
    /// Look a policy up by its configuration name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "random" => Ok(InjectionPolicy::Random),
            other => Err(ConfigError::UnknownSimulationType(other.to_string())),
        }
    }

    /// Configuration name of the policy.
    pub fn name(&self) -> &'static str {
        match self {
            InjectionPolicy::Random => "random",
        }
    }

    /// Apply one pass of the policy to `grid`.
    pub fn apply<R: Rng + ?Sized>(&self, grid: &mut FluidGrid, rng: &mut R) -> Result<(), KernelError> {
        match self {
            InjectionPolicy::Random => inject_random(grid, rng),
        }
    }
}

fn inject_random<R: Rng + ?Sized>(grid: &mut FluidGrid, rng: &mut R) -> Result<(), KernelError> {
    let n = grid.size();
    let x = rng.gen_range(1..n - 1);
    let y = rng.gen_range(1..n - 1);
    let amount = rng.gen::<f32>() * MAX_RANDOM_DENSITY;
    let center = n / 2;

    for _ in 0..RANDOM_KICKS {
        let kick_x = rng.gen::<f32>() * random_sign(rng) * MAX_RANDOM_VELOCITY;
        let kick_y = rng.gen::<f32>() * random_sign(rng) * MAX_RANDOM_VELOCITY;

        grid.add_density(x, y, amount)?;
        grid.add_velocity(x, y, kick_x, kick_y)?;
        grid.add_velocity(center, center, kick_x, kick_y)?;
    }
    Ok(())
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.gen_bool(0.5) {
        1.0
    } else {
        -1.0
    }
}

/// A grid plus everything needed to drive it for a fixed number of ticks.
#[derive(Debug, Clone)]
pub struct Simulation {
    grid: FluidGrid,
    tick: usize,
    length: usize,
    repeat: usize,
    fade_out: bool,
    policy: InjectionPolicy,
    rng: StdRng,
}

impl Simulation {
    /// Wrap `grid` for a run of `length` ticks.
    ///
    /// `repeat` values below one are raised to one.
    pub fn new(
        grid: FluidGrid,
        length: usize,
        policy: InjectionPolicy,
        repeat: usize,
        fade_out: bool,
        rng: StdRng,
    ) -> Self {
        Self {
            grid,
            tick: 0,
            length,
            repeat: repeat.max(1),
            fade_out,
            policy,
            rng,
        }
    }

    /// Build the simulation a job record describes.
    pub fn from_config(config: &JobConfig) -> Result<Self, ConfigError> {
        let policy = InjectionPolicy::from_name(&config.sim_type)?;
        let grid = FluidGrid::new(config.size, config.diffusion, config.viscosity, DEFAULT_DT)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::new(
            grid,
            config.frames,
            policy,
            config.repeat_count(),
            config.fade_out,
            rng,
        ))
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> usize {
        self.tick
    }

    /// Total tick budget.
    pub fn length(&self) -> usize {
        self.length
    }

    /// The live grid.
    pub fn grid(&self) -> &FluidGrid {
        &self.grid
    }

    /// Active injection policy.
    pub fn policy(&self) -> InjectionPolicy {
        self.policy
    }

    /// Whether the current tick falls inside the fade-out window.
    pub fn is_fading(&self) -> bool {
        self.fade_out && self.tick + FADE_OUT_TICKS > self.length
    }

    /// Run the injection policy `repeat` times, unless fading out.
    ///
    /// Returns the number of injection passes applied.
    pub fn update(&mut self) -> Result<usize, KernelError> {
        if self.is_fading() {
            return Ok(0);
        }
        for _ in 0..self.repeat {
            self.policy.apply(&mut self.grid, &mut self.rng)?;
        }
        Ok(self.repeat)
    }

    /// Advance the grid one timestep and count the tick.
    pub fn step(&mut self) {
        self.grid.step();
        self.tick += 1;
    }

    /// Drive the whole run without rendering.
    pub fn run(&mut self) -> Result<(), KernelError> {
        while self.tick < self.length {
            self.update()?;
            self.step();
        }
        Ok(())
    }
}

impl DensitySource for Simulation {
    fn size(&self) -> usize {
        self.grid.size()
    }

    fn density(&self, x: usize, y: usize) -> f32 {
        self.grid.density(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulation(size: usize, length: usize, repeat: usize, fade_out: bool, seed: u64) -> Simulation {
        let grid = FluidGrid::new(size, 100.0, 1.0, DEFAULT_DT).unwrap();
        Simulation::new(
            grid,
            length,
            InjectionPolicy::Random,
            repeat,
            fade_out,
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_policy_lookup() {
        assert_eq!(InjectionPolicy::from_name("random").unwrap(), InjectionPolicy::Random);
        assert_eq!(InjectionPolicy::Random.name(), "random");
        assert!(InjectionPolicy::from_name("swirl").is_err());
    }

    #[test]
    fn test_fade_out_skips_final_ticks() {
        let length = 60;
        let mut sim = simulation(8, length, 1, true, 1);

        for tick in 0..length {
            assert_eq!(sim.tick(), tick);
            let injected = sim.update().unwrap();
            if tick > length - FADE_OUT_TICKS {
                assert_eq!(injected, 0, "tick {tick} should be inside the fade-out window");
            } else {
                assert!(injected >= 1, "tick {tick} should inject");
            }
            sim.step();
        }
        assert_eq!(sim.tick(), length);
    }

    #[test]
    fn test_fade_out_longer_than_run_never_injects() {
        let mut sim = simulation(8, 20, 1, true, 2);
        for _ in 0..20 {
            assert_eq!(sim.update().unwrap(), 0);
            sim.step();
        }
        assert!(sim.grid().density_field().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_without_fade_out_every_tick_injects_repeat_times() {
        let mut sim = simulation(8, 60, 3, false, 3);
        for _ in 0..60 {
            assert_eq!(sim.update().unwrap(), 3);
            sim.step();
        }
    }

    #[test]
    fn test_repeat_below_one_is_raised() {
        let sim = simulation(8, 5, 0, false, 4);
        assert_eq!(sim.repeat, 1);
    }

    #[test]
    fn test_random_injection_touches_interior_and_center_only() {
        let size = 9;
        let mut grid = FluidGrid::new(size, 100.0, 1.0, DEFAULT_DT).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        InjectionPolicy::Random.apply(&mut grid, &mut rng).unwrap();

        let dyed: Vec<(usize, usize)> = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .filter(|&(x, y)| grid.density(x, y) != 0.0)
            .collect();
        assert!(dyed.len() <= 1);
        for &(x, y) in &dyed {
            assert!((1..size - 1).contains(&x) && (1..size - 1).contains(&y));
            assert!(grid.density(x, y) < 4.0 * MAX_RANDOM_DENSITY);
        }

        let (cx, cy) = grid.velocity(size / 2, size / 2);
        assert!(cx.abs() < RANDOM_KICKS as f32 * MAX_RANDOM_VELOCITY * 2.0);
        assert!(cy.abs() < RANDOM_KICKS as f32 * MAX_RANDOM_VELOCITY * 2.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = simulation(12, 15, 2, false, 99);
        let mut b = simulation(12, 15, 2, false, 99);
        a.run().unwrap();
        b.run().unwrap();
        assert_eq!(a.grid().density_field(), b.grid().density_field());
        assert_eq!(a.tick(), 15);
    }

    #[test]
    fn test_from_config_uses_record() {
        let mut config = JobConfig::new(10, 7, "random", "out.gif");
        config.repeat = 2;
        config.fade_out = true;
        config.seed = Some(5);

        let sim = Simulation::from_config(&config).unwrap();
        assert_eq!(sim.length(), 7);
        assert_eq!(sim.grid().size(), 10);
        assert_eq!(sim.policy(), InjectionPolicy::Random);
        assert!(sim.is_fading());
    }
}
