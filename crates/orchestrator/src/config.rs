//! Job records and run-level settings.
//!
//! Jobs arrive as one JSON object per input line:
//!
//! ```text
//! {"size": 64, "frames": 200, "simType": "random", "outPath": "fluid.gif", "fadeOut": true}
//! ```
//!
//! The whole input is parsed and validated before anything runs; a single bad
//! line aborts the run.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use kernel::{DEFAULT_DIFFUSION, DEFAULT_VISCOSITY};

use crate::error::ConfigError;
use crate::simulation::InjectionPolicy;

/// Default delay between frames, in hundredths of a second.
pub const DEFAULT_DELAY: u32 = 1;

/// Largest accepted grid side. Frames are `size` pixels square and GIF
/// dimensions are 16-bit.
pub const MAX_GRID_SIZE: usize = 4096;

/// One simulation to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// Grid side length in cells (also the frame width and height in pixels)
    pub size: usize,
    /// Number of frames (and simulation ticks)
    pub frames: usize,
    /// Injection policy name
    pub sim_type: String,
    /// Where to write the GIF
    pub out_path: String,
    /// Density diffusion rate (0 means default)
    #[serde(default = "default_diffusion")]
    pub diffusion: f32,
    /// Velocity diffusion rate (0 means default)
    #[serde(default = "default_viscosity")]
    pub viscosity: f32,
    /// Frame delay in hundredths of a second (0 means default)
    #[serde(default = "default_delay")]
    pub delay: u32,
    /// How many times the injection policy runs per tick (<= 0 means 1)
    #[serde(default = "default_repeat")]
    pub repeat: i32,
    /// Stop injecting for the last 50 ticks
    #[serde(default)]
    pub fade_out: bool,
    /// Seed for the job's random source; OS entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

// Default values
fn default_diffusion() -> f32 {
    DEFAULT_DIFFUSION
}

fn default_viscosity() -> f32 {
    DEFAULT_VISCOSITY
}

fn default_delay() -> u32 {
    DEFAULT_DELAY
}

fn default_repeat() -> i32 {
    1
}

impl JobConfig {
    /// Minimal record with every optional field at its default.
    pub fn new(size: usize, frames: usize, sim_type: &str, out_path: &str) -> Self {
        Self {
            size,
            frames,
            sim_type: sim_type.to_string(),
            out_path: out_path.to_string(),
            diffusion: default_diffusion(),
            viscosity: default_viscosity(),
            delay: default_delay(),
            repeat: default_repeat(),
            fade_out: false,
            seed: None,
        }
    }

    /// Parse, normalize and validate one input line.
    pub fn parse(line: usize, text: &str) -> Result<Self, ConfigError> {
        let mut config: JobConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse { line, source })?;
        config.normalize();

        InjectionPolicy::from_name(&config.sim_type)?;
        config
            .validate()
            .map_err(|reason| ConfigError::Invalid { line, reason })?;
        Ok(config)
    }

    /// Replace "unset" zeros with defaults and clamp the repeat count.
    pub fn normalize(&mut self) {
        if self.diffusion == 0.0 {
            self.diffusion = DEFAULT_DIFFUSION;
        }
        if self.viscosity == 0.0 {
            self.viscosity = DEFAULT_VISCOSITY;
        }
        if self.delay == 0 {
            self.delay = DEFAULT_DELAY;
        }
        if self.repeat <= 0 {
            self.repeat = 1;
        }
    }

    /// Validate the record
    pub fn validate(&self) -> Result<(), String> {
        if self.size < 3 {
            return Err(format!("size must be at least 3, got {}", self.size));
        }
        if self.size > MAX_GRID_SIZE {
            return Err(format!(
                "size must be at most {}, got {}",
                MAX_GRID_SIZE, self.size
            ));
        }
        if self.frames == 0 {
            return Err("frames must be at least 1".to_string());
        }
        if self.out_path.trim().is_empty() {
            return Err("outPath must not be empty".to_string());
        }
        if !self.diffusion.is_finite() || self.diffusion < 0.0 {
            return Err("diffusion must be finite and non-negative".to_string());
        }
        if !self.viscosity.is_finite() || self.viscosity < 0.0 {
            return Err("viscosity must be finite and non-negative".to_string());
        }
        Ok(())
    }

    /// Injection passes per tick, at least one.
    pub fn repeat_count(&self) -> usize {
        self.repeat.max(1) as usize
    }
}

/// Read every job record from `reader`, skipping blank lines.
///
/// Fails on the first bad line; no partial job list is returned.
pub fn read_jobs<R: BufRead>(reader: R) -> Result<Vec<JobConfig>, ConfigError> {
    let mut jobs = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        jobs.push(JobConfig::parse(index + 1, &line)?);
    }
    tracing::info!("Loaded {} job(s)", jobs.len());
    Ok(jobs)
}

/// Read every job record from the file at `path`.
pub fn load_jobs<P: AsRef<Path>>(path: P) -> Result<Vec<JobConfig>, ConfigError> {
    let file = File::open(path.as_ref())?;
    tracing::info!("Reading jobs from {}", path.as_ref().display());
    read_jobs(BufReader::new(file))
}

/// How jobs are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Jobs run one after another on the calling thread.
    Sequential,
    /// A pool of `workers` threads, each rendering whole jobs.
    Parallel {
        /// Pool size; also the number of frame chunks per tick.
        workers: usize,
        /// Overlap frame writing with the next tick's computation.
        bsp: bool,
    },
}

/// Process-level knobs handed over by the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSettings {
    /// 0 runs sequentially, negative uses every hardware thread.
    pub threads: i32,
    /// Bulk-synchronous mode.
    pub bsp: bool,
}

impl RunSettings {
    /// Resolve the thread count into an execution mode.
    pub fn mode(&self) -> ExecutionMode {
        let workers = match self.threads {
            0 => return ExecutionMode::Sequential,
            n if n < 0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n as usize,
        };
        ExecutionMode::Parallel {
            workers,
            bsp: self.bsp,
        }
    }
}
