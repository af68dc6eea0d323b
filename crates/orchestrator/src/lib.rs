//! Orchestration Layer
//!
//! This crate turns job records into rendered animations:
//! - Job configuration parsing and run-level settings
//! - The simulation driver (injection policy, tick budget, fade-out)
//! - Frame partitioning and the reusable tick barrier
//! - Sequential, chunked and bulk-synchronous (BSP) render pipelines
//! - The job dispatcher and its worker pool
//! - Image sinks: animated GIF files and an in-memory recorder
//!
//! # Example
//! ```no_run
//! use orchestrator::{execute, read_jobs, RunSettings};
//!
//! let jobs = read_jobs(std::io::stdin().lock())?;
//! let settings = RunSettings { threads: 4, bsp: true };
//! for report in execute(&settings, &jobs)? {
//!     println!("{} -> {:?}", report.target, report.status);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod barrier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod partition;
pub mod pipeline;
pub mod simulation;
pub mod sink;

pub use barrier::{BarrierBroken, TickBarrier};
pub use config::{load_jobs, read_jobs, ExecutionMode, JobConfig, RunSettings, MAX_GRID_SIZE};
pub use dispatcher::{execute, prepare_job, run_job, run_jobs, JobDispatcher, PreparedJob};
pub use error::{ConfigError, JobError, SinkError};
pub use job::{Job, JobId, JobReport, JobStatus};
pub use partition::{partition, Rect};
pub use pipeline::{
    render_chunk, render_job, render_sequential, FrameSource, RenderCrew, RenderedChunk, WriteTask,
};
pub use simulation::{InjectionPolicy, Simulation, FADE_OUT_TICKS};
pub use sink::{brightness, FrameRecorder, GifSink, ImageSink};
