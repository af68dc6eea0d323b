//! Error types for configuration, image sinks and job execution.

use kernel::KernelError;
use thiserror::Error;

/// Fatal problems with the job input. Any of these aborts the whole run
/// before a single job is dispatched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the input failed.
    #[error("failed to read job input: {0}")]
    Io(#[from] std::io::Error),

    /// A line is not a valid job record.
    #[error("line {line}: malformed job record: {source}")]
    Parse {
        /// 1-based input line.
        line: usize,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The record names an injection policy that does not exist.
    #[error("unknown simulation type: {0}")]
    UnknownSimulationType(String),

    /// The record parsed but holds unusable values.
    #[error("line {line}: {reason}")]
    Invalid {
        /// 1-based input line (record position for in-memory job lists).
        line: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// The grid described by a record cannot be built.
    #[error("invalid grid: {0}")]
    Grid(#[from] KernelError),
}

/// Failures of an output image sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Creating or writing the output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The encoder rejected the frames.
    #[error("encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// A frame index beyond the declared frame count.
    #[error("frame {index} is out of range ({frames} frames)")]
    FrameOutOfRange {
        /// Requested frame.
        index: usize,
        /// Declared frame count.
        frames: usize,
    },

    /// The frame side does not fit the image format.
    #[error("a {size}x{size} frame is too large to encode")]
    FrameTooLarge {
        /// Requested side length.
        size: usize,
    },

    /// `set_pixel` was called before `new_frame`.
    #[error("no frame has been started")]
    NoActiveFrame,

    /// A pixel outside the frame.
    #[error("pixel ({x}, {y}) is outside a {width}x{height} frame")]
    PixelOutOfRange {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
        /// Frame width.
        width: usize,
        /// Frame height.
        height: usize,
    },
}

/// Reasons a job ends in the `Failed` state.
#[derive(Debug, Error)]
pub enum JobError {
    /// The simulation rejected an injection.
    #[error("simulation error: {0}")]
    Kernel(#[from] KernelError),

    /// Rendering into or saving the output failed.
    #[error("output error: {0}")]
    Sink(#[from] SinkError),

    /// A helper thread of the worker is gone (it panicked or hung up).
    #[error("worker helper thread was lost")]
    WorkerLost,

    /// The operating system refused to start a thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(std::io::Error),

    /// The job could not be built from its configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
