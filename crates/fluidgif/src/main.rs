//! Fluid GIF renderer
//!
//! Reads one JSON job record per line (stdin by default), simulates each job
//! and writes the result as an animated GIF.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use orchestrator::{execute, load_jobs, read_jobs, RunSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Worker threads. 0 renders jobs one by one; a negative value uses every hardware thread.
    #[arg(
        short = 'p',
        long = "threads",
        value_name = "THREADS",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    threads: i32,
    /// Overlap writing each frame with computing the next tick.
    #[arg(long)]
    bsp: bool,
    /// Read job records from this file instead of stdin.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fluidgif=info,orchestrator=info,kernel=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let jobs = match &args.input {
        Some(path) => load_jobs(path),
        None => read_jobs(io::stdin().lock()),
    };
    let jobs = match jobs {
        Ok(jobs) => jobs,
        Err(err) => {
            tracing::error!("Invalid job input: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let settings = RunSettings {
        threads: args.threads,
        bsp: args.bsp,
    };
    let reports = match execute(&settings, &jobs) {
        Ok(reports) => reports,
        Err(err) => {
            tracing::error!("Could not run jobs: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let failed = reports.iter().filter(|report| !report.is_success()).count();
    let total_secs: f64 = reports.iter().map(|report| report.elapsed.as_secs_f64()).sum();
    tracing::info!(
        "{} of {} job(s) completed ({:.2}s of rendering)",
        reports.len() - failed,
        reports.len(),
        total_secs
    );
    tracing::info!("Done!");

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
