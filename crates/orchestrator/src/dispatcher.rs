//! Job dispatch: a bounded queue feeding a fixed pool of worker threads.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::config::{ExecutionMode, JobConfig, RunSettings};
use crate::error::{ConfigError, JobError};
use crate::job::{Job, JobId, JobReport, JobStatus};
use crate::pipeline::{render_job, RenderCrew};
use crate::simulation::{InjectionPolicy, Simulation};
use crate::sink::{GifSink, ImageSink};

/// A job's simulation and its sink, before an id is assigned.
pub type PreparedJob = (Simulation, Box<dyn ImageSink + Send>);

/// Fixed pool of workers pulling jobs from a bounded queue.
///
/// Closing the queue (via [`finish`](Self::finish)) is the only shutdown
/// signal; workers drain what is queued, then exit.
pub struct JobDispatcher {
    next_id: u64,
    queue: Option<Sender<Job>>,
    reports: Receiver<JobReport>,
    workers: Vec<JoinHandle<()>>,
}

impl JobDispatcher {
    /// Start `workers` threads (at least one). Each worker gets its own
    /// [`RenderCrew`] with `workers` frame chunks, overlapped when `bsp` is set.
    pub fn start(workers: usize, bsp: bool) -> Result<Self, JobError> {
        let workers = workers.max(1);
        let (queue_tx, queue_rx) = bounded::<Job>(workers);
        let (report_tx, report_rx) = unbounded::<JobReport>();

        tracing::info!(
            "Starting {} worker(s), bsp={}, {} chunk(s) per frame",
            workers,
            bsp,
            workers
        );

        let mut dispatcher = Self {
            next_id: 0,
            queue: Some(queue_tx),
            reports: report_rx,
            workers: Vec::with_capacity(workers),
        };

        for i in 0..workers {
            let name = format!("job-worker-{i}");
            let crew = RenderCrew::spawn(&name, workers, bsp)?;
            let jobs = queue_rx.clone();
            let reports = report_tx.clone();
            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || worker_loop(jobs, reports, crew))
                .map_err(JobError::Spawn)?;
            dispatcher.workers.push(handle);
        }

        Ok(dispatcher)
    }

    /// Queue a job, blocking while the queue is full.
    pub fn submit(
        &mut self,
        simulation: Simulation,
        sink: Box<dyn ImageSink + Send>,
    ) -> Result<JobId, JobError> {
        let queue = self.queue.as_ref().ok_or(JobError::WorkerLost)?;
        let id = JobId(self.next_id);
        self.next_id += 1;

        queue
            .send(Job {
                id,
                simulation,
                sink,
            })
            .map_err(|_| JobError::WorkerLost)?;
        Ok(id)
    }

    /// Close the queue, wait for every worker, and return the reports in id
    /// order.
    pub fn finish(mut self) -> Vec<JobReport> {
        self.close();
        let mut reports: Vec<JobReport> = self.reports.try_iter().collect();
        reports.sort_by_key(|report| report.id);
        reports
    }

    fn close(&mut self) {
        self.queue = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("A job worker panicked");
            }
        }
    }
}

impl Drop for JobDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(jobs: Receiver<Job>, reports: Sender<JobReport>, mut crew: RenderCrew) {
    for job in jobs.iter() {
        let report = run_job(job, Some(&mut crew));
        if reports.send(report).is_err() {
            break;
        }
    }
}

/// Render one job to completion and save its output.
pub fn run_job(job: Job, crew: Option<&mut RenderCrew>) -> JobReport {
    let started = Instant::now();
    let Job {
        id,
        simulation,
        mut sink,
    } = job;
    let target = sink.target().to_string();
    tracing::info!("Job {} started: {} ({} frames)", id, target, simulation.length());

    let outcome = render_job(simulation, sink.as_mut(), crew)
        .and_then(|_| sink.save().map_err(JobError::from));

    let status = match outcome {
        Ok(()) => {
            tracing::info!("Saved {}", target);
            JobStatus::Completed
        }
        Err(err) => {
            tracing::error!("Job {} ({}) failed: {}", id, target, err);
            JobStatus::Failed(err.to_string())
        }
    };

    JobReport {
        id,
        target,
        status,
        elapsed: started.elapsed(),
    }
}

/// Run jobs in `mode` and report on each, in submission order.
///
/// Jobs are pulled from `jobs` only as the queue has room for them, so at
/// most a queue's worth of simulations exist ahead of the workers. The first
/// `Err` item stops submission; jobs already queued still run to completion
/// before the error is returned.
pub fn run_jobs<I>(mode: ExecutionMode, jobs: I) -> Result<Vec<JobReport>, JobError>
where
    I: IntoIterator<Item = Result<PreparedJob, JobError>>,
{
    match mode {
        ExecutionMode::Sequential => {
            let mut reports = Vec::new();
            for (index, prepared) in jobs.into_iter().enumerate() {
                let (simulation, sink) = prepared?;
                let job = Job {
                    id: JobId(index as u64),
                    simulation,
                    sink,
                };
                reports.push(run_job(job, None));
            }
            Ok(reports)
        }
        ExecutionMode::Parallel { workers, bsp } => {
            let mut dispatcher = JobDispatcher::start(workers, bsp)?;
            for prepared in jobs {
                let (simulation, sink) = prepared?;
                dispatcher.submit(simulation, sink)?;
            }
            Ok(dispatcher.finish())
        }
    }
}

/// Build the simulation and GIF sink a job record describes.
pub fn prepare_job(config: &JobConfig) -> Result<PreparedJob, JobError> {
    let simulation = Simulation::from_config(config)?;
    let sink: Box<dyn ImageSink + Send> = Box::new(GifSink::from_config(config)?);
    Ok((simulation, sink))
}

/// Run every job described by `configs`, writing GIFs.
///
/// Every record is checked before the first job starts; a bad record aborts
/// the run with nothing rendered. Simulations are then built one at a time
/// as the dispatcher accepts them.
pub fn execute(settings: &RunSettings, configs: &[JobConfig]) -> Result<Vec<JobReport>, JobError> {
    for (index, config) in configs.iter().enumerate() {
        InjectionPolicy::from_name(&config.sim_type)?;
        config
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                line: index + 1,
                reason,
            })?;
    }

    run_jobs(settings.mode(), configs.iter().map(prepare_job))
}
