//! Units of work handed to the dispatcher, and what comes back.

use std::fmt;
use std::time::Duration;

use crate::simulation::Simulation;
use crate::sink::ImageSink;

/// Dispatcher-assigned job number, unique per dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A simulation together with the sink its frames go to.
pub struct Job {
    /// Assigned identifier
    pub id: JobId,
    /// Simulation to drive to completion
    pub simulation: Simulation,
    /// Render target
    pub sink: Box<dyn ImageSink + Send>,
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Every frame was rendered and the output saved.
    Completed,
    /// The job stopped; the message says why.
    Failed(String),
}

/// Outcome of one job.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Job identifier
    pub id: JobId,
    /// Output target name
    pub target: String,
    /// Final state
    pub status: JobStatus,
    /// Wall-clock time spent on the job
    pub elapsed: Duration,
}

impl JobReport {
    /// Whether the job completed.
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
